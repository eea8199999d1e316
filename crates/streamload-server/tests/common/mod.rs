//! Shared fixtures for integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{self, StreamExt};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use streamload_common::{JobStatus, Status};
use streamload_server::ingest::framework::{
    AdapterError, ByteSource, DataStore, FetchError, IngestionPipeline, RecordAdapter,
    SourceResponse, StatusStore, StatusTracker, StorageError,
};
use streamload_server::storage::{MemoryDataStore, MemoryStatusStore};
use tokio::sync::Notify;
use uuid::Uuid;

/// Splits a line on commas; a line containing `FAIL` is rejected
#[derive(Debug, Default)]
pub struct FieldsAdapter;

impl RecordAdapter for FieldsAdapter {
    type Record = Vec<String>;

    fn line_to_record(&self, line: &str) -> Result<Vec<String>, AdapterError> {
        if line.contains("FAIL") {
            return Err(AdapterError::InvalidValue {
                field: "line",
                value: line.to_string(),
            });
        }
        Ok(line.trim().split(',').map(str::to_string).collect())
    }
}

/// What a [`ScriptedSource`] answers for one URL
#[derive(Clone)]
pub struct Script {
    pub content_length: Option<String>,
    pub chunks: Vec<Result<Bytes, String>>,
    /// Hold the stream open after the last chunk until notified
    pub hold: Option<Arc<Notify>>,
    pub fail_request: Option<String>,
}

impl Script {
    /// Serve `body` in the given chunk sizes with an accurate content length
    pub fn chunked(body: &str, chunk_size: usize) -> Self {
        let chunks = body
            .as_bytes()
            .chunks(chunk_size.max(1))
            .map(|c| Ok(Bytes::copy_from_slice(c)))
            .collect();
        Self {
            content_length: Some(body.len().to_string()),
            chunks,
            hold: None,
            fail_request: None,
        }
    }

    pub fn whole(body: &str) -> Self {
        Self::chunked(body, body.len())
    }

    pub fn with_content_length(mut self, value: Option<&str>) -> Self {
        self.content_length = value.map(str::to_string);
        self
    }

    pub fn then_fail(mut self, message: &str) -> Self {
        self.chunks.push(Err(message.to_string()));
        self
    }

    pub fn held(mut self, release: Arc<Notify>) -> Self {
        self.hold = Some(release);
        self
    }

    pub fn request_error(message: &str) -> Self {
        Self {
            content_length: None,
            chunks: Vec::new(),
            hold: None,
            fail_request: Some(message.to_string()),
        }
    }
}

/// In-process [`ByteSource`] replaying scripted responses per URL
#[derive(Default)]
pub struct ScriptedSource {
    scripts: Mutex<HashMap<String, Script>>,
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, url: &str, script: Script) {
        self.scripts.lock().unwrap().insert(url.to_string(), script);
    }
}

#[async_trait]
impl ByteSource for ScriptedSource {
    async fn get(&self, url: &str) -> Result<SourceResponse, FetchError> {
        let script = self
            .scripts
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .ok_or_else(|| FetchError::Other(format!("no script for {url}")))?;
        let Script {
            content_length,
            chunks,
            hold,
            fail_request,
        } = script;

        if let Some(message) = fail_request {
            return Err(FetchError::Other(message));
        }

        let chunks = stream::iter(chunks.into_iter().map(|chunk| chunk.map_err(FetchError::Other)));
        let hold = stream::once(async move {
            if let Some(release) = hold {
                release.notified().await;
            }
        })
        .filter_map(|()| async { None::<Result<Bytes, FetchError>> });

        Ok(SourceResponse {
            content_length,
            body: chunks.chain(hold).boxed(),
        })
    }
}

/// [`StatusStore`] that keeps every write, optionally failing all of them
#[derive(Default)]
pub struct RecordingStatusStore {
    inner: MemoryStatusStore,
    history: Mutex<Vec<JobStatus>>,
    fail_writes: bool,
}

impl RecordingStatusStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail_writes: true,
            ..Self::default()
        }
    }

    pub fn history(&self) -> Vec<JobStatus> {
        self.history.lock().unwrap().clone()
    }

    pub fn history_for(&self, id: Uuid) -> Vec<JobStatus> {
        self.history().into_iter().filter(|s| s.id == id).collect()
    }

    pub fn statuses_for(&self, id: Uuid) -> Vec<Status> {
        self.history_for(id).into_iter().map(|s| s.status).collect()
    }
}

#[async_trait]
impl StatusStore for RecordingStatusStore {
    async fn get_status(&self, id: Uuid) -> Result<Option<JobStatus>, StorageError> {
        self.inner.get_status(id).await
    }

    async fn upsert_status(&self, status: &JobStatus) -> Result<(), StorageError> {
        self.history.lock().unwrap().push(status.clone());
        if self.fail_writes {
            return Err(StorageError::Database("connection refused".to_string()));
        }
        self.inner.upsert_status(status).await
    }
}

/// [`DataStore`] that counts calls and can reject inserts
pub struct RecordingDataStore<R> {
    inner: MemoryDataStore<R>,
    batch_sizes: Mutex<Vec<usize>>,
    deletes: Mutex<Vec<Uuid>>,
    fail_inserts: bool,
}

impl<R: Clone> RecordingDataStore<R> {
    pub fn new() -> Self {
        Self {
            inner: MemoryDataStore::new(),
            batch_sizes: Mutex::new(Vec::new()),
            deletes: Mutex::new(Vec::new()),
            fail_inserts: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            fail_inserts: true,
            ..Self::new()
        }
    }

    pub async fn records(&self, job_id: Uuid) -> Vec<R> {
        self.inner.records(job_id).await
    }

    pub fn batch_sizes(&self) -> Vec<usize> {
        self.batch_sizes.lock().unwrap().clone()
    }

    pub fn deletes(&self) -> Vec<Uuid> {
        self.deletes.lock().unwrap().clone()
    }
}

#[async_trait]
impl<R: Clone + Send + Sync + 'static> DataStore<R> for RecordingDataStore<R> {
    async fn insert_all(&self, job_id: Uuid, records: Vec<R>) -> Result<(), StorageError> {
        self.batch_sizes.lock().unwrap().push(records.len());
        if self.fail_inserts {
            return Err(StorageError::Database("disk full".to_string()));
        }
        self.inner.insert_all(job_id, records).await
    }

    async fn delete_all(&self, job_id: Uuid) -> Result<(), StorageError> {
        self.deletes.lock().unwrap().push(job_id);
        self.inner.delete_all(job_id).await
    }
}

/// Stores and source wired into a pipeline
pub struct Harness {
    pub source: Arc<ScriptedSource>,
    pub statuses: Arc<RecordingStatusStore>,
    pub data: Arc<RecordingDataStore<Vec<String>>>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_stores(RecordingStatusStore::new(), RecordingDataStore::new())
    }

    pub fn with_stores(
        statuses: RecordingStatusStore,
        data: RecordingDataStore<Vec<String>>,
    ) -> Self {
        Self {
            source: Arc::new(ScriptedSource::new()),
            statuses: Arc::new(statuses),
            data: Arc::new(data),
        }
    }

    pub fn pipeline(&self, batch_size: usize) -> IngestionPipeline<FieldsAdapter> {
        IngestionPipeline::new(
            Arc::new(FieldsAdapter),
            StatusTracker::new(self.statuses.clone()),
            self.data.clone(),
            self.source.clone(),
            batch_size,
        )
    }
}

/// Poll `check` until it returns true or two seconds pass
pub async fn wait_until(mut check: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while tokio::time::Instant::now() < deadline {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    false
}

/// Wait until `status` has been written for `id`
pub async fn wait_for_status(store: &RecordingStatusStore, id: Uuid, status: Status) -> bool {
    wait_until(|| store.statuses_for(id).contains(&status)).await
}
