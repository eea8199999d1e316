//! In-memory stores

use async_trait::async_trait;
use std::collections::HashMap;
use streamload_common::JobStatus;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::ingest::framework::{DataStore, StatusStore, StorageError};

#[derive(Debug, Default)]
pub struct MemoryStatusStore {
    statuses: RwLock<HashMap<Uuid, JobStatus>>,
}

impl MemoryStatusStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.statuses.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.statuses.read().await.is_empty()
    }
}

#[async_trait]
impl StatusStore for MemoryStatusStore {
    async fn get_status(&self, id: Uuid) -> Result<Option<JobStatus>, StorageError> {
        Ok(self.statuses.read().await.get(&id).cloned())
    }

    async fn upsert_status(&self, status: &JobStatus) -> Result<(), StorageError> {
        let mut statuses = self.statuses.write().await;
        match statuses.get_mut(&status.id) {
            Some(existing) => existing.merge(status.clone()),
            None => {
                statuses.insert(status.id, status.clone());
            }
        }
        Ok(())
    }
}

/// Records grouped by job, in insertion order
#[derive(Debug)]
pub struct MemoryDataStore<R> {
    records: RwLock<HashMap<Uuid, Vec<R>>>,
}

impl<R> Default for MemoryDataStore<R> {
    fn default() -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
        }
    }
}

impl<R: Clone> MemoryDataStore<R> {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn records(&self, job_id: Uuid) -> Vec<R> {
        self.records
            .read()
            .await
            .get(&job_id)
            .cloned()
            .unwrap_or_default()
    }

    pub async fn count(&self, job_id: Uuid) -> usize {
        self.records.read().await.get(&job_id).map_or(0, Vec::len)
    }
}

#[async_trait]
impl<R: Send + Sync + 'static> DataStore<R> for MemoryDataStore<R> {
    async fn insert_all(&self, job_id: Uuid, records: Vec<R>) -> Result<(), StorageError> {
        self.records
            .write()
            .await
            .entry(job_id)
            .or_default()
            .extend(records);
        Ok(())
    }

    async fn delete_all(&self, job_id: Uuid) -> Result<(), StorageError> {
        self.records.write().await.remove(&job_id);
        Ok(())
    }
}
