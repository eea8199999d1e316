//! Streaming ingestion of one job: fetch, split, convert, batch, store
//!
//! A run goes through these steps:
//! 1. Fetch the URL and validate the declared content length
//! 2. Reassemble lines from the byte stream, dropping the header and blanks
//! 3. Convert lines to records and flush them to the data store in batches
//! 4. Publish progress after every flush and a terminal status at the end
//!
//! Every status is sent to the scheduler even when persisting it fails.

use futures::{FutureExt, StreamExt};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;
use streamload_common::{IngestError, JobStatus, Status};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, error, info, warn};

use super::adapter::RecordAdapter;
use super::lines::LineSplitter;
use super::source::ByteSource;
use super::status::{StatusTracker, StatusUpdate};
use super::storage::DataStore;
use super::types::{Announcement, Job, WorkerMessage};

/// Parse a raw `Content-Length` value. Absent, zero or non-numeric is an error.
pub fn parse_content_length(raw: Option<&str>) -> Result<u64, IngestError> {
    match raw.map(str::trim).map(str::parse::<u64>) {
        Some(Ok(length)) if length > 0 => Ok(length),
        _ => Err(IngestError::InvalidContentLength),
    }
}

/// Byte and record counters for a running job
#[derive(Debug, Default, Clone, Copy)]
struct Progress {
    content_length: Option<u64>,
    bytes_consumed: u64,
    records: u64,
}

impl Progress {
    fn percentage(&self) -> f64 {
        match self.content_length {
            Some(length) if length > 0 => {
                (self.bytes_consumed as f64 / length as f64 * 100.0).min(100.0)
            }
            _ => 0.0,
        }
    }
}

/// Sends statuses and announcements for one job
struct Publisher<'a> {
    job: &'a Job,
    tracker: &'a StatusTracker,
    outbox: &'a UnboundedSender<WorkerMessage>,
    started: Instant,
}

impl Publisher<'_> {
    fn announce(&self, announcement: Announcement) {
        info!(job_id = %self.job.id, url = %self.job.url, "{}", announcement.as_str());
        let _ = self.outbox.send(WorkerMessage::Announce {
            id: self.job.id,
            url: self.job.url.clone(),
            announcement,
        });
    }

    async fn publish(&self, update: StatusUpdate) -> JobStatus {
        let update = update
            .with_url(self.job.url.clone())
            .with_elapsed(self.started.elapsed());
        let status = self.tracker.build(self.job.id, update);

        if let Err(e) = self.tracker.persist(&status).await {
            let err = IngestError::from(e);
            warn!(job_id = %self.job.id, status = %status.status, error = %err, "Failed to persist status");
        }

        let _ = self.outbox.send(WorkerMessage::Status(status.clone()));
        status
    }
}

/// Everything a job execution needs, shared across executions
pub struct IngestionPipeline<A: RecordAdapter> {
    adapter: Arc<A>,
    tracker: StatusTracker,
    data_store: Arc<dyn DataStore<A::Record>>,
    source: Arc<dyn ByteSource>,
    batch_size: usize,
}

impl<A: RecordAdapter> Clone for IngestionPipeline<A> {
    fn clone(&self) -> Self {
        Self {
            adapter: self.adapter.clone(),
            tracker: self.tracker.clone(),
            data_store: self.data_store.clone(),
            source: self.source.clone(),
            batch_size: self.batch_size,
        }
    }
}

impl<A: RecordAdapter> IngestionPipeline<A> {
    /// A `batch_size` of zero is treated as one.
    pub fn new(
        adapter: Arc<A>,
        tracker: StatusTracker,
        data_store: Arc<dyn DataStore<A::Record>>,
        source: Arc<dyn ByteSource>,
        batch_size: usize,
    ) -> Self {
        Self {
            adapter,
            tracker,
            data_store,
            source,
            batch_size: batch_size.max(1),
        }
    }

    pub fn tracker(&self) -> &StatusTracker {
        &self.tracker
    }

    pub fn data_store(&self) -> Arc<dyn DataStore<A::Record>> {
        self.data_store.clone()
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Run the job as a self-contained execution unit.
    ///
    /// A panic inside the run is caught and recorded as an `Error` status.
    /// [`WorkerMessage::Exited`] is always the last message sent, unless the
    /// task is aborted first.
    pub async fn execute(self, job: Job, outbox: UnboundedSender<WorkerMessage>) {
        let outcome = AssertUnwindSafe(self.run(&job, &outbox)).catch_unwind().await;

        if outcome.is_err() {
            error!(job_id = %job.id, url = %job.url, "Ingestion task panicked");
            let status = self.tracker.build(
                job.id,
                StatusUpdate::new(Status::Error)
                    .with_url(job.url.clone())
                    .with_error("Ingestion task panicked"),
            );
            if let Err(e) = self.tracker.persist(&status).await {
                warn!(job_id = %job.id, error = %e, "Failed to persist status");
            }
            let _ = outbox.send(WorkerMessage::Status(status));
        }

        let _ = outbox.send(WorkerMessage::Exited { id: job.id });
    }

    /// Ingest `job` and return its terminal status
    pub async fn run(&self, job: &Job, outbox: &UnboundedSender<WorkerMessage>) -> JobStatus {
        let publisher = Publisher {
            job,
            tracker: &self.tracker,
            outbox,
            started: Instant::now(),
        };
        publisher.announce(Announcement::Started);

        let mut progress = Progress::default();
        match self.ingest(&publisher, &mut progress).await {
            Ok(()) => {
                let status = publisher
                    .publish(StatusUpdate::new(Status::Finished).with_progress(100.0, progress.records))
                    .await;
                info!(
                    job_id = %job.id,
                    records = progress.records,
                    bytes = progress.bytes_consumed,
                    duration_ms = ?status.duration,
                    "Ingestion completed"
                );
                publisher.announce(Announcement::Finished);
                status
            }
            Err(err) => {
                error!(job_id = %job.id, url = %job.url, error = %err, "Ingestion failed");
                let mut update = StatusUpdate::new(Status::Error).with_error(err.to_string());
                if progress.content_length.is_some() {
                    update = update.with_progress(progress.percentage(), progress.records);
                }
                let status = publisher.publish(update).await;
                publisher.announce(Announcement::Failed);
                status
            }
        }
    }

    async fn ingest(&self, publisher: &Publisher<'_>, progress: &mut Progress) -> Result<(), IngestError> {
        let job = publisher.job;
        let response = self
            .source
            .get(&job.url)
            .await
            .map_err(|e| IngestError::Network(e.to_string()))?;

        let content_length = parse_content_length(response.content_length.as_deref())?;
        progress.content_length = Some(content_length);
        debug!(job_id = %job.id, content_length, "Content length accepted");

        publisher
            .publish(StatusUpdate::new(Status::InProgress).with_progress(0.0, 0))
            .await;

        let mut body = response.body;
        let mut splitter = LineSplitter::new();
        let mut batch = Vec::with_capacity(self.batch_size);
        let mut header_seen = false;

        while let Some(chunk) = body.next().await {
            let chunk = chunk.map_err(|e| IngestError::Network(e.to_string()))?;
            progress.bytes_consumed += chunk.len() as u64;

            for line in splitter.push(&chunk) {
                self.accept_line(&line, &mut header_seen, &mut batch, progress, publisher)
                    .await?;
            }
        }

        if let Some(line) = splitter.finish() {
            self.accept_line(&line, &mut header_seen, &mut batch, progress, publisher)
                .await?;
        }

        if !batch.is_empty() {
            self.flush(job, &mut batch).await;
        }

        Ok(())
    }

    async fn accept_line(
        &self,
        line: &str,
        header_seen: &mut bool,
        batch: &mut Vec<A::Record>,
        progress: &mut Progress,
        publisher: &Publisher<'_>,
    ) -> Result<(), IngestError> {
        if !*header_seen {
            *header_seen = true;
            return Ok(());
        }
        if line.trim().is_empty() {
            return Ok(());
        }

        progress.records += 1;
        let record = self
            .adapter
            .line_to_record(line)
            .map_err(|e| IngestError::Adapter(e.to_string()))?;
        batch.push(record);

        if batch.len() >= self.batch_size {
            self.flush(publisher.job, batch).await;
            publisher
                .publish(
                    StatusUpdate::new(Status::InProgress)
                        .with_progress(progress.percentage(), progress.records),
                )
                .await;
        }

        Ok(())
    }

    /// Write the batch and start a new one. A failed write is logged and the
    /// batch is dropped.
    async fn flush(&self, job: &Job, batch: &mut Vec<A::Record>) {
        let records = std::mem::replace(batch, Vec::with_capacity(self.batch_size));
        let count = records.len();

        match self.data_store.insert_all(job.id, records).await {
            Ok(()) => debug!(job_id = %job.id, count, "Flushed batch"),
            Err(e) => {
                let err = IngestError::from(e);
                warn!(job_id = %job.id, count, error = %err, "Failed to store batch, records dropped");
            }
        }
    }
}
