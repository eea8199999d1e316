//! Status tracking and ETA estimation

use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use streamload_common::{JobStatus, Status};
use uuid::Uuid;

use super::storage::{StatusStore, StorageError};

/// A status transition about to be recorded for a job
#[derive(Debug, Clone, PartialEq)]
pub struct StatusUpdate {
    pub status: Status,
    pub url: Option<String>,
    pub percentage: Option<f64>,
    pub records: Option<u64>,
    /// Time since the execution started, when there is one
    pub elapsed: Option<Duration>,
    pub error: Option<String>,
}

impl StatusUpdate {
    pub fn new(status: Status) -> Self {
        Self {
            status,
            url: None,
            percentage: None,
            records: None,
            elapsed: None,
            error: None,
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_progress(mut self, percentage: f64, records: u64) -> Self {
        self.percentage = Some(percentage);
        self.records = Some(records);
        self
    }

    pub fn with_elapsed(mut self, elapsed: Duration) -> Self {
        self.elapsed = Some(elapsed);
        self
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }
}

/// Estimated completion time for a job.
///
/// - terminal states finish "now"
/// - in progress with some progress made extrapolates linearly from elapsed time
/// - anything else has no estimate
pub fn estimate_eta(
    status: Status,
    percentage: Option<f64>,
    elapsed: Duration,
    now: DateTime<Utc>,
) -> Option<DateTime<Utc>> {
    if status.is_terminal() {
        return Some(now);
    }

    match (status, percentage) {
        (Status::InProgress, Some(pct)) if pct > 0.0 => {
            let elapsed_ms = elapsed.as_secs_f64() * 1000.0;
            let total_ms = elapsed_ms * 100.0 / pct;
            let remaining_ms = (total_ms - elapsed_ms).max(0.0);
            Some(now + chrono::Duration::milliseconds(remaining_ms.round() as i64))
        }
        _ => None,
    }
}

/// Builds complete status records and persists them through a [`StatusStore`]
#[derive(Clone)]
pub struct StatusTracker {
    store: Arc<dyn StatusStore>,
}

impl StatusTracker {
    pub fn new(store: Arc<dyn StatusStore>) -> Self {
        Self { store }
    }

    /// Derive duration and ETA for an update without persisting it
    pub fn build(&self, id: Uuid, update: StatusUpdate) -> JobStatus {
        self.build_at(id, update, Utc::now())
    }

    fn build_at(&self, id: Uuid, update: StatusUpdate, now: DateTime<Utc>) -> JobStatus {
        let elapsed = update.elapsed.unwrap_or_default();
        let eta = estimate_eta(update.status, update.percentage, elapsed, now);

        JobStatus {
            id,
            status: update.status,
            url: update.url,
            percentage: update.percentage,
            records: update.records,
            duration: update.elapsed.map(|d| d.as_millis() as u64),
            eta,
            error: update.error,
        }
    }

    pub async fn persist(&self, status: &JobStatus) -> Result<(), StorageError> {
        self.store.upsert_status(status).await
    }

    /// Build and persist in one step
    pub async fn record(&self, id: Uuid, update: StatusUpdate) -> Result<JobStatus, StorageError> {
        let status = self.build(id, update);
        self.persist(&status).await?;
        Ok(status)
    }

    pub async fn get_status(&self, id: Uuid) -> Result<Option<JobStatus>, StorageError> {
        self.store.get_status(id).await
    }
}

impl std::fmt::Debug for StatusTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatusTracker").finish_non_exhaustive()
    }
}
