//! Storage contracts consumed by the ingestion core
//!
//! Two stores, both addressed by job id:
//! - [`StatusStore`]: the last known [`JobStatus`] of every job
//! - [`DataStore`]: the converted records of every job
//!
//! Implementations live in [`crate::storage`].

use async_trait::async_trait;
use streamload_common::{IngestError, JobStatus};
use thiserror::Error;
use uuid::Uuid;

/// Status or record persistence failure
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Corrupt stored value: {0}")]
    Corrupt(String),
}

impl From<sqlx::Error> for StorageError {
    fn from(err: sqlx::Error) -> Self {
        StorageError::Database(err.to_string())
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Serialization(err.to_string())
    }
}

impl From<StorageError> for IngestError {
    fn from(err: StorageError) -> Self {
        IngestError::Storage(err.to_string())
    }
}

/// Durable job status, upserted by job id
#[async_trait]
pub trait StatusStore: Send + Sync {
    async fn get_status(&self, id: Uuid) -> Result<Option<JobStatus>, StorageError>;

    /// Insert or update. Optional fields absent from `status` keep their
    /// previously stored value; everything else is last writer wins.
    async fn upsert_status(&self, status: &JobStatus) -> Result<(), StorageError>;
}

/// Durable record storage, tagged by job id
#[async_trait]
pub trait DataStore<R: Send + 'static>: Send + Sync {
    /// Append `records` for `job_id`, preserving their order
    async fn insert_all(&self, job_id: Uuid, records: Vec<R>) -> Result<(), StorageError>;

    /// Remove every record written for `job_id`
    async fn delete_all(&self, job_id: Uuid) -> Result<(), StorageError>;
}
