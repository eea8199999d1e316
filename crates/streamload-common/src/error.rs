//! Error taxonomy for ingestion jobs

use thiserror::Error;

/// Result type alias for ingestion operations
pub type Result<T> = std::result::Result<T, IngestError>;

/// Every way an ingestion job can fail.
///
/// Per-job failures never escape the ingestion pipeline: they are turned into
/// a terminal `Error` status whose message is this error's `Display` output.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IngestError {
    /// Malformed input to an operation, rejected before it reaches the core
    #[error("{0}")]
    Validation(String),

    /// The source fetch failed, or the stream errored mid-flight
    #[error("{0}")]
    Network(String),

    /// Declared content length missing, zero or non-numeric
    #[error("Invalid content length")]
    InvalidContentLength,

    /// Status or record persistence failed
    #[error("Storage error: {0}")]
    Storage(String),

    /// A line could not be converted into a record
    #[error("Record conversion failed: {0}")]
    Adapter(String),

    /// The execution unit was torn down by an abort
    #[error("Job aborted")]
    Aborted,
}
