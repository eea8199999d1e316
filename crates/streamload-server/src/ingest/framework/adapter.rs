//! Record adapter contract
//!
//! Implement this trait for each delimited dataset layout. The ingestion
//! pipeline hands it one complete, non-empty, non-header line at a time.

use thiserror::Error;

/// Why a line could not be converted
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AdapterError {
    #[error("expected {expected} fields, found {found}")]
    FieldCount { expected: usize, found: usize },

    #[error("invalid value for {field}: {value:?}")]
    InvalidValue { field: &'static str, value: String },
}

/// Converts one raw delimited line into a typed record.
///
/// Must be total over well-formed lines. What happens with malformed input is
/// up to the implementation; returning an error fails the job.
pub trait RecordAdapter: Send + Sync + 'static {
    type Record: Send + Sync + 'static;

    fn line_to_record(&self, line: &str) -> Result<Self::Record, AdapterError>;
}
