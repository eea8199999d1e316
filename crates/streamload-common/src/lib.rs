//! Streamload Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared types, error taxonomy and logging for the Streamload workspace.
//!
//! # Overview
//!
//! - **Error Handling**: the ingestion error taxonomy ([`IngestError`])
//! - **Types**: job status wire types shared by the server and its clients
//! - **Logging**: `tracing` subscriber set-up driven by `LOG_*` variables
//!
//! # Example
//!
//! ```no_run
//! use streamload_common::logging::{init_logging, LogConfig};
//! use streamload_common::types::{JobStatus, Status};
//!
//! fn main() -> anyhow::Result<()> {
//!     init_logging(&LogConfig::from_env()?)?;
//!     let status = JobStatus::new(uuid::Uuid::new_v4(), Status::Pending);
//!     tracing::info!(job_id = %status.id, "job queued");
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod logging;
pub mod types;

// Re-export commonly used types
pub use error::{IngestError, Result};
pub use types::{EnqueuedJob, JobStatus, Status};
