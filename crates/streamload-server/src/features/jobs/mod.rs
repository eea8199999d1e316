//! Jobs feature module
//!
//! Queue a URL for ingestion, read a job's status, abort a running job.

pub mod commands;
pub mod queries;
pub mod routes;

pub use routes::jobs_routes;
