//! Feature modules implementing the Streamload API
//!
//! Each feature is a vertical slice with its own commands, queries and
//! routes. Commands and queries implement the mediator `Request` trait.
//!
//! # Features
//!
//! - **jobs**: queue URLs for ingestion, follow their status, abort them

pub mod jobs;

use axum::Router;
use std::sync::Arc;

use crate::ingest::framework::JobService;

/// Creates the API router with all feature routes mounted
pub fn router(jobs: Arc<dyn JobService>) -> Router<()> {
    Router::new().merge(jobs::jobs_routes().with_state(jobs))
}
