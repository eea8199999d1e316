//! Streamload Server Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Streams delimited datasets from remote URLs into storage.
//!
//! # Overview
//!
//! - **API Endpoints**: queue a URL, follow its status, abort it
//! - **Ingestion**: a bounded scheduler running one streaming pipeline per job
//! - **Storage**: PostgreSQL (sqlx) or in-memory status and record stores
//! - **Configuration**: environment-based configuration management
//! - **Middleware**: CORS and request logging
//!
//! # Architecture
//!
//! HTTP handlers talk to the [`ingest::framework::Scheduler`] through the
//! [`ingest::framework::JobService`] trait. The scheduler is a single actor
//! task owning the pending queue and the in-flight map; every admitted job
//! runs in its own task and reports back over a channel.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use streamload_server::{api, config::Config, ingest, storage};
//! use streamload_server::ingest::framework::{HttpSource, IngestionPipeline, Scheduler, StatusTracker};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load()?;
//!     let ingest_config = ingest::IngestConfig::from_env()?;
//!     let stores = storage::connect::<ingest::TripDataRow>(&config).await?;
//!
//!     let pipeline = IngestionPipeline::new(
//!         Arc::new(ingest::TripDataCsvAdapter),
//!         StatusTracker::new(stores.status),
//!         stores.data,
//!         Arc::new(HttpSource::new(ingest_config.http_timeout())?),
//!         ingest_config.batch_size,
//!     );
//!     let (scheduler, _task) = Scheduler::start(ingest_config.scheduler_config(), pipeline);
//!
//!     let app = api::create_router(Arc::new(scheduler), &config.cors);
//!     let listener = tokio::net::TcpListener::bind("127.0.0.1:3000").await?;
//!     axum::serve(listener, app).await?;
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod config;
pub mod error;
pub mod features;
pub mod ingest;
pub mod middleware;
pub mod storage;

// Re-export commonly used types
pub use error::AppError;
