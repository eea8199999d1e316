//! Data ingestion
//!
//! - **config**: ingestion settings (`CONCURRENT_DOWNLOADS`, `BATCH_SIZE`, ...)
//! - **framework**: dataset-agnostic scheduler and streaming pipeline
//! - **trip_data**: record adapter for the for-hire-vehicle trip CSV layout

pub mod config;
pub mod framework;
pub mod trip_data;

pub use config::IngestConfig;
pub use framework::{IngestionPipeline, Scheduler, SchedulerConfig};
pub use trip_data::{TripDataCsvAdapter, TripDataRow};
