//! Generic URL-to-storage ingestion framework
//!
//! Streams a delimited file from a URL, converts each line with a
//! [`RecordAdapter`] and stores the records in batches, while a single
//! [`Scheduler`] bounds how many jobs run at once.

pub mod adapter;
pub mod lines;
pub mod pipeline;
pub mod scheduler;
pub mod source;
pub mod status;
pub mod storage;
pub mod types;

// Re-export commonly used types
pub use adapter::{AdapterError, RecordAdapter};
pub use lines::LineSplitter;
pub use pipeline::{parse_content_length, IngestionPipeline};
pub use scheduler::{JobService, Scheduler, SchedulerConfig, SchedulerError, SchedulerSnapshot};
pub use source::{ByteSource, ByteStream, FetchError, HttpSource, SourceResponse};
pub use status::{estimate_eta, StatusTracker, StatusUpdate};
pub use storage::{DataStore, StatusStore, StorageError};
pub use types::{Announcement, Job, WorkerMessage};
