//! Core types for the ingestion framework

use streamload_common::JobStatus;
use uuid::Uuid;

/// One URL-to-storage ingestion request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub id: Uuid,
    pub url: String,
}

impl Job {
    /// Create a job with a freshly generated id
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            url: url.into(),
        }
    }
}

/// Lifecycle notices an execution sends for observability only
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Announcement {
    Started,
    Finished,
    Failed,
}

impl Announcement {
    pub fn as_str(&self) -> &'static str {
        match self {
            Announcement::Started => "download started",
            Announcement::Finished => "download finished",
            Announcement::Failed => "error downloading",
        }
    }
}

/// Messages flowing from an execution unit back to the scheduler.
///
/// This channel is the only way an execution talks to the scheduler; it never
/// touches the pending queue or the in-flight map directly.
#[derive(Debug, Clone)]
pub enum WorkerMessage {
    Announce {
        id: Uuid,
        url: String,
        announcement: Announcement,
    },
    /// Every status the execution publishes, persisted or not
    Status(JobStatus),
    /// The execution unit has ended, whether or not it published a terminal status
    Exited { id: Uuid },
}
