//! Job status types shared by the server and its clients

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle state of an ingestion job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Status {
    Pending,
    InProgress,
    Error,
    Finished,
    Aborted,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Pending => "Pending",
            Status::InProgress => "InProgress",
            Status::Error => "Error",
            Status::Finished => "Finished",
            Status::Aborted => "Aborted",
        }
    }

    /// Terminal states free the job's worker slot
    pub fn is_terminal(&self) -> bool {
        matches!(self, Status::Error | Status::Finished | Status::Aborted)
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Status {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(Status::Pending),
            "InProgress" => Ok(Status::InProgress),
            "Error" => Ok(Status::Error),
            "Finished" => Ok(Status::Finished),
            "Aborted" => Ok(Status::Aborted),
            other => Err(format!("Unknown job status: {}", other)),
        }
    }
}

/// Persisted status of one job, upserted by job id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobStatus {
    pub id: Uuid,
    pub status: Status,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Percent of the declared content length consumed (0-100)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub percentage: Option<f64>,
    /// Records converted so far
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub records: Option<u64>,
    /// Wall-clock milliseconds since the job started
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eta: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl JobStatus {
    pub fn new(id: Uuid, status: Status) -> Self {
        Self {
            id,
            status,
            url: None,
            percentage: None,
            records: None,
            duration: None,
            eta: None,
            error: None,
        }
    }

    /// Apply a newer write on top of this one.
    ///
    /// The status always changes; optional fields only change when the newer
    /// write carries them.
    pub fn merge(&mut self, newer: JobStatus) {
        self.status = newer.status;
        if newer.url.is_some() {
            self.url = newer.url;
        }
        if newer.percentage.is_some() {
            self.percentage = newer.percentage;
        }
        if newer.records.is_some() {
            self.records = newer.records;
        }
        if newer.duration.is_some() {
            self.duration = newer.duration;
        }
        if newer.eta.is_some() {
            self.eta = newer.eta;
        }
        if newer.error.is_some() {
            self.error = newer.error;
        }
    }
}

/// Descriptor returned when a job is queued
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnqueuedJob {
    pub id: Uuid,
    pub url: String,
    /// 1-based position in the pending queue right after insertion
    pub position: usize,
}
