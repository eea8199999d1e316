//! Ingestion configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::framework::SchedulerConfig;

fn default_concurrent_downloads() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

/// `true` or `yes`, case-insensitive, surrounding whitespace ignored
fn parse_flag(value: &str) -> bool {
    matches!(value.trim().to_lowercase().as_str(), "true" | "yes")
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IngestConfig {
    /// Maximum number of downloads running at once
    pub concurrent_downloads: usize,
    /// Admission tick period in milliseconds
    pub download_job_interval_ms: u64,
    /// Records per data store insert
    pub batch_size: usize,
    /// Delete stored records of aborted jobs
    pub delete_on_abort: bool,
    /// Connect timeout for source fetches in seconds
    pub http_timeout_secs: u64,
}

impl IngestConfig {
    /// Load ingestion configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        let config = Self {
            concurrent_downloads: std::env::var("CONCURRENT_DOWNLOADS")
                .ok()
                .and_then(|s| s.trim().parse().ok())
                .unwrap_or_else(default_concurrent_downloads),
            download_job_interval_ms: std::env::var("DOWNLOAD_JOB_INTERVAL")
                .ok()
                .and_then(|s| s.trim().parse().ok())
                .unwrap_or(1000),
            batch_size: std::env::var("BATCH_SIZE")
                .ok()
                .and_then(|s| s.trim().parse().ok())
                .unwrap_or(1000),
            delete_on_abort: std::env::var("DELETE_ON_ABORT")
                .map(|s| parse_flag(&s))
                .unwrap_or(false),
            http_timeout_secs: std::env::var("HTTP_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.trim().parse().ok())
                .unwrap_or(30),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.concurrent_downloads == 0 {
            anyhow::bail!("CONCURRENT_DOWNLOADS must be greater than 0");
        }
        if self.download_job_interval_ms == 0 {
            anyhow::bail!("DOWNLOAD_JOB_INTERVAL must be greater than 0");
        }
        if self.batch_size == 0 {
            anyhow::bail!("BATCH_SIZE must be greater than 0");
        }
        if self.http_timeout_secs == 0 {
            anyhow::bail!("HTTP_TIMEOUT_SECS must be greater than 0");
        }
        Ok(())
    }

    pub fn job_tick(&self) -> Duration {
        Duration::from_millis(self.download_job_interval_ms)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn scheduler_config(&self) -> SchedulerConfig {
        SchedulerConfig {
            max_workers: self.concurrent_downloads,
            tick_interval: self.job_tick(),
            delete_on_abort: self.delete_on_abort,
        }
    }
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            concurrent_downloads: default_concurrent_downloads(),
            download_job_interval_ms: 1000,
            batch_size: 1000,
            delete_on_abort: false,
            http_timeout_secs: 30,
        }
    }
}
