//! Enqueue URL command

use mediator::Request;
use serde::{Deserialize, Serialize};
use streamload_common::{EnqueuedJob, IngestError};

use crate::ingest::framework::{JobService, SchedulerError};

/// Queue a remote CSV for ingestion
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnqueueUrlCommand {
    #[serde(default)]
    pub url: String,
}

#[derive(Debug, thiserror::Error)]
pub enum EnqueueUrlError {
    #[error(transparent)]
    Validation(#[from] IngestError),

    #[error(transparent)]
    Scheduler(#[from] SchedulerError),
}

impl Request<Result<EnqueuedJob, EnqueueUrlError>> for EnqueueUrlCommand {}

impl EnqueueUrlCommand {
    /// The URL must be absolute http(s)
    pub fn validate(&self) -> Result<(), IngestError> {
        let url = self.url.trim();
        if url.is_empty() {
            return Err(IngestError::Validation("url is required".to_string()));
        }

        let parsed = reqwest::Url::parse(url)
            .map_err(|e| IngestError::Validation(format!("url is not valid: {}", e)))?;

        match parsed.scheme() {
            "http" | "https" => Ok(()),
            other => Err(IngestError::Validation(format!(
                "url scheme must be http or https, got {}",
                other
            ))),
        }
    }
}

#[tracing::instrument(skip(jobs), fields(url = %command.url))]
pub async fn handle(
    jobs: &dyn JobService,
    command: EnqueueUrlCommand,
) -> Result<EnqueuedJob, EnqueueUrlError> {
    command.validate()?;
    Ok(jobs.enqueue(command.url.trim().to_string()).await?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn command(url: &str) -> EnqueueUrlCommand {
        EnqueueUrlCommand {
            url: url.to_string(),
        }
    }

    #[test]
    fn test_accepts_http_and_https() {
        assert!(command("http://localhost:3001/files/trips.csv").validate().is_ok());
        assert!(command(" https://example.com/a.csv ").validate().is_ok());
    }

    #[test]
    fn test_rejects_missing_url() {
        let err = command("   ").validate().unwrap_err();
        assert_eq!(err, IngestError::Validation("url is required".to_string()));
    }

    #[test]
    fn test_rejects_relative_and_other_schemes() {
        assert!(command("/files/trips.csv").validate().is_err());
        assert!(command("ftp://example.com/a.csv").validate().is_err());
        assert!(command("not a url").validate().is_err());
    }
}
