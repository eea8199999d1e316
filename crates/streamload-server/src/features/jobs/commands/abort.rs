//! Abort job command

use mediator::Request;
use serde::{Deserialize, Serialize};
use streamload_common::JobStatus;
use uuid::Uuid;

use crate::ingest::framework::{JobService, SchedulerError};

/// Cancel a running job
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AbortJobCommand {
    pub id: Uuid,
}

#[derive(Debug, thiserror::Error)]
pub enum AbortJobError {
    #[error("Unable to abort successfully")]
    NotFound,

    #[error(transparent)]
    Scheduler(#[from] SchedulerError),
}

impl Request<Result<JobStatus, AbortJobError>> for AbortJobCommand {}

/// Returns the job's status after the abort attempt. Queued and finished jobs
/// come back unchanged.
#[tracing::instrument(skip(jobs), fields(job_id = %command.id))]
pub async fn handle(jobs: &dyn JobService, command: AbortJobCommand) -> Result<JobStatus, AbortJobError> {
    jobs.abort(command.id).await?.ok_or(AbortJobError::NotFound)
}
