//! Get job status query

use mediator::Request;
use serde::{Deserialize, Serialize};
use streamload_common::JobStatus;
use uuid::Uuid;

use crate::ingest::framework::{JobService, SchedulerError};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetJobStatusQuery {
    pub id: Uuid,
}

#[derive(Debug, thiserror::Error)]
pub enum GetJobStatusError {
    #[error("Status not found")]
    NotFound,

    #[error(transparent)]
    Scheduler(#[from] SchedulerError),
}

impl Request<Result<JobStatus, GetJobStatusError>> for GetJobStatusQuery {}

pub async fn handle(jobs: &dyn JobService, query: GetJobStatusQuery) -> Result<JobStatus, GetJobStatusError> {
    jobs.status(query.id).await?.ok_or(GetJobStatusError::NotFound)
}
