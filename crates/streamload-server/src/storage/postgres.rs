//! PostgreSQL stores

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;
use std::marker::PhantomData;
use streamload_common::JobStatus;
use uuid::Uuid;

use crate::ingest::framework::{DataStore, StatusStore, StorageError};

#[derive(Debug, sqlx::FromRow)]
struct JobStatusRow {
    id: Uuid,
    status: String,
    url: Option<String>,
    percentage: Option<f64>,
    records: Option<i64>,
    duration_ms: Option<i64>,
    eta: Option<DateTime<Utc>>,
    error: Option<String>,
}

impl TryFrom<JobStatusRow> for JobStatus {
    type Error = StorageError;

    fn try_from(row: JobStatusRow) -> Result<Self, Self::Error> {
        Ok(JobStatus {
            id: row.id,
            status: row.status.parse().map_err(StorageError::Corrupt)?,
            url: row.url,
            percentage: row.percentage,
            records: row.records.map(|r| r.max(0) as u64),
            duration: row.duration_ms.map(|d| d.max(0) as u64),
            eta: row.eta,
            error: row.error,
        })
    }
}

/// Job statuses in the `job_status` table
#[derive(Debug, Clone)]
pub struct PgStatusStore {
    pool: PgPool,
}

impl PgStatusStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl StatusStore for PgStatusStore {
    async fn get_status(&self, id: Uuid) -> Result<Option<JobStatus>, StorageError> {
        let row: Option<JobStatusRow> = sqlx::query_as(
            r#"
            SELECT id, status, url, percentage, records, duration_ms, eta, error
            FROM job_status
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(JobStatus::try_from).transpose()
    }

    async fn upsert_status(&self, status: &JobStatus) -> Result<(), StorageError> {
        sqlx::query(
            r#"
            INSERT INTO job_status (id, status, url, percentage, records, duration_ms, eta, error)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (id) DO UPDATE SET
                status = EXCLUDED.status,
                url = COALESCE(EXCLUDED.url, job_status.url),
                percentage = COALESCE(EXCLUDED.percentage, job_status.percentage),
                records = COALESCE(EXCLUDED.records, job_status.records),
                duration_ms = COALESCE(EXCLUDED.duration_ms, job_status.duration_ms),
                eta = COALESCE(EXCLUDED.eta, job_status.eta),
                error = COALESCE(EXCLUDED.error, job_status.error),
                updated_at = NOW()
            "#,
        )
        .bind(status.id)
        .bind(status.status.as_str())
        .bind(status.url.as_deref())
        .bind(status.percentage)
        .bind(status.records.map(|r| r as i64))
        .bind(status.duration.map(|d| d as i64))
        .bind(status.eta)
        .bind(status.error.as_deref())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

/// Records serialized as JSONB in the `ingested_records` table
#[derive(Debug)]
pub struct PgDataStore<R> {
    pool: PgPool,
    _record: PhantomData<fn(R)>,
}

impl<R> PgDataStore<R> {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            _record: PhantomData,
        }
    }
}

impl<R> Clone for PgDataStore<R> {
    fn clone(&self) -> Self {
        Self::new(self.pool.clone())
    }
}

#[async_trait]
impl<R: Serialize + Send + Sync + 'static> DataStore<R> for PgDataStore<R> {
    async fn insert_all(&self, job_id: Uuid, records: Vec<R>) -> Result<(), StorageError> {
        if records.is_empty() {
            return Ok(());
        }

        let values = records
            .iter()
            .map(serde_json::to_value)
            .collect::<Result<Vec<_>, _>>()?;

        // seq follows array order
        sqlx::query(
            r#"
            INSERT INTO ingested_records (job_id, record)
            SELECT $1, batch.record
            FROM UNNEST($2::jsonb[]) WITH ORDINALITY AS batch(record, ord)
            ORDER BY batch.ord
            "#,
        )
        .bind(job_id)
        .bind(values)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn delete_all(&self, job_id: Uuid) -> Result<(), StorageError> {
        let result = sqlx::query("DELETE FROM ingested_records WHERE job_id = $1")
            .bind(job_id)
            .execute(&self.pool)
            .await?;

        tracing::debug!(job_id = %job_id, deleted = result.rows_affected(), "Deleted ingested records");

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use streamload_common::Status;

    fn row(status: &str) -> JobStatusRow {
        JobStatusRow {
            id: Uuid::new_v4(),
            status: status.to_string(),
            url: Some("http://host/a.csv".to_string()),
            percentage: Some(40.0),
            records: Some(12),
            duration_ms: Some(900),
            eta: None,
            error: None,
        }
    }

    #[test]
    fn test_row_conversion() {
        let status = JobStatus::try_from(row("InProgress")).unwrap();
        assert_eq!(status.status, Status::InProgress);
        assert_eq!(status.records, Some(12));
        assert_eq!(status.duration, Some(900));
    }

    #[test]
    fn test_row_with_unknown_status_is_corrupt() {
        let err = JobStatus::try_from(row("Paused")).unwrap_err();
        assert!(matches!(err, StorageError::Corrupt(_)));
    }
}
