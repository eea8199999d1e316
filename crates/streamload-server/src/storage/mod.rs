//! Status and record store backends
//!
//! - **postgres**: `job_status` and `ingested_records` tables via sqlx
//! - **memory**: process-local maps, for development and tests

pub mod memory;
pub mod postgres;

pub use memory::{MemoryDataStore, MemoryStatusStore};
pub use postgres::{PgDataStore, PgStatusStore};

use serde::Serialize;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::config::{Config, StorageBackend};
use crate::ingest::framework::{DataStore, StatusStore};

/// The pair of stores a running server uses
pub struct Stores<R: Send + 'static> {
    pub status: Arc<dyn StatusStore>,
    pub data: Arc<dyn DataStore<R>>,
}

/// Open the configured backend. For Postgres this connects the pool and
/// runs pending migrations.
pub async fn connect<R>(config: &Config) -> anyhow::Result<Stores<R>>
where
    R: Serialize + Send + Sync + 'static,
{
    match config.storage {
        StorageBackend::Memory => {
            info!("Using in-memory storage, data is lost on restart");
            Ok(Stores {
                status: Arc::new(MemoryStatusStore::new()),
                data: Arc::new(MemoryDataStore::<R>::default()),
            })
        }
        StorageBackend::Postgres => {
            let db = &config.database;
            let pool = PgPoolOptions::new()
                .max_connections(db.max_connections)
                .min_connections(db.min_connections)
                .acquire_timeout(Duration::from_secs(db.connect_timeout_secs))
                .idle_timeout(Duration::from_secs(db.idle_timeout_secs))
                .connect(&db.url)
                .await?;

            info!("Database connection pool established");

            sqlx::migrate!("../../migrations")
                .run(&pool)
                .await
                .map_err(|e| anyhow::anyhow!("Failed to run migrations: {}", e))?;

            info!("Database migrations completed");

            Ok(Stores {
                status: Arc::new(PgStatusStore::new(pool.clone())),
                data: Arc::new(PgDataStore::<R>::new(pool)),
            })
        }
    }
}
