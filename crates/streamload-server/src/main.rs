//! Streamload Server - Main entry point

use anyhow::Result;
use std::{net::SocketAddr, sync::Arc, time::Duration};
use streamload_common::logging::{init_logging, LogConfig};
use tokio::signal;
use tracing::{info, warn};

use streamload_server::{
    api,
    config::Config,
    ingest::{
        framework::{HttpSource, IngestionPipeline, Scheduler, StatusTracker},
        IngestConfig, TripDataCsvAdapter, TripDataRow,
    },
    storage,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Environment variables take precedence over these defaults
    let log_config = LogConfig::builder()
        .log_file_prefix("streamload-server")
        .filter_directives("streamload_server=debug,tower_http=debug,sqlx=warn")
        .build()
        .merge_env()?;

    let _log_guard = init_logging(&log_config)?;

    info!("Starting Streamload Server");

    let config = Config::load()?;
    info!(
        "Configuration loaded - server will bind to {}:{}",
        config.server.host, config.server.port
    );

    let ingest_config = IngestConfig::from_env()?;
    info!(
        concurrent_downloads = ingest_config.concurrent_downloads,
        batch_size = ingest_config.batch_size,
        "Ingestion configuration loaded"
    );

    let stores = storage::connect::<TripDataRow>(&config).await?;
    info!(backend = ?config.storage, "Storage initialized");

    let source = HttpSource::new(ingest_config.http_timeout())?;
    let pipeline = IngestionPipeline::new(
        Arc::new(TripDataCsvAdapter),
        StatusTracker::new(stores.status),
        stores.data,
        Arc::new(source),
        ingest_config.batch_size,
    );
    let (scheduler, scheduler_task) = Scheduler::start(ingest_config.scheduler_config(), pipeline);

    let app = api::create_router(Arc::new(scheduler.clone()), &config.cors);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Running jobs are cancelled; their status stays at the last published value
    let timeout = Duration::from_secs(config.server.shutdown_timeout_secs);
    match tokio::time::timeout(timeout, scheduler.shutdown()).await {
        Ok(Ok(())) => {
            if let Err(e) = scheduler_task.await {
                warn!("Scheduler task ended abnormally: {}", e);
            }
        }
        Ok(Err(e)) => warn!("Scheduler already stopped: {}", e),
        Err(_) => warn!("Scheduler did not stop within {} seconds", timeout.as_secs()),
    }

    info!("Server shut down gracefully");

    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown");
        },
        _ = terminate => {
            info!("Received terminate signal, starting graceful shutdown");
        },
    }
}
