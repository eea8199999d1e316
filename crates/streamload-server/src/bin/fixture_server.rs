//! Static file server for local ingestion testing
//!
//! Serves every file under `--dir` at `/files/<name>` with a declared
//! `Content-Length`, so a running Streamload server can ingest it:
//!
//! ```text
//! fixture-server --dir ./csvs --port 3001
//! curl -X POST localhost:3000/url -H 'content-type: application/json' \
//!     -d '{"url":"http://localhost:3001/files/trips.csv"}'
//! ```

use anyhow::Result;
use axum::Router;
use clap::Parser;
use std::{net::SocketAddr, path::PathBuf};
use streamload_common::logging::{init_logging, LogConfig};
use tower_http::services::ServeDir;
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "fixture-server", version, about = "Serve CSV fixtures over HTTP")]
struct Args {
    /// Directory to serve
    #[arg(long, env = "FIXTURE_DIR", default_value = "csvs")]
    dir: PathBuf,

    #[arg(long, env = "FIXTURE_HOST", default_value = "127.0.0.1")]
    host: String,

    #[arg(long, env = "PORT_EXTERNAL", default_value_t = 3001)]
    port: u16,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let log_config = LogConfig::builder()
        .log_file_prefix("fixture-server")
        .filter_directives("fixture_server=info,tower_http=debug")
        .build()
        .merge_env()?;
    let _log_guard = init_logging(&log_config)?;

    if !args.dir.is_dir() {
        anyhow::bail!("Fixture directory does not exist: {}", args.dir.display());
    }

    let app = Router::new()
        .nest_service("/files", ServeDir::new(&args.dir))
        .layer(streamload_server::middleware::tracing_layer());

    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    info!("Serving {} on http://{}/files", args.dir.display(), addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
