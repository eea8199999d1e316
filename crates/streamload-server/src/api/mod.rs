//! HTTP surface: feature routes, health check and middleware

use axum::{response::IntoResponse, routing::get, Json, Router};
use serde_json::json;
use std::sync::Arc;

use crate::config::CorsConfig;
use crate::features;
use crate::ingest::framework::JobService;
use crate::middleware;

/// Create the application router with all routes and middleware
pub fn create_router(jobs: Arc<dyn JobService>, cors: &CorsConfig) -> Router {
    Router::new()
        .route("/health", get(health))
        .merge(features::router(jobs))
        // Apply layers from innermost to outermost
        .layer(middleware::tracing_layer())
        .layer(middleware::cors_layer(cors))
}

async fn health() -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "service": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
