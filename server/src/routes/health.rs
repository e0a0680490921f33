//! Health check endpoint.

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use crate::db;
use crate::error::Result;
use crate::AppState;

/// Health check response.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    /// Remote feed the cache mirrors
    pub feed_url: String,
    /// Cached rows
    pub markers: i64,
    /// Open WebSocket connections
    pub connections: usize,
    /// A sync cycle is running right now
    pub sync_running: bool,
}

/// Create health routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_check))
        .route("/", get(root))
}

/// Health check handler.
async fn health_check(State(state): State<AppState>) -> Result<Json<HealthResponse>> {
    let markers = db::count(&state.pool).await?;

    Ok(Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        feed_url: state.config.feed_url.clone(),
        markers,
        connections: state.conn_manager.connection_count(),
        sync_running: state.sync.is_running(),
    }))
}

/// Root handler.
async fn root() -> &'static str {
    "Markersync Cache Server"
}
