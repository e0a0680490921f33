//! Sync trigger and status routes.

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};

use crate::error::{AppError, Result};
use crate::sync::{SyncReport, SyncTrigger};
use crate::AppState;

/// Create sync routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/sync", post(trigger_handler))
        .route("/sync/status", get(status_handler))
}

/// POST /sync - Run a cycle now.
///
/// Answers with the cycle's report; 409 if a cycle is already running.
async fn trigger_handler(State(state): State<AppState>) -> Result<Json<SyncReport>> {
    let report = state.sync.run(SyncTrigger::Manual).await?;
    Ok(Json(report))
}

/// GET /sync/status - Report of the last finished cycle.
async fn status_handler(State(state): State<AppState>) -> Result<Json<SyncReport>> {
    state
        .sync
        .last_report()
        .await
        .map(Json)
        .ok_or_else(|| AppError::NotFound("no sync cycle has finished yet".to_string()))
}
