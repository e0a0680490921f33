//! Marker query routes.

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use markersync_engine::{LocalEntry, RowId};

use crate::error::Result;
use crate::handlers::{handle_get, handle_list, MarkerQuery};
use crate::AppState;

/// Create marker routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/markers", get(list_handler))
        .route("/markers/{row_id}", get(get_handler))
}

/// GET /markers - List cached markers.
async fn list_handler(
    State(state): State<AppState>,
    Query(query): Query<MarkerQuery>,
) -> Result<Json<Vec<LocalEntry>>> {
    let markers = handle_list(&state.pool, query).await?;
    Ok(Json(markers))
}

/// GET /markers/{row_id} - One cached marker.
async fn get_handler(
    State(state): State<AppState>,
    Path(row_id): Path<RowId>,
    Query(query): Query<MarkerQuery>,
) -> Result<Json<LocalEntry>> {
    let marker = handle_get(&state.pool, row_id, query).await?;
    Ok(Json(marker))
}
