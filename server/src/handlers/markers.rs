//! Marker queries against the cache.

use crate::db;
use crate::error::{AppError, Result};
use markersync_engine::{LocalEntry, MarkerFilter, RowId};
use serde::Deserialize;
use sqlx::SqlitePool;

/// Optional selection for marker queries.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkerQuery {
    /// Exact feed id
    pub external_id: Option<String>,
    /// Exact name
    pub name: Option<String>,
}

impl MarkerQuery {
    fn into_filter(self) -> MarkerFilter {
        MarkerFilter {
            row_id: None,
            external_id: self.external_id,
            name: self.name,
        }
    }
}

/// List cached markers matching the selection.
pub async fn handle_list(pool: &SqlitePool, query: MarkerQuery) -> Result<Vec<LocalEntry>> {
    Ok(db::query(pool, &query.into_filter()).await?)
}

/// Fetch one marker by row id, further narrowed by the selection.
pub async fn handle_get(
    pool: &SqlitePool,
    row_id: RowId,
    query: MarkerQuery,
) -> Result<LocalEntry> {
    let filter = query.into_filter().with_row_id(row_id);

    db::query(pool, &filter)
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| AppError::NotFound(format!("marker {}", row_id)))
}
