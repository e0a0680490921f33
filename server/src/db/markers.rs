//! Database operations for the markers table.

use crate::error::{AppError, Result};
use markersync_engine::{
    Error as EngineError, LocalEntry, MarkerFilter, ReconciliationPlan, RowId,
};
use sqlx::{sqlite::SqliteRow, QueryBuilder, Row, Sqlite, SqliteConnection, SqlitePool};

/// A stored marker row from the database.
#[derive(Debug)]
pub struct StoredMarker {
    pub id: i64,
    pub marker_id: Option<String>,
    pub name: Option<String>,
    pub address: Option<String>,
    pub lat: f64,
    pub lng: f64,
}

impl<'r> sqlx::FromRow<'r, SqliteRow> for StoredMarker {
    fn from_row(row: &'r SqliteRow) -> std::result::Result<Self, sqlx::Error> {
        Ok(StoredMarker {
            id: row.try_get("id")?,
            marker_id: row.try_get("marker_id")?,
            name: row.try_get("name")?,
            address: row.try_get("address")?,
            lat: row.try_get("lat")?,
            lng: row.try_get("lng")?,
        })
    }
}

impl From<StoredMarker> for LocalEntry {
    fn from(stored: StoredMarker) -> Self {
        LocalEntry {
            row_id: stored.id,
            external_id: stored.marker_id,
            name: stored.name,
            address: stored.address,
            lat: stored.lat,
            lng: stored.lng,
        }
    }
}

/// Read every cached row, ordered by row id.
///
/// Takes a connection so the read can share a transaction with the apply.
pub async fn snapshot(
    conn: &mut SqliteConnection,
) -> std::result::Result<Vec<LocalEntry>, sqlx::Error> {
    let rows = sqlx::query_as::<_, StoredMarker>(
        "SELECT id, marker_id, name, address, lat, lng FROM markers ORDER BY id",
    )
    .fetch_all(&mut *conn)
    .await?;

    Ok(rows.into_iter().map(LocalEntry::from).collect())
}

/// Rows matching a filter, ordered by row id.
///
/// A row id in the filter narrows the selection; it never replaces it.
pub async fn query(
    pool: &SqlitePool,
    filter: &MarkerFilter,
) -> std::result::Result<Vec<LocalEntry>, sqlx::Error> {
    let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(
        "SELECT id, marker_id, name, address, lat, lng FROM markers WHERE 1 = 1",
    );

    if let Some(row_id) = filter.row_id {
        builder.push(" AND id = ").push_bind(row_id);
    }
    if let Some(external_id) = &filter.external_id {
        builder.push(" AND marker_id = ").push_bind(external_id.clone());
    }
    if let Some(name) = &filter.name {
        builder.push(" AND name = ").push_bind(name.clone());
    }
    builder.push(" ORDER BY id");

    let rows = builder
        .build_query_as::<StoredMarker>()
        .fetch_all(pool)
        .await?;

    Ok(rows.into_iter().map(LocalEntry::from).collect())
}

/// Number of cached rows.
pub async fn count(pool: &SqlitePool) -> std::result::Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM markers")
        .fetch_one(pool)
        .await
}

/// Apply a plan on an open connection, returning the number of mutations.
///
/// Order is deletes, updates, inserts. A missing row or a taken external id
/// fails with [`EngineError::Apply`]; the caller owns the transaction and
/// rolls back by dropping it.
pub async fn apply_plan(conn: &mut SqliteConnection, plan: &ReconciliationPlan) -> Result<usize> {
    let mut applied = 0;

    for row_id in &plan.deletes {
        tracing::debug!(row_id, "scheduling delete");
        let result = sqlx::query("DELETE FROM markers WHERE id = ?")
            .bind(row_id)
            .execute(&mut *conn)
            .await?;
        ensure_row(result.rows_affected(), *row_id, applied)?;
        applied += 1;
    }

    for update in &plan.updates {
        tracing::debug!(row_id = update.row_id, "scheduling update");
        let entry = &update.entry;
        let result = sqlx::query(
            r#"
            UPDATE markers
            SET name = COALESCE(?, name),
                address = COALESCE(?, address),
                lat = ?,
                lng = ?
            WHERE id = ?
            "#,
        )
        .bind(entry.name.as_deref())
        .bind(entry.address.as_deref())
        .bind(entry.lat)
        .bind(entry.lng)
        .bind(update.row_id)
        .execute(&mut *conn)
        .await?;
        ensure_row(result.rows_affected(), update.row_id, applied)?;
        applied += 1;
    }

    for entry in &plan.inserts {
        tracing::debug!(external_id = ?entry.id, "scheduling insert");
        let result = sqlx::query(
            "INSERT INTO markers (marker_id, name, address, lat, lng) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(entry.id.as_deref())
        .bind(entry.name.as_deref())
        .bind(entry.address.as_deref())
        .bind(entry.lat)
        .bind(entry.lng)
        .execute(&mut *conn)
        .await;

        match result {
            Ok(_) => applied += 1,
            Err(e) if is_unique_violation(&e) => {
                let id = entry.id.clone().unwrap_or_default();
                return Err(
                    EngineError::apply(applied, EngineError::DuplicateExternalId(id)).into(),
                );
            }
            Err(e) => return Err(e.into()),
        }
    }

    Ok(applied)
}

fn ensure_row(rows_affected: u64, row_id: RowId, applied: usize) -> Result<()> {
    if rows_affected == 0 {
        return Err(AppError::Engine(EngineError::apply(
            applied,
            EngineError::RowNotFound(row_id),
        )));
    }
    Ok(())
}

/// Check if an error is a unique constraint violation.
fn is_unique_violation(e: &sqlx::Error) -> bool {
    match e {
        sqlx::Error::Database(db_err) => db_err.is_unique_violation(),
        _ => false,
    }
}
