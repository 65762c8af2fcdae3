//! Location-source junction queries.
//!
//! At most one row exists per (location, source); re-observations refresh
//! `last_seen_at` and flip `is_present` back on rather than inserting.

use chrono::{DateTime, Utc};
use ice_maker_staging_models::LocationSourceRow;
use moosicbox_json_utils::database::ToValue as _;
use switchy_database::{Database, DatabaseValue};

use crate::{DbError, sources::naive_to_utc};

/// Records that a source corroborates a location, via a candidate.
/// An existing link is refreshed instead of duplicated.
///
/// # Errors
///
/// Returns [`DbError`] if the database operation fails.
pub async fn upsert_link(
    db: &dyn Database,
    location_id: &str,
    source_id: i32,
    candidate_id: Option<i32>,
) -> Result<(), DbError> {
    let updated = db
        .exec_raw_params(
            "UPDATE location_sources SET last_seen_at = NOW(), is_present = TRUE
             WHERE location_id = $1 AND source_id = $2",
            &[
                DatabaseValue::String(location_id.to_string()),
                DatabaseValue::Int32(source_id),
            ],
        )
        .await?;

    if updated == 0 {
        db.exec_raw_params(
            "INSERT INTO location_sources (location_id, source_id, candidate_id)
             VALUES ($1, $2, $3)
             ON CONFLICT ON CONSTRAINT uq_location_source DO UPDATE
                SET last_seen_at = NOW(), is_present = TRUE",
            &[
                DatabaseValue::String(location_id.to_string()),
                DatabaseValue::Int32(source_id),
                candidate_id.map_or(DatabaseValue::Null, DatabaseValue::Int32),
            ],
        )
        .await?;
    }

    Ok(())
}

/// Records an observation with an explicit timestamp (the ice-time sync
/// carries the last-skated date rather than "now").
///
/// # Errors
///
/// Returns [`DbError`] if the database operation fails.
pub async fn upsert_observation(
    db: &dyn Database,
    location_id: &str,
    source_id: i32,
    seen_at: DateTime<Utc>,
) -> Result<(), DbError> {
    let updated = db
        .exec_raw_params(
            "UPDATE location_sources SET last_seen_at = $3, is_present = TRUE
             WHERE location_id = $1 AND source_id = $2",
            &[
                DatabaseValue::String(location_id.to_string()),
                DatabaseValue::Int32(source_id),
                DatabaseValue::DateTime(seen_at.naive_utc()),
            ],
        )
        .await?;

    if updated == 0 {
        db.exec_raw_params(
            "INSERT INTO location_sources
                (location_id, source_id, candidate_id, first_seen_at, last_seen_at)
             VALUES ($1, $2, NULL, $3, $3)
             ON CONFLICT ON CONSTRAINT uq_location_source DO UPDATE
                SET last_seen_at = EXCLUDED.last_seen_at, is_present = TRUE",
            &[
                DatabaseValue::String(location_id.to_string()),
                DatabaseValue::Int32(source_id),
                DatabaseValue::DateTime(seen_at.naive_utc()),
            ],
        )
        .await?;
    }

    Ok(())
}

/// Every link for a location.
///
/// # Errors
///
/// Returns [`DbError`] if the database operation fails.
pub async fn list_for_location(
    db: &dyn Database,
    location_id: &str,
) -> Result<Vec<LocationSourceRow>, DbError> {
    let rows = db
        .query_raw_params(
            "SELECT * FROM location_sources WHERE location_id = $1 ORDER BY id",
            &[DatabaseValue::String(location_id.to_string())],
        )
        .await?;

    rows.iter().map(link_from_row).collect()
}

/// The link for a specific (location, source) pair.
///
/// # Errors
///
/// Returns [`DbError`] if the database operation fails.
pub async fn get_link(
    db: &dyn Database,
    location_id: &str,
    source_id: i32,
) -> Result<Option<LocationSourceRow>, DbError> {
    let rows = db
        .query_raw_params(
            "SELECT * FROM location_sources WHERE location_id = $1 AND source_id = $2",
            &[
                DatabaseValue::String(location_id.to_string()),
                DatabaseValue::Int32(source_id),
            ],
        )
        .await?;

    rows.first().map(link_from_row).transpose()
}

/// Re-points a link at a different location (merge path when the target
/// has no link for that source yet).
///
/// # Errors
///
/// Returns [`DbError`] if the database operation fails.
pub async fn repoint_link(db: &dyn Database, link_id: i32, location_id: &str) -> Result<(), DbError> {
    db.exec_raw_params(
        "UPDATE location_sources SET location_id = $2 WHERE id = $1",
        &[
            DatabaseValue::Int32(link_id),
            DatabaseValue::String(location_id.to_string()),
        ],
    )
    .await?;

    Ok(())
}

/// Overwrites a link's seen window (merge path widening the surviving
/// link).
///
/// # Errors
///
/// Returns [`DbError`] if the database operation fails.
pub async fn update_window(
    db: &dyn Database,
    link_id: i32,
    first_seen_at: Option<DateTime<Utc>>,
    last_seen_at: Option<DateTime<Utc>>,
) -> Result<(), DbError> {
    db.exec_raw_params(
        "UPDATE location_sources SET first_seen_at = $2, last_seen_at = $3 WHERE id = $1",
        &[
            DatabaseValue::Int32(link_id),
            first_seen_at.map_or(DatabaseValue::Null, |t| DatabaseValue::DateTime(t.naive_utc())),
            last_seen_at.map_or(DatabaseValue::Null, |t| DatabaseValue::DateTime(t.naive_utc())),
        ],
    )
    .await?;

    Ok(())
}

/// Deletes a link (merge path after its window was folded into the
/// survivor).
///
/// # Errors
///
/// Returns [`DbError`] if the database operation fails.
pub async fn delete_link(db: &dyn Database, link_id: i32) -> Result<(), DbError> {
    db.exec_raw_params(
        "DELETE FROM location_sources WHERE id = $1",
        &[DatabaseValue::Int32(link_id)],
    )
    .await?;

    Ok(())
}

/// Maps a database row to a [`LocationSourceRow`].
fn link_from_row(row: &switchy_database::Row) -> Result<LocationSourceRow, DbError> {
    let id: i32 = row.to_value("id").map_err(|e| DbError::Conversion {
        message: format!("Failed to parse location_sources id: {e}"),
    })?;

    let first_seen: Option<chrono::NaiveDateTime> = row.to_value("first_seen_at").unwrap_or(None);
    let last_seen: Option<chrono::NaiveDateTime> = row.to_value("last_seen_at").unwrap_or(None);

    Ok(LocationSourceRow {
        id,
        location_id: row.to_value("location_id").unwrap_or_default(),
        source_id: row.to_value("source_id").unwrap_or(0),
        candidate_id: row.to_value("candidate_id").unwrap_or(None),
        first_seen_at: first_seen.map(naive_to_utc),
        last_seen_at: last_seen.map(naive_to_utc),
        is_present: row.to_value("is_present").unwrap_or(true),
    })
}
