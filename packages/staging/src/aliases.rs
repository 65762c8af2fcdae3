//! Location alias queries.

use chrono::{DateTime, Utc};
use ice_maker_staging_models::LocationAliasRow;
use moosicbox_json_utils::database::ToValue as _;
use switchy_database::{Database, DatabaseValue};

use crate::{DbError, sources::naive_to_utc};

/// Records a historical or alternate name for a location.
///
/// # Errors
///
/// Returns [`DbError`] if the database operation fails.
pub async fn insert_alias(
    db: &dyn Database,
    location_id: &str,
    alias_name: &str,
    effective_until: Option<DateTime<Utc>>,
    notes: Option<&str>,
) -> Result<(), DbError> {
    db.exec_raw_params(
        "INSERT INTO location_aliases (location_id, alias_name, effective_until, notes)
         VALUES ($1, $2, $3, $4)",
        &[
            DatabaseValue::String(location_id.to_string()),
            DatabaseValue::String(alias_name.to_string()),
            effective_until.map_or(DatabaseValue::Null, |t| {
                DatabaseValue::DateTime(t.naive_utc())
            }),
            notes.map_or(DatabaseValue::Null, |n| DatabaseValue::String(n.to_string())),
        ],
    )
    .await?;

    Ok(())
}

/// Whether an alias with this exact name already exists on a location.
///
/// # Errors
///
/// Returns [`DbError`] if the database operation fails.
pub async fn alias_exists(
    db: &dyn Database,
    location_id: &str,
    alias_name: &str,
) -> Result<bool, DbError> {
    let rows = db
        .query_raw_params(
            "SELECT id FROM location_aliases WHERE location_id = $1 AND alias_name = $2 LIMIT 1",
            &[
                DatabaseValue::String(location_id.to_string()),
                DatabaseValue::String(alias_name.to_string()),
            ],
        )
        .await?;

    Ok(!rows.is_empty())
}

/// Every alias recorded for a location.
///
/// # Errors
///
/// Returns [`DbError`] if the database operation fails.
pub async fn list_for_location(
    db: &dyn Database,
    location_id: &str,
) -> Result<Vec<LocationAliasRow>, DbError> {
    let rows = db
        .query_raw_params(
            "SELECT * FROM location_aliases WHERE location_id = $1 ORDER BY id",
            &[DatabaseValue::String(location_id.to_string())],
        )
        .await?;

    rows.iter()
        .map(|row| {
            let id: i32 = row.to_value("id").map_err(|e| DbError::Conversion {
                message: format!("Failed to parse alias id: {e}"),
            })?;

            let effective_from: Option<chrono::NaiveDateTime> =
                row.to_value("effective_from").unwrap_or(None);
            let effective_until: Option<chrono::NaiveDateTime> =
                row.to_value("effective_until").unwrap_or(None);

            Ok(LocationAliasRow {
                id,
                location_id: row.to_value("location_id").unwrap_or_default(),
                alias_name: row.to_value("alias_name").unwrap_or_default(),
                effective_from: effective_from.map(naive_to_utc),
                effective_until: effective_until.map(naive_to_utc),
                notes: row.to_value("notes").unwrap_or(None),
            })
        })
        .collect()
}
