//! Raw entry queries.

use ice_maker_staging_models::{ParseStatus, RawEntryRow};
use moosicbox_json_utils::database::ToValue as _;
use switchy_database::{Database, DatabaseValue};

use crate::{DbError, sources::naive_to_utc};

/// Inserts an immutable raw capture with `pending` parse status.
///
/// # Errors
///
/// Returns [`DbError`] if the database operation fails.
pub async fn insert_raw(
    db: &dyn Database,
    source_id: i32,
    raw_name: &str,
    raw_address: &str,
    fingerprint: &str,
) -> Result<RawEntryRow, DbError> {
    let rows = db
        .query_raw_params(
            "INSERT INTO raw_entries (source_id, raw_name, raw_address, raw_fingerprint, parse_status)
             VALUES ($1, $2, $3, $4, 'pending')
             RETURNING *",
            &[
                DatabaseValue::Int32(source_id),
                DatabaseValue::String(raw_name.to_string()),
                DatabaseValue::String(raw_address.to_string()),
                DatabaseValue::String(fingerprint.to_string()),
            ],
        )
        .await?;

    let row = rows.first().ok_or_else(|| DbError::Conversion {
        message: "Insert into raw_entries returned no row".to_string(),
    })?;

    raw_entry_from_row(row)
}

/// Looks up a raw entry by its unique fingerprint.
///
/// # Errors
///
/// Returns [`DbError`] if the database operation fails.
pub async fn find_by_fingerprint(
    db: &dyn Database,
    fingerprint: &str,
) -> Result<Option<RawEntryRow>, DbError> {
    let rows = db
        .query_raw_params(
            "SELECT * FROM raw_entries WHERE raw_fingerprint = $1",
            &[DatabaseValue::String(fingerprint.to_string())],
        )
        .await?;

    rows.first().map(raw_entry_from_row).transpose()
}

/// Looks up a raw entry by id.
///
/// # Errors
///
/// Returns [`DbError`] if the database operation fails.
pub async fn get_raw_entry(db: &dyn Database, id: i32) -> Result<Option<RawEntryRow>, DbError> {
    let rows = db
        .query_raw_params(
            "SELECT * FROM raw_entries WHERE id = $1",
            &[DatabaseValue::Int32(id)],
        )
        .await?;

    rows.first().map(raw_entry_from_row).transpose()
}

/// Transitions a raw entry's parse status.
///
/// # Errors
///
/// Returns [`DbError`] if the database operation fails.
pub async fn set_parse_status(
    db: &dyn Database,
    id: i32,
    status: ParseStatus,
) -> Result<(), DbError> {
    db.exec_raw_params(
        "UPDATE raw_entries SET parse_status = $2 WHERE id = $1",
        &[
            DatabaseValue::Int32(id),
            DatabaseValue::String(status.as_ref().to_string()),
        ],
    )
    .await?;

    Ok(())
}

/// Maps a database row to a [`RawEntryRow`].
pub(crate) fn raw_entry_from_row(row: &switchy_database::Row) -> Result<RawEntryRow, DbError> {
    let id: i32 = row.to_value("id").map_err(|e| DbError::Conversion {
        message: format!("Failed to parse raw entry id: {e}"),
    })?;

    let status: String = row.to_value("parse_status").unwrap_or_default();
    let scrape_date: Option<chrono::NaiveDateTime> = row.to_value("scrape_date").unwrap_or(None);

    Ok(RawEntryRow {
        id,
        source_id: row.to_value("source_id").unwrap_or(0),
        raw_name: row.to_value("raw_name").unwrap_or_default(),
        raw_address: row.to_value("raw_address").unwrap_or_default(),
        raw_fingerprint: row.to_value("raw_fingerprint").unwrap_or_default(),
        scrape_date: scrape_date.map(naive_to_utc),
        parse_status: status.parse().unwrap_or(ParseStatus::Pending),
    })
}
