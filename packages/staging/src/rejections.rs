//! Rejection record queries.

use ice_maker_staging_models::{RejectedEntryRow, RejectionReason};
use moosicbox_json_utils::database::ToValue as _;
use switchy_database::{Database, DatabaseValue};

use crate::DbError;

/// Records why a raw entry was not promoted.
///
/// # Errors
///
/// Returns [`DbError`] if the database operation fails.
pub async fn insert_rejection(
    db: &dyn Database,
    raw_entry_id: i32,
    reason: RejectionReason,
    error: Option<&str>,
) -> Result<(), DbError> {
    db.exec_raw_params(
        "INSERT INTO rejected_entries (raw_entry_id, rejection_reason, raw_parse_error)
         VALUES ($1, $2, $3)",
        &[
            DatabaseValue::Int32(raw_entry_id),
            DatabaseValue::String(reason.as_ref().to_string()),
            error.map_or(DatabaseValue::Null, |e| DatabaseValue::String(e.to_string())),
        ],
    )
    .await?;

    Ok(())
}

/// Finds the duplicate-flavored rejection for a raw entry, used by the
/// promoter to recover which primary candidate a duplicate matched.
///
/// # Errors
///
/// Returns [`DbError`] if the database operation fails.
pub async fn find_duplicate_rejection(
    db: &dyn Database,
    raw_entry_id: i32,
) -> Result<Option<RejectedEntryRow>, DbError> {
    let rows = db
        .query_raw_params(
            "SELECT * FROM rejected_entries
             WHERE raw_entry_id = $1
               AND rejection_reason IN ('duplicate_address_exact', 'suspected_duplicate')
             ORDER BY id
             LIMIT 1",
            &[DatabaseValue::Int32(raw_entry_id)],
        )
        .await?;

    rows.first().map(rejection_from_row).transpose()
}

/// Maps a database row to a [`RejectedEntryRow`].
fn rejection_from_row(row: &switchy_database::Row) -> Result<RejectedEntryRow, DbError> {
    let id: i32 = row.to_value("id").map_err(|e| DbError::Conversion {
        message: format!("Failed to parse rejection id: {e}"),
    })?;

    let reason: String = row.to_value("rejection_reason").unwrap_or_default();

    Ok(RejectedEntryRow {
        id,
        raw_entry_id: row.to_value("raw_entry_id").unwrap_or(0),
        rejection_reason: reason.parse().unwrap_or(RejectionReason::ParseFailure),
        raw_parse_error: row.to_value("raw_parse_error").unwrap_or(None),
        reviewed: row.to_value("reviewed").unwrap_or(false),
    })
}
