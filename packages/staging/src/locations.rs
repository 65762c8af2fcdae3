//! Location directory queries.

use ice_maker_staging_models::{LocationRow, LocationStatus};
use moosicbox_json_utils::database::ToValue as _;
use switchy_database::{Database, DatabaseValue};

use crate::{DbError, sources::naive_to_utc};

/// Fields for a new location insert.
#[derive(Debug, Clone, Default)]
pub struct NewLocation {
    /// Explicit identifier to adopt; a fresh UUID is minted when absent.
    pub rink_id: Option<String>,
    /// Display name.
    pub rink_name: String,
    /// Street address (empty string for street-less promotions).
    pub rink_address: String,
    /// City.
    pub rink_city: String,
    /// 2-letter state code.
    pub rink_state: String,
    /// 2-letter country code.
    pub rink_country: String,
    /// Zip code.
    pub rink_zip: String,
    /// Label of the source that produced this location.
    pub data_source: String,
}

/// Inserts a new `active` location, minting a UUID unless one was
/// adopted from the peer system.
///
/// # Errors
///
/// Returns [`DbError`] if the database operation fails.
pub async fn insert_location(db: &dyn Database, new: &NewLocation) -> Result<LocationRow, DbError> {
    let rink_id = new
        .rink_id
        .clone()
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    let rows = db
        .query_raw_params(
            "INSERT INTO locations
                (rink_id, rink_name, rink_address, rink_city, rink_state, rink_country,
                 rink_zip, rink_status, data_source)
             VALUES ($1, $2, $3, $4, $5, $6, $7, 'active', $8)
             RETURNING *",
            &[
                DatabaseValue::String(rink_id),
                DatabaseValue::String(new.rink_name.clone()),
                DatabaseValue::String(new.rink_address.clone()),
                DatabaseValue::String(new.rink_city.clone()),
                DatabaseValue::String(new.rink_state.clone()),
                DatabaseValue::String(new.rink_country.clone()),
                DatabaseValue::String(new.rink_zip.clone()),
                DatabaseValue::String(new.data_source.clone()),
            ],
        )
        .await?;

    let row = rows.first().ok_or_else(|| DbError::Conversion {
        message: "Insert into locations returned no row".to_string(),
    })?;

    location_from_row(row)
}

/// Looks up a location by identifier.
///
/// # Errors
///
/// Returns [`DbError`] if the database operation fails.
pub async fn get_location(db: &dyn Database, rink_id: &str) -> Result<Option<LocationRow>, DbError> {
    let rows = db
        .query_raw_params(
            "SELECT * FROM locations WHERE rink_id = $1",
            &[DatabaseValue::String(rink_id.to_string())],
        )
        .await?;

    rows.first().map(location_from_row).transpose()
}

/// Locations visible to promoter matching: `active` only. Closed,
/// seasonal, merged, and disabled identifiers stay out of the match
/// pool.
///
/// # Errors
///
/// Returns [`DbError`] if the database operation fails.
pub async fn list_matchable_locations(db: &dyn Database) -> Result<Vec<LocationRow>, DbError> {
    let rows = db
        .query_raw_params(
            "SELECT * FROM locations WHERE rink_status = 'active' ORDER BY rink_id",
            &[],
        )
        .await?;

    rows.iter().map(location_from_row).collect()
}

/// Active locations ordered for the peer push (state, then city).
///
/// # Errors
///
/// Returns [`DbError`] if the database operation fails.
pub async fn list_active_ordered(db: &dyn Database) -> Result<Vec<LocationRow>, DbError> {
    let rows = db
        .query_raw_params(
            "SELECT * FROM locations WHERE rink_status = 'active'
             ORDER BY rink_state, rink_city",
            &[],
        )
        .await?;

    rows.iter().map(location_from_row).collect()
}

/// Case-insensitive partial name search, optionally filtered to a state,
/// ordered by state then city.
///
/// # Errors
///
/// Returns [`DbError`] if the database operation fails.
pub async fn search_by_name(
    db: &dyn Database,
    query: &str,
    state: Option<&str>,
) -> Result<Vec<LocationRow>, DbError> {
    let pattern = format!("%{query}%");

    let rows = if let Some(state) = state {
        db.query_raw_params(
            "SELECT * FROM locations
             WHERE rink_name ILIKE $1 AND rink_state = $2
             ORDER BY rink_state, rink_city",
            &[
                DatabaseValue::String(pattern),
                DatabaseValue::String(state.to_uppercase()),
            ],
        )
        .await?
    } else {
        db.query_raw_params(
            "SELECT * FROM locations WHERE rink_name ILIKE $1 ORDER BY rink_state, rink_city",
            &[DatabaseValue::String(pattern)],
        )
        .await?
    };

    rows.iter().map(location_from_row).collect()
}

/// Exact name match, case-insensitive.
///
/// # Errors
///
/// Returns [`DbError`] if the database operation fails.
pub async fn find_by_name_exact(
    db: &dyn Database,
    name: &str,
) -> Result<Option<LocationRow>, DbError> {
    let rows = db
        .query_raw_params(
            "SELECT * FROM locations WHERE rink_name ILIKE $1 LIMIT 1",
            &[DatabaseValue::String(name.to_string())],
        )
        .await?;

    rows.first().map(location_from_row).transpose()
}

/// Changes a location's lifecycle status.
///
/// # Errors
///
/// Returns [`DbError`] if the database operation fails.
pub async fn update_status(
    db: &dyn Database,
    rink_id: &str,
    status: LocationStatus,
) -> Result<(), DbError> {
    db.exec_raw_params(
        "UPDATE locations SET rink_status = $2 WHERE rink_id = $1",
        &[
            DatabaseValue::String(rink_id.to_string()),
            DatabaseValue::String(status.as_ref().to_string()),
        ],
    )
    .await?;

    Ok(())
}

/// Changes a location's display name.
///
/// # Errors
///
/// Returns [`DbError`] if the database operation fails.
pub async fn update_name(db: &dyn Database, rink_id: &str, name: &str) -> Result<(), DbError> {
    db.exec_raw_params(
        "UPDATE locations SET rink_name = $2 WHERE rink_id = $1",
        &[
            DatabaseValue::String(rink_id.to_string()),
            DatabaseValue::String(name.to_string()),
        ],
    )
    .await?;

    Ok(())
}

/// Total number of locations.
///
/// # Errors
///
/// Returns [`DbError`] if the database operation fails.
pub async fn count_locations(db: &dyn Database) -> Result<i64, DbError> {
    let rows = db
        .query_raw_params("SELECT COUNT(*) AS total FROM locations", &[])
        .await?;

    let row = rows.first().ok_or_else(|| DbError::Conversion {
        message: "COUNT query returned no row".to_string(),
    })?;

    Ok(row.to_value("total").unwrap_or(0))
}

/// Every location with its corroborating source count, ordered for
/// export (state, then city).
///
/// # Errors
///
/// Returns [`DbError`] if the database operation fails.
pub async fn list_with_source_counts(
    db: &dyn Database,
) -> Result<Vec<(LocationRow, i64)>, DbError> {
    let rows = db
        .query_raw_params(
            "SELECT l.*, COUNT(ls.id) AS source_count
             FROM locations l
             LEFT JOIN location_sources ls ON l.rink_id = ls.location_id
             GROUP BY l.rink_id
             ORDER BY l.rink_state, l.rink_city",
            &[],
        )
        .await?;

    rows.iter()
        .map(|row| {
            let location = location_from_row(row)?;
            let count: i64 = row.to_value("source_count").unwrap_or(0);
            Ok((location, count))
        })
        .collect()
}

/// Maps a database row to a [`LocationRow`].
pub(crate) fn location_from_row(row: &switchy_database::Row) -> Result<LocationRow, DbError> {
    let rink_id: String = row.to_value("rink_id").map_err(|e| DbError::Conversion {
        message: format!("Failed to parse rink_id: {e}"),
    })?;

    let status: String = row.to_value("rink_status").unwrap_or_default();
    let date_created: Option<chrono::NaiveDateTime> = row.to_value("date_created").unwrap_or(None);

    Ok(LocationRow {
        rink_id,
        rink_name: row.to_value("rink_name").unwrap_or_default(),
        rink_address: row.to_value("rink_address").unwrap_or(None),
        rink_city: row.to_value("rink_city").unwrap_or_default(),
        rink_state: row.to_value("rink_state").unwrap_or_default(),
        rink_country: row.to_value("rink_country").unwrap_or_else(|_| "US".to_string()),
        rink_zip: row.to_value("rink_zip").unwrap_or_default(),
        rink_url: row.to_value("rink_url").unwrap_or(None),
        rink_phone: row.to_value("rink_phone").unwrap_or(None),
        rink_tz: row.to_value("rink_tz").unwrap_or(None),
        rink_status: status.parse().unwrap_or(LocationStatus::Active),
        data_source: row.to_value("data_source").unwrap_or_default(),
        date_created: date_created.map(naive_to_utc),
    })
}
