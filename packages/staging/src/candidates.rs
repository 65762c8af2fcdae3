//! Candidate queries.

use ice_maker_staging_models::{CandidateRow, VerificationStatus};
use moosicbox_json_utils::database::ToValue as _;
use switchy_database::{Database, DatabaseValue};

use crate::DbError;

/// Fields for a new candidate insert. Geodata is present only when the
/// source supplied it.
#[derive(Debug, Clone, Default)]
pub struct NewCandidate {
    /// The raw entry this candidate was parsed from.
    pub raw_entry_id: i32,
    /// Title-cased name.
    pub name: String,
    /// Uppercase normalized street.
    pub street: Option<String>,
    /// Title-cased city.
    pub city: Option<String>,
    /// 2-letter state code.
    pub state: Option<String>,
    /// Source-provided zip.
    pub zip: Option<String>,
    /// Source-provided latitude.
    pub geo_lat: Option<f64>,
    /// Source-provided longitude.
    pub geo_lon: Option<f64>,
}

fn opt_string(value: Option<&str>) -> DatabaseValue {
    value.map_or(DatabaseValue::Null, |v| DatabaseValue::String(v.to_string()))
}

fn opt_real(value: Option<f64>) -> DatabaseValue {
    value.map_or(DatabaseValue::Null, DatabaseValue::Real64)
}

/// Builds a SQL list literal from status enum values. The values come
/// from our own enum spellings, never user input.
fn status_list(statuses: &[VerificationStatus]) -> String {
    statuses
        .iter()
        .map(|s| format!("'{}'", s.as_ref()))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Inserts a new `unverified` candidate and returns the stored row.
///
/// # Errors
///
/// Returns [`DbError`] if the database operation fails.
pub async fn insert_candidate(
    db: &dyn Database,
    new: &NewCandidate,
) -> Result<CandidateRow, DbError> {
    let rows = db
        .query_raw_params(
            "INSERT INTO candidates
                (raw_entry_id, name, street, city, state, zip, country, geo_lat, geo_lon,
                 verification_status)
             VALUES ($1, $2, $3, $4, $5, $6, 'US', $7, $8, 'unverified')
             RETURNING *",
            &[
                DatabaseValue::Int32(new.raw_entry_id),
                DatabaseValue::String(new.name.clone()),
                opt_string(new.street.as_deref()),
                opt_string(new.city.as_deref()),
                opt_string(new.state.as_deref()),
                opt_string(new.zip.as_deref()),
                opt_real(new.geo_lat),
                opt_real(new.geo_lon),
            ],
        )
        .await?;

    let row = rows.first().ok_or_else(|| DbError::Conversion {
        message: "Insert into candidates returned no row".to_string(),
    })?;

    candidate_from_row(row)
}

/// Looks up a candidate by id.
///
/// # Errors
///
/// Returns [`DbError`] if the database operation fails.
pub async fn get_candidate(db: &dyn Database, id: i32) -> Result<Option<CandidateRow>, DbError> {
    let rows = db
        .query_raw_params(
            "SELECT * FROM candidates WHERE id = $1",
            &[DatabaseValue::Int32(id)],
        )
        .await?;

    rows.first().map(candidate_from_row).transpose()
}

/// Every staged candidate, in insertion order. The dedup policy filters
/// its own pools from this.
///
/// # Errors
///
/// Returns [`DbError`] if the database operation fails.
pub async fn list_candidates(db: &dyn Database) -> Result<Vec<CandidateRow>, DbError> {
    let rows = db
        .query_raw_params("SELECT * FROM candidates ORDER BY id", &[])
        .await?;

    rows.iter().map(candidate_from_row).collect()
}

/// Candidates with the given status, in insertion order.
///
/// # Errors
///
/// Returns [`DbError`] if the database operation fails.
pub async fn list_by_status(
    db: &dyn Database,
    status: VerificationStatus,
) -> Result<Vec<CandidateRow>, DbError> {
    let rows = db
        .query_raw_params(
            "SELECT * FROM candidates WHERE verification_status = $1 ORDER BY id",
            &[DatabaseValue::String(status.as_ref().to_string())],
        )
        .await?;

    rows.iter().map(candidate_from_row).collect()
}

/// Candidates with the given status whose raw entry came from one
/// source.
///
/// # Errors
///
/// Returns [`DbError`] if the database operation fails.
pub async fn list_by_status_for_source(
    db: &dyn Database,
    status: VerificationStatus,
    source_id: i32,
) -> Result<Vec<CandidateRow>, DbError> {
    let rows = db
        .query_raw_params(
            "SELECT c.* FROM candidates c
             JOIN raw_entries r ON c.raw_entry_id = r.id
             WHERE c.verification_status = $1 AND r.source_id = $2
             ORDER BY c.id",
            &[
                DatabaseValue::String(status.as_ref().to_string()),
                DatabaseValue::Int32(source_id),
            ],
        )
        .await?;

    rows.iter().map(candidate_from_row).collect()
}

/// Candidates in any of `statuses` that are not yet linked to a
/// location.
///
/// # Errors
///
/// Returns [`DbError`] if the database operation fails.
pub async fn list_unpromoted(
    db: &dyn Database,
    statuses: &[VerificationStatus],
) -> Result<Vec<CandidateRow>, DbError> {
    let sql = format!(
        "SELECT * FROM candidates
         WHERE verification_status IN ({}) AND location_id IS NULL
         ORDER BY id",
        status_list(statuses)
    );

    let rows = db.query_raw_params(&sql, &[]).await?;
    rows.iter().map(candidate_from_row).collect()
}

/// Persists geocoder output: coordinates, confidence, matched name, zip,
/// and the resulting status.
///
/// # Errors
///
/// Returns [`DbError`] if the database operation fails.
pub async fn update_geocode_results(
    db: &dyn Database,
    candidate: &CandidateRow,
) -> Result<(), DbError> {
    db.exec_raw_params(
        "UPDATE candidates SET
            geo_lat = $2, geo_lon = $3, geo_confidence = $4, geo_matched_name = $5,
            zip = $6, verification_status = $7, updated_at = NOW()
         WHERE id = $1",
        &[
            DatabaseValue::Int32(candidate.id),
            opt_real(candidate.geo_lat),
            opt_real(candidate.geo_lon),
            opt_real(candidate.geo_confidence),
            opt_string(candidate.geo_matched_name.as_deref()),
            opt_string(candidate.zip.as_deref()),
            DatabaseValue::String(candidate.verification_status.as_ref().to_string()),
        ],
    )
    .await?;

    Ok(())
}

/// Transitions a candidate's verification status.
///
/// # Errors
///
/// Returns [`DbError`] if the database operation fails.
pub async fn set_status(
    db: &dyn Database,
    id: i32,
    status: VerificationStatus,
) -> Result<(), DbError> {
    db.exec_raw_params(
        "UPDATE candidates SET verification_status = $2, updated_at = NOW() WHERE id = $1",
        &[
            DatabaseValue::Int32(id),
            DatabaseValue::String(status.as_ref().to_string()),
        ],
    )
    .await?;

    Ok(())
}

/// Links a candidate to its promoted location.
///
/// # Errors
///
/// Returns [`DbError`] if the database operation fails.
pub async fn set_location(db: &dyn Database, id: i32, location_id: &str) -> Result<(), DbError> {
    db.exec_raw_params(
        "UPDATE candidates SET location_id = $2, updated_at = NOW() WHERE id = $1",
        &[
            DatabaseValue::Int32(id),
            DatabaseValue::String(location_id.to_string()),
        ],
    )
    .await?;

    Ok(())
}

/// Re-points every candidate from one location to another (merge).
/// Returns how many rows moved.
///
/// # Errors
///
/// Returns [`DbError`] if the database operation fails.
pub async fn repoint_location(
    db: &dyn Database,
    from_location: &str,
    to_location: &str,
) -> Result<u64, DbError> {
    let moved = db
        .exec_raw_params(
            "UPDATE candidates SET location_id = $2, updated_at = NOW() WHERE location_id = $1",
            &[
                DatabaseValue::String(from_location.to_string()),
                DatabaseValue::String(to_location.to_string()),
            ],
        )
        .await?;

    Ok(moved)
}

/// Resets a repaired candidate to `unverified` with fresh parse output,
/// clearing stale geodata and zip so geocoding starts over.
///
/// # Errors
///
/// Returns [`DbError`] if the database operation fails.
pub async fn reset_for_repair(
    db: &dyn Database,
    id: i32,
    street: Option<&str>,
    city: Option<&str>,
    state: Option<&str>,
) -> Result<(), DbError> {
    db.exec_raw_params(
        "UPDATE candidates SET
            street = $2, city = $3, state = $4,
            verification_status = 'unverified',
            geo_lat = NULL, geo_lon = NULL, geo_confidence = NULL,
            geo_matched_name = NULL, zip = NULL, updated_at = NOW()
         WHERE id = $1",
        &[
            DatabaseValue::Int32(id),
            opt_string(street),
            opt_string(city),
            opt_string(state),
        ],
    )
    .await?;

    Ok(())
}

/// Maps a database row to a [`CandidateRow`].
pub(crate) fn candidate_from_row(row: &switchy_database::Row) -> Result<CandidateRow, DbError> {
    let id: i32 = row.to_value("id").map_err(|e| DbError::Conversion {
        message: format!("Failed to parse candidate id: {e}"),
    })?;

    let status: String = row.to_value("verification_status").unwrap_or_default();

    Ok(CandidateRow {
        id,
        raw_entry_id: row.to_value("raw_entry_id").unwrap_or(0),
        name: row.to_value("name").unwrap_or_default(),
        street: row.to_value("street").unwrap_or(None),
        city: row.to_value("city").unwrap_or(None),
        state: row.to_value("state").unwrap_or(None),
        zip: row.to_value("zip").unwrap_or(None),
        country: row.to_value("country").unwrap_or(None),
        geo_lat: row.to_value("geo_lat").unwrap_or(None),
        geo_lon: row.to_value("geo_lon").unwrap_or(None),
        geo_confidence: row.to_value("geo_confidence").unwrap_or(None),
        geo_matched_name: row.to_value("geo_matched_name").unwrap_or(None),
        verification_status: status.parse().unwrap_or(VerificationStatus::Unverified),
        location_id: row.to_value("location_id").unwrap_or(None),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_list_renders_sql_literals() {
        let sql = status_list(&[
            VerificationStatus::GeocodeMatch,
            VerificationStatus::SourceVerified,
        ]);
        assert_eq!(sql, "'geocode_match', 'source_verified'");
    }
}
