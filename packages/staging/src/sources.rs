//! Source registry queries and seeding.

use ice_maker_staging_models::SourceRow;
use moosicbox_json_utils::database::ToValue as _;
use switchy_database::{Database, DatabaseValue};

use crate::DbError;

/// A source definition for registry seeding.
struct SeedSource {
    name: &'static str,
    fetcher_module: &'static str,
    formatter_module: Option<&'static str>,
    confidence_weight: f64,
    notes: &'static str,
}

/// The sources this deployment ingests. Seeded at init; re-running adds
/// any that are missing without touching existing rows.
const SEED_SOURCES: &[SeedSource] = &[
    SeedSource {
        name: "sk8stuff",
        fetcher_module: "fetchers.sk8stuff",
        formatter_module: Some("formatters.sk8stuff"),
        confidence_weight: 1.0,
        notes: "Single-page PHP table, all rinks in one request",
    },
    SeedSource {
        name: "arena_guide",
        fetcher_module: "fetchers.arena_guide",
        formatter_module: Some("formatters.arena_guide"),
        confidence_weight: 1.0,
        notes: "CMS pagination, ~1773 posts, site owner permission granted",
    },
    SeedSource {
        name: "learntoskate",
        fetcher_module: "fetchers.learntoskate",
        formatter_module: Some("formatters.learntoskate"),
        confidence_weight: 1.0,
        notes: "JSON API, returns programs not rinks directly",
    },
    SeedSource {
        name: "fandom_wiki",
        fetcher_module: "fetchers.fandom_wiki",
        formatter_module: None,
        confidence_weight: 1.0,
        notes: "Curated wiki list, no street addresses but has defunct status, clubs, and websites",
    },
    SeedSource {
        name: "skatetrax",
        fetcher_module: "pipeline.ice_time_sync",
        formatter_module: None,
        confidence_weight: 2.0,
        notes: "Skatetrax ice_time table -- ultimate proof a rink exists",
    },
];

/// Inserts any seed sources that don't exist yet.
///
/// # Errors
///
/// Returns [`DbError`] if the database operation fails.
pub async fn seed_sources(db: &dyn Database) -> Result<(), DbError> {
    for seed in SEED_SOURCES {
        db.exec_raw_params(
            "INSERT INTO sources (name, fetcher_module, formatter_module, confidence_weight, notes)
             VALUES ($1, $2, $3, $4, $5)
             ON CONFLICT (name) DO NOTHING",
            &[
                DatabaseValue::String(seed.name.to_string()),
                DatabaseValue::String(seed.fetcher_module.to_string()),
                seed.formatter_module.map_or(DatabaseValue::Null, |m| {
                    DatabaseValue::String(m.to_string())
                }),
                DatabaseValue::Real64(seed.confidence_weight),
                DatabaseValue::String(seed.notes.to_string()),
            ],
        )
        .await?;
    }

    Ok(())
}

/// Looks up a source by its unique name.
///
/// # Errors
///
/// Returns [`DbError`] if the database operation fails.
pub async fn get_source_by_name(
    db: &dyn Database,
    name: &str,
) -> Result<Option<SourceRow>, DbError> {
    let rows = db
        .query_raw_params(
            "SELECT * FROM sources WHERE name = $1",
            &[DatabaseValue::String(name.to_string())],
        )
        .await?;

    rows.first().map(source_from_row).transpose()
}

/// Looks up a source by id.
///
/// # Errors
///
/// Returns [`DbError`] if the database operation fails.
pub async fn get_source_by_id(db: &dyn Database, id: i32) -> Result<Option<SourceRow>, DbError> {
    let rows = db
        .query_raw_params(
            "SELECT * FROM sources WHERE id = $1",
            &[DatabaseValue::Int32(id)],
        )
        .await?;

    rows.first().map(source_from_row).transpose()
}

/// All enabled sources in id order (the order runs execute in).
///
/// # Errors
///
/// Returns [`DbError`] if the database operation fails.
pub async fn list_enabled_sources(db: &dyn Database) -> Result<Vec<SourceRow>, DbError> {
    let rows = db
        .query_raw_params("SELECT * FROM sources WHERE enabled = TRUE ORDER BY id", &[])
        .await?;

    rows.iter().map(source_from_row).collect()
}

/// Stamps run metadata on a source after a pipeline run.
///
/// # Errors
///
/// Returns [`DbError`] if the database operation fails.
pub async fn update_run_metadata(
    db: &dyn Database,
    source_id: i32,
    status: &str,
    entry_count: i32,
) -> Result<(), DbError> {
    db.exec_raw_params(
        "UPDATE sources SET last_run_at = NOW(), last_run_status = $2, last_run_entry_count = $3
         WHERE id = $1",
        &[
            DatabaseValue::Int32(source_id),
            DatabaseValue::String(status.to_string()),
            DatabaseValue::Int32(entry_count),
        ],
    )
    .await?;

    Ok(())
}

/// Maps a database row to a [`SourceRow`].
fn source_from_row(row: &switchy_database::Row) -> Result<SourceRow, DbError> {
    let id: i32 = row.to_value("id").map_err(|e| DbError::Conversion {
        message: format!("Failed to parse source id: {e}"),
    })?;

    let last_run_at: Option<chrono::NaiveDateTime> = row.to_value("last_run_at").unwrap_or(None);
    let created_at: Option<chrono::NaiveDateTime> = row.to_value("created_at").unwrap_or(None);

    Ok(SourceRow {
        id,
        name: row.to_value("name").unwrap_or_default(),
        fetcher_module: row.to_value("fetcher_module").unwrap_or_default(),
        formatter_module: row.to_value("formatter_module").unwrap_or(None),
        enabled: row.to_value("enabled").unwrap_or(true),
        last_run_at: last_run_at.map(naive_to_utc),
        last_run_status: row.to_value("last_run_status").unwrap_or(None),
        last_run_entry_count: row.to_value("last_run_entry_count").unwrap_or(None),
        confidence_weight: row.to_value("confidence_weight").unwrap_or(1.0),
        notes: row.to_value("notes").unwrap_or(None),
        created_at: created_at.map(naive_to_utc),
    })
}

/// Interprets a naive database timestamp as UTC.
pub(crate) fn naive_to_utc(naive: chrono::NaiveDateTime) -> chrono::DateTime<chrono::Utc> {
    chrono::DateTime::<chrono::Utc>::from_naive_utc_and_offset(naive, chrono::Utc)
}
