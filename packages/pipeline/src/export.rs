//! CSV export of the locations directory.

use std::path::Path;

use switchy_database::Database;

use ice_maker_staging::locations;

use crate::PipelineError;

/// Columns in the export, in order.
const FIELDNAMES: &[&str] = &[
    "rink_id",
    "rink_name",
    "rink_address",
    "rink_city",
    "rink_state",
    "rink_zip",
    "rink_status",
    "data_source",
    "source_count",
];

/// Writes every location (all statuses) with its corroborating source
/// count, ordered by state then city. Returns the row count.
///
/// # Errors
///
/// Returns [`PipelineError`] if the query or the file write fails.
pub async fn export_csv(db: &dyn Database, path: &Path) -> Result<usize, PipelineError> {
    let rows = locations::list_with_source_counts(db).await?;

    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(FIELDNAMES)?;

    for (location, source_count) in &rows {
        let source_count = source_count.to_string();
        writer.write_record([
            location.rink_id.as_str(),
            location.rink_name.as_str(),
            location.rink_address.as_deref().unwrap_or(""),
            location.rink_city.as_str(),
            location.rink_state.as_str(),
            location.rink_zip.as_str(),
            location.rink_status.as_ref(),
            location.data_source.as_str(),
            source_count.as_str(),
        ])?;
    }

    writer.flush().map_err(csv::Error::from)?;

    log::info!("Exported {} locations to {}", rows.len(), path.display());
    Ok(rows.len())
}
