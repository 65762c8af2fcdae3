//! Push the directory into the Skatetrax locations table.
//!
//! This is the step that makes the directory usable by the consumer
//! service. The contract is conservative:
//!
//! - Existing Skatetrax rinks are never deleted.
//! - Hand-curated fields (`rink_name`, `rink_phone`, `rink_url`,
//!   `rink_tz`) are never overwritten on existing rows; only
//!   address/city/state/country/zip update.
//! - Name mismatches are recorded locally as aliases for future
//!   "formerly known as" use.
//! - Only active locations with a zip code are pushed.
//! - Dry-run mode previews everything without writing.

use ice_maker_staging::{aliases, db, locations};
use ice_maker_staging_models::LocationRow;
use moosicbox_json_utils::database::ToValue as _;
use switchy_database::{Database, DatabaseValue};

use crate::PipelineError;

/// Counters for a push run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PushStats {
    /// Active locations in the directory.
    pub icemaker_active: u64,
    /// Rows already present in Skatetrax before the push.
    pub already_in_skatetrax: u64,
    /// Existing rows whose address fields were updated.
    pub updated: u64,
    /// New rows inserted.
    pub inserted: u64,
    /// Name-mismatch aliases recorded locally.
    pub aliases_created: u64,
    /// Active locations skipped for having no zip.
    pub skipped_no_zip: u64,
}

impl PushStats {
    /// Key/value pairs for the results printout.
    #[must_use]
    pub fn pairs(&self) -> Vec<(&'static str, String)> {
        vec![
            ("icemaker_active", self.icemaker_active.to_string()),
            ("already_in_skatetrax", self.already_in_skatetrax.to_string()),
            ("updated", self.updated.to_string()),
            ("inserted", self.inserted.to_string()),
            ("aliases_created", self.aliases_created.to_string()),
            ("skipped_no_zip", self.skipped_no_zip.to_string()),
        ]
    }
}

/// Whether two names differ beyond case and surrounding whitespace.
fn name_differs(ours: &str, theirs: &str) -> bool {
    !ours.trim().is_empty()
        && !theirs.trim().is_empty()
        && ours.trim().to_lowercase() != theirs.trim().to_lowercase()
}

/// Pushes active locations into the Skatetrax database.
///
/// # Errors
///
/// Returns [`PipelineError`] if the staging store fails. A missing or
/// unreachable peer is logged and returns zeroed stats.
pub async fn push_locations(
    staging: &dyn Database,
    dry_run: bool,
) -> Result<PushStats, PipelineError> {
    let mut stats = PushStats::default();

    let peer = match db::connect_peer_from_env().await {
        Ok(Some(peer)) => peer,
        Ok(None) => {
            log::error!(
                "SKATETRAX_DB_URL is not set. Cannot push locations without a target database."
            );
            return Ok(stats);
        }
        Err(e) => {
            log::error!("Cannot connect to Skatetrax DB: {e}");
            return Ok(stats);
        }
    };

    let active = locations::list_active_ordered(staging).await?;
    stats.icemaker_active = active.len() as u64;
    log::info!("Found {} active locations in ice-maker to push", active.len());

    let pushable: Vec<&LocationRow> = active
        .iter()
        .filter(|loc| {
            if loc.rink_zip.is_empty() {
                stats.skipped_no_zip += 1;
                false
            } else {
                true
            }
        })
        .collect();

    log::info!(
        "Pushing {} locations ({} skipped, no zip)",
        pushable.len(),
        stats.skipped_no_zip,
    );

    // Existing peer rows: id -> current name.
    let existing_rows = match peer
        .query_raw_params("SELECT rink_id, rink_name FROM locations", &[])
        .await
    {
        Ok(rows) => rows,
        Err(e) => {
            log::error!(
                "Skatetrax DB has no readable 'locations' table: {e}. \
                 Is SKATETRAX_DB_URL pointing to the right database?"
            );
            return Ok(stats);
        }
    };

    let existing: std::collections::BTreeMap<String, String> = existing_rows
        .iter()
        .map(|row| {
            (
                row.to_value("rink_id").unwrap_or_default(),
                row.to_value("rink_name").unwrap_or_default(),
            )
        })
        .collect();

    stats.already_in_skatetrax = existing.len() as u64;
    log::info!("Skatetrax currently has {} locations", existing.len());

    let mut alias_queue: Vec<(String, String, String)> = Vec::new();

    for location in pushable {
        if let Some(peer_name) = existing.get(&location.rink_id) {
            let differs = name_differs(&location.rink_name, peer_name);

            if dry_run {
                if differs {
                    log::info!(
                        "  [DRY-RUN] Would update (name kept): {peer_name} -- ice-maker has \
                         \"{}\"",
                        location.rink_name,
                    );
                } else {
                    log::info!(
                        "  [DRY-RUN] Would update: {peer_name} ({}, {})",
                        location.rink_city,
                        location.rink_state,
                    );
                }
                stats.updated += 1;
                if differs {
                    stats.aliases_created += 1;
                }
                continue;
            }

            peer.exec_raw_params(
                "UPDATE locations SET
                    rink_address = $2, rink_city = $3, rink_state = $4,
                    rink_country = $5, rink_zip = $6
                 WHERE rink_id = $1",
                &[
                    DatabaseValue::String(location.rink_id.clone()),
                    DatabaseValue::String(location.rink_address.clone().unwrap_or_default()),
                    DatabaseValue::String(location.rink_city.clone()),
                    DatabaseValue::String(location.rink_state.clone()),
                    DatabaseValue::String(location.rink_country.clone()),
                    DatabaseValue::String(location.rink_zip.clone()),
                ],
            )
            .await
            .map_err(ice_maker_staging::DbError::from)?;
            stats.updated += 1;

            if differs {
                alias_queue.push((
                    location.rink_id.clone(),
                    location.rink_name.clone(),
                    location.data_source.clone(),
                ));
            }
        } else {
            if dry_run {
                log::info!(
                    "  [DRY-RUN] Would insert: {} ({}, {}) id={}",
                    location.rink_name,
                    location.rink_city,
                    location.rink_state,
                    location.rink_id,
                );
                stats.inserted += 1;
                continue;
            }

            peer.exec_raw_params(
                "INSERT INTO locations
                    (rink_id, rink_name, rink_address, rink_city, rink_state, rink_country,
                     rink_zip, data_source, date_created)
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, NOW())",
                &[
                    DatabaseValue::String(location.rink_id.clone()),
                    DatabaseValue::String(location.rink_name.clone()),
                    DatabaseValue::String(location.rink_address.clone().unwrap_or_default()),
                    DatabaseValue::String(location.rink_city.clone()),
                    DatabaseValue::String(location.rink_state.clone()),
                    DatabaseValue::String(location.rink_country.clone()),
                    DatabaseValue::String(location.rink_zip.clone()),
                    DatabaseValue::String(location.data_source.clone()),
                ],
            )
            .await
            .map_err(ice_maker_staging::DbError::from)?;
            stats.inserted += 1;
        }
    }

    if dry_run {
        log::info!("Dry-run complete -- no changes written");
    } else {
        // Record name mismatches locally so old names keep resolving.
        for (location_id, alias_name, data_source) in alias_queue {
            if aliases::alias_exists(staging, &location_id, &alias_name).await? {
                continue;
            }
            aliases::insert_alias(
                staging,
                &location_id,
                &alias_name,
                None,
                Some(&format!("auto: push name mismatch (source: {data_source})")),
            )
            .await?;
            stats.aliases_created += 1;
        }
    }

    log::info!(
        "Push complete: {} updated, {} inserted, {} aliases, {} already present",
        stats.updated,
        stats.inserted,
        stats.aliases_created,
        stats.already_in_skatetrax,
    );

    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_comparison_ignores_case_and_whitespace() {
        assert!(!name_differs("Polar Ice House", "  polar ice house "));
        assert!(name_differs("Polar Ice House", "Polar Iceplex"));
    }

    #[test]
    fn empty_names_never_differ() {
        assert!(!name_differs("", "Polar Ice House"));
        assert!(!name_differs("Polar Ice House", ""));
    }
}
