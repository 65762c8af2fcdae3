//! Ice-time confirmation sync.
//!
//! Every `rink_id` that appears in the Skatetrax `ice_time` table is
//! proof that at least one skater has actually been there — the highest
//! confidence signal available. Each is recorded as a `skatetrax`
//! source corroboration on the matching location.

use chrono::Utc;
use ice_maker_staging::{db, location_sources, locations, sources};
use moosicbox_json_utils::database::ToValue as _;

use crate::PipelineError;

/// Counters for the ice-time sync.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IceTimeStats {
    /// Distinct rinks referenced by ice-time rows.
    pub total_rinks_in_ice_time: u64,
    /// Rinks confirmed into `location_sources`.
    pub confirmed: u64,
    /// Rinks skated at but missing from the directory.
    pub missing_from_directory: u64,
}

impl IceTimeStats {
    /// Key/value pairs for the results printout.
    #[must_use]
    pub fn pairs(&self) -> Vec<(&'static str, String)> {
        vec![
            (
                "total_rinks_in_ice_time",
                self.total_rinks_in_ice_time.to_string(),
            ),
            ("confirmed", self.confirmed.to_string()),
            (
                "missing_from_directory",
                self.missing_from_directory.to_string(),
            ),
        ]
    }
}

/// Queries the peer database for distinct ice-time rinks and records
/// them as `skatetrax` source observations.
///
/// # Errors
///
/// Returns [`PipelineError`] if the staging store fails. Peer
/// connectivity problems are logged and produce zeroed stats instead.
pub async fn sync_ice_time(
    staging: &dyn switchy_database::Database,
) -> Result<IceTimeStats, PipelineError> {
    let mut stats = IceTimeStats::default();

    let peer = match db::connect_peer_from_env().await {
        Ok(Some(peer)) => peer,
        Ok(None) => {
            log::error!(
                "SKATETRAX_DB_URL is not set. Set it to a valid connection string to enable \
                 ice_time sync"
            );
            return Ok(stats);
        }
        Err(e) => {
            log::error!("Cannot connect to Skatetrax DB: {e}");
            return Ok(stats);
        }
    };

    let rink_rows = match peer
        .query_raw_params(
            "SELECT rink_id, MAX(date) AS last_skated FROM ice_time GROUP BY rink_id",
            &[],
        )
        .await
    {
        Ok(rows) => rows,
        Err(e) => {
            log::error!("ice_time query failed: {e}");
            return Ok(stats);
        }
    };

    stats.total_rinks_in_ice_time = rink_rows.len() as u64;
    log::info!("Found {} distinct rink_ids in ice_time", rink_rows.len());

    if rink_rows.is_empty() {
        return Ok(stats);
    }

    let Some(skatetrax_source) = sources::get_source_by_name(staging, "skatetrax").await? else {
        log::error!("'skatetrax' source not found in sources table");
        return Ok(stats);
    };

    for row in &rink_rows {
        let rink_id: String = row.to_value("rink_id").unwrap_or_default();
        let last_skated: Option<chrono::NaiveDateTime> = row.to_value("last_skated").unwrap_or(None);

        if locations::get_location(staging, &rink_id).await?.is_none() {
            log::debug!("Rink {rink_id} exists in ice_time but not in directory");
            stats.missing_from_directory += 1;
            continue;
        }

        let seen_at = last_skated.map_or_else(Utc::now, |naive| {
            chrono::DateTime::<Utc>::from_naive_utc_and_offset(naive, Utc)
        });

        location_sources::upsert_observation(staging, &rink_id, skatetrax_source.id, seen_at)
            .await?;
        stats.confirmed += 1;
    }

    log::info!(
        "ice_time sync complete: {} confirmed, {} missing from directory (out of {} total)",
        stats.confirmed,
        stats.missing_from_directory,
        stats.total_rinks_in_ice_time,
    );

    Ok(stats)
}
