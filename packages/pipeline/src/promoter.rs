//! Three-phase promotion from candidate to location.
//!
//! Phase 1 lifts verified candidates, linking to existing locations where
//! the two-layer match hits and otherwise creating new ones — adopting
//! the Skatetrax identifier when the peer directory already knows the
//! rink. Phase 2 links duplicate candidates to wherever their primary
//! went. Phase 3 attaches street-less wiki entries to already-promoted
//! locations; wiki data alone never creates a location.
//!
//! Phases run strictly in order: phase 2 depends on phase 1 having
//! promoted the primaries, and phase 3 only links to locations that
//! exist.

use std::sync::LazyLock;

use ice_maker_matcher::find_address_match;
use ice_maker_staging::locations::NewLocation;
use ice_maker_staging::{candidates, location_sources, locations, raw_entries, rejections, sources};
use ice_maker_staging_models::{CandidateRow, LocationRow, SourceRow, VerificationStatus};
use regex::Regex;
use switchy_database::Database;

use crate::{PipelineError, skatetrax};
use crate::skatetrax::PeerLocation;

/// Progress-log cadence for promotion phases.
const PROMOTE_LOG_BATCH: usize = 100;

/// Pulls the primary candidate id out of a dedup rejection message.
static MATCHES_CANDIDATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Matches candidate (\d+):").expect("valid regex"));

/// Phase 1 counters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Phase1Stats {
    /// Locations created.
    pub promoted_new: u64,
    /// Candidates linked to an existing location.
    pub promoted_existing: u64,
    /// Verified candidates skipped for having no zip.
    pub skipped_no_zip: u64,
    /// New locations that adopted a Skatetrax identifier.
    pub adopted_skatetrax_uuid: u64,
}

/// Phase 2 counters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Phase2Stats {
    /// Duplicates linked to their primary's location.
    pub linked: u64,
    /// Duplicates whose primary has not been promoted yet.
    pub primary_not_promoted: u64,
    /// Rejection rows whose match reference couldn't be parsed.
    pub parse_failed: u64,
}

/// Phase 3 counters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Phase3Stats {
    /// Wiki entries linked to an existing location.
    pub linked: u64,
    /// Wiki entries with no matching location.
    pub no_match: u64,
}

/// Combined promotion counters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PromotionStats {
    /// Phase 1 results.
    pub phase1: Phase1Stats,
    /// Phase 2 results.
    pub phase2: Phase2Stats,
    /// Phase 3 results.
    pub phase3: Phase3Stats,
    /// Directory size after promotion.
    pub total_locations: i64,
}

impl PromotionStats {
    /// Key/value pairs for the results printout.
    #[must_use]
    pub fn pairs(&self) -> Vec<(&'static str, String)> {
        vec![
            ("phase1_new_locations", self.phase1.promoted_new.to_string()),
            (
                "phase1_adopted_skatetrax_uuid",
                self.phase1.adopted_skatetrax_uuid.to_string(),
            ),
            (
                "phase1_linked_existing",
                self.phase1.promoted_existing.to_string(),
            ),
            ("phase1_skipped_no_zip", self.phase1.skipped_no_zip.to_string()),
            ("phase2_duplicates_linked", self.phase2.linked.to_string()),
            (
                "phase2_primary_not_promoted",
                self.phase2.primary_not_promoted.to_string(),
            ),
            ("phase2_parse_failed", self.phase2.parse_failed.to_string()),
            ("phase3_wiki_linked", self.phase3.linked.to_string()),
            ("phase3_wiki_no_match", self.phase3.no_match.to_string()),
            ("total_locations", self.total_locations.to_string()),
        ]
    }
}

/// Parses the primary candidate id from a dedup rejection message.
#[must_use]
pub fn parse_primary_id(message: &str) -> Option<i32> {
    MATCHES_CANDIDATE_RE
        .captures(message)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Resolves the source behind a candidate's raw entry.
async fn candidate_source(
    db: &dyn Database,
    candidate: &CandidateRow,
) -> Result<Option<SourceRow>, PipelineError> {
    let Some(raw) = raw_entries::get_raw_entry(db, candidate.raw_entry_id).await? else {
        return Ok(None);
    };
    Ok(sources::get_source_by_id(db, raw.source_id).await?)
}

/// Links a candidate to a location and records the source
/// corroboration.
async fn link_candidate(
    db: &dyn Database,
    candidate: &CandidateRow,
    location_id: &str,
) -> Result<(), PipelineError> {
    candidates::set_location(db, candidate.id, location_id).await?;

    if let Some(source) = candidate_source(db, candidate).await? {
        location_sources::upsert_link(db, location_id, source.id, Some(candidate.id)).await?;
    }

    Ok(())
}

/// Runs the two-layer location match for a candidate against the loaded
/// active-location pool.
fn match_location<'a>(
    pool: &'a [LocationRow],
    candidate: &CandidateRow,
) -> Option<&'a LocationRow> {
    find_address_match(
        pool,
        &candidate.name,
        candidate.street.as_deref(),
        candidate.city.as_deref(),
        candidate.state.as_deref(),
    )
}

/// Phase 1: promotes `geocode_match` and `source_verified` candidates
/// into the locations table.
///
/// When the peer list is non-empty, a rink Skatetrax already knows keeps
/// its original identifier; only genuinely new rinks get a fresh UUID.
///
/// # Errors
///
/// Returns [`PipelineError`] if the staging store fails.
pub async fn promote_verified(
    db: &dyn Database,
    peer_locations: &[PeerLocation],
) -> Result<Phase1Stats, PipelineError> {
    let mut stats = Phase1Stats::default();

    let pending = candidates::list_unpromoted(
        db,
        &[
            VerificationStatus::GeocodeMatch,
            VerificationStatus::SourceVerified,
        ],
    )
    .await?;

    log::info!("Phase 1: {} verified candidates to promote", pending.len());

    // Locations created this phase join the match pool immediately, so
    // two verified candidates for the same rink collapse to one row.
    let mut pool = locations::list_matchable_locations(db).await?;

    for (i, candidate) in pending.iter().enumerate() {
        if candidate.zip.as_deref().is_none_or(str::is_empty) {
            stats.skipped_no_zip += 1;
            continue;
        }

        if let Some(existing) = match_location(&pool, candidate) {
            let location_id = existing.rink_id.clone();
            link_candidate(db, candidate, &location_id).await?;
            stats.promoted_existing += 1;
        } else {
            let adopted_id = find_peer_id(db, peer_locations, candidate, &mut stats).await?;

            // A peer match may point at a location we already hold; the
            // pool only carries active rows, so check by id.
            if let Some(adopted) = &adopted_id
                && let Some(existing) = locations::get_location(db, adopted).await?
            {
                link_candidate(db, candidate, &existing.rink_id).await?;
                stats.promoted_existing += 1;
                continue;
            }

            let source_name = candidate_source(db, candidate)
                .await?
                .map_or_else(|| "unknown".to_string(), |s| s.name);

            let created = locations::insert_location(
                db,
                &NewLocation {
                    rink_id: adopted_id,
                    rink_name: candidate.name.clone(),
                    rink_address: candidate.street.clone().unwrap_or_default(),
                    rink_city: candidate.city.clone().unwrap_or_default(),
                    rink_state: candidate.state.clone().unwrap_or_default(),
                    rink_country: candidate
                        .country
                        .clone()
                        .unwrap_or_else(|| "US".to_string()),
                    rink_zip: candidate.zip.clone().unwrap_or_default(),
                    data_source: source_name,
                },
            )
            .await?;

            link_candidate(db, candidate, &created.rink_id).await?;
            pool.push(created);
            stats.promoted_new += 1;
        }

        if (i + 1) % PROMOTE_LOG_BATCH == 0 {
            log::info!("Phase 1 progress: {}/{}", i + 1, pending.len());
        }
    }

    log::info!(
        "Phase 1 done: {} new locations ({} adopted Skatetrax UUIDs), {} linked to existing, \
         {} skipped (no zip)",
        stats.promoted_new,
        stats.adopted_skatetrax_uuid,
        stats.promoted_existing,
        stats.skipped_no_zip,
    );

    Ok(stats)
}

/// Checks the peer directory for this candidate and returns the
/// identifier to adopt, counting the adoption.
async fn find_peer_id(
    db: &dyn Database,
    peer_locations: &[PeerLocation],
    candidate: &CandidateRow,
    stats: &mut Phase1Stats,
) -> Result<Option<String>, PipelineError> {
    let Some(peer) = find_address_match(
        peer_locations,
        &candidate.name,
        candidate.street.as_deref(),
        candidate.city.as_deref(),
        candidate.state.as_deref(),
    ) else {
        return Ok(None);
    };

    // Adoption only counts when the id is genuinely new to us.
    if locations::get_location(db, &peer.rink_id).await?.is_none() {
        log::info!(
            "Adopting Skatetrax UUID {} for '{}' in {:?}, {:?}",
            peer.rink_id,
            candidate.name,
            candidate.city,
            candidate.state,
        );
        stats.adopted_skatetrax_uuid += 1;
    }

    Ok(Some(peer.rink_id.clone()))
}

/// Phase 2: links `duplicate` candidates to the location their primary
/// candidate was promoted to.
///
/// # Errors
///
/// Returns [`PipelineError`] if the staging store fails.
pub async fn link_duplicates(db: &dyn Database) -> Result<Phase2Stats, PipelineError> {
    let mut stats = Phase2Stats::default();

    let duplicates = candidates::list_unpromoted(db, &[VerificationStatus::Duplicate]).await?;
    log::info!("Phase 2: {} duplicate candidates to link", duplicates.len());

    for (i, duplicate) in duplicates.iter().enumerate() {
        let rejection = rejections::find_duplicate_rejection(db, duplicate.raw_entry_id).await?;

        let primary_id = rejection
            .as_ref()
            .and_then(|r| r.raw_parse_error.as_deref())
            .and_then(parse_primary_id);

        let Some(primary_id) = primary_id else {
            stats.parse_failed += 1;
            continue;
        };

        let primary = candidates::get_candidate(db, primary_id).await?;
        let Some(location_id) = primary.and_then(|p| p.location_id) else {
            stats.primary_not_promoted += 1;
            continue;
        };

        link_candidate(db, duplicate, &location_id).await?;
        stats.linked += 1;

        if (i + 1) % PROMOTE_LOG_BATCH == 0 {
            log::info!("Phase 2 progress: {}/{}", i + 1, duplicates.len());
        }
    }

    log::info!(
        "Phase 2 done: {} linked, {} primary not yet promoted, {} couldn't parse match",
        stats.linked,
        stats.primary_not_promoted,
        stats.parse_failed,
    );

    Ok(stats)
}

/// Phase 3: links unverified street-less (wiki) candidates to existing
/// promoted locations. No new locations are created — wiki data alone
/// isn't enough.
///
/// # Errors
///
/// Returns [`PipelineError`] if the staging store fails.
pub async fn link_wiki_entries(db: &dyn Database) -> Result<Phase3Stats, PipelineError> {
    let mut stats = Phase3Stats::default();

    let unverified = candidates::list_unpromoted(db, &[VerificationStatus::Unverified]).await?;
    let streetless: Vec<&CandidateRow> = unverified
        .iter()
        .filter(|c| c.street.as_deref().is_none_or(|s| s.trim().is_empty()))
        .collect();

    log::info!(
        "Phase 3: {} unverified streetless candidates to link",
        streetless.len()
    );

    let pool = locations::list_matchable_locations(db).await?;

    for (i, candidate) in streetless.iter().enumerate() {
        if let Some(existing) = match_location(&pool, candidate) {
            let location_id = existing.rink_id.clone();
            link_candidate(db, candidate, &location_id).await?;
            stats.linked += 1;
        } else {
            stats.no_match += 1;
        }

        if (i + 1) % PROMOTE_LOG_BATCH == 0 {
            log::info!("Phase 3 progress: {}/{}", i + 1, streetless.len());
        }
    }

    log::info!(
        "Phase 3 done: {} wiki entries linked, {} unmatched",
        stats.linked,
        stats.no_match,
    );

    Ok(stats)
}

/// Executes all three promotion phases in order.
///
/// # Errors
///
/// Returns [`PipelineError`] if the staging store fails. Peer lookup
/// failures are absorbed (empty peer list).
pub async fn run_promotion(db: &dyn Database) -> Result<PromotionStats, PipelineError> {
    let peer_locations = skatetrax::load_locations().await;

    let phase1 = promote_verified(db, &peer_locations).await?;
    let phase2 = link_duplicates(db).await?;
    let phase3 = link_wiki_entries(db).await?;

    let total_locations = locations::count_locations(db).await?;

    let stats = PromotionStats {
        phase1,
        phase2,
        phase3,
        total_locations,
    };

    log::info!("Promotion complete: {stats:?}");
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_primary_id_from_rejection_message() {
        assert_eq!(parse_primary_id("Matches candidate 42: Polar Ice"), Some(42));
        assert_eq!(
            parse_primary_id("Matches candidate 7: Rink: With Colons"),
            Some(7)
        );
    }

    #[test]
    fn unparseable_messages_yield_none() {
        assert_eq!(parse_primary_id("Confidence 0.40, matched: elsewhere"), None);
        assert_eq!(parse_primary_id(""), None);
        assert_eq!(parse_primary_id("Matches candidate abc: nope"), None);
    }

    #[test]
    fn promotion_pairs_use_the_reporting_keys() {
        let stats = PromotionStats {
            phase1: Phase1Stats {
                promoted_new: 3,
                adopted_skatetrax_uuid: 1,
                ..Phase1Stats::default()
            },
            ..PromotionStats::default()
        };

        let pairs = stats.pairs();
        assert_eq!(pairs[0], ("phase1_new_locations", "3".to_string()));
        assert_eq!(pairs[1], ("phase1_adopted_skatetrax_uuid", "1".to_string()));
    }
}
