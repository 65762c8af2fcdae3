//! Per-source pipeline orchestration.
//!
//! One source per call: fetch → fingerprint → parse → dedup → verify.
//! Entries run strictly in order so that a candidate inserted early in
//! the run is a dedup target for every later entry of the same run.

use ice_maker_address::{NormalizedEntry, normalize_entry, normalize_wiki_entry};
use ice_maker_geocoder::clock::Clock;
use ice_maker_geocoder::nominatim::Geocoder;
use ice_maker_geocoder::geocode_candidate;
use ice_maker_matcher::dedup::find_duplicate;
use ice_maker_source::Fetcher;
use ice_maker_source_models::FetchExtras;
use ice_maker_staging::candidates::NewCandidate;
use ice_maker_staging::{candidates, fingerprint, raw_entries, rejections, sources};
use ice_maker_staging_models::{
    CandidateRow, MatchLayer, ParseStatus, RawEntryRow, RejectionReason, VerificationStatus,
};
use switchy_database::Database;

use crate::PipelineError;

/// Progress-log cadence for the standalone geocoding mode.
const GEOCODE_LOG_BATCH: usize = 50;

/// Options for a source run.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Only scrape and fingerprint; skip parse/dedup/verify.
    pub scrape_only: bool,
    /// Geocode candidates that lack source-provided coordinates.
    pub geocode: bool,
    /// Max number of new entries to process (for testing).
    pub limit: Option<usize>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            scrape_only: false,
            geocode: true,
            limit: None,
        }
    }
}

/// Counters for one source run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunStats {
    /// Rows the fetcher produced.
    pub scraped: u64,
    /// Rows with a fingerprint not seen before.
    pub new: u64,
    /// Rows skipped as unchanged.
    pub skipped: u64,
    /// New rows parsed into candidates.
    pub parsed: u64,
    /// New rows that failed parsing.
    pub parse_failed: u64,
    /// Candidates sent to the geocoder.
    pub geocoded: u64,
    /// Geocoder confirmations.
    pub geocode_match: u64,
    /// Geocoder results below the confidence threshold.
    pub geocode_mismatch: u64,
    /// Geocoder lookups that produced nothing.
    pub geocode_failed: u64,
    /// Candidates verified by source-provided coordinates and zip.
    pub source_verified: u64,
    /// Layer-1 dedup hits.
    pub dedup_exact: u64,
    /// Layer-2 dedup hits.
    pub dedup_fuzzy: u64,
    /// Layer-3 dedup hits.
    pub dedup_geo: u64,
}

impl RunStats {
    /// Key/value pairs for the results printout.
    #[must_use]
    pub fn pairs(&self) -> Vec<(&'static str, String)> {
        vec![
            ("scraped", self.scraped.to_string()),
            ("new", self.new.to_string()),
            ("skipped", self.skipped.to_string()),
            ("parsed", self.parsed.to_string()),
            ("parse_failed", self.parse_failed.to_string()),
            ("geocoded", self.geocoded.to_string()),
            ("geocode_match", self.geocode_match.to_string()),
            ("geocode_mismatch", self.geocode_mismatch.to_string()),
            ("geocode_failed", self.geocode_failed.to_string()),
            ("source_verified", self.source_verified.to_string()),
            ("dedup_exact", self.dedup_exact.to_string()),
            ("dedup_fuzzy", self.dedup_fuzzy.to_string()),
            ("dedup_geo", self.dedup_geo.to_string()),
        ]
    }

    /// Run status for the source registry, from parse outcomes.
    #[must_use]
    pub const fn run_status(&self) -> &'static str {
        if self.parse_failed == 0 && self.scraped > 0 {
            "success"
        } else if self.parsed > 0 {
            "partial"
        } else {
            "failed"
        }
    }
}

/// Executes the full pipeline for a single named source.
///
/// # Errors
///
/// Returns [`PipelineError`] only for staging store failures; fetch and
/// parse problems are absorbed into the stats and the source's run
/// metadata.
pub async fn run_source<C: Clock>(
    db: &dyn Database,
    geocoder: &Geocoder<C>,
    source_name: &str,
    options: &RunOptions,
) -> Result<RunStats, PipelineError> {
    let mut stats = RunStats::default();

    let Some(source) = sources::get_source_by_name(db, source_name).await? else {
        log::error!("Source '{source_name}' not found in sources table");
        return Ok(stats);
    };
    if !source.enabled {
        log::warn!("Source '{source_name}' is disabled, skipping");
        return Ok(stats);
    }

    let Some(fetcher) = Fetcher::from_module(&source.fetcher_module) else {
        log::error!("No fetcher for source '{source_name}' ({})", source.fetcher_module);
        return Ok(stats);
    };

    // Step 1: Scrape.
    log::info!("Fetching source: {source_name} ({})", fetcher.module());
    let fetched = match fetcher.fetch().await {
        Ok(fetched) => fetched,
        Err(e) => {
            log::error!("Fetch failed for {source_name}: {e}");
            sources::update_run_metadata(db, source.id, "failed", 0).await?;
            return Ok(stats);
        }
    };

    stats.scraped = fetched.len() as u64;
    log::info!("Scraped {} entries from {source_name}", fetched.len());

    // Steps 2-3: Fingerprint and insert raws.
    let mut new_entries: Vec<(RawEntryRow, FetchExtras)> = Vec::new();
    for row in &fetched {
        let (entry, is_new) =
            fingerprint::check_and_insert_raw(db, source.id, &row.name, &row.address).await?;

        if is_new {
            new_entries.push((entry, row.extras.clone()));
            stats.new += 1;
        } else {
            stats.skipped += 1;
        }

        if let Some(limit) = options.limit
            && stats.new as usize >= limit
        {
            break;
        }
    }

    log::info!("New: {}, Skipped (unchanged): {}", stats.new, stats.skipped);

    if options.scrape_only {
        sources::update_run_metadata(db, source.id, stats.run_status(), entry_count(&stats))
            .await?;
        return Ok(stats);
    }

    // The dedup pool: everything staged so far, kept current as this
    // run inserts and verifies candidates.
    let mut pool = candidates::list_candidates(db).await?;

    // Steps 4-6 per new raw entry: parse, dedup, verify.
    for (raw_entry, extras) in new_entries {
        match parse_raw_entry(&raw_entry, &extras) {
            Err(error) => {
                raw_entries::set_parse_status(db, raw_entry.id, ParseStatus::Failed).await?;
                rejections::insert_rejection(
                    db,
                    raw_entry.id,
                    RejectionReason::ParseFailure,
                    Some(&error),
                )
                .await?;
                stats.parse_failed += 1;
            }
            Ok(parsed) => {
                raw_entries::set_parse_status(db, raw_entry.id, ParseStatus::Parsed).await?;

                let mut candidate =
                    candidates::insert_candidate(db, &new_candidate(&raw_entry, &parsed, &extras))
                        .await?;
                stats.parsed += 1;

                process_candidate(db, geocoder, &mut candidate, &pool, options, &mut stats)
                    .await?;

                pool.push(candidate);
            }
        }
    }

    sources::update_run_metadata(db, source.id, stats.run_status(), entry_count(&stats)).await?;

    log::info!("Pipeline complete for {source_name}: {stats:?}");
    Ok(stats)
}

/// Dedups and verifies one freshly inserted candidate, updating it in
/// place so the caller can add it to the dedup pool.
async fn process_candidate<C: Clock>(
    db: &dyn Database,
    geocoder: &Geocoder<C>,
    candidate: &mut CandidateRow,
    pool: &[CandidateRow],
    options: &RunOptions,
    stats: &mut RunStats,
) -> Result<(), PipelineError> {
    // Step 5: Dedup check.
    if let Some((matched, layer)) = find_duplicate(candidate, pool) {
        let reason = match layer {
            MatchLayer::AddressExact => {
                stats.dedup_exact += 1;
                RejectionReason::DuplicateAddressExact
            }
            MatchLayer::FuzzyName => {
                stats.dedup_fuzzy += 1;
                RejectionReason::SuspectedDuplicate
            }
            MatchLayer::GeoProximity => {
                stats.dedup_geo += 1;
                RejectionReason::SuspectedDuplicate
            }
        };

        rejections::insert_rejection(
            db,
            candidate.raw_entry_id,
            reason,
            Some(&format!("Matches candidate {}: {}", matched.id, matched.name)),
        )
        .await?;

        candidate.verification_status = VerificationStatus::Duplicate;
        candidates::set_status(db, candidate.id, VerificationStatus::Duplicate).await?;
        return Ok(());
    }

    // Step 6: Geocode, or trust source-provided coordinates + zip.
    let has_source_coords = candidate.geo_lat.is_some()
        && candidate.geo_lon.is_some()
        && candidate.zip.as_deref().is_some_and(|z| !z.is_empty());

    if has_source_coords {
        candidate.verification_status = VerificationStatus::SourceVerified;
        candidates::set_status(db, candidate.id, VerificationStatus::SourceVerified).await?;
        stats.source_verified += 1;
        log::debug!("Source-verified (coords+zip from API): {}", candidate.name);
    } else if options.geocode {
        let status = geocode_candidate(geocoder, candidate).await;
        candidates::update_geocode_results(db, candidate).await?;
        stats.geocoded += 1;

        match status {
            VerificationStatus::GeocodeMatch => stats.geocode_match += 1,
            VerificationStatus::GeocodeMismatch => {
                stats.geocode_mismatch += 1;
                rejections::insert_rejection(
                    db,
                    candidate.raw_entry_id,
                    RejectionReason::GeocodeMismatch,
                    Some(&mismatch_detail(candidate)),
                )
                .await?;
            }
            VerificationStatus::GeocodeFailed => stats.geocode_failed += 1,
            _ => {}
        }
    }

    Ok(())
}

/// Parses a raw entry using the path its extras variant selects: wiki
/// rows carry pre-extracted city/state and skip street tagging.
fn parse_raw_entry(
    raw_entry: &RawEntryRow,
    extras: &FetchExtras,
) -> Result<NormalizedEntry, String> {
    let result = match extras {
        FetchExtras::Wiki(wiki) => {
            normalize_wiki_entry(&raw_entry.raw_name, &wiki.city, &wiki.state)
        }
        FetchExtras::None | FetchExtras::Facility(_) => {
            normalize_entry(&raw_entry.raw_name, &raw_entry.raw_address)
        }
    };

    result.map_err(|e| e.to_string())
}

/// Builds the candidate insert from parse output plus any geodata the
/// source supplied.
fn new_candidate(
    raw_entry: &RawEntryRow,
    parsed: &NormalizedEntry,
    extras: &FetchExtras,
) -> NewCandidate {
    let mut new = NewCandidate {
        raw_entry_id: raw_entry.id,
        name: parsed.name.clone(),
        street: parsed.street.clone().filter(|s| !s.is_empty()),
        city: Some(parsed.city.clone()).filter(|c| !c.is_empty()),
        state: Some(parsed.state.clone()).filter(|s| !s.is_empty()),
        ..NewCandidate::default()
    };

    if let FetchExtras::Facility(facility) = extras {
        if !facility.zip.is_empty() {
            new.zip = Some(facility.zip.clone());
        }
        if let (Some(lat), Some(lng)) = (facility.lat, facility.lng) {
            new.geo_lat = Some(lat);
            new.geo_lon = Some(lng);
        }
    }

    new
}

/// Rejection detail for a below-threshold geocode.
fn mismatch_detail(candidate: &CandidateRow) -> String {
    format!(
        "Confidence {:.2}, matched: {}",
        candidate.geo_confidence.unwrap_or(0.0),
        candidate.geo_matched_name.as_deref().unwrap_or("")
    )
}

#[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
const fn entry_count(stats: &RunStats) -> i32 {
    stats.scraped as i32
}

/// Counters for the standalone geocoding mode.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GeocodeStats {
    /// Unverified candidates considered.
    pub total_pending: u64,
    /// Skipped because they have no street (wiki entries).
    pub skipped_no_street: u64,
    /// Candidates sent to the geocoder.
    pub geocoded: u64,
    /// Confirmations.
    pub geocode_match: u64,
    /// Below-threshold results.
    pub geocode_mismatch: u64,
    /// Lookups that produced nothing.
    pub geocode_failed: u64,
}

impl GeocodeStats {
    /// Key/value pairs for the results printout.
    #[must_use]
    pub fn pairs(&self) -> Vec<(&'static str, String)> {
        vec![
            ("total_pending", self.total_pending.to_string()),
            ("skipped_no_street", self.skipped_no_street.to_string()),
            ("geocoded", self.geocoded.to_string()),
            ("geocode_match", self.geocode_match.to_string()),
            ("geocode_mismatch", self.geocode_mismatch.to_string()),
            ("geocode_failed", self.geocode_failed.to_string()),
        ]
    }
}

/// Geocodes existing unverified candidates without re-scraping.
///
/// Only candidates with a street address are sent out — wiki entries
/// lack one, and Nominatim needs a street for a meaningful result.
/// Already-geocoded candidates aren't re-queried on a later run because
/// their status leaves `unverified`. Progress is logged every
/// [`GEOCODE_LOG_BATCH`] candidates; every write is already durable.
///
/// # Errors
///
/// Returns [`PipelineError`] if the staging store fails.
pub async fn geocode_pending<C: Clock>(
    db: &dyn Database,
    geocoder: &Geocoder<C>,
    source_name: Option<&str>,
) -> Result<GeocodeStats, PipelineError> {
    let mut stats = GeocodeStats::default();

    let pending = if let Some(source_name) = source_name {
        let Some(source) = sources::get_source_by_name(db, source_name).await? else {
            log::error!("Source '{source_name}' not found");
            return Ok(stats);
        };
        candidates::list_by_status_for_source(db, VerificationStatus::Unverified, source.id)
            .await?
    } else {
        candidates::list_by_status(db, VerificationStatus::Unverified).await?
    };

    stats.total_pending = pending.len() as u64;
    log::info!(
        "Found {} unverified candidates{}",
        pending.len(),
        source_name.map(|s| format!(" for source '{s}'")).unwrap_or_default()
    );

    let (with_street, streetless): (Vec<_>, Vec<_>) = pending
        .into_iter()
        .partition(|c| c.street.as_deref().is_some_and(|s| !s.trim().is_empty()));

    stats.skipped_no_street = streetless.len() as u64;
    if !streetless.is_empty() {
        log::info!(
            "Skipping {} candidates with no street address (wiki entries)",
            streetless.len()
        );
    }

    log::info!("Geocoding {} candidates with street addresses", with_street.len());
    let start = std::time::Instant::now();
    let total = with_street.len();

    for (i, mut candidate) in with_street.into_iter().enumerate() {
        let status = geocode_candidate(geocoder, &mut candidate).await;
        candidates::update_geocode_results(db, &candidate).await?;
        stats.geocoded += 1;

        match status {
            VerificationStatus::GeocodeMatch => stats.geocode_match += 1,
            VerificationStatus::GeocodeMismatch => {
                stats.geocode_mismatch += 1;
                rejections::insert_rejection(
                    db,
                    candidate.raw_entry_id,
                    RejectionReason::GeocodeMismatch,
                    Some(&mismatch_detail(&candidate)),
                )
                .await?;
            }
            VerificationStatus::GeocodeFailed => stats.geocode_failed += 1,
            _ => {}
        }

        let done = i + 1;
        if done % GEOCODE_LOG_BATCH == 0 {
            let elapsed = start.elapsed().as_secs_f64();
            let rate = if elapsed > 0.0 {
                #[allow(clippy::cast_precision_loss)]
                {
                    done as f64 / elapsed
                }
            } else {
                0.0
            };
            #[allow(clippy::cast_precision_loss)]
            let remaining = if rate > 0.0 {
                (total - done) as f64 / rate / 60.0
            } else {
                0.0
            };
            log::info!(
                "Progress: {done}/{total} ({:.0}%) | {rate:.1}/sec | ~{remaining:.0} min remaining",
                100.0 * done as f64 / total as f64,
            );
        }
    }

    log::info!(
        "Geocoding complete: {} processed in {:.1} min | match={}, mismatch={}, failed={}",
        stats.geocoded,
        start.elapsed().as_secs_f64() / 60.0,
        stats.geocode_match,
        stats.geocode_mismatch,
        stats.geocode_failed,
    );

    Ok(stats)
}

/// Counters for the repair operation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepairStats {
    /// `geocode_failed` candidates examined.
    pub total: u64,
    /// Reset to `unverified` with fresh parse output.
    pub repaired: u64,
    /// Could not be re-parsed.
    pub still_failed: u64,
    /// Re-parse produced the same street.
    pub unchanged: u64,
}

impl RepairStats {
    /// Key/value pairs for the results printout.
    #[must_use]
    pub fn pairs(&self) -> Vec<(&'static str, String)> {
        vec![
            ("total", self.total.to_string()),
            ("repaired", self.repaired.to_string()),
            ("still_failed", self.still_failed.to_string()),
            ("unchanged", self.unchanged.to_string()),
        ]
    }
}

/// Re-parses `geocode_failed` candidates from their raw entries.
///
/// Candidates whose street now parses differently are reset to
/// `unverified` (geodata and zip cleared) so `--geocode-pending` picks
/// them up again.
///
/// # Errors
///
/// Returns [`PipelineError`] if the staging store fails.
pub async fn repair_geocode_failed(db: &dyn Database) -> Result<RepairStats, PipelineError> {
    let mut stats = RepairStats::default();

    let failed = candidates::list_by_status(db, VerificationStatus::GeocodeFailed).await?;
    stats.total = failed.len() as u64;
    log::info!("Found {} geocode_failed candidates to repair", failed.len());

    for candidate in failed {
        let Some(raw) = raw_entries::get_raw_entry(db, candidate.raw_entry_id).await? else {
            stats.still_failed += 1;
            continue;
        };

        let Ok(parsed) = normalize_entry(&raw.raw_name, &raw.raw_address) else {
            stats.still_failed += 1;
            continue;
        };

        let new_street = parsed.street.filter(|s| !s.is_empty());
        if new_street.is_some() && new_street != candidate.street {
            candidates::reset_for_repair(
                db,
                candidate.id,
                new_street.as_deref(),
                Some(parsed.city.as_str()).filter(|c| !c.is_empty()),
                Some(parsed.state.as_str()).filter(|s| !s.is_empty()),
            )
            .await?;
            stats.repaired += 1;
        } else {
            stats.unchanged += 1;
        }
    }

    log::info!(
        "Repair complete: {} repaired (now unverified), {} unchanged, {} still failed",
        stats.repaired,
        stats.unchanged,
        stats.still_failed,
    );

    Ok(stats)
}

#[cfg(test)]
mod tests {
    use ice_maker_source_models::{FacilityExtras, WikiExtras};

    use super::*;

    fn raw(name: &str, address: &str) -> RawEntryRow {
        RawEntryRow {
            id: 1,
            source_id: 1,
            raw_name: name.to_string(),
            raw_address: address.to_string(),
            raw_fingerprint: "fp".to_string(),
            scrape_date: None,
            parse_status: ParseStatus::Pending,
        }
    }

    #[test]
    fn run_status_reflects_parse_outcomes() {
        let clean = RunStats {
            scraped: 10,
            parsed: 10,
            ..RunStats::default()
        };
        assert_eq!(clean.run_status(), "success");

        let partial = RunStats {
            scraped: 10,
            parsed: 8,
            parse_failed: 2,
            ..RunStats::default()
        };
        assert_eq!(partial.run_status(), "partial");

        let failed = RunStats {
            scraped: 10,
            parse_failed: 10,
            ..RunStats::default()
        };
        assert_eq!(failed.run_status(), "failed");

        assert_eq!(RunStats::default().run_status(), "failed");
    }

    #[test]
    fn wiki_extras_select_the_streetless_parse_path() {
        let extras = FetchExtras::Wiki(WikiExtras {
            city: "Denver".to_string(),
            state: "Colorado".to_string(),
            ..WikiExtras::default()
        });

        let parsed = parse_raw_entry(&raw("Big Bear Ice Arena", "Denver, Colorado"), &extras)
            .unwrap();
        assert_eq!(parsed.street, None);
        assert_eq!(parsed.state, "CO");
    }

    #[test]
    fn facility_extras_carry_geodata_into_the_candidate() {
        let extras = FetchExtras::Facility(FacilityExtras {
            zip: "62701".to_string(),
            lat: Some(39.8),
            lng: Some(-89.6),
        });

        let raw_entry = raw("Springfield Ice", "100 Main St, Springfield, IL");
        let parsed = parse_raw_entry(&raw_entry, &extras).unwrap();
        let new = new_candidate(&raw_entry, &parsed, &extras);

        assert_eq!(new.zip.as_deref(), Some("62701"));
        assert_eq!(new.geo_lat, Some(39.8));
        assert_eq!(new.geo_lon, Some(-89.6));
        assert_eq!(new.street.as_deref(), Some("100 MAIN STREET"));
    }

    #[test]
    fn partial_facility_geodata_is_not_copied() {
        let extras = FetchExtras::Facility(FacilityExtras {
            zip: String::new(),
            lat: Some(39.8),
            lng: None,
        });

        let raw_entry = raw("Rink", "100 Main St, Springfield, IL");
        let parsed = parse_raw_entry(&raw_entry, &extras).unwrap();
        let new = new_candidate(&raw_entry, &parsed, &extras);

        assert_eq!(new.zip, None);
        assert_eq!(new.geo_lat, None);
        assert_eq!(new.geo_lon, None);
    }

    #[test]
    fn parse_failure_message_is_preserved() {
        let err = parse_raw_entry(&raw("", "100 Main St, Springfield, IL"), &FetchExtras::None)
            .unwrap_err();
        assert!(err.contains("Missing required fields"), "was: {err}");
    }

    #[test]
    fn mismatch_detail_formats_confidence() {
        let candidate = CandidateRow {
            id: 1,
            raw_entry_id: 1,
            name: "Rink".to_string(),
            street: None,
            city: None,
            state: None,
            zip: None,
            country: None,
            geo_lat: None,
            geo_lon: None,
            geo_confidence: Some(0.4567),
            geo_matched_name: Some("Somewhere Else".to_string()),
            verification_status: VerificationStatus::GeocodeMismatch,
            location_id: None,
        };
        assert_eq!(mismatch_detail(&candidate), "Confidence 0.46, matched: Somewhere Else");
    }
}
