#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Duplicate detection and cross-table matching.
//!
//! Two policies share one normalization and one similarity metric:
//!
//! - the **three-layer candidate dedup** (exact address, fuzzy name in the
//!   same locality, geographic proximity) run during ingestion, and
//! - the **two-layer location match** (exact address, fuzzy name) run by
//!   the promoter against both our `locations` table and the peer
//!   directory.
//!
//! All matching is over rows already loaded into memory; callers query
//! the relevant pool and hand it in, which keeps the policy itself free
//! of database concerns.

pub mod dedup;
pub mod geo;
pub mod similarity;

use std::sync::LazyLock;

use ice_maker_staging_models::LocationRow;
use regex::Regex;

/// Fuzzy-name threshold when both sides have a street address.
pub const FUZZY_NAME_THRESHOLD: f64 = 0.8;

/// Relaxed fuzzy-name threshold when either side has no street (wiki
/// entries carry city/state only).
pub const FUZZY_NAME_THRESHOLD_NO_STREET: f64 = 0.6;

/// Layer-3 match radius in miles.
pub const GEO_PROXIMITY_MILES: f64 = 0.5;

static COMPARISON_SCRUB_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z0-9 ]").expect("valid regex"));

static WHITESPACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

/// Normalizes a value for comparison: lowercase, strip everything outside
/// `[a-z0-9 ]`, collapse whitespace runs, trim.
#[must_use]
pub fn normalize_for_comparison(text: Option<&str>) -> String {
    let Some(text) = text else {
        return String::new();
    };
    let lowered = text.to_lowercase();
    let scrubbed = COMPARISON_SCRUB_RE.replace_all(lowered.trim(), "");
    WHITESPACE_RE.replace_all(&scrubbed, " ").trim().to_string()
}

/// Anything with a name and an address that match targets expose.
///
/// Implemented for our [`LocationRow`] and for the peer directory's rows,
/// so the promoter runs one policy against both.
pub trait AddressRecord {
    /// Display name.
    fn record_name(&self) -> &str;
    /// Street address, if any.
    fn record_street(&self) -> Option<&str>;
    /// City.
    fn record_city(&self) -> &str;
    /// State code.
    fn record_state(&self) -> &str;
}

impl AddressRecord for LocationRow {
    fn record_name(&self) -> &str {
        &self.rink_name
    }

    fn record_street(&self) -> Option<&str> {
        self.rink_address.as_deref()
    }

    fn record_city(&self) -> &str {
        &self.rink_city
    }

    fn record_state(&self) -> &str {
        &self.rink_state
    }
}

/// Two-layer match against a slice of address records.
///
/// Layer 1: non-empty normalized street equal on (street, city, state).
/// Layer 2: fuzzy name within the same (city, state), with the relaxed
/// threshold when either side has no street. First hit wins, layer 1
/// checked exhaustively before layer 2.
#[must_use]
pub fn find_address_match<'a, T: AddressRecord>(
    records: &'a [T],
    name: &str,
    street: Option<&str>,
    city: Option<&str>,
    state: Option<&str>,
) -> Option<&'a T> {
    let norm_street = normalize_for_comparison(street);
    let norm_city = normalize_for_comparison(city);
    let norm_state = normalize_for_comparison(state);
    let norm_name = normalize_for_comparison(Some(name));

    for record in records {
        let rec_street = normalize_for_comparison(record.record_street());

        if !norm_street.is_empty()
            && !rec_street.is_empty()
            && norm_street == rec_street
            && norm_city == normalize_for_comparison(Some(record.record_city()))
            && norm_state == normalize_for_comparison(Some(record.record_state()))
        {
            return Some(record);
        }
    }

    for record in records {
        if norm_city != normalize_for_comparison(Some(record.record_city()))
            || norm_state != normalize_for_comparison(Some(record.record_state()))
        {
            continue;
        }

        let rec_has_street = !normalize_for_comparison(record.record_street()).is_empty();
        let no_street = norm_street.is_empty() || !rec_has_street;
        let threshold = if no_street {
            FUZZY_NAME_THRESHOLD_NO_STREET
        } else {
            FUZZY_NAME_THRESHOLD
        };

        let rec_name = normalize_for_comparison(Some(record.record_name()));
        if similarity::ratio(&norm_name, &rec_name) >= threshold {
            return Some(record);
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use ice_maker_staging_models::LocationStatus;

    use super::*;

    fn location(name: &str, street: Option<&str>, city: &str, state: &str) -> LocationRow {
        LocationRow {
            rink_id: format!("id-{name}"),
            rink_name: name.to_string(),
            rink_address: street.map(str::to_string),
            rink_city: city.to_string(),
            rink_state: state.to_string(),
            rink_country: "US".to_string(),
            rink_zip: "00000".to_string(),
            rink_url: None,
            rink_phone: None,
            rink_tz: None,
            rink_status: LocationStatus::Active,
            data_source: "test".to_string(),
            date_created: None,
        }
    }

    #[test]
    fn comparison_normalization_strips_and_collapses() {
        assert_eq!(
            normalize_for_comparison(Some("  100  MAIN ST.  ")),
            "100 main st"
        );
        assert_eq!(normalize_for_comparison(Some("Coeur d'Alene")), "coeur dalene");
        assert_eq!(normalize_for_comparison(None), "");
    }

    #[test]
    fn exact_address_wins_over_name_difference() {
        let pool = vec![location(
            "Springfield Ice",
            Some("100 MAIN STREET"),
            "Springfield",
            "IL",
        )];
        let hit = find_address_match(
            &pool,
            "Totally Different Name",
            Some("100 Main Street"),
            Some("Springfield"),
            Some("IL"),
        );
        assert!(hit.is_some());
    }

    #[test]
    fn fuzzy_name_requires_same_locality() {
        let pool = vec![location(
            "Polar Ice Raleigh",
            Some("100 MAIN STREET"),
            "Raleigh",
            "NC",
        )];
        let wrong_city = find_address_match(
            &pool,
            "Polar Ice Raleigh",
            Some("200 OAK AVENUE"),
            Some("Durham"),
            Some("NC"),
        );
        assert!(wrong_city.is_none());
    }

    #[test]
    fn streetless_sides_use_relaxed_threshold() {
        let pool = vec![location("Polar Ice Raleigh", None, "Raleigh", "NC")];
        let hit = find_address_match(
            &pool,
            "Polar Iceplex Raleigh",
            None,
            Some("Raleigh"),
            Some("NC"),
        );
        assert!(hit.is_some());
    }

    #[test]
    fn empty_streets_never_match_layer_one() {
        let pool = vec![location("A Rink", Some(""), "Boston", "MA")];
        let hit = find_address_match(
            &pool,
            "Completely Unrelated",
            Some(""),
            Some("Boston"),
            Some("MA"),
        );
        assert!(hit.is_none());
    }
}
