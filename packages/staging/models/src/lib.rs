#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Staging store row types and status enums.
//!
//! These types mirror the shapes of data as stored in the staging tables.
//! Every persisted status is a string-backed enum so the database value is
//! the single source of truth for its spelling.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Parse lifecycle of a raw scraped entry.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ParseStatus {
    /// Scraped but not yet parsed.
    Pending,
    /// Successfully parsed into a candidate.
    Parsed,
    /// Address parsing failed; a rejection row records why.
    Failed,
}

/// Verification lifecycle of a candidate.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum VerificationStatus {
    /// Parsed but not yet checked against anything.
    Unverified,
    /// Geocoder confirmed the address with sufficient confidence.
    GeocodeMatch,
    /// Geocoder returned a result that did not match the parsed address.
    GeocodeMismatch,
    /// Geocoder call failed or returned no results.
    GeocodeFailed,
    /// The source itself supplied coordinates and a zip code.
    SourceVerified,
    /// Matched an existing candidate during dedup.
    Duplicate,
    /// Manually approved by a curator.
    HumanApproved,
}

impl VerificationStatus {
    /// Statuses whose candidates are eligible dedup/promotion match targets.
    pub const VERIFIED_POOL: &[Self] = &[
        Self::GeocodeMatch,
        Self::HumanApproved,
        Self::SourceVerified,
    ];

    /// Whether this status places a candidate in the verified pool.
    #[must_use]
    pub fn is_verified(self) -> bool {
        Self::VERIFIED_POOL.contains(&self)
    }
}

/// Why a raw entry was not promoted.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RejectionReason {
    /// The address tagger failed or produced empty required fields.
    ParseFailure,
    /// Layer-1 dedup hit: same normalized street, city, and state.
    DuplicateAddressExact,
    /// Layer-2/3 dedup hit: fuzzy name or geographic proximity.
    SuspectedDuplicate,
    /// Geocoder result scored below the confidence threshold.
    GeocodeMismatch,
}

/// Lifecycle status of a promoted location.
///
/// Locations are never deleted; `disabled` retires an identifier while
/// keeping it stable for downstream references.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum LocationStatus {
    /// Operating rink, visible to promoter matching.
    Active,
    /// Permanently closed.
    ClosedPermanently,
    /// Open part of the year (outdoor rinks).
    Seasonal,
    /// Folded into another location; at least one alias points here.
    Merged,
    /// Retired identifier.
    Disabled,
}

/// Which dedup layer produced a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum MatchLayer {
    /// Exact normalized (street, city, state) equality.
    AddressExact,
    /// Fuzzy name similarity within the same city and state.
    FuzzyName,
    /// Haversine proximity between geocoded coordinates.
    GeoProximity,
}

/// A row in the `sources` registry table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceRow {
    /// Primary key.
    pub id: i32,
    /// Unique source name (e.g., `"sk8stuff"`).
    pub name: String,
    /// Module path of the fetcher that scrapes this source.
    pub fetcher_module: String,
    /// Optional module path of a legacy formatter.
    pub formatter_module: Option<String>,
    /// Whether the runner will process this source.
    pub enabled: bool,
    /// When the source last ran.
    pub last_run_at: Option<DateTime<Utc>>,
    /// Outcome of the last run: `success`, `partial`, or `failed`.
    pub last_run_status: Option<String>,
    /// How many entries the last run scraped.
    pub last_run_entry_count: Option<i32>,
    /// Relative reliability weight (skatetrax ice-time evidence is 2.0).
    pub confidence_weight: f64,
    /// Free-text operator notes.
    pub notes: Option<String>,
    /// When the source row was created.
    pub created_at: Option<DateTime<Utc>>,
}

/// An immutable capture of one scraped row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawEntryRow {
    /// Primary key.
    pub id: i32,
    /// Source that produced this entry.
    pub source_id: i32,
    /// Name exactly as scraped.
    pub raw_name: String,
    /// Address exactly as scraped.
    pub raw_address: String,
    /// Deterministic content hash; unique across the table.
    pub raw_fingerprint: String,
    /// When the row was scraped.
    pub scrape_date: Option<DateTime<Utc>>,
    /// Parse lifecycle state.
    pub parse_status: ParseStatus,
}

/// A parsed, normalized entry awaiting verification and promotion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateRow {
    /// Primary key.
    pub id: i32,
    /// The raw entry this candidate was parsed from.
    pub raw_entry_id: i32,
    /// Title-cased rink name.
    pub name: String,
    /// Uppercase normalized street, absent for wiki entries.
    pub street: Option<String>,
    /// Title-cased city.
    pub city: Option<String>,
    /// Two-letter state code.
    pub state: Option<String>,
    /// Zip code, from the source or the geocoder.
    pub zip: Option<String>,
    /// Two-letter country code.
    pub country: Option<String>,
    /// Geocoded latitude.
    pub geo_lat: Option<f64>,
    /// Geocoded longitude.
    pub geo_lon: Option<f64>,
    /// Address-match confidence from the geocoder, 0.0–1.0.
    pub geo_confidence: Option<f64>,
    /// Display name the geocoder matched.
    pub geo_matched_name: Option<String>,
    /// Verification lifecycle state.
    pub verification_status: VerificationStatus,
    /// Promoted location, once linked. A candidate with a location is
    /// resolved and is never re-geocoded.
    pub location_id: Option<String>,
}

/// A record of why a raw entry was not promoted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectedEntryRow {
    /// Primary key.
    pub id: i32,
    /// The raw entry that was rejected.
    pub raw_entry_id: i32,
    /// Why it was rejected.
    pub rejection_reason: RejectionReason,
    /// Free-text detail (parse error, or `Matches candidate <id>: <name>`).
    pub raw_parse_error: Option<String>,
    /// Whether a human has reviewed this rejection.
    pub reviewed: bool,
}

/// A canonical promoted rink record.
///
/// Column names mirror the Skatetrax `locations` schema so pushed rows are
/// column-compatible, and the 36-char string key works on both embedded and
/// server databases.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationRow {
    /// 36-char UUID primary key.
    pub rink_id: String,
    /// Current display name.
    pub rink_name: String,
    /// Street address.
    pub rink_address: Option<String>,
    /// City.
    pub rink_city: String,
    /// Two-letter state code.
    pub rink_state: String,
    /// Two-letter country code.
    pub rink_country: String,
    /// Zip code.
    pub rink_zip: String,
    /// Rink website.
    pub rink_url: Option<String>,
    /// Contact phone number.
    pub rink_phone: Option<String>,
    /// IANA timezone name.
    pub rink_tz: Option<String>,
    /// Lifecycle status.
    pub rink_status: LocationStatus,
    /// Label of the source that first produced this location.
    pub data_source: String,
    /// When the location was created.
    pub date_created: Option<DateTime<Utc>>,
}

/// Junction row recording that a source corroborates a location.
///
/// At most one row exists per (location, source) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationSourceRow {
    /// Primary key.
    pub id: i32,
    /// The corroborated location.
    pub location_id: String,
    /// The corroborating source.
    pub source_id: i32,
    /// The candidate that established the link, if any.
    pub candidate_id: Option<i32>,
    /// First time this source observed the location.
    pub first_seen_at: Option<DateTime<Utc>>,
    /// Most recent time this source observed the location.
    pub last_seen_at: Option<DateTime<Utc>>,
    /// Whether the source still lists the location.
    pub is_present: bool,
}

/// A prior or alternate name for a location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationAliasRow {
    /// Primary key.
    pub id: i32,
    /// The location this name resolves to.
    pub location_id: String,
    /// The historical or alternate name.
    pub alias_name: String,
    /// When the name took effect, if known.
    pub effective_from: Option<DateTime<Utc>>,
    /// When the name stopped being current, if known.
    pub effective_until: Option<DateTime<Utc>>,
    /// Free-text note (e.g., `Renamed to <name>`).
    pub notes: Option<String>,
}

#[cfg(test)]
mod tests {
    use std::str::FromStr as _;

    use super::*;

    #[test]
    fn verification_status_round_trips_as_snake_case() {
        assert_eq!(VerificationStatus::GeocodeMatch.as_ref(), "geocode_match");
        assert_eq!(
            VerificationStatus::from_str("source_verified").unwrap(),
            VerificationStatus::SourceVerified
        );
    }

    #[test]
    fn verified_pool_excludes_unverified_and_duplicate() {
        assert!(VerificationStatus::GeocodeMatch.is_verified());
        assert!(VerificationStatus::HumanApproved.is_verified());
        assert!(VerificationStatus::SourceVerified.is_verified());
        assert!(!VerificationStatus::Unverified.is_verified());
        assert!(!VerificationStatus::Duplicate.is_verified());
        assert!(!VerificationStatus::GeocodeMismatch.is_verified());
    }

    #[test]
    fn location_status_spellings_match_database_values() {
        assert_eq!(
            LocationStatus::ClosedPermanently.to_string(),
            "closed_permanently"
        );
        assert_eq!(
            LocationStatus::from_str("merged").unwrap(),
            LocationStatus::Merged
        );
    }

    #[test]
    fn match_layer_labels() {
        assert_eq!(MatchLayer::AddressExact.as_ref(), "address_exact");
        assert_eq!(MatchLayer::FuzzyName.as_ref(), "fuzzy_name");
        assert_eq!(MatchLayer::GeoProximity.as_ref(), "geo_proximity");
    }
}
