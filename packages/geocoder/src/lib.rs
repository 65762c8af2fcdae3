#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Rate-limited address verification against Nominatim / OpenStreetMap.
//!
//! The public instance allows **1 request per second**; the limiter lives
//! on the long-lived [`Geocoder`] value and paces every outbound call.
//! Confidence scoring compares address components only — rink brand names
//! rarely appear in the geocoder index, and that's fine: the address is
//! what verification needs.
//!
//! Transport errors, non-2xx responses, and malformed bodies all collapse
//! to "no result" (logged at warn); the next pipeline run retries the
//! entry.

pub mod clock;
pub mod nominatim;
pub mod scoring;

use ice_maker_staging_models::{CandidateRow, VerificationStatus};
use thiserror::Error;

use crate::clock::Clock;
use crate::nominatim::Geocoder;

/// Minimum address-match confidence for `geocode_match`.
pub const CONFIDENCE_THRESHOLD: f64 = 0.7;

/// Errors from geocoding operations. Callers treat every variant as a
/// miss; the distinction exists for logging.
#[derive(Debug, Error)]
pub enum GeocodeError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Response parsing failed.
    #[error("Parse error: {message}")]
    Parse {
        /// Description of the parsing failure.
        message: String,
    },
}

/// Structured address components returned alongside a hit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddressDetail {
    /// Street name of the matched feature.
    pub road: Option<String>,
    /// City, if the feature resolved to one.
    pub city: Option<String>,
    /// Town, for smaller municipalities.
    pub town: Option<String>,
    /// Village, for the smallest.
    pub village: Option<String>,
    /// Full state name.
    pub state: Option<String>,
    /// ISO 3166-2 subdivision code (e.g., `US-IL`).
    pub iso_subdivision: Option<String>,
    /// Postal code.
    pub postcode: Option<String>,
}

impl AddressDetail {
    /// The locality at whatever granularity the geocoder resolved:
    /// city, then town, then village.
    #[must_use]
    pub fn locality(&self) -> Option<&str> {
        self.city
            .as_deref()
            .or(self.town.as_deref())
            .or(self.village.as_deref())
    }
}

/// A single geocoding hit.
#[derive(Debug, Clone, PartialEq)]
pub struct GeocodeHit {
    /// Latitude (WGS84).
    pub latitude: f64,
    /// Longitude (WGS84).
    pub longitude: f64,
    /// Canonical display name of the matched feature.
    pub display_name: String,
    /// Structured address components.
    pub address: AddressDetail,
}

/// Geocodes a candidate and applies the result to its fields in place.
///
/// Sets coordinates, matched display name, postcode-derived zip, and
/// confidence, then transitions the verification status:
/// `geocode_match` at or above [`CONFIDENCE_THRESHOLD`],
/// `geocode_mismatch` below it, `geocode_failed` when the lookup
/// produced nothing. The caller persists the updated row.
pub async fn geocode_candidate<C: Clock>(
    geocoder: &Geocoder<C>,
    candidate: &mut CandidateRow,
) -> VerificationStatus {
    let result = geocoder
        .lookup(
            candidate.street.as_deref().unwrap_or(""),
            candidate.city.as_deref().unwrap_or(""),
            candidate.state.as_deref().unwrap_or(""),
            "US",
        )
        .await;

    let Some(hit) = result else {
        candidate.verification_status = VerificationStatus::GeocodeFailed;
        return VerificationStatus::GeocodeFailed;
    };

    candidate.geo_lat = Some(hit.latitude);
    candidate.geo_lon = Some(hit.longitude);
    candidate.geo_matched_name = Some(hit.display_name.clone());

    if let Some(postcode) = &hit.address.postcode {
        candidate.zip = Some(postcode.clone());
    }

    let confidence = scoring::score_address(
        candidate.street.as_deref(),
        candidate.city.as_deref(),
        candidate.state.as_deref(),
        &hit.address,
    );
    candidate.geo_confidence = Some(confidence);

    let status = if confidence >= CONFIDENCE_THRESHOLD {
        VerificationStatus::GeocodeMatch
    } else {
        VerificationStatus::GeocodeMismatch
    };
    candidate.verification_status = status;
    status
}
