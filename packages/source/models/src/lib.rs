#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! The uniform record every rink source produces.
//!
//! Each fetcher emits `{name, address, extras}`; `extras` is a typed sum
//! of the per-source shapes so the runner can dispatch on the variant
//! instead of inspecting source names or loosely-typed maps.

use serde::{Deserialize, Serialize};

/// One scraped rink row, before fingerprinting and parsing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchResult {
    /// Rink name exactly as the source shows it.
    pub name: String,
    /// Free-text address. Street-less sources compose `"{city}, {state}"`.
    pub address: String,
    /// Source-specific sidecar data.
    pub extras: FetchExtras,
}

impl FetchResult {
    /// A plain `{name, address}` record with no sidecar data.
    #[must_use]
    pub fn plain(name: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            address: address.into(),
            extras: FetchExtras::None,
        }
    }
}

/// Per-source sidecar data carried alongside the raw name/address.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FetchExtras {
    /// Nothing beyond name and address.
    #[default]
    None,
    /// Facility-finder sources provide geodata directly.
    Facility(FacilityExtras),
    /// Wiki rows carry structured locality columns but no street.
    Wiki(WikiExtras),
}

/// Extra fields from the learn-to-skate facility finder.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FacilityExtras {
    /// 5-digit zip code.
    pub zip: String,
    /// Facility latitude, when the API returned one.
    pub lat: Option<f64>,
    /// Facility longitude, when the API returned one.
    pub lng: Option<f64>,
}

/// Extra fields from the community wiki's rink tables.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct WikiExtras {
    /// City / municipality column.
    pub city: String,
    /// State section the row appeared under (full name).
    pub state: String,
    /// County / borough / parish column.
    pub county: String,
    /// Affiliated figure skating club(s).
    pub club: String,
    /// Free-text notes column.
    pub notes: String,
    /// Rink website, when the name cell linked out.
    pub website: Option<String>,
    /// Whether the row sat in a "Defunct Rinks" section.
    pub is_defunct: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_results_have_no_extras() {
        let result = FetchResult::plain("Rink", "100 Main St, Springfield, IL");
        assert_eq!(result.extras, FetchExtras::None);
    }

    #[test]
    fn extras_serialize_with_kind_tag() {
        let extras = FetchExtras::Facility(FacilityExtras {
            zip: "62701".to_string(),
            lat: Some(39.8),
            lng: Some(-89.6),
        });
        let json = serde_json::to_value(&extras).unwrap();
        assert_eq!(json["kind"], "facility");
        assert_eq!(json["zip"], "62701");
    }
}
