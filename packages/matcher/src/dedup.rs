//! Three-layer candidate deduplication.
//!
//! Layer 1 — exact normalized (street, city, state) against the verified
//! pool. Layer 2 — fuzzy name within the same (city, state); when either
//! side has no street the threshold relaxes and unverified candidates
//! join the pool so wiki-vs-wiki duplicates are caught. Layer 3 —
//! haversine proximity of geocoded coordinates against the verified pool.
//!
//! The first matching layer wins; within a layer the first qualifying row
//! (insertion order) wins, which keeps results stable across runs.

use ice_maker_staging_models::{CandidateRow, MatchLayer, VerificationStatus};

use crate::{
    FUZZY_NAME_THRESHOLD, FUZZY_NAME_THRESHOLD_NO_STREET, GEO_PROXIMITY_MILES, geo,
    normalize_for_comparison, similarity,
};

/// Runs the cascaded dedup policy for `candidate` against `others`.
///
/// `others` is every other candidate currently staged (the function
/// applies the pool rules itself); rows equal to `candidate.id` are
/// ignored. Returns the matched row and the layer that matched.
#[must_use]
pub fn find_duplicate<'a>(
    candidate: &CandidateRow,
    others: &'a [CandidateRow],
) -> Option<(&'a CandidateRow, MatchLayer)> {
    let norm_street = normalize_for_comparison(candidate.street.as_deref());
    let norm_city = normalize_for_comparison(candidate.city.as_deref());
    let norm_state = normalize_for_comparison(candidate.state.as_deref());
    let norm_name = normalize_for_comparison(Some(&candidate.name));

    let verified: Vec<&CandidateRow> = others
        .iter()
        .filter(|o| o.id != candidate.id && o.verification_status.is_verified())
        .collect();

    // Layer 1: street + city + state exact match.
    if !norm_street.is_empty() {
        for other in &verified {
            let other_street = normalize_for_comparison(other.street.as_deref());
            if !other_street.is_empty()
                && norm_street == other_street
                && norm_city == normalize_for_comparison(other.city.as_deref())
                && norm_state == normalize_for_comparison(other.state.as_deref())
            {
                log::info!(
                    "Layer 1 match: '{}' == '{}' at {:?}, {:?}",
                    candidate.name,
                    other.name,
                    other.city,
                    other.state
                );
                return Some((other, MatchLayer::AddressExact));
            }
        }
    }

    // Layer 2: fuzzy name within the same city + state.
    let candidate_has_street = !norm_street.is_empty();

    let layer2_pool: Vec<&CandidateRow> = if candidate_has_street {
        verified.clone()
    } else {
        others
            .iter()
            .filter(|o| {
                o.id != candidate.id
                    && (o.verification_status.is_verified()
                        || o.verification_status == VerificationStatus::Unverified)
            })
            .collect()
    };

    for other in &layer2_pool {
        if norm_city != normalize_for_comparison(other.city.as_deref())
            || norm_state != normalize_for_comparison(other.state.as_deref())
        {
            continue;
        }

        let other_has_street = !normalize_for_comparison(other.street.as_deref()).is_empty();
        let no_street = !candidate_has_street || !other_has_street;
        let threshold = if no_street {
            FUZZY_NAME_THRESHOLD_NO_STREET
        } else {
            FUZZY_NAME_THRESHOLD
        };

        let other_name = normalize_for_comparison(Some(&other.name));
        let ratio = similarity::ratio(&norm_name, &other_name);

        if ratio >= threshold {
            log::info!(
                "Layer 2 match ({ratio:.2}, thr={threshold:.2}): '{}' ~ '{}' in {:?}, {:?}",
                candidate.name,
                other.name,
                other.city,
                other.state
            );
            return Some((other, MatchLayer::FuzzyName));
        }
    }

    // Layer 3: geographic proximity.
    if let (Some(lat), Some(lon)) = (candidate.geo_lat, candidate.geo_lon) {
        for other in &verified {
            let (Some(other_lat), Some(other_lon)) = (other.geo_lat, other.geo_lon) else {
                continue;
            };

            let dist = geo::haversine_miles(lat, lon, other_lat, other_lon);
            if dist <= GEO_PROXIMITY_MILES {
                log::info!(
                    "Layer 3 match ({dist:.2} mi): '{}' near '{}'",
                    candidate.name,
                    other.name
                );
                return Some((other, MatchLayer::GeoProximity));
            }
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(id: i32, name: &str, street: Option<&str>, city: &str, state: &str) -> CandidateRow {
        CandidateRow {
            id,
            raw_entry_id: id,
            name: name.to_string(),
            street: street.map(str::to_string),
            city: Some(city.to_string()),
            state: Some(state.to_string()),
            zip: None,
            country: Some("US".to_string()),
            geo_lat: None,
            geo_lon: None,
            geo_confidence: None,
            geo_matched_name: None,
            verification_status: VerificationStatus::GeocodeMatch,
            location_id: None,
        }
    }

    #[test]
    fn layer_one_exact_address() {
        let existing = vec![candidate(
            1,
            "Polar Ice Raleigh",
            Some("100 MAIN STREET"),
            "Raleigh",
            "NC",
        )];
        let mut new = candidate(2, "Polar Iceplex", Some("100 MAIN STREET"), "Raleigh", "NC");
        new.verification_status = VerificationStatus::Unverified;

        let (hit, layer) = find_duplicate(&new, &existing).unwrap();
        assert_eq!(hit.id, 1);
        assert_eq!(layer, MatchLayer::AddressExact);
    }

    #[test]
    fn layer_one_requires_verified_pool() {
        let mut other = candidate(1, "A", Some("100 MAIN STREET"), "Raleigh", "NC");
        other.verification_status = VerificationStatus::GeocodeMismatch;
        let new = candidate(2, "B", Some("100 MAIN STREET"), "Raleigh", "NC");

        assert!(find_duplicate(&new, &[other]).is_none());
    }

    #[test]
    fn layer_two_streetless_relaxed_threshold() {
        let mut existing = candidate(1, "Polar Ice Raleigh", None, "Raleigh", "NC");
        existing.verification_status = VerificationStatus::Unverified;
        let mut new = candidate(2, "Polar Iceplex Raleigh", None, "Raleigh", "NC");
        new.verification_status = VerificationStatus::Unverified;

        let (hit, layer) = find_duplicate(&new, &[existing]).unwrap();
        assert_eq!(hit.id, 1);
        assert_eq!(layer, MatchLayer::FuzzyName);
    }

    #[test]
    fn layer_two_unverified_pool_needs_a_streetless_side() {
        // With a street on the new side, unverified rows stay out of the
        // pool entirely.
        let mut existing = candidate(1, "Polar Ice Raleigh", None, "Raleigh", "NC");
        existing.verification_status = VerificationStatus::Unverified;
        let new = candidate(2, "Polar Ice Raleigh", Some("100 MAIN STREET"), "Raleigh", "NC");

        assert!(find_duplicate(&new, &[existing]).is_none());
    }

    #[test]
    fn layer_two_scoped_to_locality() {
        let existing = vec![candidate(
            1,
            "Polar Ice Raleigh",
            Some("100 MAIN STREET"),
            "Raleigh",
            "NC",
        )];
        let new = candidate(
            2,
            "Polar Ice Raleigh",
            Some("999 ELM STREET"),
            "Durham",
            "NC",
        );
        assert!(find_duplicate(&new, &existing).is_none());
    }

    #[test]
    fn layer_three_proximity() {
        let mut existing = candidate(1, "North Rink", Some("1 A STREET"), "Chicago", "IL");
        existing.geo_lat = Some(41.8827);
        existing.geo_lon = Some(-87.6278);

        let mut new = candidate(2, "Completely Different", Some("2 B STREET"), "Chicago", "IL");
        new.geo_lat = Some(41.8830);
        new.geo_lon = Some(-87.6280);
        new.verification_status = VerificationStatus::Unverified;

        let (hit, layer) = find_duplicate(&new, &[existing]).unwrap();
        assert_eq!(hit.id, 1);
        assert_eq!(layer, MatchLayer::GeoProximity);
    }

    #[test]
    fn no_coordinates_skips_layer_three() {
        let mut existing = candidate(1, "North Rink", Some("1 A STREET"), "Chicago", "IL");
        existing.geo_lat = Some(41.8827);
        existing.geo_lon = Some(-87.6278);

        let new = candidate(2, "South Rink", Some("2 B STREET"), "Chicago", "IL");
        assert!(find_duplicate(&new, &[existing]).is_none());
    }

    #[test]
    fn self_is_never_a_match() {
        let me = candidate(7, "Solo Rink", Some("1 LONELY ROAD"), "Fargo", "ND");
        assert!(find_duplicate(&me, std::slice::from_ref(&me)).is_none());
    }
}
