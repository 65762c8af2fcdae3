//! Comma-aware US address segmenter.
//!
//! Produces the labeled components the street assembler consumes:
//! `AddressNumber`, `StreetNamePreDirectional`, `StreetName`,
//! `StreetNamePostType`, `StreetNamePostDirectional`,
//! `OccupancyIdentifier`, `PlaceName`, `StateName`.
//!
//! Scraped addresses are comma-delimited (`street, city, state [zip]`), so
//! segmentation runs on comma boundaries first and token rules second. An
//! address that would assign the same label twice (two cities, a second
//! house number after the street type) is reported as a repeated-label
//! failure rather than guessed at.

use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

/// 5-digit zip, optionally zip+4, as a whole token.
static ZIP_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{5}(?:-\d{4})?$").expect("valid regex"));

/// Compass directionals accepted before or after the street name.
const DIRECTIONALS: &[&str] = &[
    "N", "S", "E", "W", "NE", "NW", "SE", "SW", "NORTH", "SOUTH", "EAST", "WEST", "NORTHEAST",
    "NORTHWEST", "SOUTHEAST", "SOUTHWEST",
];

/// Street-type tokens that close out a street name. Both abbreviated and
/// spelled-out forms appear in scraped data.
const STREET_TYPES: &[&str] = &[
    "ST", "STREET", "AVE", "AVENUE", "BLVD", "BOULEVARD", "RD", "ROAD", "DR", "DRIVE", "HWY",
    "HW", "HIGHWAY", "PKWY", "PARKWAY", "LN", "LANE", "CT", "COURT", "CIR", "CIRCLE", "PL",
    "PLACE", "SQ", "SQUARE", "TPKE", "TURNPIKE", "TR", "TRAIL", "RTE", "ROUTE", "BR", "BRIDGE",
    "WAY", "TER", "TERRACE", "PIKE", "LOOP", "ALY", "ALLEY", "PLZ", "PLAZA", "XING", "CROSSING",
];

/// Leading tokens that mark an occupancy segment (`Suite 210`, `Unit B`).
const OCCUPANCY_MARKERS: &[&str] = &["STE", "SUITE", "APT", "APARTMENT", "UNIT", "BLDG", "FL", "RM"];

/// The labeled components of a tagged address.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaggedAddress {
    /// House number.
    pub address_number: Option<String>,
    /// Directional before the street name (`N`, `West`).
    pub pre_directional: Option<String>,
    /// The street name proper.
    pub street_name: Option<String>,
    /// Street type (`St`, `Blvd`).
    pub post_type: Option<String>,
    /// Directional after the street type.
    pub post_directional: Option<String>,
    /// Occupancy detail (`Suite 210`, `#4`).
    pub occupancy: Option<String>,
    /// City.
    pub place_name: Option<String>,
    /// State, as written (full name or code).
    pub state_name: Option<String>,
}

/// Tagging failures. These are terminal for an entry: the raw row is
/// marked failed and a rejection records the message.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TagError {
    /// The address would assign one label twice.
    #[error("repeated label: {0}")]
    RepeatedLabel(&'static str),

    /// Nothing to tag.
    #[error("empty address")]
    Empty,
}

fn is_directional(token: &str) -> bool {
    let upper = token.trim_end_matches('.').to_uppercase();
    DIRECTIONALS.contains(&upper.as_str())
}

fn is_street_type(token: &str) -> bool {
    let upper = token.trim_end_matches('.').to_uppercase();
    STREET_TYPES.contains(&upper.as_str())
}

fn is_house_number(token: &str) -> bool {
    !token.is_empty() && token.chars().all(|c| c.is_ascii_digit())
}

fn is_occupancy_segment(segment: &str) -> bool {
    if segment.starts_with('#') {
        return true;
    }
    segment
        .split_whitespace()
        .next()
        .is_some_and(|first| {
            let upper = first.trim_end_matches('.').to_uppercase();
            OCCUPANCY_MARKERS.contains(&upper.as_str())
        })
}

/// Whether a lone trailing segment reads as a state zone rather than a
/// city: a bare USPS code, a known state name, or either followed by a zip.
fn looks_like_state_zone(segment: &str) -> bool {
    let without_zip = strip_trailing_zip(segment);
    if without_zip.is_empty() {
        return false;
    }
    crate::states::is_state_code(&without_zip)
        || crate::states::code_for_name(&without_zip).is_some()
}

fn strip_trailing_zip(segment: &str) -> String {
    let mut tokens: Vec<&str> = segment.split_whitespace().collect();
    if let Some(last) = tokens.last()
        && ZIP_RE.is_match(last)
    {
        tokens.pop();
    }
    tokens.join(" ")
}

/// Tags a free-text US address into labeled components.
///
/// # Errors
///
/// Returns [`TagError::Empty`] for blank input and
/// [`TagError::RepeatedLabel`] when segmentation would assign the same
/// label twice.
pub fn tag(address: &str) -> Result<TaggedAddress, TagError> {
    let segments: Vec<&str> = address
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();

    if segments.is_empty() {
        return Err(TagError::Empty);
    }

    let mut tagged = TaggedAddress::default();

    match segments.len() {
        1 => {
            tag_street_zone(segments[0], &mut tagged)?;
        }
        2 => {
            tag_street_zone(segments[0], &mut tagged)?;
            if looks_like_state_zone(segments[1]) {
                tag_state_zone(segments[1], &mut tagged);
            } else {
                tagged.place_name = Some(segments[1].to_string());
            }
        }
        _ => {
            tag_street_zone(segments[0], &mut tagged)?;
            tag_state_zone(segments[segments.len() - 1], &mut tagged);

            for middle in &segments[1..segments.len() - 1] {
                if is_occupancy_segment(middle) {
                    if tagged.occupancy.is_some() {
                        return Err(TagError::RepeatedLabel("OccupancyIdentifier"));
                    }
                    tagged.occupancy = Some((*middle).to_string());
                } else {
                    if tagged.place_name.is_some() {
                        return Err(TagError::RepeatedLabel("PlaceName"));
                    }
                    tagged.place_name = Some((*middle).to_string());
                }
            }
        }
    }

    Ok(tagged)
}

/// Tags the final comma segment: optional trailing zip, remainder is the
/// state as written.
fn tag_state_zone(segment: &str, tagged: &mut TaggedAddress) {
    let state = strip_trailing_zip(segment);
    if !state.is_empty() {
        tagged.state_name = Some(state);
    }
}

/// Tags the leading comma segment into number / directionals / name /
/// type / occupancy.
fn tag_street_zone(segment: &str, tagged: &mut TaggedAddress) -> Result<(), TagError> {
    let tokens: Vec<&str> = segment.split_whitespace().collect();
    if tokens.is_empty() {
        return Err(TagError::Empty);
    }

    let mut i = 0;

    if is_house_number(tokens[i]) {
        tagged.address_number = Some(tokens[i].to_string());
        i += 1;
    }

    if i < tokens.len() && i + 1 < tokens.len() && is_directional(tokens[i]) {
        tagged.pre_directional = Some(tokens[i].to_string());
        i += 1;
    }

    // The street name runs up to the *last* street-type token; anything
    // between two street types would belong to a second address.
    let type_index = tokens
        .iter()
        .enumerate()
        .skip(i)
        .rev()
        .find(|(_, t)| is_street_type(t))
        .map(|(idx, _)| idx);

    match type_index {
        Some(idx) if idx > i => {
            // A house number after an earlier street type means the zone
            // holds two addresses ("100 Main St 200 Oak Ave").
            let mut seen_type = false;
            for token in &tokens[i..idx] {
                if is_street_type(token) {
                    seen_type = true;
                } else if seen_type && is_house_number(token) {
                    return Err(TagError::RepeatedLabel("AddressNumber"));
                }
            }

            tagged.street_name = Some(tokens[i..idx].join(" "));
            tagged.post_type = Some(tokens[idx].to_string());

            let mut rest = idx + 1;
            if rest < tokens.len() && is_directional(tokens[rest]) {
                tagged.post_directional = Some(tokens[rest].to_string());
                rest += 1;
            }

            let leftover = &tokens[rest..];
            if leftover
                .iter()
                .any(|t| is_house_number(t))
                && leftover.iter().any(|t| is_street_type(t))
            {
                return Err(TagError::RepeatedLabel("AddressNumber"));
            }

            if !leftover.is_empty() {
                if tagged.occupancy.is_some() {
                    return Err(TagError::RepeatedLabel("OccupancyIdentifier"));
                }
                tagged.occupancy = Some(leftover.join(" "));
            }
        }
        _ => {
            // No street type (or it would leave the name empty): the rest
            // of the zone is the street name.
            if i < tokens.len() {
                tagged.street_name = Some(tokens[i..].join(" "));
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_simple_address() {
        let t = tag("100 Main St, Springfield, IL").unwrap();
        assert_eq!(t.address_number.as_deref(), Some("100"));
        assert_eq!(t.street_name.as_deref(), Some("Main"));
        assert_eq!(t.post_type.as_deref(), Some("St"));
        assert_eq!(t.place_name.as_deref(), Some("Springfield"));
        assert_eq!(t.state_name.as_deref(), Some("IL"));
    }

    #[test]
    fn tags_directionals() {
        let t = tag("1234 W 5th Ave S, Seattle, WA").unwrap();
        assert_eq!(t.pre_directional.as_deref(), Some("W"));
        assert_eq!(t.street_name.as_deref(), Some("5th"));
        assert_eq!(t.post_type.as_deref(), Some("Ave"));
        assert_eq!(t.post_directional.as_deref(), Some("S"));
    }

    #[test]
    fn drops_trailing_zip_from_state_zone() {
        let t = tag("6119 Landmark Center Blvd, Greensboro, NC 27407").unwrap();
        assert_eq!(t.state_name.as_deref(), Some("NC"));
        assert_eq!(t.street_name.as_deref(), Some("Landmark Center"));
        assert_eq!(t.post_type.as_deref(), Some("Blvd"));
    }

    #[test]
    fn full_state_name_survives_as_written() {
        let t = tag("100 Main St, Minneapolis, Minnesota").unwrap();
        assert_eq!(t.state_name.as_deref(), Some("Minnesota"));
    }

    #[test]
    fn occupancy_segment_between_street_and_city() {
        let t = tag("200 Oak Ave, Suite 210, Denver, CO").unwrap();
        assert_eq!(t.occupancy.as_deref(), Some("Suite 210"));
        assert_eq!(t.place_name.as_deref(), Some("Denver"));
    }

    #[test]
    fn two_cities_is_a_repeated_label() {
        let err = tag("100 Main St, Springfield, Greenville, IL").unwrap_err();
        assert_eq!(err, TagError::RepeatedLabel("PlaceName"));
    }

    #[test]
    fn two_street_addresses_is_a_repeated_label() {
        let err = tag("100 Main St 200 Oak Ave, Springfield, IL").unwrap_err();
        assert_eq!(err, TagError::RepeatedLabel("AddressNumber"));
    }

    #[test]
    fn empty_input_is_an_error() {
        assert_eq!(tag("   "), Err(TagError::Empty));
        assert_eq!(tag(", ,"), Err(TagError::Empty));
    }

    #[test]
    fn two_segments_with_state_zone() {
        let t = tag("100 Main St, IL").unwrap();
        assert_eq!(t.state_name.as_deref(), Some("IL"));
        assert_eq!(t.place_name, None);
    }

    #[test]
    fn two_segments_with_city() {
        let t = tag("100 Main St, Springfield").unwrap();
        assert_eq!(t.place_name.as_deref(), Some("Springfield"));
        assert_eq!(t.state_name, None);
    }

    #[test]
    fn street_without_type_keeps_full_name() {
        let t = tag("400 Broadway, Albany, NY").unwrap();
        assert_eq!(t.street_name.as_deref(), Some("Broadway"));
        assert_eq!(t.post_type, None);
    }

    #[test]
    fn type_token_in_first_position_is_a_name() {
        // "St Clair" style names: the type can't be the whole street.
        let t = tag("Court House Rd, Arlington, VA").unwrap();
        assert_eq!(t.street_name.as_deref(), Some("Court House"));
        assert_eq!(t.post_type.as_deref(), Some("Rd"));
    }
}
