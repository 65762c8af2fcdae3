//! Street assembly and abbreviation expansion.
//!
//! Applied after tagging: components are joined in a fixed order, scrubbed
//! to bare alphanumerics, expanded per-word against the abbreviation
//! table, and uppercased. The same pipeline runs on every source so that
//! layer-1 dedup can compare streets byte-for-byte.

use std::sync::LazyLock;

use regex::Regex;

use crate::tagger::TaggedAddress;

/// Everything outside `[A-Za-z0-9 ]` is dropped from streets.
static STREET_SCRUB_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^A-Za-z0-9 ]").expect("valid regex"));

/// City cleanup keeps word chars and whitespace.
static CITY_SCRUB_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\w\s]").expect("valid regex"));

/// Street abbreviation table, compared per whitespace-delimited word in
/// uppercase.
const STREET_ABBREVIATIONS: &[(&str, &str)] = &[
    ("APT", "APARTMENT"),
    ("APTS", "APARTMENTS"),
    ("AVE", "AVENUE"),
    ("BLVD", "BOULEVARD"),
    ("BR", "BRIDGE"),
    ("CIR", "CIRCLE"),
    ("CT", "COURT"),
    ("DR", "DRIVE"),
    ("HWY", "HIGHWAY"),
    ("HW", "HIGHWAY"),
    ("LK", "LAKE"),
    ("LN", "LANE"),
    ("RD", "ROAD"),
    ("MT", "MOUNT"),
    ("MTN", "MOUNTAIN"),
    ("PKWY", "PARKWAY"),
    ("PL", "PLACE"),
    ("RTE", "ROUTE"),
    ("SQ", "SQUARE"),
    ("ST", "STREET"),
    ("STE", "SUITE"),
    ("TPKE", "TURNPIKE"),
    ("TR", "TRAIL"),
];

/// Joins the present street components in canonical order with single
/// spaces: number, pre-directional, name, type, post-directional,
/// occupancy.
#[must_use]
pub fn assemble_street(tagged: &TaggedAddress) -> String {
    [
        tagged.address_number.as_deref(),
        tagged.pre_directional.as_deref(),
        tagged.street_name.as_deref(),
        tagged.post_type.as_deref(),
        tagged.post_directional.as_deref(),
        tagged.occupancy.as_deref(),
    ]
    .iter()
    .filter_map(|part| *part)
    .filter(|part| !part.is_empty())
    .collect::<Vec<_>>()
    .join(" ")
    .trim()
    .to_string()
}

/// Drops every character outside `[A-Za-z0-9 ]`.
#[must_use]
pub fn scrub_street(input: &str) -> String {
    STREET_SCRUB_RE.replace_all(input, "").into_owned()
}

/// Strips punctuation from a city name, keeping word chars and spaces.
#[must_use]
pub fn scrub_city(input: &str) -> String {
    CITY_SCRUB_RE.replace_all(input, "").into_owned()
}

/// Uppercases and expands each whitespace-delimited word through the
/// abbreviation table.
#[must_use]
pub fn expand_abbreviations(input: &str) -> String {
    input
        .to_uppercase()
        .split_whitespace()
        .map(|word| {
            STREET_ABBREVIATIONS
                .iter()
                .find(|(abbr, _)| *abbr == word)
                .map_or(word, |(_, full)| *full)
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// The full street pipeline: assemble, scrub, expand, uppercase.
///
/// Returns an empty string when the tagged address has no street
/// components.
#[must_use]
pub fn normalize_street(tagged: &TaggedAddress) -> String {
    let assembled = assemble_street(tagged);
    if assembled.is_empty() {
        return String::new();
    }
    expand_abbreviations(&scrub_street(&assembled))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tagger;

    #[test]
    fn assembles_components_in_order() {
        let tagged = tagger::tag("100 N Main St S, Springfield, IL").unwrap();
        assert_eq!(assemble_street(&tagged), "100 N Main St S");
    }

    #[test]
    fn expands_per_word() {
        assert_eq!(expand_abbreviations("100 main st"), "100 MAIN STREET");
        assert_eq!(
            expand_abbreviations("6119 Landmark Center Blvd"),
            "6119 LANDMARK CENTER BOULEVARD"
        );
    }

    #[test]
    fn expansion_is_whole_word_only() {
        // STreet-like substrings inside words stay put.
        assert_eq!(expand_abbreviations("STAVE RD"), "STAVE ROAD");
    }

    #[test]
    fn both_highway_spellings_expand() {
        assert_eq!(expand_abbreviations("STATE HWY 7"), "STATE HIGHWAY 7");
        assert_eq!(expand_abbreviations("STATE HW 7"), "STATE HIGHWAY 7");
    }

    #[test]
    fn scrub_street_keeps_alphanumerics_only() {
        assert_eq!(scrub_street("St. Mary's Ave #2"), "St Marys Ave 2");
    }

    #[test]
    fn scrub_city_strips_punctuation() {
        assert_eq!(scrub_city("Coeur d'Alene"), "Coeur dAlene");
        assert_eq!(scrub_city("St. Paul"), "St Paul");
    }

    #[test]
    fn normalize_street_is_uppercase() {
        let tagged = tagger::tag("4400 Paradise Rd., Las Vegas, NV").unwrap();
        assert_eq!(normalize_street(&tagged), "4400 PARADISE ROAD");
    }

    #[test]
    fn empty_components_normalize_to_empty() {
        let tagged = TaggedAddress::default();
        assert_eq!(normalize_street(&tagged), "");
    }
}
