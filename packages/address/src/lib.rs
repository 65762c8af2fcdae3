#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Deterministic normalization of free-text rink names and US addresses.
//!
//! Turns heterogeneous scraped `(name, address)` pairs into the common
//! shape the rest of the pipeline works with: title-cased name, uppercase
//! street with expanded abbreviations, title-cased city, and a 2-letter
//! state code. The same input always produces the same output; there is no
//! network or model involvement anywhere in this crate.

pub mod normalize;
pub mod states;
pub mod tagger;
pub mod text;

use thiserror::Error;

use crate::tagger::TagError;

/// A normalized `(name, street, city, state)` tuple ready for staging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedEntry {
    /// Title-cased rink name.
    pub name: String,
    /// Uppercase street address; `None` for street-less (wiki) entries.
    pub street: Option<String>,
    /// Title-cased city, possibly empty.
    pub city: String,
    /// 2-letter state code, possibly empty.
    pub state: String,
}

/// Errors from entry normalization. The message is persisted verbatim on
/// the rejection row.
#[derive(Debug, Error)]
pub enum NormalizeError {
    /// The address tagger failed.
    #[error("{0}")]
    Tag(#[from] TagError),

    /// A required output field came out empty.
    #[error("Missing required fields: name={name:?}, street={street:?}")]
    MissingFields {
        /// The name after cleanup.
        name: String,
        /// The assembled street, if any.
        street: String,
    },

    /// A street-less entry had neither city nor state.
    #[error("Missing city and state for {name:?}")]
    MissingLocality {
        /// The name after cleanup.
        name: String,
    },
}

/// Normalizes a scraped entry with a full street address.
///
/// Pipeline: name cleanup (mojibake repair, `Rec Ctr` expansion,
/// title-casing), address tagging, street assembly with abbreviation
/// expansion, city punctuation scrub, state code mapping.
///
/// # Errors
///
/// Returns [`NormalizeError`] when the tagger reports repeated labels or
/// cannot segment the address, or when the produced name or street is
/// empty.
pub fn normalize_entry(
    raw_name: &str,
    raw_address: &str,
) -> Result<NormalizedEntry, NormalizeError> {
    let name = text::clean_name(raw_name);

    let tagged = tagger::tag(raw_address)?;
    let street = normalize::normalize_street(&tagged);

    if name.is_empty() || street.is_empty() {
        return Err(NormalizeError::MissingFields {
            name,
            street,
        });
    }

    let city = tagged
        .place_name
        .as_deref()
        .map(|c| text::title_case(&normalize::scrub_city(c)))
        .unwrap_or_default();

    let state = tagged
        .state_name
        .as_deref()
        .map(states::to_state_code)
        .unwrap_or_default();

    Ok(NormalizedEntry {
        name: text::title_case(&name),
        street: Some(street),
        city,
        state,
    })
}

/// Normalizes a street-less entry whose city/state were pre-extracted by
/// the source (the wiki table structure carries them directly).
///
/// # Errors
///
/// Returns [`NormalizeError`] when the cleaned name is empty or both city
/// and state are empty.
pub fn normalize_wiki_entry(
    raw_name: &str,
    city: &str,
    state: &str,
) -> Result<NormalizedEntry, NormalizeError> {
    let name = text::clean_name(raw_name);
    if name.is_empty() {
        return Err(NormalizeError::MissingFields {
            name,
            street: String::new(),
        });
    }

    let city = city.trim();
    let state = states::to_state_code(state.trim());

    if city.is_empty() && state.is_empty() {
        return Err(NormalizeError::MissingLocality { name });
    }

    Ok(NormalizedEntry {
        name: text::title_case(&name),
        street: None,
        city: text::title_case(city),
        state,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn house_number_is_preserved() {
        let entry = normalize_entry("Rink A", "100 Main St, Springfield, IL").unwrap();
        let street = entry.street.unwrap();
        assert!(street.starts_with("100"), "street was {street:?}");
        assert!(street.contains("STREET"));
        assert_eq!(entry.city, "Springfield");
        assert_eq!(entry.state, "IL");
    }

    #[test]
    fn abbreviations_are_expanded() {
        let entry =
            normalize_entry("Greensboro Ice House", "6119 Landmark Center Blvd, Greensboro, NC")
                .unwrap();
        assert!(entry.street.unwrap().contains("BOULEVARD"));
    }

    #[test]
    fn full_state_names_become_codes() {
        let entry =
            normalize_entry("Parade Ice Garden", "100 Main St, Minneapolis, Minnesota").unwrap();
        assert_eq!(entry.state, "MN");
    }

    #[test]
    fn street_output_is_uppercase() {
        let entry = normalize_entry("Rink", "321 Oak dr, Austin, TX").unwrap();
        let street = entry.street.unwrap();
        assert_eq!(street, street.to_uppercase());
        assert!(street.contains("DRIVE"));
    }

    #[test]
    fn name_is_title_cased() {
        let entry = normalize_entry("POLAR ICE HOUSE", "100 Main St, Raleigh, NC").unwrap();
        assert_eq!(entry.name, "Polar Ice House");
    }

    #[test]
    fn rec_ctr_expands_before_title_casing() {
        let entry = normalize_entry("Lakeview Rec Ctr", "9 Lake Rd, Erie, PA").unwrap();
        assert_eq!(entry.name, "Lakeview Recreation Center");
    }

    #[test]
    fn empty_name_fails() {
        let err = normalize_entry("", "100 Main St, Springfield, IL").unwrap_err();
        assert!(matches!(err, NormalizeError::MissingFields { .. }));
    }

    #[test]
    fn unparseable_address_fails() {
        assert!(normalize_entry("Rink", "").is_err());
    }

    #[test]
    fn wiki_entry_skips_street_parsing() {
        let entry = normalize_wiki_entry("Big Bear Ice Arena", "Denver", "Colorado").unwrap();
        assert_eq!(entry.street, None);
        assert_eq!(entry.city, "Denver");
        assert_eq!(entry.state, "CO");
    }

    #[test]
    fn wiki_entry_requires_some_locality() {
        assert!(normalize_wiki_entry("Nameless Rink", "  ", "").is_err());
        assert!(normalize_wiki_entry("Has State", "", "Ohio").is_ok());
    }
}
