//! US state and territory code table.
//!
//! Sources disagree on whether they carry full state names or 2-letter
//! codes; everything funnels through [`to_state_code`].

/// Full name → USPS code for the 50 states, DC, and inhabited territories.
const STATE_NAMES: &[(&str, &str)] = &[
    ("Alabama", "AL"),
    ("Alaska", "AK"),
    ("Arizona", "AZ"),
    ("Arkansas", "AR"),
    ("California", "CA"),
    ("Colorado", "CO"),
    ("Connecticut", "CT"),
    ("Delaware", "DE"),
    ("Florida", "FL"),
    ("Georgia", "GA"),
    ("Hawaii", "HI"),
    ("Idaho", "ID"),
    ("Illinois", "IL"),
    ("Indiana", "IN"),
    ("Iowa", "IA"),
    ("Kansas", "KS"),
    ("Kentucky", "KY"),
    ("Louisiana", "LA"),
    ("Maine", "ME"),
    ("Maryland", "MD"),
    ("Massachusetts", "MA"),
    ("Michigan", "MI"),
    ("Minnesota", "MN"),
    ("Mississippi", "MS"),
    ("Missouri", "MO"),
    ("Montana", "MT"),
    ("Nebraska", "NE"),
    ("Nevada", "NV"),
    ("New Hampshire", "NH"),
    ("New Jersey", "NJ"),
    ("New Mexico", "NM"),
    ("New York", "NY"),
    ("North Carolina", "NC"),
    ("North Dakota", "ND"),
    ("Ohio", "OH"),
    ("Oklahoma", "OK"),
    ("Oregon", "OR"),
    ("Pennsylvania", "PA"),
    ("Rhode Island", "RI"),
    ("South Carolina", "SC"),
    ("South Dakota", "SD"),
    ("Tennessee", "TN"),
    ("Texas", "TX"),
    ("Utah", "UT"),
    ("Vermont", "VT"),
    ("Virginia", "VA"),
    ("Washington", "WA"),
    ("West Virginia", "WV"),
    ("Wisconsin", "WI"),
    ("Wyoming", "WY"),
    ("District of Columbia", "DC"),
    ("American Samoa", "AS"),
    ("Guam", "GU"),
    ("Northern Mariana Islands", "MP"),
    ("Puerto Rico", "PR"),
    ("United States Minor Outlying Islands", "UM"),
    ("U.S. Virgin Islands", "VI"),
];

/// Every valid USPS code, for code-or-not checks.
const STATE_CODES: &[&str] = &[
    "AK", "AL", "AR", "AZ", "CA", "CO", "CT", "DE", "FL", "GA", "HI", "IA", "ID", "IL", "IN",
    "KS", "KY", "LA", "MA", "MD", "ME", "MI", "MN", "MO", "MS", "MT", "NC", "ND", "NE", "NH",
    "NJ", "NM", "NV", "NY", "OH", "OK", "OR", "PA", "RI", "SC", "SD", "TN", "TX", "UT", "VA",
    "VT", "WA", "WI", "WV", "WY", "DC", "AS", "GU", "MP", "PR", "UM", "VI",
];

/// Looks up the USPS code for a full state name (case-insensitive).
#[must_use]
pub fn code_for_name(name: &str) -> Option<&'static str> {
    let trimmed = name.trim();
    STATE_NAMES
        .iter()
        .find(|(full, _)| full.eq_ignore_ascii_case(trimmed))
        .map(|(_, code)| *code)
}

/// Whether the input is already a valid USPS code (case-insensitive).
#[must_use]
pub fn is_state_code(value: &str) -> bool {
    let trimmed = value.trim();
    STATE_CODES.iter().any(|c| c.eq_ignore_ascii_case(trimmed))
}

/// Converts a state value to its 2-letter USPS code.
///
/// Accepts full names and existing codes. Unrecognized values are kept
/// as-is, uppercased, so bad upstream data stays visible rather than
/// silently disappearing.
#[must_use]
pub fn to_state_code(value: &str) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return String::new();
    }
    if let Some(code) = code_for_name(trimmed) {
        return code.to_string();
    }
    if is_state_code(trimmed) {
        return trimmed.to_uppercase();
    }
    trimmed.to_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_full_names() {
        assert_eq!(to_state_code("Minnesota"), "MN");
        assert_eq!(to_state_code("north carolina"), "NC");
        assert_eq!(to_state_code("District of Columbia"), "DC");
    }

    #[test]
    fn accepts_existing_codes() {
        assert_eq!(to_state_code("il"), "IL");
        assert_eq!(to_state_code(" NY "), "NY");
    }

    #[test]
    fn keeps_unknown_values_uppercased() {
        assert_eq!(to_state_code("Ontario"), "ONTARIO");
        assert_eq!(to_state_code(""), "");
    }

    #[test]
    fn every_name_maps_to_a_listed_code() {
        for (name, code) in STATE_NAMES {
            assert!(STATE_CODES.contains(code), "{name} maps to unlisted code {code}");
        }
    }
}
