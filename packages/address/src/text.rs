//! Rink name text repair.
//!
//! Upstream sites serve UTF-8 that was decoded as Latin-1 somewhere in
//! their CMS, so names arrive with mojibake (`Caf\u{e9}` renders as
//! `CafÃ©`). The repair re-encodes through the same path in reverse.

use std::sync::LazyLock;

use regex::Regex;

/// `Rec Ctr` as a standalone word pair, any casing.
static REC_CTR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\brec\s+ctr\b").expect("valid regex"));

/// Undoes a Latin-1 → UTF-8 mis-decode.
///
/// If every char fits in a single Latin-1 byte, reinterpret those bytes as
/// UTF-8; when that parses, the input was double-decoded and the repaired
/// string is returned. Anything else passes through unchanged.
#[must_use]
pub fn repair_mojibake(input: &str) -> String {
    let mut bytes = Vec::with_capacity(input.len());
    for ch in input.chars() {
        let code = u32::from(ch);
        let Ok(byte) = u8::try_from(code) else {
            return input.to_string();
        };
        bytes.push(byte);
    }

    String::from_utf8(bytes).unwrap_or_else(|_| input.to_string())
}

/// Expands the `Rec Ctr` shorthand common across municipal rink listings.
#[must_use]
pub fn expand_rec_ctr(input: &str) -> String {
    REC_CTR_RE.replace_all(input, "Recreation Center").into_owned()
}

/// Title-cases a string: the first alphabetic character of each
/// whitespace-separated word is uppercased, the rest lowercased.
#[must_use]
pub fn title_case(input: &str) -> String {
    input
        .split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            chars.next().map_or_else(String::new, |first| {
                first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase()
            })
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// The full name-cleanup pipeline: mojibake repair, `Rec Ctr` expansion,
/// trim. Title-casing is applied by the caller once all other checks pass.
#[must_use]
pub fn clean_name(raw_name: &str) -> String {
    expand_rec_ctr(&repair_mojibake(raw_name)).trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repairs_double_decoded_utf8() {
        // "Café" decoded as Latin-1 shows up as "CafÃ©".
        assert_eq!(repair_mojibake("Caf\u{c3}\u{a9}"), "Caf\u{e9}");
    }

    #[test]
    fn ascii_passes_through() {
        assert_eq!(repair_mojibake("Polar Ice House"), "Polar Ice House");
    }

    #[test]
    fn already_decoded_text_passes_through() {
        // Chars above U+00FF can't have come from a Latin-1 mis-decode.
        assert_eq!(repair_mojibake("Rink \u{2603}"), "Rink \u{2603}");
    }

    #[test]
    fn invalid_utf8_bytes_pass_through() {
        assert_eq!(repair_mojibake("Caf\u{e9}"), "Caf\u{e9}");
    }

    #[test]
    fn expands_rec_ctr_case_insensitively() {
        assert_eq!(
            expand_rec_ctr("Lakeview REC CTR"),
            "Lakeview Recreation Center"
        );
        assert_eq!(
            expand_rec_ctr("Lakeview rec ctr annex"),
            "Lakeview Recreation Center annex"
        );
    }

    #[test]
    fn rec_ctr_requires_word_boundaries() {
        assert_eq!(expand_rec_ctr("Recreational Ctrl"), "Recreational Ctrl");
    }

    #[test]
    fn title_cases_each_word() {
        assert_eq!(title_case("POLAR ICE house"), "Polar Ice House");
        assert_eq!(title_case("  extra   spaces "), "Extra Spaces");
    }

    #[test]
    fn title_case_keeps_apostrophes_intact() {
        assert_eq!(title_case("SKATER'S EDGE"), "Skater's Edge");
    }
}
