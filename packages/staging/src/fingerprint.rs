//! Change-detection fingerprinting for raw entries.
//!
//! The fingerprint is the dedup key for re-scrapes: the same upstream row
//! hashes identically on every run, so an unchanged source costs zero
//! parse/geocode work.

use ice_maker_staging_models::RawEntryRow;
use switchy_database::Database;

use crate::{DbError, raw_entries};

/// MD5 hex digest of `source_id|raw_name|raw_address`, lowercased, with
/// leading/trailing whitespace trimmed from the whole payload.
#[must_use]
pub fn compute_fingerprint(source_id: i32, raw_name: &str, raw_address: &str) -> String {
    let payload = format!("{source_id}|{raw_name}|{raw_address}")
        .to_lowercase()
        .trim()
        .to_string();
    format!("{:x}", md5::compute(payload.as_bytes()))
}

/// Checks whether this entry already exists (by fingerprint) and inserts
/// it when it doesn't.
///
/// Returns the row and whether it was newly inserted.
///
/// # Errors
///
/// Returns [`DbError`] if the database operation fails.
pub async fn check_and_insert_raw(
    db: &dyn Database,
    source_id: i32,
    raw_name: &str,
    raw_address: &str,
) -> Result<(RawEntryRow, bool), DbError> {
    let fingerprint = compute_fingerprint(source_id, raw_name, raw_address);

    if let Some(existing) = raw_entries::find_by_fingerprint(db, &fingerprint).await? {
        log::debug!("Fingerprint exists, skipping: {raw_name}");
        return Ok((existing, false));
    }

    let entry = raw_entries::insert_raw(db, source_id, raw_name, raw_address, &fingerprint).await?;
    Ok((entry, true))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fingerprint_is_32_hex_chars() {
        let fp = compute_fingerprint(1, "Polar Ice House", "100 Main St, Raleigh, NC");
        assert_eq!(fp.len(), 32);
        assert!(fp.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(fp, fp.to_lowercase());
    }

    #[test]
    fn fingerprint_is_deterministic() {
        let a = compute_fingerprint(1, "Rink", "100 Main St");
        let b = compute_fingerprint(1, "Rink", "100 Main St");
        assert_eq!(a, b);
    }

    #[test]
    fn fingerprint_is_case_insensitive_on_the_payload() {
        assert_eq!(
            compute_fingerprint(1, "POLAR ICE", "100 MAIN ST"),
            compute_fingerprint(1, "polar ice", "100 main st")
        );
    }

    #[test]
    fn fingerprint_trims_payload_edges_only() {
        assert_eq!(
            compute_fingerprint(1, "  Rink", "100 Main St  "),
            compute_fingerprint(1, "Rink", "100 Main St")
        );
        // Interior whitespace still distinguishes entries; only the edges
        // of the joined payload are trimmed.
        assert_ne!(
            compute_fingerprint(1, "Rink  ", "100 Main St"),
            compute_fingerprint(1, "Rink", "100 Main St")
        );
    }

    #[test]
    fn fingerprint_scopes_by_source_name_and_address() {
        let base = compute_fingerprint(1, "Rink", "100 Main St");
        assert_ne!(base, compute_fingerprint(2, "Rink", "100 Main St"));
        assert_ne!(base, compute_fingerprint(1, "Other Rink", "100 Main St"));
        assert_ne!(base, compute_fingerprint(1, "Rink", "200 Oak Ave"));
    }

    #[test]
    fn fingerprint_matches_known_digest() {
        // Pinned so schema migrations can't silently change the key.
        assert_eq!(
            compute_fingerprint(1, "Test Rink", "100 Main St, Springfield, IL"),
            format!(
                "{:x}",
                md5::compute("1|test rink|100 main st, springfield, il".as_bytes())
            )
        );
    }
}
