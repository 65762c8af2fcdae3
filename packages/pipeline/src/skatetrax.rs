//! Skatetrax peer directory access.
//!
//! The promoter aligns identifiers with the Skatetrax service: before
//! minting a UUID for a new location it checks whether Skatetrax already
//! knows the rink and adopts that identifier instead. The public API is
//! tried first (no credentials, works anywhere); a direct database read
//! is the fallback when `SKATETRAX_DB_URL` is configured. Neither being
//! available is fine — promotion just mints fresh UUIDs.

use std::time::Duration;

use ice_maker_matcher::AddressRecord;
use ice_maker_staging::db;
use moosicbox_json_utils::database::ToValue as _;

/// Environment variable overriding the public rink list endpoint.
pub const API_URL_ENV: &str = "SKATETRAX_API_URL";

/// Default public rink list endpoint.
pub const DEFAULT_API_URL: &str = "https://api.skatetrax.com/api/v4/public/rinks";

const API_TIMEOUT: Duration = Duration::from_secs(15);

/// A rink row from the peer directory, in either access path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerLocation {
    /// Peer identifier (the UUID adoption candidates carry).
    pub rink_id: String,
    /// Peer display name.
    pub rink_name: String,
    /// Peer street address.
    pub rink_address: String,
    /// Peer city.
    pub rink_city: String,
    /// Peer state code.
    pub rink_state: String,
}

impl AddressRecord for PeerLocation {
    fn record_name(&self) -> &str {
        &self.rink_name
    }

    fn record_street(&self) -> Option<&str> {
        Some(&self.rink_address)
    }

    fn record_city(&self) -> &str {
        &self.rink_city
    }

    fn record_state(&self) -> &str {
        &self.rink_state
    }
}

/// Loads the peer rink list for UUID alignment: public API first, then
/// the direct database fallback. Empty on total failure.
pub async fn load_locations() -> Vec<PeerLocation> {
    let mut locations = fetch_api().await;
    if locations.is_empty() {
        locations = fetch_db().await;
    }

    if locations.is_empty() {
        log::info!(
            "No Skatetrax rinks available for UUID alignment -- new locations will receive \
             fresh UUIDs"
        );
    } else {
        log::info!("Loaded {} Skatetrax rinks for UUID alignment", locations.len());
    }

    locations
}

/// Fetches rinks from the public API. Empty on any failure.
async fn fetch_api() -> Vec<PeerLocation> {
    let url = std::env::var(API_URL_ENV).unwrap_or_else(|_| DEFAULT_API_URL.to_string());
    if url.is_empty() {
        return Vec::new();
    }

    let client = match reqwest::Client::builder().timeout(API_TIMEOUT).build() {
        Ok(client) => client,
        Err(e) => {
            log::warn!("Skatetrax API client build failed: {e}");
            return Vec::new();
        }
    };

    let body: serde_json::Value = match client
        .get(&url)
        .send()
        .await
        .and_then(reqwest::Response::error_for_status)
    {
        Ok(resp) => match resp.json().await {
            Ok(body) => body,
            Err(e) => {
                log::warn!("Skatetrax public API response unreadable: {e}");
                return Vec::new();
            }
        },
        Err(e) => {
            log::warn!("Skatetrax public API request failed: {e}");
            return Vec::new();
        }
    };

    parse_peer_list(&body)
}

/// Maps the public API's JSON array to peer locations. Placeholder rows
/// (city `"-"`) are dropped.
#[must_use]
pub fn parse_peer_list(body: &serde_json::Value) -> Vec<PeerLocation> {
    let Some(rows) = body.as_array() else {
        log::warn!("Skatetrax public API returned a non-array body");
        return Vec::new();
    };

    let mut locations = Vec::with_capacity(rows.len());

    for row in rows {
        let text = |key: &str| row[key].as_str().unwrap_or_default().to_string();

        let rink_city = text("rink_city");
        if rink_city == "-" {
            continue;
        }

        let rink_id = text("rink_id");
        if rink_id.is_empty() {
            continue;
        }

        locations.push(PeerLocation {
            rink_id,
            rink_name: text("rink_name"),
            rink_address: text("rink_address"),
            rink_city,
            rink_state: text("rink_state"),
        });
    }

    locations
}

/// Fallback: reads rinks straight from the peer database when
/// `SKATETRAX_DB_URL` is set. Empty on any failure.
async fn fetch_db() -> Vec<PeerLocation> {
    let peer = match db::connect_peer_from_env().await {
        Ok(Some(peer)) => peer,
        Ok(None) => return Vec::new(),
        Err(e) => {
            log::warn!("Skatetrax DB fallback failed: {e}");
            return Vec::new();
        }
    };

    let rows = match peer
        .query_raw_params(
            "SELECT rink_id, rink_name, rink_address, rink_city, rink_state FROM locations",
            &[],
        )
        .await
    {
        Ok(rows) => rows,
        Err(e) => {
            log::warn!("Skatetrax DB fallback query failed: {e}");
            return Vec::new();
        }
    };

    rows.iter()
        .map(|row| PeerLocation {
            rink_id: row.to_value("rink_id").unwrap_or_default(),
            rink_name: row.to_value("rink_name").unwrap_or_default(),
            rink_address: row.to_value("rink_address").unwrap_or_default(),
            rink_city: row.to_value("rink_city").unwrap_or_default(),
            rink_state: row.to_value("rink_state").unwrap_or_default(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_peer_rows() {
        let body = serde_json::json!([
            {
                "rink_id": "11111111-1111-1111-1111-111111111111",
                "rink_name": "Springfield Ice",
                "rink_address": "100 MAIN STREET",
                "rink_city": "Springfield",
                "rink_state": "IL"
            },
            {
                "rink_id": "22222222-2222-2222-2222-222222222222",
                "rink_name": "Placeholder",
                "rink_city": "-",
                "rink_state": ""
            }
        ]);

        let peers = parse_peer_list(&body);
        assert_eq!(peers.len(), 1);
        assert_eq!(peers[0].rink_name, "Springfield Ice");
    }

    #[test]
    fn non_array_bodies_parse_to_empty() {
        assert!(parse_peer_list(&serde_json::json!({"error": "down"})).is_empty());
    }

    #[test]
    fn rows_without_ids_are_dropped() {
        let body = serde_json::json!([{"rink_name": "No Id", "rink_city": "Denver"}]);
        assert!(parse_peer_list(&body).is_empty());
    }

    #[test]
    fn verified_candidate_matches_peer_row_for_adoption() {
        let peers = vec![PeerLocation {
            rink_id: "11111111-1111-1111-1111-111111111111".to_string(),
            rink_name: "Springfield Ice".to_string(),
            rink_address: "100 MAIN STREET".to_string(),
            rink_city: "Springfield".to_string(),
            rink_state: "IL".to_string(),
        }];

        let hit = ice_maker_matcher::find_address_match(
            &peers,
            "Springfield Ice",
            Some("100 MAIN STREET"),
            Some("Springfield"),
            Some("IL"),
        )
        .expect("peer row should match");
        assert_eq!(hit.rink_id, "11111111-1111-1111-1111-111111111111");
    }

    #[test]
    fn peer_locations_expose_address_record() {
        let peer = PeerLocation {
            rink_id: "id".to_string(),
            rink_name: "Rink".to_string(),
            rink_address: "100 MAIN STREET".to_string(),
            rink_city: "Springfield".to_string(),
            rink_state: "IL".to_string(),
        };
        assert_eq!(peer.record_street(), Some("100 MAIN STREET"));
        assert_eq!(peer.record_state(), "IL");
    }
}
