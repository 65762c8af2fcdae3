//! Learn-to-skate facility finder.
//!
//! The Umbraco map-search endpoint returns *programs* rather than rinks;
//! program rows carry the facility address and coordinates, which is what
//! the directory needs. One POST per state id, 1 through 50.

use std::time::Duration;

use ice_maker_source_models::{FacilityExtras, FetchExtras, FetchResult};

use crate::{RinkFetcher, SourceError};

/// Registry module string for this fetcher.
pub const MODULE: &str = "fetchers.learntoskate";

const LTS_URL: &str = "https://www.learntoskateusa.com/umbraco/surface/Map/GetPointsFromSearch";
const STATE_COUNT: u32 = 50;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const REQUEST_DELAY: Duration = Duration::from_millis(500);

/// Fetcher for the learn-to-skate program finder.
#[derive(Debug, Default)]
pub struct LearnToSkateFetcher {
    url: String,
}

impl LearnToSkateFetcher {
    /// Creates a fetcher against the live endpoint.
    #[must_use]
    pub fn new() -> Self {
        Self {
            url: LTS_URL.to_string(),
        }
    }

    /// Creates a fetcher against an alternate URL (tests).
    #[must_use]
    pub fn with_url(url: &str) -> Self {
        Self {
            url: url.to_string(),
        }
    }

    /// Fetches the program list for one state id. Failures are logged and
    /// yield an empty page; the remaining states still run.
    async fn fetch_state(&self, client: &reqwest::Client, state_id: u32) -> Vec<serde_json::Value> {
        let payload = format!("facilityName=&stateId={state_id}&zip=&radius=2000");

        let response = client
            .post(&self.url)
            .header("Content-Type", "application/x-www-form-urlencoded; charset=UTF-8")
            .header("Accept", "application/json, text/javascript, */*; q=0.01")
            .body(payload)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status);

        let response = match response {
            Ok(resp) => resp,
            Err(e) => {
                log::warn!("learntoskate: state {state_id} request failed: {e}");
                return Vec::new();
            }
        };

        match response.json::<serde_json::Value>().await {
            Ok(body) => body["programs"].as_array().cloned().unwrap_or_default(),
            Err(e) => {
                log::warn!("learntoskate: state {state_id} bad response: {e}");
                Vec::new()
            }
        }
    }
}

impl RinkFetcher for LearnToSkateFetcher {
    async fn fetch(&self) -> Result<Vec<FetchResult>, SourceError> {
        let client = reqwest::Client::builder()
            .user_agent("ice-maker/0.1 (skatetrax rink directory builder)")
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        let mut results = Vec::new();

        for state_id in 1..=STATE_COUNT {
            let programs = self.fetch_state(&client, state_id).await;
            log::info!(
                "learntoskate: state {state_id}/{STATE_COUNT} -> {} programs",
                programs.len()
            );

            for program in &programs {
                if let Some(result) = parse_program(program) {
                    results.push(result);
                }
            }

            if state_id < STATE_COUNT {
                tokio::time::sleep(REQUEST_DELAY).await;
            }
        }

        log::info!("learntoskate: {} total programs collected", results.len());
        Ok(results)
    }

    fn module(&self) -> &'static str {
        MODULE
    }
}

/// Maps one program object to a fetch result. Entries missing street,
/// city, or state are dropped (the finder lists online-only programs
/// too).
#[must_use]
pub fn parse_program(program: &serde_json::Value) -> Option<FetchResult> {
    let text = |key: &str| {
        program[key]
            .as_str()
            .map(str::trim)
            .unwrap_or_default()
            .to_string()
    };

    let name = text("OrganizationName");
    let street = text("StreetOne");
    let city = text("City");
    let state = text("StateCode");
    let postal = text("PostalCode");

    if street.is_empty() || city.is_empty() || state.is_empty() {
        log::debug!(
            "learntoskate: skipping incomplete entry: {}",
            if name.is_empty() { "(no name)" } else { &name }
        );
        return None;
    }

    let zip = postal.split('-').next().unwrap_or_default().to_string();

    let coord = |primary: &str, fallback: &str| {
        let value = if program[primary].is_null() {
            &program[fallback]
        } else {
            &program[primary]
        };
        value
            .as_f64()
            .or_else(|| value.as_str().and_then(|s| s.parse().ok()))
    };

    let lat = coord("Lat", "Latitude");
    let lng = coord("Lng", "Longitude");

    Some(FetchResult {
        name,
        address: format!("{street}, {city}, {state}"),
        extras: FetchExtras::Facility(FacilityExtras { zip, lat, lng }),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_complete_program() {
        let program = serde_json::json!({
            "OrganizationName": "Springfield Skating Club",
            "StreetOne": "100 Main St",
            "City": "Springfield",
            "StateCode": "IL",
            "PostalCode": "62701-1234",
            "Lat": 39.8017,
            "Lng": -89.6437
        });

        let result = parse_program(&program).unwrap();
        assert_eq!(result.name, "Springfield Skating Club");
        assert_eq!(result.address, "100 Main St, Springfield, IL");

        let FetchExtras::Facility(extras) = result.extras else {
            panic!("expected facility extras");
        };
        assert_eq!(extras.zip, "62701");
        assert!((extras.lat.unwrap() - 39.8017).abs() < 1e-6);
    }

    #[test]
    fn accepts_alternate_coordinate_keys_and_strings() {
        let program = serde_json::json!({
            "OrganizationName": "Rink",
            "StreetOne": "1 Ice Way",
            "City": "Denver",
            "StateCode": "CO",
            "PostalCode": "80202",
            "Latitude": "39.74",
            "Longitude": "-104.99"
        });

        let FetchExtras::Facility(extras) = parse_program(&program).unwrap().extras else {
            panic!("expected facility extras");
        };
        assert!((extras.lat.unwrap() - 39.74).abs() < 1e-6);
        assert!((extras.lng.unwrap() - -104.99).abs() < 1e-6);
    }

    #[test]
    fn drops_incomplete_entries() {
        let program = serde_json::json!({
            "OrganizationName": "Online Only Program",
            "StreetOne": "",
            "City": "Nowhere",
            "StateCode": "XX"
        });
        assert!(parse_program(&program).is_none());
    }

    #[test]
    fn missing_coordinates_stay_none() {
        let program = serde_json::json!({
            "OrganizationName": "No Geo Rink",
            "StreetOne": "5 Cold St",
            "City": "Fargo",
            "StateCode": "ND",
            "PostalCode": ""
        });

        let FetchExtras::Facility(extras) = parse_program(&program).unwrap().extras else {
            panic!("expected facility extras");
        };
        assert_eq!(extras.lat, None);
        assert_eq!(extras.zip, "");
    }
}
