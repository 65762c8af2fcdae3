//! Nominatim / OpenStreetMap client.
//!
//! Structured search with `addressdetails`, single best hit. The public
//! instance's usage policy caps throughput at 1 request per second; see
//! <https://operations.osmfoundation.org/policies/nominatim/>.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::clock::{Clock, SystemClock};
use crate::{AddressDetail, GeocodeError, GeocodeHit};

/// Default search endpoint.
pub const NOMINATIM_URL: &str = "https://nominatim.openstreetmap.org/search";

/// Minimum gap between outbound requests.
pub const RATE_LIMIT: Duration = Duration::from_secs(1);

const USER_AGENT: &str = "ice-maker/0.1 (skatetrax rink directory builder)";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Paces outbound calls to a minimum inter-request gap.
///
/// The last-request timestamp is owned here rather than in module-global
/// state so tests can drive it with a [`ManualClock`](crate::clock::ManualClock).
#[derive(Debug)]
pub struct RateLimiter<C: Clock> {
    min_gap: Duration,
    clock: C,
    last_request: Mutex<Option<Instant>>,
}

impl<C: Clock> RateLimiter<C> {
    /// Creates a limiter with the given gap and clock.
    pub const fn new(min_gap: Duration, clock: C) -> Self {
        Self {
            min_gap,
            clock,
            last_request: Mutex::new(None),
        }
    }

    /// Sleeps out the remainder of the gap since the previous call, then
    /// stamps now as the new last-request time.
    pub async fn pace(&self) {
        let wait = {
            let last = self
                .last_request
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            last.map(|at| {
                let elapsed = self.clock.now().saturating_duration_since(at);
                self.min_gap.saturating_sub(elapsed)
            })
        };

        if let Some(wait) = wait
            && !wait.is_zero()
        {
            self.clock.sleep(wait).await;
        }

        let mut last = self
            .last_request
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        *last = Some(self.clock.now());
    }
}

/// Long-lived Nominatim client with its own rate limiter.
#[derive(Debug)]
pub struct Geocoder<C: Clock = SystemClock> {
    client: reqwest::Client,
    base_url: String,
    limiter: RateLimiter<C>,
}

impl Geocoder<SystemClock> {
    /// Creates a client against the public instance with the default
    /// 1 req/s limit.
    ///
    /// # Errors
    ///
    /// Returns [`GeocodeError`] if the HTTP client cannot be built.
    pub fn new() -> Result<Self, GeocodeError> {
        Self::with_clock(NOMINATIM_URL, RATE_LIMIT, SystemClock)
    }
}

impl<C: Clock> Geocoder<C> {
    /// Creates a client against `base_url` with an explicit gap and clock.
    ///
    /// # Errors
    ///
    /// Returns [`GeocodeError`] if the HTTP client cannot be built.
    pub fn with_clock(base_url: &str, min_gap: Duration, clock: C) -> Result<Self, GeocodeError> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.to_string(),
            limiter: RateLimiter::new(min_gap, clock),
        })
    }

    /// Looks up a structured address, returning the single best hit.
    ///
    /// Every failure mode — transport, HTTP status, body parsing, empty
    /// result set — returns `None` (logged at warn/debug); retrying is
    /// the next run's job.
    pub async fn lookup(
        &self,
        street: &str,
        city: &str,
        state: &str,
        country: &str,
    ) -> Option<GeocodeHit> {
        self.limiter.pace().await;

        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("street", street),
                ("city", city),
                ("state", state),
                ("country", country),
                ("format", "json"),
                ("addressdetails", "1"),
                ("limit", "1"),
            ])
            .send()
            .await
            .and_then(reqwest::Response::error_for_status);

        let response = match response {
            Ok(resp) => resp,
            Err(e) => {
                log::warn!("Nominatim request failed for '{street}, {city}, {state}': {e}");
                return None;
            }
        };

        let body: serde_json::Value = match response.json().await {
            Ok(body) => body,
            Err(e) => {
                log::warn!("Nominatim response unreadable for '{street}, {city}, {state}': {e}");
                return None;
            }
        };

        match parse_response(&body) {
            Ok(Some(hit)) => Some(hit),
            Ok(None) => {
                log::debug!("No Nominatim results for '{street}, {city}, {state}'");
                None
            }
            Err(e) => {
                log::warn!("Nominatim parse failed for '{street}, {city}, {state}': {e}");
                None
            }
        }
    }
}

/// Parses a Nominatim JSON body into the best hit.
///
/// # Errors
///
/// Returns [`GeocodeError::Parse`] when the body is not an array or the
/// first hit lacks coordinates.
pub fn parse_response(body: &serde_json::Value) -> Result<Option<GeocodeHit>, GeocodeError> {
    let results = body.as_array().ok_or_else(|| GeocodeError::Parse {
        message: "Nominatim response is not an array".to_string(),
    })?;

    let Some(first) = results.first() else {
        return Ok(None);
    };

    let latitude = first["lat"]
        .as_str()
        .and_then(|s| s.parse::<f64>().ok())
        .ok_or_else(|| GeocodeError::Parse {
            message: "Missing lat in Nominatim response".to_string(),
        })?;

    let longitude = first["lon"]
        .as_str()
        .and_then(|s| s.parse::<f64>().ok())
        .ok_or_else(|| GeocodeError::Parse {
            message: "Missing lon in Nominatim response".to_string(),
        })?;

    let display_name = first["display_name"].as_str().unwrap_or_default().to_string();

    let detail = &first["address"];
    let get = |key: &str| detail[key].as_str().map(String::from);

    let address = AddressDetail {
        road: get("road"),
        city: get("city"),
        town: get("town"),
        village: get("village"),
        state: get("state"),
        iso_subdivision: get("ISO3166-2-lvl4"),
        postcode: get("postcode"),
    };

    Ok(Some(GeocodeHit {
        latitude,
        longitude,
        display_name,
        address,
    }))
}

#[cfg(test)]
mod tests {
    use crate::clock::ManualClock;

    use super::*;

    #[test]
    fn parses_full_result() {
        let body = serde_json::json!([{
            "lat": "41.8827",
            "lon": "-87.6278",
            "display_name": "100, North State Street, Chicago, IL, USA",
            "address": {
                "road": "North State Street",
                "city": "Chicago",
                "state": "Illinois",
                "ISO3166-2-lvl4": "US-IL",
                "postcode": "60602"
            }
        }]);

        let hit = parse_response(&body).unwrap().unwrap();
        assert!((hit.latitude - 41.8827).abs() < 1e-4);
        assert!((hit.longitude - -87.6278).abs() < 1e-4);
        assert_eq!(hit.address.road.as_deref(), Some("North State Street"));
        assert_eq!(hit.address.iso_subdivision.as_deref(), Some("US-IL"));
        assert_eq!(hit.address.postcode.as_deref(), Some("60602"));
    }

    #[test]
    fn parses_empty_result_set() {
        let body = serde_json::json!([]);
        assert!(parse_response(&body).unwrap().is_none());
    }

    #[test]
    fn rejects_non_array_body() {
        let body = serde_json::json!({"error": "rate limited"});
        assert!(parse_response(&body).is_err());
    }

    #[test]
    fn rejects_missing_coordinates() {
        let body = serde_json::json!([{"display_name": "nowhere"}]);
        assert!(parse_response(&body).is_err());
    }

    #[test]
    fn locality_falls_back_through_town_and_village() {
        let body = serde_json::json!([{
            "lat": "44.0",
            "lon": "-93.0",
            "display_name": "somewhere",
            "address": {"village": "Tiny Hamlet"}
        }]);
        let hit = parse_response(&body).unwrap().unwrap();
        assert_eq!(hit.address.locality(), Some("Tiny Hamlet"));
    }

    #[tokio::test]
    async fn limiter_sleeps_out_the_remaining_gap() {
        let limiter = RateLimiter::new(Duration::from_secs(1), ManualClock::new());

        // First call: no previous request, no sleep.
        limiter.pace().await;
        assert!(limiter.clock.recorded_sleeps().is_empty());

        // 300 ms later, the limiter owes 700 ms.
        limiter.clock.advance(Duration::from_millis(300));
        limiter.pace().await;
        assert_eq!(
            limiter.clock.recorded_sleeps(),
            vec![Duration::from_millis(700)]
        );
    }

    #[tokio::test]
    async fn limiter_skips_sleep_when_gap_already_elapsed() {
        let limiter = RateLimiter::new(Duration::from_secs(1), ManualClock::new());

        limiter.pace().await;
        limiter.clock.advance(Duration::from_secs(5));
        limiter.pace().await;
        assert!(limiter.clock.recorded_sleeps().is_empty());
    }
}
