//! SerpApi Google Maps directions client

use crate::secrets::SecretManager;
use regex::Regex;
use sdk::errors::EngineError;
use sdk::types::TravelMode;
use serde_json::Value;
use std::sync::OnceLock;
use std::time::Duration;

static HOURS_PATTERN: OnceLock<Regex> = OnceLock::new();
static MINUTES_PATTERN: OnceLock<Regex> = OnceLock::new();

/// Parse a human duration such as `"1 hr 5 min"` or `"45 mins"` into minutes.
///
/// Returns `None` when neither an hour nor a minute component is present.
pub fn parse_duration_text(text: &str) -> Option<u32> {
    let hours_re = HOURS_PATTERN
        .get_or_init(|| Regex::new(r"(?i)(\d+)\s*(?:hr|hour|h\b)").expect("Invalid hours pattern"));
    let minutes_re =
        MINUTES_PATTERN.get_or_init(|| Regex::new(r"(?i)(\d+)\s*min").expect("Invalid minutes pattern"));

    let hours = hours_re
        .captures(text)
        .and_then(|c| c[1].parse::<u32>().ok());
    let minutes = minutes_re
        .captures(text)
        .and_then(|c| c[1].parse::<u32>().ok());

    if hours.is_none() && minutes.is_none() {
        return None;
    }

    Some(hours.unwrap_or(0).saturating_mul(60).saturating_add(minutes.unwrap_or(0)))
}

/// Duration of the first route in a directions payload.
///
/// Text durations are parsed; numeric durations are seconds and round up to
/// whole minutes.
pub fn route_minutes(payload: &Value) -> Option<u32> {
    let route = payload.get("directions_results")?.as_array()?.first()?;

    for field in ["duration", "formatted_duration"] {
        match route.get(field) {
            Some(Value::String(text)) => {
                if let Some(minutes) = parse_duration_text(text) {
                    return Some(minutes);
                }
            }
            Some(Value::Number(n)) => {
                if let Some(secs) = n.as_u64() {
                    return u32::try_from(secs.div_ceil(60)).ok();
                }
            }
            _ => {}
        }
    }

    None
}

pub struct DirectionsClient {
    base_url: String,
    client: reqwest::Client,
}

impl DirectionsClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_default();

        Self {
            base_url: base_url.into(),
            client,
        }
    }

    /// Ask for a route departing now. `Ok(None)` means the service answered
    /// but returned no usable duration.
    pub async fn travel_minutes(
        &self,
        api_key: &str,
        from: &str,
        to: &str,
        mode: TravelMode,
    ) -> Result<Option<u32>, EngineError> {
        let url = format!("{}/search", self.base_url.trim_end_matches('/'));

        let response = self
            .client
            .get(&url)
            .query(&[
                ("engine", "google_maps_directions"),
                ("start_addr", from),
                ("end_addr", to),
                ("departure_time", "now"),
                ("travel_mode", mode.as_str()),
                ("api_key", api_key),
            ])
            .send()
            .await
            .map_err(|e| EngineError::Network(SecretManager::scrub(&e.to_string())))?;

        let status = response.status();
        let payload: Value = response.json().await.unwrap_or(Value::Null);

        if let Some(error) = payload.get("error").and_then(Value::as_str) {
            return Err(EngineError::upstream("SerpApi", SecretManager::scrub(error)));
        }
        if !status.is_success() {
            return Err(EngineError::upstream("SerpApi", "API request failed"));
        }

        Ok(route_minutes(&payload))
    }
}
