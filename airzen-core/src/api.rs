use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, fmt::Debug};

use crate::model::{Multipliers, SearchResponse, Place, SimulationResult, Snapshot};

/// Nominatim's usage policy requires an identifying User-Agent.
const NOMINATIM_URL: &str = "https://nominatim.openstreetmap.org/reverse";
const USER_AGENT: &str = "AirZen-App/1.0";

/// Everything the refresh pipeline needs from the outside world.
///
/// The HTTP client implements this against the real backend; tests substitute
/// their own implementations.
#[async_trait]
pub trait AirQualityApi: Send + Sync + Debug {
    /// Current snapshot (AQI, pollutants, forecasts) for a coordinate pair.
    async fn fetch_aqi(&self, lat: f64, lng: f64) -> Result<Snapshot>;

    /// Free-text place search. An unsuccessful backend response yields an
    /// empty list, not an error.
    async fn search(&self, query: &str) -> Result<Vec<Place>>;

    /// What-if recomposition of the given pollutants under source multipliers.
    async fn simulate(
        &self,
        pollutants: &BTreeMap<String, f64>,
        multipliers: &Multipliers,
    ) -> Result<SimulationResult>;

    /// Human-readable settlement name for a coordinate pair, if the
    /// third-party geocoder knows one.
    async fn reverse_geocode(&self, lat: f64, lng: f64) -> Result<Option<String>>;
}

/// Reqwest-backed client for the AirZen backend plus the Nominatim geocoder.
#[derive(Debug, Clone)]
pub struct HttpApi {
    base_url: String,
    http: Client,
}

impl HttpApi {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        let base_url = base_url.trim_end_matches('/').to_string();

        Self { base_url, http: Client::new() }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[derive(Debug, Serialize)]
struct SimulateRequest<'a> {
    pollutants: &'a BTreeMap<String, f64>,
    multipliers: &'a Multipliers,
}

#[derive(Debug, Deserialize)]
struct NominatimAddress {
    city: Option<String>,
    town: Option<String>,
    village: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NominatimResponse {
    address: Option<NominatimAddress>,
}

#[async_trait]
impl AirQualityApi for HttpApi {
    async fn fetch_aqi(&self, lat: f64, lng: f64) -> Result<Snapshot> {
        let url = format!("{}/api/aqi/{lat}/{lng}", self.base_url);

        let res = self
            .http
            .get(&url)
            .send()
            .await
            .context("Failed to send AQI request to the AirZen backend")?;

        let status = res.status();
        let body = res.text().await.context("Failed to read AQI response body")?;

        if !status.is_success() {
            return Err(anyhow!(
                "AQI request failed with status {}: {}",
                status,
                truncate_body(&body),
            ));
        }

        serde_json::from_str(&body).context("Failed to parse AQI snapshot JSON")
    }

    async fn search(&self, query: &str) -> Result<Vec<Place>> {
        let encoded = urlencode(query);
        let url = format!("{}/api/search/{encoded}", self.base_url);

        let res = self
            .http
            .get(&url)
            .send()
            .await
            .context("Failed to send search request to the AirZen backend")?;

        let status = res.status();
        let body = res.text().await.context("Failed to read search response body")?;

        if !status.is_success() {
            return Err(anyhow!(
                "Search request failed with status {}: {}",
                status,
                truncate_body(&body),
            ));
        }

        let parsed: SearchResponse =
            serde_json::from_str(&body).context("Failed to parse search JSON")?;

        if parsed.success { Ok(parsed.results) } else { Ok(Vec::new()) }
    }

    async fn simulate(
        &self,
        pollutants: &BTreeMap<String, f64>,
        multipliers: &Multipliers,
    ) -> Result<SimulationResult> {
        let url = format!("{}/simulate", self.base_url);

        let res = self
            .http
            .post(&url)
            .json(&SimulateRequest { pollutants, multipliers })
            .send()
            .await
            .context("Failed to send simulation request to the AirZen backend")?;

        let status = res.status();
        let body = res.text().await.context("Failed to read simulation response body")?;

        if !status.is_success() {
            return Err(anyhow!(
                "Simulation request failed with status {}: {}",
                status,
                truncate_body(&body),
            ));
        }

        serde_json::from_str(&body).context("Failed to parse simulation JSON")
    }

    async fn reverse_geocode(&self, lat: f64, lng: f64) -> Result<Option<String>> {
        let res = self
            .http
            .get(NOMINATIM_URL)
            .query(&[
                ("format", "json"),
                ("lat", &lat.to_string()),
                ("lon", &lng.to_string()),
            ])
            .header("User-Agent", USER_AGENT)
            .send()
            .await
            .context("Failed to send reverse-geocoding request to Nominatim")?;

        let status = res.status();
        let body = res.text().await.context("Failed to read Nominatim response body")?;

        if !status.is_success() {
            return Err(anyhow!(
                "Reverse geocoding failed with status {}: {}",
                status,
                truncate_body(&body),
            ));
        }

        let parsed: NominatimResponse =
            serde_json::from_str(&body).context("Failed to parse Nominatim JSON")?;

        // Only city/town/village are usable; anything else means "no name".
        let name = parsed
            .address
            .and_then(|a| a.city.or(a.town).or(a.village))
            .filter(|n| !n.is_empty());

        Ok(name)
    }
}

/// Minimal percent-encoding for a path segment.
fn urlencode(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for byte in s.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char)
            }
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    if body.len() <= MAX {
        return body.to_string();
    }

    // Back off to a character boundary so the cut never splits a code point.
    let mut cut = MAX;
    while !body.is_char_boundary(cut) {
        cut -= 1;
    }

    format!("{}...", &body[..cut])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_trailing_slash_is_stripped() {
        let api = HttpApi::new("http://localhost:8000/");
        assert_eq!(api.base_url(), "http://localhost:8000");
    }

    #[test]
    fn urlencode_keeps_unreserved_and_escapes_the_rest() {
        assert_eq!(urlencode("New Delhi"), "New%20Delhi");
        assert_eq!(urlencode("são-paulo"), "s%C3%A3o-paulo");
        assert_eq!(urlencode("plain"), "plain");
    }

    #[test]
    fn simulate_request_serializes_expected_shape() {
        let mut pollutants = BTreeMap::new();
        pollutants.insert("PM2.5".to_string(), 40.0);

        let multipliers = Multipliers { traffic: 0.5, ..Default::default() };
        let req = SimulateRequest { pollutants: &pollutants, multipliers: &multipliers };

        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["pollutants"]["PM2.5"], 40.0);
        assert_eq!(json["multipliers"]["traffic"], 0.5);
        assert_eq!(json["multipliers"]["biomass"], 1.0);
    }

    #[test]
    fn nominatim_name_prefers_city_over_town_and_village() {
        let body = r#"{"address": {"city": "Delhi", "town": "T", "village": "V"}}"#;
        let parsed: NominatimResponse = serde_json::from_str(body).unwrap();
        let name = parsed.address.and_then(|a| a.city.or(a.town).or(a.village));
        assert_eq!(name.as_deref(), Some("Delhi"));
    }

    #[test]
    fn truncate_body_caps_long_payloads() {
        let long = "x".repeat(500);
        assert_eq!(truncate_body(&long).len(), 203);
        assert_eq!(truncate_body("short"), "short");
    }

    #[test]
    fn truncate_body_never_splits_a_code_point() {
        // 3-byte characters: byte 200 falls mid-character.
        let long = "気".repeat(100);
        let cut = truncate_body(&long);

        assert!(cut.ends_with("..."));
        assert!(cut.len() <= 203);
        assert_eq!(truncate_body(&long), cut);
    }
}
