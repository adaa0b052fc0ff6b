use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::InvalidCoordinates;

/// A geographic point of interest, the single driver of the refresh pipeline.
///
/// There is exactly one authoritative `Location` at a time; a new selection
/// replaces the previous one entirely.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub lat: f64,
    pub lng: f64,
    pub name: String,
}

impl Location {
    /// Build a location, validating coordinate ranges.
    pub fn new(lat: f64, lng: f64, name: impl Into<String>) -> Result<Self, InvalidCoordinates> {
        if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lng) {
            return Err(InvalidCoordinates { lat, lng });
        }

        Ok(Self { lat, lng, name: name.into() })
    }
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} ({:.4}°{}, {:.4}°{})",
            self.name,
            self.lat.abs(),
            if self.lat >= 0.0 { 'N' } else { 'S' },
            self.lng.abs(),
            if self.lng >= 0.0 { 'E' } else { 'W' },
        )
    }
}

/// One hourly forecast value, ML- or satellite-sourced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    pub hour: String,
    pub aqi: f64,
}

/// The most recent payload fetched for the current location.
///
/// Replaced wholesale on every successful fetch. The backend's degraded-mode
/// payload omits most fields, hence the defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub aqi: f64,
    #[serde(default)]
    pub risk_level: String,
    #[serde(default)]
    pub pollutants: BTreeMap<String, f64>,
    #[serde(default)]
    pub ml_forecast: Vec<ForecastPoint>,
    #[serde(default)]
    pub forecast: Vec<ForecastPoint>,
    #[serde(default)]
    pub pollution_sources: BTreeMap<String, f64>,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub last_updated: Option<String>,
}

impl Snapshot {
    /// First ML-forecast AQI, used as the "predicted" value in history entries.
    pub fn first_prediction(&self) -> Option<f64> {
        self.ml_forecast.first().map(|p| p.aqi)
    }
}

/// One observed (and possibly predicted) AQI value in the rolling trend history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub time: String,
    pub aqi: f64,
    pub predicted: Option<f64>,
}

/// What-if simulator inputs: one emission multiplier per pollution source,
/// each clamped to `[0, 2]` with `1.0` meaning "unchanged".
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Multipliers {
    pub traffic: f64,
    pub industrial: f64,
    pub power: f64,
    pub biomass: f64,
}

impl Default for Multipliers {
    fn default() -> Self {
        Self { traffic: 1.0, industrial: 1.0, power: 1.0, biomass: 1.0 }
    }
}

impl Multipliers {
    pub const SOURCES: &'static [&'static str] = &["traffic", "industrial", "power", "biomass"];

    /// Set the multiplier for a named source, clamping into `[0, 2]`.
    /// Unknown source names are ignored.
    pub fn set(&mut self, source: &str, value: f64) {
        let value = value.clamp(0.0, 2.0);

        match source {
            "traffic" => self.traffic = value,
            "industrial" => self.industrial = value,
            "power" => self.power = value,
            "biomass" => self.biomass = value,
            _ => {}
        }
    }

    pub fn get(&self, source: &str) -> Option<f64> {
        match source {
            "traffic" => Some(self.traffic),
            "industrial" => Some(self.industrial),
            "power" => Some(self.power),
            "biomass" => Some(self.biomass),
            _ => None,
        }
    }
}

/// Result of the backend's what-if recomposition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationResult {
    pub aqi: f64,
    #[serde(default)]
    pub color: String,
    /// Signed percent: positive means the simulated air is cleaner.
    #[serde(default)]
    pub improvement: f64,
    #[serde(default)]
    pub risk: String,
}

/// One geocoding hit from the backend search endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Place {
    pub name: String,
    pub lat: f64,
    pub lng: f64,
    #[serde(default)]
    pub country: String,
}

impl Place {
    /// Short display name: first comma-separated component plus country,
    /// matching how selections are labelled in the dashboard.
    pub fn short_name(&self) -> String {
        let head = self.name.split(',').next().unwrap_or(&self.name).trim();

        if self.country.is_empty() {
            head.to_string()
        } else {
            format!("{head}, {}", self.country)
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub results: Vec<Place>,
}
