//! Core library for the AirZen air-quality dashboard CLI.
//!
//! This crate defines:
//! - The backend API client (AQI snapshots, search, simulation, geocoding)
//! - The location-driven refresh pipeline and its application state
//! - Pure derived-metrics functions (health bands, exposure, scheduling)
//! - Configuration handling
//!
//! It is used by `airzen-cli`, but can also be reused by other binaries or services.

pub mod api;
pub mod config;
pub mod error;
pub mod metrics;
pub mod model;
pub mod pipeline;
pub mod resolver;
pub mod state;

pub use api::{AirQualityApi, HttpApi};
pub use config::Config;
pub use model::{
    ForecastPoint, HistoryEntry, Location, Multipliers, Place, SimulationResult, Snapshot,
};
pub use pipeline::{Event, Notice, Pipeline};
pub use state::AppState;
