//! Initial-location resolution.
//!
//! The pipeline needs exactly one authoritative starting location. Device
//! coordinates (when the caller has them) are reverse-geocoded for a display
//! name; anything that goes wrong degrades silently to a fallback, never to
//! an error.

use std::time::Duration;

use anyhow::Result;
use tokio::time::timeout;

use crate::{api::AirQualityApi, model::Location};

/// Fallback when no device position is available.
pub const DEFAULT_LAT: f64 = 28.6139;
pub const DEFAULT_LNG: f64 = 77.2090;
pub const DEFAULT_NAME: &str = "New Delhi";

/// Name used when reverse geocoding fails or returns nothing usable.
const UNNAMED: &str = "Your Location";

/// Reverse geocoding gets this long before we give up on a pretty name.
const GEOCODE_TIMEOUT: Duration = Duration::from_secs(5);

pub fn default_location() -> Location {
    // Constants are in range; this cannot fail.
    Location { lat: DEFAULT_LAT, lng: DEFAULT_LNG, name: DEFAULT_NAME.to_string() }
}

/// Resolve the starting location.
///
/// With coordinates: reverse-geocode them under a 5-second timeout and fall
/// back to a generic name on timeout, error, or an unusable address. Without
/// coordinates: the hardcoded default. Only genuinely invalid coordinates
/// produce an error.
pub async fn resolve_initial(
    api: &dyn AirQualityApi,
    coords: Option<(f64, f64)>,
) -> Result<Location> {
    let Some((lat, lng)) = coords else {
        return Ok(default_location());
    };

    let name = match timeout(GEOCODE_TIMEOUT, api.reverse_geocode(lat, lng)).await {
        Ok(Ok(Some(name))) => name,
        // Timeout, geocoder error, or no city/town/village field.
        _ => UNNAMED.to_string(),
    };

    Ok(Location::new(lat, lng, name)?)
}
