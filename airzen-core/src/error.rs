use thiserror::Error;

/// Coordinates outside the valid latitude/longitude ranges.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
#[error("invalid coordinates: lat {lat} must be in [-90, 90], lng {lng} in [-180, 180]")]
pub struct InvalidCoordinates {
    pub lat: f64,
    pub lng: f64,
}
