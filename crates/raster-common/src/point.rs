//! Geographic point type.

use serde::{Deserialize, Serialize};

/// A WGS84 location in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Reject non-finite or out-of-range coordinates.
    pub fn validate(&self) -> Result<(), CoordinateError> {
        if !self.lat.is_finite() || !(-90.0..=90.0).contains(&self.lat) {
            return Err(CoordinateError::OutOfRange(format!(
                "Latitude {} out of range [-90, 90]",
                self.lat
            )));
        }
        if !self.lon.is_finite() || !(-180.0..=180.0).contains(&self.lon) {
            return Err(CoordinateError::OutOfRange(format!(
                "Longitude {} out of range [-180, 180]",
                self.lon
            )));
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CoordinateError {
    #[error("Coordinate out of range: {0}")]
    OutOfRange(String),
}
