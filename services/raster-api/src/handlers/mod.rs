//! HTTP request handlers for the raster API.

pub mod health;
pub mod insitu;
pub mod polygon;
pub mod timeseries;
pub mod transect;
pub mod value;

use raster_common::GeoPoint;

use crate::error::{required, ApiError};

/// Build and validate a point from optional query parameters.
pub(crate) fn query_point(
    lat: Option<f64>,
    lon: Option<f64>,
    lat_name: &str,
    lon_name: &str,
) -> Result<GeoPoint, ApiError> {
    let point = GeoPoint::new(required(lat, lat_name)?, required(lon, lon_name)?);
    point
        .validate()
        .map_err(|e| ApiError::bad_request(e.to_string()))?;
    Ok(point)
}
