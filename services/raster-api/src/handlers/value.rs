//! Single-pixel value handler.

use std::sync::Arc;

use axum::{
    extract::{Extension, Query},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use raster_sampler::Sample;

use super::query_point;
use crate::error::{required, ApiError};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ValueQuery {
    pub url: Option<String>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct ValueResponse {
    pub value: f64,
    pub lat: f64,
    pub lon: f64,
}

/// GET /get_value
pub async fn value_handler(
    Extension(state): Extension<Arc<AppState>>,
    Query(query): Query<ValueQuery>,
) -> Result<Json<ValueResponse>, ApiError> {
    let url = required(query.url, "url")?;
    let point = query_point(query.lat, query.lon, "lat", "lon")?;

    match state.sampler.sample_point(&url, point).await {
        Sample::Value(value) => Ok(Json(ValueResponse {
            value,
            lat: point.lat,
            lon: point.lon,
        })),
        Sample::Absent => {
            debug!(url = %url, lat = point.lat, lon = point.lon, "No data at point");
            Err(ApiError::not_found("No data at this location"))
        }
    }
}
