//! Transect handler.

use std::sync::Arc;

use axum::{
    extract::{Extension, Query},
    Json,
};
use serde::{Deserialize, Serialize};

use raster_common::GeoPoint;

use super::query_point;
use crate::error::{required, ApiError};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct TransectQuery {
    pub url: Option<String>,
    pub start_lat: Option<f64>,
    pub start_lon: Option<f64>,
    pub end_lat: Option<f64>,
    pub end_lon: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct TransectResponse {
    pub values: Vec<f64>,
    /// Nominal units: raster index distance times the configured spacing.
    pub distances: Vec<f64>,
    pub start_point: GeoPoint,
    pub end_point: GeoPoint,
}

/// GET /get_transect
pub async fn transect_handler(
    Extension(state): Extension<Arc<AppState>>,
    Query(query): Query<TransectQuery>,
) -> Result<Json<TransectResponse>, ApiError> {
    let url = required(query.url, "url")?;
    let start = query_point(query.start_lat, query.start_lon, "start_lat", "start_lon")?;
    let end = query_point(query.end_lat, query.end_lon, "end_lat", "end_lon")?;

    let transect = state.sampler.sample_transect(&url, start, end).await;
    if transect.is_empty() {
        return Err(ApiError::not_found("No valid data along transect"));
    }

    Ok(Json(TransectResponse {
        values: transect.values,
        distances: transect.distances,
        start_point: start,
        end_point: end,
    }))
}
