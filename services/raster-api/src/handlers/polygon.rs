//! Polygon statistics handler.

use std::sync::Arc;

use axum::{extract::Extension, Json};
use serde::Deserialize;
use serde_json::Value;

use raster_sampler::ZonalStatistics;

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct PolygonRequest {
    pub url: String,
    /// GeoJSON Polygon, MultiPolygon or Feature.
    pub polygon: Value,
}

/// POST /get_polygon_stats
pub async fn polygon_stats_handler(
    Extension(state): Extension<Arc<AppState>>,
    Json(request): Json<PolygonRequest>,
) -> Result<Json<ZonalStatistics>, ApiError> {
    let stats = state
        .sampler
        .aggregate_polygon(&request.url, &request.polygon)
        .await?;
    Ok(Json(stats))
}
