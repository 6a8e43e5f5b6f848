//! Time series handler: one raster per day from the URL template.

use std::sync::Arc;

use axum::{
    extract::{Extension, Query},
    Json,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tokio::{sync::Semaphore, task::JoinSet};
use tracing::{debug, warn};

use raster_common::{expand_date_range, GeoPoint, DATE_FORMAT};
use raster_sampler::Sample;

use super::query_point;
use crate::error::{required, ApiError};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct TimeseriesQuery {
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub variable: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TimeseriesResponse {
    pub values: Vec<f64>,
    pub dates: Vec<String>,
    pub location: GeoPoint,
    pub variable: String,
}

/// GET /get_timeseries
///
/// Days whose raster is missing or has no data at the point are skipped.
pub async fn timeseries_handler(
    Extension(state): Extension<Arc<AppState>>,
    Query(query): Query<TimeseriesQuery>,
) -> Result<Json<TimeseriesResponse>, ApiError> {
    let point = query_point(query.lat, query.lon, "lat", "lon")?;
    let variable = required(query.variable, "variable")?;
    let start = required(query.start_date, "start_date")?;
    let end = required(query.end_date, "end_date")?;

    let days = expand_date_range(&start, &end).map_err(|e| ApiError::bad_request(e.to_string()))?;
    if days.len() > state.config.max_timeseries_days {
        return Err(ApiError::bad_request(format!(
            "Date range spans {} days, maximum is {}",
            days.len(),
            state.config.max_timeseries_days
        )));
    }

    let samples = sample_days(&state, &days, &variable, point).await;
    let (dates, values): (Vec<String>, Vec<f64>) = samples
        .into_iter()
        .filter_map(|(day, sample)| sample.value().map(|v| (day.format(DATE_FORMAT).to_string(), v)))
        .unzip();

    debug!(
        variable = %variable,
        days = days.len(),
        found = values.len(),
        "Time series sampled"
    );

    if values.is_empty() {
        return Err(ApiError::not_found(
            "No data available for the selected date range",
        ));
    }

    Ok(Json(TimeseriesResponse {
        values,
        dates,
        location: point,
        variable,
    }))
}

/// Sample every day with bounded concurrency, returned in date order.
async fn sample_days(
    state: &AppState,
    days: &[NaiveDate],
    variable: &str,
    point: GeoPoint,
) -> Vec<(NaiveDate, Sample)> {
    let permits = Arc::new(Semaphore::new(state.config.timeseries_concurrency));
    let mut tasks = JoinSet::new();

    for &day in days {
        let url = state.url_template.format(day, variable);
        let sampler = state.sampler.clone();
        let permits = Arc::clone(&permits);
        tasks.spawn(async move {
            let _permit = permits.acquire_owned().await;
            (day, sampler.sample_point(&url, point).await)
        });
    }

    let mut samples = Vec::with_capacity(days.len());
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(sample) => samples.push(sample),
            Err(e) => warn!(error = %e, "Time series task failed"),
        }
    }
    samples.sort_by_key(|(day, _)| *day);
    samples
}
