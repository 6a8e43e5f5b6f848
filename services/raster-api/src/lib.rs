//! Raster API Service Library
//!
//! HTTP endpoints for sampling daily ocean-color GeoTIFFs by point,
//! transect, date range and polygon, plus in-situ observation lookups.

pub mod config;
pub mod error;
pub mod handlers;
pub mod insitu;
pub mod metrics;
pub mod state;
pub mod url_template;

use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Extension, Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};

use crate::state::AppState;

/// Build the application router.
///
/// `/metrics` answers 503 when no Prometheus recorder is supplied.
pub fn build_router(state: Arc<AppState>, prometheus: Option<PrometheusHandle>) -> Router {
    let mut app = Router::new()
        // Raster sampling
        .route("/get_value", get(handlers::value::value_handler))
        .route("/get_transect", get(handlers::transect::transect_handler))
        .route(
            "/get_timeseries",
            get(handlers::timeseries::timeseries_handler),
        )
        .route(
            "/get_polygon_stats",
            post(handlers::polygon::polygon_stats_handler),
        )
        // In-situ observations
        .route(
            "/get_insitu_data",
            get(handlers::insitu::insitu_data_handler),
        )
        .route(
            "/get_available_dates",
            get(handlers::insitu::available_dates_handler),
        )
        // Health and metrics
        .route("/health", get(handlers::health::health_handler))
        .route("/ready", get(handlers::health::ready_handler))
        .route("/metrics", get(handlers::health::metrics_handler))
        // Middleware
        .layer(middleware::from_fn(crate::metrics::track_requests))
        .layer(Extension(state));

    if let Some(handle) = prometheus {
        app = app.layer(Extension(handle));
    }

    app.layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
}
