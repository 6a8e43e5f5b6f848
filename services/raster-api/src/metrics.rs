//! Per-endpoint request metrics.

use std::time::Instant;

use axum::{
    extract::{MatchedPath, Request},
    middleware::Next,
    response::Response,
};
use metrics::{counter, histogram};

pub const REQUESTS_TOTAL: &str = "raster_api_requests_total";
pub const REQUEST_DURATION_SECONDS: &str = "raster_api_request_duration_seconds";

/// Record a request count and latency labelled by route and status.
pub async fn track_requests(request: Request, next: Next) -> Response {
    let endpoint = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());
    let start = Instant::now();

    let response = next.run(request).await;

    let status = response.status().as_u16().to_string();
    counter!(REQUESTS_TOTAL, "endpoint" => endpoint.clone(), "status" => status).increment(1);
    histogram!(REQUEST_DURATION_SECONDS, "endpoint" => endpoint)
        .record(start.elapsed().as_secs_f64());

    response
}
