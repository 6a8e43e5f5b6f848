//! HTTP error mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use raster_sampler::ZonalError;

/// An error returned to the client as `{"error": "<reason>"}`.
///
/// Routes consumed by the map frontend also carry the reason under
/// `detail`.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
    pub include_detail: bool,
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    detail: Option<&'a str>,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            include_detail: false,
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(StatusCode::SERVICE_UNAVAILABLE, message)
    }

    /// Also emit the reason under `detail`.
    pub fn with_detail(mut self) -> Self {
        self.include_detail = true;
        self
    }

    /// Reject a missing query parameter.
    pub fn missing(name: &str) -> Self {
        Self::bad_request(format!("Missing required parameter: {}", name))
    }
}

impl From<ZonalError> for ApiError {
    fn from(err: ZonalError) -> Self {
        let status =
            StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            tracing::error!(error = %err, "Polygon aggregation failed");
        }
        Self::new(status, err.to_string()).with_detail()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: &self.message,
            detail: self.include_detail.then_some(self.message.as_str()),
        };
        (self.status, Json(body)).into_response()
    }
}

/// Unwrap a required query parameter.
pub fn required<T>(value: Option<T>, name: &str) -> Result<T, ApiError> {
    value.ok_or_else(|| ApiError::missing(name))
}
