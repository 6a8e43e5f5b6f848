//! In-situ observation handlers.

use std::sync::Arc;

use axum::{
    extract::{Extension, Query},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::error::{required, ApiError};
use crate::insitu::{normalize_date, InsituTable, Observation};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct InsituQuery {
    pub variable: Option<String>,
    pub date: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct InsituResponse {
    pub data: Vec<Observation>,
    pub variable: String,
    pub date: String,
}

#[derive(Debug, Serialize)]
pub struct AvailableDatesResponse {
    pub dates: Vec<String>,
    pub variable: String,
}

fn table(state: &AppState) -> Result<&InsituTable, ApiError> {
    state
        .insitu
        .as_deref()
        .ok_or_else(|| ApiError::unavailable("In-situ data is not loaded").with_detail())
}

/// GET /get_insitu_data
pub async fn insitu_data_handler(
    Extension(state): Extension<Arc<AppState>>,
    Query(query): Query<InsituQuery>,
) -> Result<Json<InsituResponse>, ApiError> {
    let table = table(&state)?;
    let variable = required(query.variable, "variable").map_err(ApiError::with_detail)?;
    let raw_date = required(query.date, "date").map_err(ApiError::with_detail)?;
    let date = normalize_date(&raw_date).ok_or_else(|| {
        ApiError::bad_request(format!("Invalid date: {}", raw_date)).with_detail()
    })?;

    Ok(Json(InsituResponse {
        data: table.observations(&variable, &date).to_vec(),
        variable,
        date,
    }))
}

/// GET /get_available_dates
pub async fn available_dates_handler(
    Extension(state): Extension<Arc<AppState>>,
    Query(query): Query<InsituQuery>,
) -> Result<Json<AvailableDatesResponse>, ApiError> {
    let table = table(&state)?;
    let variable = required(query.variable, "variable").map_err(ApiError::with_detail)?;

    Ok(Json(AvailableDatesResponse {
        dates: table.available_dates(&variable),
        variable,
    }))
}
