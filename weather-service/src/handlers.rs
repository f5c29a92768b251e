use axum::{
    extract::{Query, State, rejection::QueryRejection},
    http::Uri,
    response::Json,
};
use common::errors::AppError;
use common::models::RetrievalResult;
use std::sync::Arc;
use tracing::{debug, info};

use crate::service::WeatherService;
use crate::validation::{WeatherParams, validate};

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<WeatherService>,
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service health check")
    )
)]
pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok", "service": "weather-service" }))
}

#[utoipa::path(
    get,
    path = "/api/weather",
    params(WeatherParams),
    responses(
        (status = 200, description = "Weather data for the city", body = RetrievalResult),
        (status = 400, description = "Missing or empty city", body = common::models::ErrorBody),
        (status = 429, description = "Rate limit exceeded", body = common::models::ErrorBody),
        (status = 500, description = "Internal server error", body = common::models::ErrorBody)
    ),
    tag = "weather"
)]
pub async fn get_weather(
    State(state): State<AppState>,
    params: Result<Query<WeatherParams>, QueryRejection>,
) -> Result<Json<RetrievalResult>, AppError> {
    let query = validate(params_or_default(params))?;

    info!(city = %query.city(), "Weather request received");

    let result = state.service.get_weather(&query).await?;

    Ok(Json(result))
}

/// A query string that fails to deserialize is treated as one without a city.
fn params_or_default(params: Result<Query<WeatherParams>, QueryRejection>) -> WeatherParams {
    match params {
        Ok(Query(params)) => params,
        Err(rejection) => {
            debug!(error = %rejection.body_text(), "Rejected weather query string");
            WeatherParams::default()
        }
    }
}

pub async fn not_found(uri: Uri) -> AppError {
    AppError::not_found(uri.path())
}
