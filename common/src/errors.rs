use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::error;

use crate::models::ErrorBody;

pub const INTERNAL_ERROR_MESSAGE: &str = "Internal Server Error";
pub const RATE_LIMITED_MESSAGE: &str = "Too many requests, please try again later.";
pub const NOT_FOUND_MESSAGE: &str = "Not Found";

/// Failures talking to the upstream weather provider
#[derive(Error, Debug)]
pub enum UpstreamError {
    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("provider responded with HTTP {status}")]
    Status { status: u16 },

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("malformed provider payload: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid request URL: {0}")]
    InvalidUrl(String),

    #[error("could not build HTTP client: {0}")]
    Build(String),
}

/// Failures talking to the cache store. Always recovered by the orchestrator.
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("cache connection failed: {0}")]
    Connection(String),

    #[error("cache operation timed out after {0} ms")]
    Timeout(u64),

    #[error("cache command failed: {0}")]
    Command(String),
}

/// Closed error taxonomy for the service.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Upstream error: {0}")]
    UpstreamError(#[from] UpstreamError),

    #[error("Cache unavailable: {0}")]
    CacheUnavailable(#[from] CacheError),

    #[error("Rate limit exceeded")]
    RateLimited,

    #[error("Route not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::ValidationError(message.into())
    }

    pub fn not_found(path: impl Into<String>) -> Self {
        Self::NotFound(path.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::InternalError(message.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_) => StatusCode::BAD_REQUEST,
            AppError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::UpstreamError(_)
            | AppError::CacheUnavailable(_)
            | AppError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message exposed to clients. Server-side failures never leak detail.
    pub fn public_message(&self) -> String {
        match self {
            AppError::ValidationError(message) => message.clone(),
            AppError::RateLimited => RATE_LIMITED_MESSAGE.to_string(),
            AppError::NotFound(_) => NOT_FOUND_MESSAGE.to_string(),
            AppError::UpstreamError(_)
            | AppError::CacheUnavailable(_)
            | AppError::InternalError(_) => INTERNAL_ERROR_MESSAGE.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if status.is_server_error() {
            error!(error = %self, "Unhandled error");
        }

        let body = Json(ErrorBody {
            success: false,
            message: self.public_message(),
        });

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_errors_keep_their_message() {
        let err = AppError::validation("City query parameter is required");
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.public_message(), "City query parameter is required");
    }

    #[test]
    fn upstream_errors_are_opaque() {
        let err = AppError::from(UpstreamError::Status { status: 401 });
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.public_message(), INTERNAL_ERROR_MESSAGE);
    }

    #[test]
    fn internal_errors_do_not_leak_detail() {
        let err = AppError::internal("connection string redis://secret@host");
        assert_eq!(err.public_message(), INTERNAL_ERROR_MESSAGE);
    }

    #[test]
    fn rate_limited_maps_to_429() {
        assert_eq!(
            AppError::RateLimited.status_code(),
            StatusCode::TOO_MANY_REQUESTS
        );
    }
}
