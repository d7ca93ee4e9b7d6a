//! Error types and their HTTP mapping

use axum::{
    extract::rejection::JsonRejection,
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

/// Crate-wide result alias
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("{0}")]
    Provider(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Admission rejected by the rate limiter
    #[error("Rate limit exceeded")]
    RateLimited {
        remaining: u32,
        reset_time: Option<DateTime<Utc>>,
    },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// HTTP status this error maps to
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            AppError::Provider(_) | AppError::HttpClient(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Config(_) | AppError::Storage(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::InvalidRequest(rejection.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if let AppError::RateLimited { remaining, reset_time } = &self {
            let mut headers = HeaderMap::new();
            headers.insert("x-ratelimit-remaining", HeaderValue::from(*remaining));
            if let Some(reset) = reset_time {
                if let Ok(value) = HeaderValue::from_str(&reset.to_rfc3339()) {
                    headers.insert("x-ratelimit-reset", value);
                }
            }
            let body = json!({
                "error": "Rate limit exceeded",
                "message": "Too many requests. Please try again later.",
                "remaining": remaining,
                "resetTime": reset_time,
            });
            return (status, headers, Json(body)).into_response();
        }

        if status.is_server_error() {
            error!(error = %self, "Request failed");
        } else {
            warn!(error = %self, "Request rejected");
        }

        let label = match &self {
            AppError::InvalidRequest(_) => "Validation failed",
            AppError::NotFound(_) => "Not found",
            AppError::Provider(_) | AppError::HttpClient(_) => "External service error",
            _ => "Internal server error",
        };

        let body = json!({
            "error": label,
            "message": self.to_string(),
            "status": status.as_u16(),
            "timestamp": Utc::now(),
        });

        (status, Json(body)).into_response()
    }
}
