//! JSON envelopes shared by every route.

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::{SecondsFormat, Utc};
use goglobal_core::analysis::orchestrator::MarketResults;
use goglobal_core::validate::ValidationError;
use serde::Serialize;

/// ISO-8601 UTC with millisecond precision.
pub fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[derive(Debug, Serialize)]
pub struct AnalyzeData {
    pub markets: MarketResults,
}

#[derive(Debug, Serialize)]
pub struct AnalyzeResponse {
    pub success: bool,
    pub data: AnalyzeData,
    pub timestamp: String,
}

impl AnalyzeResponse {
    pub fn new(markets: MarketResults) -> Self {
        Self {
            success: true,
            data: AnalyzeData { markets },
            timestamp: timestamp(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub success: bool,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    pub timestamp: String,
}

impl ErrorBody {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: error.into(),
            path: None,
            timestamp: timestamp(),
        }
    }
}

#[derive(Debug)]
pub enum ApiError {
    Validation(ValidationError),
    BadRequest(String),
    RateLimited { retry_after_secs: u64 },
    NotFound { path: String },
    /// Unexpected failure. `expose` puts the error chain in the body.
    Internal { error: anyhow::Error, expose: bool },
}

impl ApiError {
    pub fn internal(error: anyhow::Error, expose: bool) -> Self {
        Self::Internal { error, expose }
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        Self::Validation(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Validation(err) => {
                (StatusCode::BAD_REQUEST, Json(ErrorBody::new(err.to_string()))).into_response()
            }
            ApiError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, Json(ErrorBody::new(msg))).into_response()
            }
            ApiError::RateLimited { retry_after_secs } => {
                let mut res = (
                    StatusCode::TOO_MANY_REQUESTS,
                    Json(ErrorBody::new("Rate limit exceeded. Please try again later.")),
                )
                    .into_response();
                res.headers_mut()
                    .insert(header::RETRY_AFTER, HeaderValue::from(retry_after_secs));
                res
            }
            ApiError::NotFound { path } => {
                let body = ErrorBody {
                    path: Some(path),
                    ..ErrorBody::new("Endpoint not found")
                };
                (StatusCode::NOT_FOUND, Json(body)).into_response()
            }
            ApiError::Internal { error, expose } => {
                sentry_anyhow::capture_anyhow(&error);
                tracing::error!(error = %format!("{error:#}"), "request failed");
                let msg = if expose {
                    format!("{error:#}")
                } else {
                    "Internal server error".to_string()
                };
                (StatusCode::INTERNAL_SERVER_ERROR, Json(ErrorBody::new(msg))).into_response()
            }
        }
    }
}
