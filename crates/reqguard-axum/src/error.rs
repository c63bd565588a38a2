//! # Middleware Error Types
//!
//! Failures of the middleware itself, as opposed to validation failures:
//! an unreadable or oversized body, a schema that does not compile, an
//! accessor used on a route without the middleware. Each maps to a
//! structured JSON error response. Internal details are logged, never
//! returned to the client.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Structured JSON error response body.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

/// Inner error detail.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g. "BAD_REQUEST").
    pub code: String,
    /// Human-readable error message.
    pub message: String,
}

/// Middleware error that implements [`IntoResponse`].
#[derive(Error, Debug)]
pub enum AppError {
    /// The request body could not be read or decoded (400).
    #[error("bad request: {0}")]
    BadRequest(String),

    /// The request body exceeded the configured limit (413).
    #[error("request body exceeds {0} bytes")]
    PayloadTooLarge(usize),

    /// Misconfiguration or an internal fault (500). The message is logged
    /// but not returned to the client.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// HTTP status and machine-readable code for this error.
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            Self::PayloadTooLarge(_) => (StatusCode::PAYLOAD_TOO_LARGE, "PAYLOAD_TOO_LARGE"),
            Self::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        let message = match &self {
            Self::Internal(_) => {
                tracing::error!(error = %self, "internal error in request validation");
                "An internal error occurred".to_string()
            }
            other => other.to_string(),
        };

        let body = ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                message,
            },
        };
        (status, Json(body)).into_response()
    }
}

impl From<reqguard_schema::SchemaError> for AppError {
    fn from(err: reqguard_schema::SchemaError) -> Self {
        Self::Internal(err.to_string())
    }
}
