//! # API Error Types
//!
//! Maps validation, store, and batch failures to HTTP responses. Every error
//! body is `{"error": "<message>"}`. Client errors carry the exact
//! validation message; internal failures are logged and replaced with a
//! generic message.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use zones_batch::BatchError;
use zones_core::ValidationError;
use zones_store::StoreError;

/// JSON error response body.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

/// Application-level error type that implements [`IntoResponse`].
#[derive(Error, Debug)]
pub enum AppError {
    /// Request rejected by validation (400).
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The spatial engine rejected a geometry (400). The message is the
    /// engine's own.
    #[error("{0}")]
    GeometryRejected(String),

    /// Store, connection, or worker failure (500). Never shown to clients.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// HTTP status and a machine-readable code for logs.
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            Self::GeometryRejected(_) => (StatusCode::BAD_REQUEST, "GEOMETRY_REJECTED"),
            Self::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        let message = match &self {
            Self::Internal(_) => {
                tracing::error!(error = %self, code, "internal server error");
                "An internal error occurred".to_string()
            }
            other => {
                tracing::debug!(error = %other, code, "request rejected");
                other.to_string()
            }
        };

        (status, Json(ErrorBody { error: message })).into_response()
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::GeometryRejected { message } => Self::GeometryRejected(message),
            other => Self::Internal(other.to_string()),
        }
    }
}

impl From<BatchError> for AppError {
    fn from(err: BatchError) -> Self {
        match err {
            BatchError::Validation(err) => Self::Validation(err),
            other => Self::Internal(other.to_string()),
        }
    }
}
