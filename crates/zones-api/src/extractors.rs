//! # Request Extraction Helpers
//!
//! Handlers take `Result<Json<T>, JsonRejection>` and pass it through
//! [`extract_json`], so every malformed body becomes the same
//! "serialization error" response.

use axum::extract::rejection::JsonRejection;
use axum::Json;
use zones_core::ValidationError;

use crate::error::AppError;

/// Extract a JSON body, mapping any rejection to
/// [`ValidationError::Serialization`].
pub fn extract_json<T>(result: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    result.map(|Json(v)| v).map_err(|rejection| {
        tracing::debug!(reason = %rejection.body_text(), "request body rejected");
        AppError::Validation(ValidationError::Serialization)
    })
}
