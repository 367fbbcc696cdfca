use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use nanodc_core::error::CoreError;
use nanodc_store::StoreError;

/// Application-level error type for HTTP handlers.
///
/// Implements [`IntoResponse`] to produce consistent JSON error responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            // --- CoreError variants ---
            AppError::Core(core) => match core {
                CoreError::Validation(msg) => {
                    (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
                }
                CoreError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg.clone()),
                CoreError::OverrideTable(_) | CoreError::Io(_) => internal(&self),
            },

            // --- Settings store ---
            AppError::Store(store) => match store {
                StoreError::UnknownKey(key) => (
                    StatusCode::NOT_FOUND,
                    "NOT_FOUND",
                    format!("Unknown setting {key}"),
                ),
                StoreError::InvalidValue { .. } => {
                    (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", store.to_string())
                }
                StoreError::Io(_) | StoreError::Encoding(_) => internal(&self),
            },

            // --- HTTP-specific errors ---
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            AppError::InternalError(_) => internal(&self),
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}

fn internal(err: &AppError) -> (StatusCode, &'static str, String) {
    tracing::error!(error = %err, "Internal error");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "INTERNAL_ERROR",
        "An internal error occurred".to_string(),
    )
}
