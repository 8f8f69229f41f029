use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use lumenstat_core::RangeError;

/// Application-level errors that map directly to HTTP responses.
///
/// Every variant implements [`IntoResponse`] so Axum handlers can use
/// `Result<impl IntoResponse, AppError>` as their return type.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("not found: {0}")]
    NotFound(String),

    /// The request body was not a JSON object of the expected shape.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// The date selection could not be resolved.
    #[error(transparent)]
    Range(#[from] RangeError),
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        let message = match &rejection {
            JsonRejection::JsonSyntaxError(_) => "Invalid JSON syntax".to_string(),
            JsonRejection::MissingJsonContentType(_) => {
                "Missing Content-Type: application/json header".to_string()
            }
            _ => rejection.body_text(),
        };
        AppError::BadRequest(message)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message, field) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg.clone(), None),
            AppError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, "invalid_body", msg.clone(), None)
            }
            AppError::Range(err) => {
                tracing::debug!(code = err.code(), error = %err, "Rejected date selection");
                (
                    StatusCode::BAD_REQUEST,
                    err.code(),
                    err.to_string(),
                    err.field(),
                )
            }
        };

        (
            status,
            Json(json!({
                "error": {
                    "code": code,
                    "message": message,
                    "field": field
                }
            })),
        )
            .into_response()
    }
}
