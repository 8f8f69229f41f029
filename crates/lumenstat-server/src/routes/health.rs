use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

/// `GET /health`: liveness check.
///
/// The server holds no connections, so reaching the handler means it is up.
///
/// Response shape:
/// ```json
/// { "status": "ok", "version": "0.1.0" }
/// ```
#[tracing::instrument]
pub async fn health() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(json!({
            "status": "ok",
            "version": env!("CARGO_PKG_VERSION")
        })),
    )
}
