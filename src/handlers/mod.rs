pub mod latency;
pub mod stats;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

// ─── Unified error type ──────────────────────────────────────────

#[derive(Debug)]
pub enum AppError {
    BadRequest(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
        };

        let body = serde_json::json!({
            "error":  message,
            "status": status.as_u16(),
        });

        (status, Json(body)).into_response()
    }
}
