//! API error types mapped to HTTP status codes.
//!
//! Each [`ApiError`] variant maps to a specific HTTP status code and produces
//! a JSON response body `{"error": "message"}`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use retrieval_core::{ErrorKind, IndexError};
use serde_json::json;

/// Application-level error type that implements `IntoResponse`.
///
/// - `BadRequest` → 400
/// - `Conflict` → 409
/// - `Internal` → 500
#[derive(Debug)]
pub enum ApiError {
    /// Invalid request parameters (400).
    BadRequest(String),
    /// Operation not valid in the index's current phase (409).
    Conflict(String),
    /// Unexpected server error (500).
    Internal(String),
}

impl From<IndexError> for ApiError {
    fn from(err: IndexError) -> Self {
        match err.kind() {
            ErrorKind::Configuration | ErrorKind::Capacity => ApiError::BadRequest(err.to_string()),
            ErrorKind::State => ApiError::Conflict(err.to_string()),
            ErrorKind::Io | ErrorKind::Internal => {
                tracing::error!(error = %err, "search failed");
                ApiError::Internal("Internal error".into())
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };
        let body = axum::Json(json!({ "error": message }));
        (status, body).into_response()
    }
}
