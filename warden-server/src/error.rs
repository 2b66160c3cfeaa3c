//! Error types for the warden server.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

/// Errors that can occur while handling a request.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Error surfaced by the governance pipeline or permission manager.
    #[error("{0}")]
    Core(#[from] warden_core::Error),

    /// The requested resource does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid request from the client.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ServerError::Core(e) if e.is_invalid_role() => {
                (StatusCode::BAD_REQUEST, e.to_string())
            }
            ServerError::Core(e) if e.is_recommendation() => {
                (StatusCode::CONFLICT, e.to_string())
            }
            ServerError::Core(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
            ServerError::NotFound(e) => (StatusCode::NOT_FOUND, e.clone()),
            ServerError::InvalidRequest(e) => (StatusCode::BAD_REQUEST, e.clone()),
        };

        let body = Json(serde_json::json!({
            "error": message,
            "code": status.as_u16(),
        }));

        (status, body).into_response()
    }
}

/// Result type alias for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
