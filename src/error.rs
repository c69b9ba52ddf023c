//! Error types for kitchen_inventory

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde_json::json;
use thiserror::Error;

/// Unified error type for request handling
#[derive(Debug, Error)]
pub enum AppError {
    /// Client sent missing or invalid data
    #[error("{0}")]
    Validation(String),
    /// Requested row does not exist
    #[error("{0}")]
    NotFound(String),
    /// Database operation failed
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
}

/// Result alias for repository and handler operations
pub type Result<T> = std::result::Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, message) = match self {
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "Bad Request", msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "Not Found", msg),
            AppError::Database(e) => {
                // Detail stays in the log, never in the response body.
                log::error!("Database error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal Server Error",
                    "An unexpected error occurred.".to_string(),
                )
            }
        };
        (status, Json(json!({ "error": error, "message": message }))).into_response()
    }
}
