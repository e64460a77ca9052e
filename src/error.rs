//! Domain-specific error types for pose-coach

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// Main error type for the coach server and client
#[derive(Error, Debug)]
pub enum CoachError {
    #[error("Database error: {message}")]
    Database { message: String },

    #[error("Generation error: {message}")]
    Generation { message: String },

    #[error("Serialization error: {message}")]
    Serialization { message: String },

    #[error("Not found: {message}")]
    NotFound { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl From<anyhow::Error> for CoachError {
    fn from(err: anyhow::Error) -> Self {
        CoachError::Internal {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for CoachError {
    fn from(err: serde_json::Error) -> Self {
        CoachError::Serialization {
            message: err.to_string(),
        }
    }
}

impl From<rusqlite::Error> for CoachError {
    fn from(err: rusqlite::Error) -> Self {
        CoachError::Database {
            message: err.to_string(),
        }
    }
}

impl From<reqwest::Error> for CoachError {
    fn from(err: reqwest::Error) -> Self {
        CoachError::Generation {
            message: format!("HTTP request failed: {}", err),
        }
    }
}

impl From<crate::clients::GenerationError> for CoachError {
    fn from(err: crate::clients::GenerationError) -> Self {
        CoachError::Generation {
            message: err.to_string(),
        }
    }
}

/// Convert CoachError to an HTTP response with a JSON `{error}` body
impl IntoResponse for CoachError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            CoachError::Database { message } => (StatusCode::INTERNAL_SERVER_ERROR, message),
            CoachError::Generation { message } => (StatusCode::BAD_GATEWAY, message),
            CoachError::Serialization { message } => (StatusCode::BAD_REQUEST, message),
            CoachError::NotFound { message } => (StatusCode::NOT_FOUND, message),
            CoachError::Internal { message } => (StatusCode::INTERNAL_SERVER_ERROR, message),
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

/// Result type alias for pose-coach operations
pub type Result<T> = std::result::Result<T, CoachError>;
