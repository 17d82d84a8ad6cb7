//! Server-specific error types
//!
//! One crate-wide error type with a stable error code per variant. Caller
//! facing messages stay generic for infrastructure failures; the detail goes
//! to the log.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;
use uuid::Uuid;

use crate::api::response::ErrorResponse;

/// Result type alias for server operations
pub type AppResult<T> = std::result::Result<T, AppError>;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Import job not found: {0}")]
    JobNotFound(Uuid),

    #[error("File too large: {0}")]
    FileTooLarge(String),

    #[error("Unsupported content type: {0}")]
    UnsupportedContentType(String),

    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Kodepos error: {0}")]
    Common(#[from] kodepos_common::KodeposError),
}

impl AppError {
    /// Stable machine-readable code for the error category.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Database(_) => "INTERNAL_ERROR",
            AppError::JobNotFound(_) => "JOB_NOT_FOUND",
            AppError::FileTooLarge(_) => "FILE_TOO_LARGE",
            AppError::UnsupportedContentType(_) => "UNSUPPORTED_CONTENT_TYPE",
            AppError::MalformedPayload(_) => "MALFORMED_PAYLOAD",
            AppError::InvalidConfiguration(_) => "INVALID_CONFIGURATION",
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::BadRequest(_) => "BAD_REQUEST",
            AppError::Internal(_) => "INTERNAL_ERROR",
            AppError::Io(_) => "INTERNAL_ERROR",
            AppError::Common(_) => "INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let code = self.code();
        let (status, message) = match self {
            AppError::Database(ref e) => {
                tracing::error!("Database error: {:?}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "A database error occurred".to_string())
            },
            AppError::JobNotFound(id) => {
                (StatusCode::NOT_FOUND, format!("Import job '{}' not found", id))
            },
            AppError::FileTooLarge(msg) => (StatusCode::PAYLOAD_TOO_LARGE, msg),
            AppError::UnsupportedContentType(msg) => (StatusCode::UNSUPPORTED_MEDIA_TYPE, msg),
            AppError::MalformedPayload(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::InvalidConfiguration(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg),
            AppError::Validation(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Internal(ref msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "An internal error occurred".to_string())
            },
            AppError::Io(ref e) => {
                tracing::error!("IO error: {:?}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "An IO error occurred".to_string())
            },
            AppError::Common(ref e) => {
                tracing::error!("Kodepos error: {:?}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "An internal error occurred".to_string())
            },
        };

        (status, Json(ErrorResponse::new(code, message))).into_response()
    }
}
