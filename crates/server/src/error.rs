// crates/server/src/error.rs
use std::path::PathBuf;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use hypercontacts_core::{ContactError, FieldErrors};
use serde::Serialize;
use thiserror::Error;

/// Structured JSON error response for API errors
#[derive(Debug, Serialize)]
#[cfg_attr(test, derive(serde::Deserialize))]
pub struct ErrorResponse {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: None,
        }
    }

    pub fn with_details(error: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: Some(details.into()),
        }
    }
}

/// Body of a 422 response: a summary plus one message per invalid field.
#[derive(Debug, Serialize)]
#[cfg_attr(test, derive(serde::Deserialize))]
pub struct ValidationResponse {
    pub message: String,
    pub errors: FieldErrors,
}

/// API error types that map to HTTP status codes
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Contact not found: {0}")]
    ContactNotFound(u64),

    #[error("Validation failed: {message}")]
    Validation { message: String, errors: FieldErrors },

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Archive not ready")]
    ArchiveNotReady,

    #[error("Archive file missing: {}", .0.display())]
    ArchiveFileMissing(PathBuf),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl From<ContactError> for ApiError {
    fn from(err: ContactError) -> Self {
        match err {
            ContactError::NotFound(id) => Self::ContactNotFound(id),
            ContactError::Invalid(errors) => Self::Validation {
                message: "Please correct the errors below".to_string(),
                errors,
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_response) = match self {
            ApiError::ContactNotFound(id) => {
                tracing::warn!(contact_id = id, "Contact not found");
                (
                    StatusCode::NOT_FOUND,
                    ErrorResponse::with_details("Contact not found", format!("Contact ID: {id}")),
                )
            }
            ApiError::Validation { message, errors } => {
                tracing::debug!(fields = ?errors.keys().collect::<Vec<_>>(), "Validation failed");
                return (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    Json(ValidationResponse { message, errors }),
                )
                    .into_response();
            }
            ApiError::BadRequest(msg) => {
                tracing::warn!(message = %msg, "Bad request");
                (
                    StatusCode::BAD_REQUEST,
                    ErrorResponse::with_details("Bad request", msg),
                )
            }
            ApiError::ArchiveNotReady => {
                tracing::debug!("Archive download requested before completion");
                (
                    StatusCode::CONFLICT,
                    ErrorResponse::with_details("Archive not ready", "Start an archive and wait for it to finish"),
                )
            }
            ApiError::ArchiveFileMissing(path) => {
                tracing::error!(path = %path.display(), "Archive file missing");
                (
                    StatusCode::NOT_FOUND,
                    ErrorResponse::new("Archive file missing"),
                )
            }
            ApiError::Internal(msg) => {
                tracing::error!(message = %msg, "Internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse::new("Internal server error"),
                )
            }
        };

        (status, Json(error_response)).into_response()
    }
}

/// Result type alias for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
