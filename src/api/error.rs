//! Shared error handling for API endpoints.
//!
//! Every failure is surfaced with a stable status/message/code triple in the
//! uniform error envelope; nothing is silently swallowed and nothing is
//! retried. Unclassified failures degrade to a generic 500.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tracing::error;

use crate::category::InvalidCategory;
use crate::pagination::PaginationError;

/// Extension trait for concise error mapping on Results.
pub trait ResultExt<T> {
    fn db_err(self, msg: &str) -> Result<T, ApiError>;
}

impl<T, E: std::fmt::Display> ResultExt<T> for Result<T, E> {
    fn db_err(self, msg: &str) -> Result<T, ApiError> {
        self.map_err(|e| ApiError::db_error(msg, e))
    }
}

/// API error taxonomy with automatic response conversion.
pub enum ApiError {
    /// Malformed input (400)
    Validation(String),
    /// No or invalid credential (401)
    Unauthenticated(String),
    /// Role or ownership mismatch (403)
    Forbidden(String),
    /// Resource absent or filtered out (404)
    NotFound(String),
    /// Page beyond bounds (404, carries the valid page count)
    OutOfRange { total_pages: i64 },
    /// Duplicate unique field (409)
    Conflict(String),
    /// Unexpected failure (500); the message never leaks internals
    Internal(String),
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::Unauthenticated(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn db_error(context: &str, e: impl std::fmt::Display) -> Self {
        error!("{}: {}", context, e);
        Self::Internal("Database error".into())
    }
}

impl From<PaginationError> for ApiError {
    fn from(err: PaginationError) -> Self {
        match err {
            PaginationError::OutOfRange { total_pages } => ApiError::OutOfRange { total_pages },
            other => ApiError::Validation(other.to_string()),
        }
    }
}

impl From<InvalidCategory> for ApiError {
    fn from(err: InvalidCategory) -> Self {
        ApiError::Validation(err.to_string())
    }
}

#[derive(Serialize)]
struct ErrorBody {
    status: &'static str,
    message: String,
    code: u16,
    data: Option<()>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Validation(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Unauthenticated(msg) => (StatusCode::UNAUTHORIZED, msg),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::OutOfRange { total_pages } => (
                StatusCode::NOT_FOUND,
                format!("There are only {} page(s)", total_pages),
            ),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = ErrorBody {
            status: if status.is_client_error() {
                "fail"
            } else {
                "error"
            },
            message,
            code: status.as_u16(),
            data: None,
        };
        (status, Json(body)).into_response()
    }
}

/// Validate a UUID string format.
pub fn validate_uuid(uuid: &str) -> Result<(), ApiError> {
    if uuid.is_empty() {
        return Err(ApiError::bad_request("ID is required"));
    }
    if uuid::Uuid::parse_str(uuid).is_err() {
        return Err(ApiError::bad_request("Invalid UUID"));
    }
    Ok(())
}
