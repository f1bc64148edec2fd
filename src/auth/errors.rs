//! Authentication error types.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

/// Internal auth error kind used by the core authentication logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthErrorKind {
    /// No `Authorization: Bearer` credential on the request
    MissingCredential,
    /// Token is in the revocation store
    RevokedToken,
    /// Malformed, expired, or bad-signature token
    InvalidToken,
    /// Authenticated but lacking the required role
    Forbidden,
    /// Revocation store lookup failed
    StoreError,
}

/// Rejection for the auth extractors; renders the uniform error envelope.
#[derive(Debug)]
pub struct ApiAuthError(pub AuthErrorKind);

impl ApiAuthError {
    fn status_code(&self) -> StatusCode {
        match self.0 {
            AuthErrorKind::MissingCredential | AuthErrorKind::InvalidToken => {
                StatusCode::UNAUTHORIZED
            }
            AuthErrorKind::RevokedToken | AuthErrorKind::Forbidden => StatusCode::FORBIDDEN,
            AuthErrorKind::StoreError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn message(&self) -> &'static str {
        match self.0 {
            AuthErrorKind::MissingCredential => "Token required",
            AuthErrorKind::RevokedToken => "Token has been blacklisted",
            AuthErrorKind::InvalidToken => "Invalid or expired token",
            AuthErrorKind::Forbidden => "You are not allowed to perform this action",
            AuthErrorKind::StoreError => "Internal server error",
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    status: &'static str,
    message: &'static str,
    code: u16,
    data: Option<()>,
}

impl IntoResponse for ApiAuthError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorBody {
            status: if status.is_client_error() {
                "fail"
            } else {
                "error"
            },
            message: self.message(),
            code: status.as_u16(),
            data: None,
        };
        (status, Json(body)).into_response()
    }
}
