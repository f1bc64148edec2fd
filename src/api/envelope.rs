//! The uniform success envelope: `{status, message, data}`, with page
//! metadata added on list endpoints.

use axum::Json;
use serde::Serialize;

#[derive(Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub status: &'static str,
    pub message: String,
    pub data: Option<T>,
}

/// Success envelope with a data payload.
pub fn success<T: Serialize>(message: impl Into<String>, data: T) -> Json<ApiResponse<T>> {
    Json(ApiResponse {
        status: "success",
        message: message.into(),
        data: Some(data),
    })
}

/// Success envelope with `data: null` (logout, deletions).
pub fn success_empty(message: impl Into<String>) -> Json<ApiResponse<()>> {
    Json(ApiResponse {
        status: "success",
        message: message.into(),
        data: None,
    })
}
