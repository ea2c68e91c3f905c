//! Response DTOs
//!
//! Data structures for API response bodies. Every successful response is
//! wrapped in `{"status": "success", "data": ...}`.

use axum::{
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Success envelope
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub status: &'static str,
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            status: "success",
            data,
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}

/// A single soft-deleted message
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MessageDeletedResponse {
    pub id: String,
    pub thread_id: String,
}

/// Result of deleting every message of a thread
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MessagesDeletedResponse {
    pub deleted: u64,
}
