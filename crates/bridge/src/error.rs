//! Error types for the bridge HTTP surface.
//!
//! `ApiError` implements `IntoResponse` so handlers can use `?` and still
//! produce a JSON error body with the right status code.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// API error response body
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Unified error type for API handlers
#[derive(Debug, Error)]
pub enum ApiError {
    /// Listing upcoming events failed, so no invite could be attempted
    #[error("Sync failed: {0}")]
    SyncFailed(#[source] anyhow::Error),

    /// Webhook verification token did not match
    #[error("Forbidden: {0}")]
    Forbidden(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_message, details) = match &self {
            ApiError::SyncFailed(e) => {
                tracing::error!("Sync failed: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Sync failed".to_string(),
                    Some(format!("{:#}", e)),
                )
            }
            ApiError::Forbidden(msg) => {
                tracing::warn!("Rejected request: {}", msg);
                (StatusCode::FORBIDDEN, "forbidden".to_string(), None)
            }
        };

        let body = Json(ErrorResponse {
            error: error_message,
            details,
        });

        (status, body).into_response()
    }
}

/// Result type alias for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
