//! Error types for the mock remote.
//!
//! [`MockError`] implements [`axum::response::IntoResponse`] so handlers can
//! return `Result<…, MockError>` directly.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

/// Request rejections, shaped like OAuth2 error responses.
#[derive(Debug, thiserror::Error)]
pub enum MockError {
    /// Missing or wrong client credentials on `/token`.
    #[error("invalid_client")]
    InvalidClient,

    /// `grant_type` absent or not `client_credentials`.
    #[error("unsupported_grant_type")]
    UnsupportedGrantType,

    /// Missing or unknown bearer token on `/mcp`.
    #[error("invalid_token")]
    InvalidToken,

    /// The `/mcp` body is not a JSON-RPC message.
    #[error("invalid_request: {0}")]
    InvalidRequest(String),
}

impl IntoResponse for MockError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::InvalidClient | Self::InvalidToken => StatusCode::UNAUTHORIZED,
            Self::UnsupportedGrantType | Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
        };

        tracing::warn!(%status, error = %self, "request rejected");
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
