//! SDK error types.
//!
//! The forwarding path distinguishes four failure kinds, each a variant of
//! [`ForwardError`]. [`ForwardError::error_code`] is the one place where a
//! kind is mapped to the JSON-RPC code the local client sees.
//!
//! [`TokenError`] is `Clone` because a single failed exchange is handed to
//! every caller that was waiting on it.

use std::time::Duration;

use mcpbridge_models::{ErrorCode, JsonRpcResponse, RequestId};
use serde_json::json;

/// A failed or timed-out client-credentials exchange.
///
/// `status` is the HTTP status of the token endpoint's answer, or `0` when no
/// answer arrived (transport failure, timeout).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("token request failed (status {status}): {message}")]
pub struct TokenError {
    /// HTTP status, `0` when unknown.
    pub status: u16,
    /// Human-readable explanation.
    pub message: String,
}

impl TokenError {
    /// Build a token error.
    pub fn new(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    /// The exchange did not complete within `after`.
    pub fn timed_out(after: Duration) -> Self {
        Self::new(
            0,
            format!("token request timed out after {}ms", after.as_millis()),
        )
    }
}

/// Failure while forwarding one message to the remote endpoint.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ForwardError {
    /// No usable credential could be obtained.
    #[error(transparent)]
    Token(#[from] TokenError),

    /// The remote answered 401 or 403. Consumed by the retry protocol and
    /// never returned from [`ForwardingEngine::forward`](crate::ForwardingEngine::forward).
    #[error("remote rejected the credential (HTTP {status})")]
    Auth {
        /// 401 or 403.
        status: u16,
    },

    /// The remote failed or returned something that is not a JSON-RPC response.
    #[error("remote error: {message}")]
    Remote {
        /// HTTP status when a response was received.
        status: Option<u16>,
        /// Human-readable explanation.
        message: String,
    },

    /// The remote call exceeded its deadline.
    #[error("remote request timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    /// Anything else.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ForwardError {
    pub(crate) fn remote(status: Option<u16>, message: impl Into<String>) -> Self {
        Self::Remote {
            status,
            message: message.into(),
        }
    }

    /// JSON-RPC code reported to the local client.
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::Token(_) | Self::Auth { .. } => ErrorCode::TokenError,
            Self::Remote { .. } => ErrorCode::RemoteError,
            Self::Timeout(_) => ErrorCode::TimeoutError,
            Self::Internal(_) => ErrorCode::InternalError,
        }
    }

    /// HTTP status associated with the failure, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Token(err) => Some(err.status),
            Self::Auth { status } => Some(*status),
            Self::Remote { status, .. } => *status,
            Self::Timeout(_) | Self::Internal(_) => None,
        }
    }

    /// Convert into the error response sent back for the request `id`.
    pub fn into_response(self, id: Option<RequestId>) -> JsonRpcResponse {
        let data = self.status().map(|status| json!({ "status": status }));
        JsonRpcResponse::error(id, self.error_code(), self.to_string(), data)
    }
}

/// Invalid or missing configuration, reported before anything is constructed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// A required value is empty.
    #[error("{field} is required")]
    Missing {
        /// Name of the offending setting.
        field: &'static str,
    },

    /// A URL setting does not parse or is not http(s).
    #[error("{field} is not a valid http(s) URL ({value:?}): {reason}")]
    InvalidUrl {
        /// Name of the offending setting.
        field: &'static str,
        /// The rejected value.
        value: String,
        /// Why it was rejected.
        reason: String,
    },

    /// A timeout of zero.
    #[error("{field} must be greater than zero")]
    ZeroTimeout {
        /// Name of the offending setting.
        field: &'static str,
    },
}
