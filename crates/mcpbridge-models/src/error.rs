//! Error types for the `mcpbridge-models` crate.
//!
//! Parsing and structural validation of inbound lines return variants of
//! [`MessageError`]. Each variant maps onto one reserved JSON-RPC code so
//! the gateway can answer without involving the forwarding engine.

use crate::response::ErrorCode;

/// Errors produced when an inbound line is not a usable JSON-RPC message.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MessageError {
    /// The line is not valid JSON.
    #[error("parse error: {0}")]
    Parse(String),

    /// The line is valid JSON but not a structurally valid JSON-RPC 2.0 message.
    #[error("invalid request: {reason}")]
    InvalidRequest {
        /// Human-readable explanation.
        reason: String,
    },
}

impl MessageError {
    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidRequest {
            reason: reason.into(),
        }
    }

    /// The JSON-RPC code the gateway answers with for this failure.
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::Parse(_) => ErrorCode::ParseError,
            Self::InvalidRequest { .. } => ErrorCode::InvalidRequest,
        }
    }
}
