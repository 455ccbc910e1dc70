//! Locally produced JSON-RPC responses.
//!
//! Remote replies are relayed as the exact JSON the remote sent. Replies the
//! bridge has to synthesise itself (parse failures, token failures, timeouts)
//! are built as a [`JsonRpcResponse`] carrying a [`JsonRpcError`].

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::id::RequestId;
use crate::JSONRPC_VERSION;

// ---------------------------------------------------------------------------
// ErrorCode
// ---------------------------------------------------------------------------

/// Error codes the bridge emits.
///
/// The first three are the standard JSON-RPC codes; the rest sit in the
/// implementation-defined server-error range `-32000..=-32099`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum ErrorCode {
    /// Inbound line was not valid JSON (`-32700`).
    ParseError,
    /// Inbound JSON was not a valid JSON-RPC 2.0 message (`-32600`).
    InvalidRequest,
    /// Any failure the bridge could not categorise (`-32603`).
    InternalError,
    /// Token exchange failed or the remote kept rejecting the credential (`-32001`).
    TokenError,
    /// Remote endpoint failed or answered with something unusable (`-32002`).
    RemoteError,
    /// An outbound call exceeded its deadline (`-32003`).
    TimeoutError,
}

impl ErrorCode {
    /// Numeric JSON-RPC code.
    pub fn code(self) -> i64 {
        match self {
            Self::ParseError => -32700,
            Self::InvalidRequest => -32600,
            Self::InternalError => -32603,
            Self::TokenError => -32001,
            Self::RemoteError => -32002,
            Self::TimeoutError => -32003,
        }
    }
}

// ---------------------------------------------------------------------------
// JsonRpcError / JsonRpcResponse
// ---------------------------------------------------------------------------

/// The `error` member of a JSON-RPC response.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct JsonRpcError {
    /// Numeric error code.
    pub code: i64,
    /// Short description.
    pub message: String,
    /// Optional structured detail.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// A JSON-RPC 2.0 response envelope.
///
/// `id` is always serialised; `None` becomes `null`, which is what the
/// protocol requires when the request id could not be determined.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct JsonRpcResponse {
    /// Always `"2.0"`.
    pub jsonrpc: String,
    /// Id of the originating request.
    #[serde(default)]
    pub id: Option<RequestId>,
    /// Success payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// Failure payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

impl JsonRpcResponse {
    /// Build an error response.
    pub fn error(
        id: Option<RequestId>,
        code: ErrorCode,
        message: impl Into<String>,
        data: Option<Value>,
    ) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: None,
            error: Some(JsonRpcError {
                code: code.code(),
                message: message.into(),
                data,
            }),
        }
    }

    /// Convert to a plain JSON value.
    pub fn into_value(self) -> Value {
        // A struct of strings, numbers and `Value`s always serialises.
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
