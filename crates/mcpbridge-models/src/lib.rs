#![deny(missing_docs)]

//! # MCP bridge models
//!
//! JSON-RPC 2.0 message types exchanged between the local stdio transport
//! and the remote HTTP endpoint.
//!
//! ## Message hierarchy
//!
//! ```text
//! JsonRpcMessage (inbound, kept as the original JSON object)
//! ├── MessageKind::Request       method + id
//! ├── MessageKind::Notification  method, no id
//! └── MessageKind::Response      id + result | error
//!
//! JsonRpcResponse (produced locally, always carries an id or null)
//! └── JsonRpcError { code: ErrorCode, message, data? }
//! ```
//!
//! ## Module layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`id`] | `RequestId`, type-preserving request identity |
//! | [`message`] | `JsonRpcMessage` parsing, classification, normalisation |
//! | [`response`] | `JsonRpcResponse`, `JsonRpcError`, `ErrorCode` |
//! | [`error`] | `MessageError` |

pub mod error;
pub mod id;
pub mod message;
pub mod response;

pub use error::*;
pub use id::*;
pub use message::*;
pub use response::*;

/// The only protocol version accepted on either side of the bridge.
pub const JSONRPC_VERSION: &str = "2.0";
