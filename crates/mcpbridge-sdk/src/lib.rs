//! # MCP bridge SDK
//!
//! Core of a stdio-to-HTTP JSON-RPC bridge that authenticates with the
//! OAuth2 client-credentials grant.
//!
//! The SDK provides:
//!
//! * [`TokenCache`]: holds the current bearer [`Credential`] and coalesces
//!   concurrent refreshes into one token request.
//! * [`ForwardingEngine`]: posts messages to the remote endpoint, follows
//!   its session id, and replays a message once after an auth failure.
//! * [`Gateway`]: reads JSON-RPC lines from any async reader and writes
//!   replies to any async writer.
//! * [`BridgeConfig`]: validated configuration, built from [`RawConfig`].
//! * [`ForwardError`], [`TokenError`], [`ConfigError`]: error types.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use mcpbridge_sdk::{BridgeConfig, ForwardingEngine, Gateway, RawConfig};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = BridgeConfig::try_from(RawConfig {
//!     remote_url: "https://mcp.example.com/mcp".into(),
//!     token_url: "https://auth.example.com/oauth/token".into(),
//!     client_id: "bridge".into(),
//!     client_secret: "s3cret".into(),
//!     scope: None,
//!     remote_timeout: Duration::from_secs(30),
//!     token_timeout: Duration::from_secs(10),
//! })?;
//!
//! let gateway = Gateway::new(Arc::new(ForwardingEngine::new(&config)));
//! let stdin = tokio::io::BufReader::new(tokio::io::stdin());
//! gateway.run(stdin, tokio::io::stdout()).await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod credentials;
pub mod error;
pub mod forwarder;
pub mod gateway;
pub mod oauth;
pub mod token_cache;

pub use config::{BridgeConfig, RawConfig};
pub use credentials::Credential;
pub use error::{ConfigError, ForwardError, TokenError};
pub use forwarder::ForwardingEngine;
pub use gateway::Gateway;
pub use token_cache::TokenCache;

// Re-export the message model for ergonomic usage.
pub use mcpbridge_models::{
    ErrorCode, JsonRpcMessage, JsonRpcResponse, MessageKind, RequestId,
};
