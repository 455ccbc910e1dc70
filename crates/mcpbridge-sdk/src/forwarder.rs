//! Forwarding engine: send a JSON-RPC message upstream with a bearer token.
//!
//! [`ForwardingEngine::forward`] posts one message to the remote endpoint,
//! follows the remote's session id, decodes JSON or event-stream replies,
//! and on a 401/403 refreshes the token and replays the message once.
//!
//! # Retry protocol
//!
//! ```text
//! Sending ──401/403──▶ Refreshing ──token──▶ Retrying ──▶ done
//!    │                     │                     │
//!    └──▶ done             └──▶ token error      └──401/403──▶ token error
//! ```
//!
//! There is no edge back from `Retrying` to `Refreshing`: a request reaches
//! the remote at most twice.

use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use mcpbridge_models::{JsonRpcMessage, MessageKind, RequestId, JSONRPC_VERSION};
use reqwest::header::{HeaderName, ACCEPT, CONTENT_TYPE};
use reqwest::{StatusCode, Url};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::BridgeConfig;
use crate::error::{ForwardError, TokenError};
use crate::token_cache::TokenCache;

/// Header carrying the remote session identifier, in both directions.
pub const SESSION_HEADER: HeaderName = HeaderName::from_static("mcp-session-id");

/// `Accept` value sent with every forwarded message.
pub const ACCEPT_JSON_OR_EVENT_STREAM: &str = "application/json, text/event-stream";

// ---------------------------------------------------------------------------
// Retry state
// ---------------------------------------------------------------------------

/// Where a single message is in the retry protocol.
enum Phase {
    /// First attempt with the cached (or freshly fetched) token.
    Sending(String),
    /// The first attempt was rejected; a new token is needed.
    Refreshing,
    /// The one and only replay, with the refreshed token.
    Retrying(String),
}

/// What the remote returned, before interpretation.
struct RawReply {
    status: StatusCode,
    content_type: Option<String>,
    body: String,
}

// ---------------------------------------------------------------------------
// ForwardingEngine
// ---------------------------------------------------------------------------

/// Forwards messages to one remote endpoint using one token cache.
pub struct ForwardingEngine {
    http: reqwest::Client,
    remote_url: Url,
    timeout: Duration,
    tokens: TokenCache,
    session_id: Mutex<Option<String>>,
}

impl ForwardingEngine {
    /// Build an engine and its token cache from the configuration.
    ///
    /// Token and remote calls share one HTTP connection pool.
    pub fn new(config: &BridgeConfig) -> Self {
        let http = reqwest::Client::new();
        let tokens = TokenCache::new(config, http.clone());
        Self::with_token_cache(config, http, tokens)
    }

    /// Build an engine around an existing token cache.
    pub fn with_token_cache(
        config: &BridgeConfig,
        http: reqwest::Client,
        tokens: TokenCache,
    ) -> Self {
        Self {
            http,
            remote_url: config.remote_url.clone(),
            timeout: config.remote_timeout,
            tokens,
            session_id: Mutex::new(None),
        }
    }

    /// The token cache used by this engine.
    pub fn tokens(&self) -> &TokenCache {
        &self.tokens
    }

    /// The session id most recently issued by the remote.
    pub fn session_id(&self) -> Option<String> {
        self.session_id
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn adopt_session_id(&self, session_id: &str) {
        let mut current = self.session_id.lock().unwrap_or_else(PoisonError::into_inner);
        if current.as_deref() != Some(session_id) {
            info!(session_id, "remote session established");
            *current = Some(session_id.to_string());
        }
    }

    /// Forward one message.
    ///
    /// Requests always yield exactly one response, carrying the request's
    /// id; failures become JSON-RPC error responses. Notifications and
    /// inbound responses yield nothing; their failures are only logged.
    pub async fn forward(&self, message: &JsonRpcMessage) -> Option<Value> {
        let method = message.method().unwrap_or_default();
        match message.kind() {
            MessageKind::Request => Some(self.forward_request(message).await),
            kind @ (MessageKind::Notification | MessageKind::Response) => {
                if let Err(e) = self.deliver(message, false).await {
                    warn!(%kind, method, error = %e, "failed to deliver message");
                }
                None
            }
        }
    }

    async fn forward_request(&self, message: &JsonRpcMessage) -> Value {
        let id = message.id().cloned();
        let method = message.method().unwrap_or_default();
        let started = Instant::now();

        match self.deliver(message, true).await {
            Ok(Some(mut reply)) => {
                restore_id(&mut reply, id.as_ref());
                debug!(
                    method,
                    id = ?id,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "request forwarded"
                );
                reply
            }
            Ok(None) => {
                ForwardError::Internal("remote reply was discarded".into())
                    .into_response(id)
                    .into_value()
            }
            Err(e) => {
                warn!(
                    method,
                    id = ?id,
                    code = e.error_code().code(),
                    error = %e,
                    "request failed"
                );
                e.into_response(id).into_value()
            }
        }
    }

    /// Run the retry protocol for one message.
    async fn deliver(
        &self,
        message: &JsonRpcMessage,
        expects_reply: bool,
    ) -> Result<Option<Value>, ForwardError> {
        let body = message.normalized();
        let mut phase = Phase::Sending(self.tokens.get_token().await?);

        loop {
            phase = match phase {
                Phase::Sending(token) => match self.send(&body, &token, expects_reply).await {
                    Err(ForwardError::Auth { status }) => {
                        warn!(status, "remote rejected the token, refreshing");
                        Phase::Refreshing
                    }
                    outcome => return outcome,
                },
                Phase::Refreshing => {
                    self.tokens.invalidate_token();
                    Phase::Retrying(self.tokens.refresh_token().await?)
                }
                Phase::Retrying(token) => {
                    debug!(attempt = 2, "replaying message with refreshed token");
                    return match self.send(&body, &token, expects_reply).await {
                        Err(ForwardError::Auth { status }) => Err(TokenError::new(
                            status,
                            "remote rejected the refreshed token",
                        )
                        .into()),
                        outcome => outcome,
                    };
                }
            };
        }
    }

    /// One HTTP exchange with the remote.
    async fn send(
        &self,
        body: &Value,
        token: &str,
        expects_reply: bool,
    ) -> Result<Option<Value>, ForwardError> {
        let reply = self.post(body, token).await?;
        interpret(reply, expects_reply)
    }

    async fn post(&self, body: &Value, token: &str) -> Result<RawReply, ForwardError> {
        let mut request = self
            .http
            .post(self.remote_url.clone())
            .bearer_auth(token)
            .header(ACCEPT, ACCEPT_JSON_OR_EVENT_STREAM)
            .json(body);
        if let Some(session_id) = self.session_id() {
            request = request.header(SESSION_HEADER, session_id);
        }

        let call = async {
            let res = request.send().await?;
            let status = res.status();
            if let Some(session_id) = res
                .headers()
                .get(SESSION_HEADER)
                .and_then(|v| v.to_str().ok())
            {
                self.adopt_session_id(session_id);
            }
            let content_type = res
                .headers()
                .get(CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .map(str::to_owned);
            let body = res.text().await?;
            Ok::<_, reqwest::Error>(RawReply {
                status,
                content_type,
                body,
            })
        };

        match tokio::time::timeout(self.timeout, call).await {
            Err(_) => Err(ForwardError::Timeout(self.timeout)),
            Ok(Err(e)) if e.is_timeout() => Err(ForwardError::Timeout(self.timeout)),
            Ok(Err(e)) => Err(ForwardError::remote(
                e.status().map(|s| s.as_u16()),
                format!("request to remote failed: {e}"),
            )),
            Ok(Ok(reply)) => Ok(reply),
        }
    }
}

// ---------------------------------------------------------------------------
// Reply interpretation
// ---------------------------------------------------------------------------

fn interpret(reply: RawReply, expects_reply: bool) -> Result<Option<Value>, ForwardError> {
    let status = reply.status;

    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Err(ForwardError::Auth {
            status: status.as_u16(),
        });
    }

    let parsed = if status.is_success() {
        if !expects_reply {
            return Ok(None);
        }
        if reply.body.trim().is_empty() {
            return Err(ForwardError::remote(
                Some(status.as_u16()),
                "remote returned an empty body",
            ));
        }
        parse_body(&reply)?
    } else {
        // Some servers send JSON-RPC errors with a non-2xx status; those are
        // relayed like any other reply.
        match parse_body(&reply) {
            Ok(value) if value.get("error").is_some() => value,
            _ => {
                return Err(ForwardError::remote(
                    Some(status.as_u16()),
                    format!("remote returned HTTP {status}: {}", reply.body.trim()),
                ))
            }
        }
    };

    if !expects_reply {
        return Ok(None);
    }

    if parsed.get("jsonrpc").and_then(Value::as_str) != Some(JSONRPC_VERSION) {
        return Err(ForwardError::remote(
            Some(status.as_u16()),
            "invalid JSON-RPC response",
        ));
    }

    Ok(Some(parsed))
}

fn parse_body(reply: &RawReply) -> Result<Value, ForwardError> {
    let status = Some(reply.status.as_u16());
    let text = if is_event_stream(reply.content_type.as_deref()) {
        event_stream_data(&reply.body).ok_or_else(|| {
            ForwardError::remote(status, "event stream carried no data lines")
        })?
    } else {
        reply.body.clone()
    };

    serde_json::from_str(&text)
        .map_err(|e| ForwardError::remote(status, format!("remote returned invalid JSON: {e}")))
}

fn is_event_stream(content_type: Option<&str>) -> bool {
    content_type
        .and_then(|ct| ct.split(';').next())
        .is_some_and(|media| media.trim().eq_ignore_ascii_case("text/event-stream"))
}

/// Concatenate the `data:` lines of an event stream holding one JSON document.
fn event_stream_data(body: &str) -> Option<String> {
    let data: Vec<&str> = body
        .lines()
        .filter_map(|line| line.strip_prefix("data:"))
        .map(|data| data.strip_prefix(' ').unwrap_or(data))
        .collect();
    (!data.is_empty()).then(|| data.concat())
}

/// Put the request id back when the remote dropped it.
fn restore_id(reply: &mut Value, id: Option<&RequestId>) {
    let (Some(id), Some(object)) = (id, reply.as_object_mut()) else {
        return;
    };
    if object.get("id").is_none_or(Value::is_null) {
        object.insert("id".to_string(), id.to_value());
    }
}
