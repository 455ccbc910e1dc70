//! Mock OAuth2 token endpoint and MCP endpoint for local development.
//!
//! | Route         | Behaviour                                                        |
//! |---------------|------------------------------------------------------------------|
//! | `POST /token` | client-credentials grant with Basic client auth; issues UUIDs    |
//! | `POST /mcp`   | bearer-protected JSON-RPC; assigns and echoes `Mcp-Session-Id`   |
//!
//! The router is built by [`router`] so the `mock-remote` binary and tests
//! serve exactly the same thing.

pub mod config;
pub mod error;

use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

use axum::extract::{Form, State};
use axum::http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info};
use uuid::Uuid;

pub use crate::config::MockConfig;
pub use crate::error::MockError;

/// Session header, in both directions.
pub const SESSION_HEADER: HeaderName = HeaderName::from_static("mcp-session-id");

/// Protocol version announced by `initialize`.
pub const PROTOCOL_VERSION: &str = "2025-03-26";

// ---------------------------------------------------------------------------
// Shared state
// ---------------------------------------------------------------------------

/// State shared across all Axum handlers.
struct MockState {
    config: MockConfig,
    /// Every access token issued so far. Tokens never expire here.
    tokens: Mutex<HashSet<String>>,
    /// Every session id handed out so far.
    sessions: Mutex<HashSet<String>>,
}

impl MockState {
    fn knows_token(&self, token: &str) -> bool {
        self.tokens
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(token)
    }

    /// Return `requested` if it is a known session, or open a new one.
    fn session(&self, requested: Option<&str>) -> String {
        let mut sessions = self.sessions.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(id) = requested.filter(|id| sessions.contains(*id)) {
            return id.to_string();
        }
        let id = Uuid::new_v4().to_string();
        info!(session_id = %id, "session opened");
        sessions.insert(id.clone());
        id
    }
}

/// Build the mock router.
pub fn router(config: MockConfig) -> Router {
    let state = Arc::new(MockState {
        config,
        tokens: Mutex::new(HashSet::new()),
        sessions: Mutex::new(HashSet::new()),
    });

    Router::new()
        .route("/token", post(issue_token))
        .route("/mcp", post(handle_rpc))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Token endpoint
// ---------------------------------------------------------------------------

/// Body of `POST /token`.
#[derive(Deserialize)]
struct TokenRequest {
    grant_type: Option<String>,
    scope: Option<String>,
}

/// Decode `Authorization: Basic base64(id:secret)`.
fn basic_credentials(headers: &HeaderMap) -> Option<(String, String)> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let encoded = value.strip_prefix("Basic ")?;
    let decoded = String::from_utf8(STANDARD.decode(encoded.trim()).ok()?).ok()?;
    let (id, secret) = decoded.split_once(':')?;
    Some((id.to_string(), secret.to_string()))
}

/// `POST /token`: client-credentials grant.
async fn issue_token(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Form(req): Form<TokenRequest>,
) -> Result<Json<Value>, MockError> {
    let (client_id, client_secret) = basic_credentials(&headers).ok_or(MockError::InvalidClient)?;
    if client_id != state.config.client_id || client_secret != state.config.client_secret {
        return Err(MockError::InvalidClient);
    }
    if req.grant_type.as_deref() != Some("client_credentials") {
        return Err(MockError::UnsupportedGrantType);
    }

    let access_token = Uuid::new_v4().to_string();
    state
        .tokens
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .insert(access_token.clone());
    info!(client_id = %client_id, scope = ?req.scope, "token issued");

    let mut body = json!({
        "access_token": access_token,
        "token_type": "Bearer",
        "expires_in": state.config.token_ttl_secs,
    });
    if let Some(scope) = req.scope {
        body["scope"] = json!(scope);
    }
    Ok(Json(body))
}

// ---------------------------------------------------------------------------
// MCP endpoint
// ---------------------------------------------------------------------------

fn bearer(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

/// `POST /mcp`: answer one JSON-RPC message.
async fn handle_rpc(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Result<Response, MockError> {
    let token = bearer(&headers).ok_or(MockError::InvalidToken)?;
    if !state.knows_token(token) {
        return Err(MockError::InvalidToken);
    }

    let requested = headers.get(&SESSION_HEADER).and_then(|v| v.to_str().ok());
    let session_id = state.session(requested);

    let message = body
        .as_object()
        .ok_or_else(|| MockError::InvalidRequest("body must be a JSON object".into()))?;
    let method = message.get("method").and_then(Value::as_str);
    let id = message.get("id").cloned();

    let mut response = match (method, id) {
        (Some(method), Some(id)) => {
            debug!(method, %id, "request");
            Json(answer(method, id, message.get("params"))).into_response()
        }
        // Notifications and client responses are acknowledged without a body.
        _ => StatusCode::ACCEPTED.into_response(),
    };

    if let Ok(value) = HeaderValue::from_str(&session_id) {
        response.headers_mut().insert(SESSION_HEADER, value);
    }
    Ok(response)
}

fn answer(method: &str, id: Value, params: Option<&Value>) -> Value {
    let result = match method {
        "initialize" => json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": { "tools": {} },
            "serverInfo": { "name": "mock-remote", "version": env!("CARGO_PKG_VERSION") },
        }),
        "tools/list" => json!({
            "tools": [{
                "name": "echo",
                "description": "Return the given text",
                "inputSchema": {
                    "type": "object",
                    "properties": { "text": { "type": "string" } },
                    "required": ["text"],
                },
            }],
        }),
        "tools/call" => {
            let text = params
                .and_then(|p| p.pointer("/arguments/text"))
                .and_then(Value::as_str)
                .unwrap_or_default();
            json!({ "content": [{ "type": "text", "text": text }] })
        }
        "ping" => json!({}),
        other => {
            return json!({
                "jsonrpc": "2.0",
                "id": id,
                "error": { "code": -32601, "message": format!("Method not found: {other}") },
            });
        }
    };

    json!({ "jsonrpc": "2.0", "id": id, "result": result })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
