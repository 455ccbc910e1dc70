//! In-process token endpoint and remote JSON-RPC endpoint for integration tests.
//!
//! Both endpoints are served by one axum router bound to an ephemeral port.
//! The token endpoint issues `token-1`, `token-2`, … and counts calls; the
//! remote endpoint records every call and answers through a per-test script.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use mcpbridge_sdk::{BridgeConfig, ForwardingEngine, JsonRpcMessage, RawConfig};
use serde_json::{json, Value};

pub const CLIENT_ID: &str = "bridge-client";
pub const CLIENT_SECRET: &str = "bridge-secret";

// ---------------------------------------------------------------------------
// Token endpoint
// ---------------------------------------------------------------------------

/// Behaviour and call log of the mock token endpoint.
#[derive(Clone)]
pub struct TokenMock {
    pub calls: Arc<AtomicUsize>,
    pub delay: Duration,
    pub expires_in: Option<u64>,
    pub omit_access_token: bool,
    fail_status: Arc<Mutex<Option<StatusCode>>>,
    requests: Arc<Mutex<Vec<(HeaderMap, String)>>>,
}

impl Default for TokenMock {
    fn default() -> Self {
        Self {
            calls: Arc::new(AtomicUsize::new(0)),
            delay: Duration::ZERO,
            expires_in: Some(3600),
            omit_access_token: false,
            fail_status: Arc::new(Mutex::new(None)),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl TokenMock {
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_expires_in(mut self, expires_in: Option<u64>) -> Self {
        self.expires_in = expires_in;
        self
    }

    pub fn without_access_token(mut self) -> Self {
        self.omit_access_token = true;
        self
    }

    /// Make every following call fail with `status` (or succeed again with `None`).
    pub fn fail_with(&self, status: Option<StatusCode>) {
        *self.fail_status.lock().unwrap() = status;
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<(HeaderMap, String)> {
        self.requests.lock().unwrap().clone()
    }
}

async fn token_handler(
    State(mock): State<TokenMock>,
    headers: HeaderMap,
    body: String,
) -> Response {
    let n = mock.calls.fetch_add(1, Ordering::SeqCst) + 1;
    mock.requests.lock().unwrap().push((headers, body));

    if !mock.delay.is_zero() {
        tokio::time::sleep(mock.delay).await;
    }

    let failure = *mock.fail_status.lock().unwrap();
    if let Some(status) = failure {
        return (status, Json(json!({ "error": "invalid_client" }))).into_response();
    }

    if mock.omit_access_token {
        return Json(json!({ "token_type": "Bearer" })).into_response();
    }

    let mut body = json!({ "access_token": format!("token-{n}"), "token_type": "Bearer" });
    if let Some(expires_in) = mock.expires_in {
        body["expires_in"] = json!(expires_in);
    }
    Json(body).into_response()
}

// ---------------------------------------------------------------------------
// Remote endpoint
// ---------------------------------------------------------------------------

/// One request received by the mock remote.
#[derive(Clone, Debug)]
pub struct RemoteCall {
    pub headers: HeaderMap,
    pub body: Value,
}

impl RemoteCall {
    pub fn bearer(&self) -> Option<&str> {
        self.headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
    }

    pub fn session_id(&self) -> Option<&str> {
        self.headers
            .get("mcp-session-id")
            .and_then(|v| v.to_str().ok())
    }
}

type Script = dyn Fn(usize, &RemoteCall) -> Response + Send + Sync;

#[derive(Clone)]
struct RemoteMock {
    calls: Arc<AtomicUsize>,
    seen: Arc<Mutex<Vec<RemoteCall>>>,
    delay: Duration,
    script: Arc<Script>,
}

async fn remote_handler(
    State(mock): State<RemoteMock>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let index = mock.calls.fetch_add(1, Ordering::SeqCst);
    let call = RemoteCall { headers, body };
    mock.seen.lock().unwrap().push(call.clone());

    if !mock.delay.is_zero() {
        tokio::time::sleep(mock.delay).await;
    }

    (mock.script)(index, &call)
}

// ---------------------------------------------------------------------------
// Canned replies
// ---------------------------------------------------------------------------

/// Reply with the request's id, echoing method and bearer token as the result.
pub fn echo(call: &RemoteCall) -> Response {
    Json(json!({
        "jsonrpc": "2.0",
        "id": call.body["id"].clone(),
        "result": { "method": call.body["method"].clone(), "token": call.bearer() },
    }))
    .into_response()
}

pub fn unauthorized() -> Response {
    (StatusCode::UNAUTHORIZED, "unauthorized").into_response()
}

pub fn accepted() -> Response {
    StatusCode::ACCEPTED.into_response()
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

pub struct Harness {
    pub base_url: String,
    pub token: TokenMock,
    remote: RemoteMock,
}

impl Harness {
    pub async fn start<F>(token: TokenMock, script: F) -> Self
    where
        F: Fn(usize, &RemoteCall) -> Response + Send + Sync + 'static,
    {
        Self::start_with_delay(token, Duration::ZERO, script).await
    }

    pub async fn start_with_delay<F>(token: TokenMock, remote_delay: Duration, script: F) -> Self
    where
        F: Fn(usize, &RemoteCall) -> Response + Send + Sync + 'static,
    {
        let remote = RemoteMock {
            calls: Arc::new(AtomicUsize::new(0)),
            seen: Arc::new(Mutex::new(Vec::new())),
            delay: remote_delay,
            script: Arc::new(script),
        };

        let app = Router::new()
            .route("/token", post(token_handler))
            .with_state(token.clone())
            .merge(
                Router::new()
                    .route("/mcp", post(remote_handler))
                    .with_state(remote.clone()),
            );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{addr}"),
            token,
            remote,
        }
    }

    pub fn remote_calls(&self) -> usize {
        self.remote.calls.load(Ordering::SeqCst)
    }

    pub fn seen(&self) -> Vec<RemoteCall> {
        self.remote.seen.lock().unwrap().clone()
    }

    pub fn raw_config(&self) -> RawConfig {
        RawConfig {
            remote_url: format!("{}/mcp", self.base_url),
            token_url: format!("{}/token", self.base_url),
            client_id: CLIENT_ID.into(),
            client_secret: CLIENT_SECRET.into(),
            scope: None,
            remote_timeout: Duration::from_secs(5),
            token_timeout: Duration::from_secs(5),
        }
    }

    pub fn engine(&self) -> ForwardingEngine {
        self.engine_with(self.raw_config())
    }

    pub fn engine_with(&self, raw: RawConfig) -> ForwardingEngine {
        ForwardingEngine::new(&BridgeConfig::try_from(raw).unwrap())
    }
}

pub fn message(value: Value) -> JsonRpcMessage {
    JsonRpcMessage::from_value(value).unwrap()
}
