use std::sync::Arc;
use std::time::Duration;

use mcpbridge_sdk::{BridgeConfig, ForwardingEngine, Gateway, RawConfig};
use mock_remote::{router, MockConfig};
use serde_json::{json, Value};
use tokio::io::{AsyncReadExt, BufReader};

async fn serve_mock() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router(MockConfig::default())).await.unwrap();
    });
    format!("http://{addr}")
}

fn engine(base_url: &str, client_secret: &str) -> Arc<ForwardingEngine> {
    let defaults = MockConfig::default();
    let config = BridgeConfig::try_from(RawConfig {
        remote_url: format!("{base_url}/mcp"),
        token_url: format!("{base_url}/token"),
        client_id: defaults.client_id,
        client_secret: client_secret.into(),
        scope: Some("mcp".into()),
        remote_timeout: Duration::from_secs(5),
        token_timeout: Duration::from_secs(5),
    })
    .unwrap();
    Arc::new(ForwardingEngine::new(&config))
}

async fn session(engine: &Arc<ForwardingEngine>, input: &str) -> Vec<Value> {
    let (writer, mut reader) = tokio::io::duplex(64 * 1024);
    Gateway::new(Arc::clone(engine))
        .run(BufReader::new(input.as_bytes()), writer)
        .await
        .unwrap();

    let mut output = String::new();
    reader.read_to_string(&mut output).await.unwrap();
    output
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

#[tokio::test]
async fn mcp_handshake_through_the_bridge() {
    let base_url = serve_mock().await;
    let secret = MockConfig::default().client_secret;

    // Sequential sessions so the remote sees initialize before anything else.
    let engine = engine(&base_url, &secret);
    let init = session(
        &engine,
        "{\"jsonrpc\":\"2.0\",\"id\":1,\"method\":\"initialize\",\"params\":{}}\n",
    )
    .await;
    assert_eq!(init.len(), 1);
    assert_eq!(init[0]["id"], json!(1));
    assert_eq!(init[0]["result"]["serverInfo"]["name"], json!("mock-remote"));
    let session_id = engine.session_id().unwrap();

    let replies = session(
        &engine,
        concat!(
            "{\"jsonrpc\":\"2.0\",\"method\":\"notifications/initialized\"}\n",
            "{\"jsonrpc\":\"2.0\",\"id\":\"t\",\"method\":\"tools/list\"}\n",
            "{\"jsonrpc\":\"2.0\",\"id\":2,\"method\":\"tools/call\",",
            "\"params\":{\"name\":\"echo\",\"arguments\":{\"text\":\"hi\"}}}\n",
            "{\"jsonrpc\":\"2.0\",\"id\":3,\"method\":\"resources/list\"}\n",
        ),
    )
    .await;

    assert_eq!(replies.len(), 3);
    let by_id = |id: Value| replies.iter().find(|r| r["id"] == id).cloned().unwrap();
    assert_eq!(by_id(json!("t"))["result"]["tools"][0]["name"], json!("echo"));
    assert_eq!(by_id(json!(2))["result"]["content"][0]["text"], json!("hi"));
    assert_eq!(by_id(json!(3))["error"]["code"], json!(-32601));
    assert_eq!(engine.session_id(), Some(session_id));
}

#[tokio::test]
async fn wrong_client_secret_surfaces_as_token_error() {
    let base_url = serve_mock().await;

    let replies = session(
        &engine(&base_url, "wrong"),
        "{\"jsonrpc\":\"2.0\",\"id\":\"x\",\"method\":\"tools/list\"}\n",
    )
    .await;

    assert_eq!(replies.len(), 1);
    assert_eq!(replies[0]["id"], json!("x"));
    assert_eq!(replies[0]["error"]["code"], json!(-32001));
    assert_eq!(replies[0]["error"]["data"]["status"], json!(401));
}
