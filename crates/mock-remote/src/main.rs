//! `mock-remote`: serves the mock token and MCP endpoints on localhost.

use mock_remote::{router, MockConfig};
use tracing::info;

#[tokio::main]
async fn main() -> std::io::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = MockConfig::from_env();
    let addr = format!("127.0.0.1:{}", config.listen_port);
    info!(client_id = %config.client_id, "accepting client credentials");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(address = %addr, "mock remote listening (token: /token, rpc: /mcp)");
    axum::serve(listener, router(config)).await
}
