//! mcpbridge: relays JSON-RPC between stdio and a remote MCP endpoint,
//! authenticating with an OAuth2 client-credentials token.
//!
//! stdout carries protocol messages only; all diagnostics go to stderr.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use mcpbridge_sdk::{BridgeConfig, ForwardingEngine, Gateway, RawConfig};
use tokio::io::BufReader;
use tokio::runtime::{Builder, Runtime};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// How long leftover blocking work may delay exit once the bridge has stopped.
const SHUTDOWN_GRACE: Duration = Duration::from_millis(500);

/// MCP OAuth bridge.
#[derive(Parser)]
#[command(
    name = "mcpbridge",
    version,
    about = "stdio to HTTP bridge for OAuth-protected MCP servers"
)]
struct Args {
    /// Remote JSON-RPC endpoint.
    #[arg(long, env = "MCP_REMOTE_URL")]
    remote_url: String,

    /// OAuth2 token endpoint.
    #[arg(long, env = "OAUTH_TOKEN_URL")]
    token_url: String,

    #[arg(long, env = "OAUTH_CLIENT_ID")]
    client_id: String,

    #[arg(long, env = "OAUTH_CLIENT_SECRET", hide_env_values = true)]
    client_secret: String,

    /// Scope requested with every token exchange.
    #[arg(long, env = "OAUTH_SCOPE")]
    scope: Option<String>,

    /// Timeout for each remote call, in milliseconds.
    #[arg(long, env = "MCP_REMOTE_TIMEOUT_MS", default_value_t = 30_000)]
    timeout_ms: u64,

    /// Timeout for each token exchange, in milliseconds.
    #[arg(long, env = "OAUTH_TOKEN_TIMEOUT_MS", default_value_t = 10_000)]
    token_timeout_ms: u64,

    /// Log filter (falls back to RUST_LOG, then `info`).
    #[arg(long, env = "MCPBRIDGE_LOG")]
    log_level: Option<String>,
}

impl Args {
    fn raw_config(&self) -> RawConfig {
        RawConfig {
            remote_url: self.remote_url.clone(),
            token_url: self.token_url.clone(),
            client_id: self.client_id.clone(),
            client_secret: self.client_secret.clone(),
            scope: self.scope.clone(),
            remote_timeout: Duration::from_millis(self.timeout_ms),
            token_timeout: Duration::from_millis(self.token_timeout_ms),
        }
    }
}

impl fmt::Debug for Args {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Args")
            .field("config", &self.raw_config())
            .field("log_level", &self.log_level)
            .finish()
    }
}

/// An explicit `--log-level` must parse; a broken `RUST_LOG` falls back to `info`.
fn log_filter(explicit: Option<&str>) -> anyhow::Result<EnvFilter> {
    match explicit {
        Some(f) => EnvFilter::try_new(f).with_context(|| format!("invalid log filter {f:?}")),
        None => Ok(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))),
    }
}

fn init_logging(explicit: Option<&str>) -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(explicit)?)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();
    Ok(())
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = sigterm.recv() => info!("SIGTERM received, shutting down"),
                    _ = tokio::signal::ctrl_c() => info!("SIGINT received, shutting down"),
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "cannot listen for SIGTERM");
                tokio::signal::ctrl_c().await.ok();
                info!("SIGINT received, shutting down");
            }
        }
    }
    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await.ok();
        info!("Ctrl-C received, shutting down");
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(args.log_level.as_deref())?;

    let runtime = Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("cannot start async runtime")?;
    run_to_completion(runtime, serve(args))
}

/// Drive `work` to completion, then stop the runtime without waiting on
/// blocking threads. Tokio reads stdin on such a thread, and that read only
/// returns when more input arrives.
fn run_to_completion<F: Future>(runtime: Runtime, work: F) -> F::Output {
    let output = runtime.block_on(work);
    runtime.shutdown_timeout(SHUTDOWN_GRACE);
    output
}

async fn serve(args: Args) -> anyhow::Result<()> {
    let config = BridgeConfig::try_from(args.raw_config()).context("invalid configuration")?;
    info!(
        remote = %config.remote_url,
        token_endpoint = %config.token_url,
        client_id = %config.client_id,
        "starting bridge"
    );

    let engine = Arc::new(ForwardingEngine::new(&config));
    let gateway = Gateway::new(engine);

    gateway
        .run_until(
            BufReader::new(tokio::io::stdin()),
            tokio::io::stdout(),
            shutdown_signal(),
        )
        .await
        .context("stdio transport failed")?;

    info!("bridge stopped");
    Ok(())
}
