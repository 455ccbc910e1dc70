//! Line-oriented JSON-RPC gateway.
//!
//! [`Gateway::run`] reads one JSON-RPC message per line, answers malformed
//! lines itself, and hands everything else to the [`ForwardingEngine`].
//! Messages are dispatched concurrently, so pipelined requests may be
//! answered out of order; every reply goes through a single writer task and
//! is written as exactly one `\n`-terminated line. Nothing else is ever
//! written to the output.

use std::future::Future;
use std::io;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use mcpbridge_models::{ErrorCode, JsonRpcMessage, JsonRpcResponse, MessageKind};
use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::forwarder::ForwardingEngine;

/// Connects a line transport to a [`ForwardingEngine`].
#[derive(Clone)]
pub struct Gateway {
    engine: Arc<ForwardingEngine>,
}

impl Gateway {
    /// Create a gateway dispatching to `engine`.
    pub fn new(engine: Arc<ForwardingEngine>) -> Self {
        Self { engine }
    }

    /// Serve until `reader` reaches end of input.
    pub async fn run<R, W>(&self, reader: R, writer: W) -> io::Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        self.run_until(reader, writer, std::future::pending()).await
    }

    /// Serve until end of input or until `shutdown` completes.
    ///
    /// Either way, messages already dispatched are allowed to finish and
    /// their replies are written before this returns.
    pub async fn run_until<R, W, S>(&self, reader: R, writer: W, shutdown: S) -> io::Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin + Send + 'static,
        S: Future<Output = ()>,
    {
        let (tx, rx) = mpsc::unbounded_channel::<Value>();
        let writer_task = tokio::spawn(write_replies(writer, rx));

        let mut in_flight = JoinSet::new();
        let mut lines = reader.lines();
        tokio::pin!(shutdown);

        let read_result = loop {
            tokio::select! {
                () = &mut shutdown => {
                    info!("shutdown requested, no longer reading input");
                    break Ok(());
                }
                line = lines.next_line() => match line {
                    Ok(Some(line)) => self.dispatch(&line, &tx, &mut in_flight),
                    Ok(None) => {
                        debug!("end of input");
                        break Ok(());
                    }
                    Err(e) => {
                        error!(error = %e, "failed to read input");
                        break Err(e);
                    }
                },
            }

            while let Some(joined) = in_flight.try_join_next() {
                log_join(joined);
            }
        };

        if !in_flight.is_empty() {
            info!(pending = in_flight.len(), "waiting for in-flight messages");
        }
        while let Some(joined) = in_flight.join_next().await {
            log_join(joined);
        }

        drop(tx);
        let write_result = writer_task.await.map_err(io::Error::other)?;
        read_result.and(write_result)
    }

    fn dispatch(
        &self,
        line: &str,
        tx: &mpsc::UnboundedSender<Value>,
        in_flight: &mut JoinSet<()>,
    ) {
        let line = line.trim();
        if line.is_empty() {
            return;
        }

        let message = match JsonRpcMessage::parse(line) {
            Ok(message) => message,
            Err(e) => {
                warn!(error = %e, "rejecting inbound line");
                let reply = JsonRpcResponse::error(None, e.error_code(), e.to_string(), None);
                send_reply(tx, reply.into_value());
                return;
            }
        };

        debug!(
            kind = %message.kind(),
            method = message.method().unwrap_or_default(),
            id = ?message.id(),
            "dispatching message"
        );

        let engine = Arc::clone(&self.engine);
        let tx = tx.clone();
        in_flight.spawn(async move {
            let outcome = AssertUnwindSafe(engine.forward(&message))
                .catch_unwind()
                .await;
            let reply = match outcome {
                Ok(reply) => reply,
                Err(_) => {
                    error!(id = ?message.id(), "forwarding panicked");
                    (message.kind() == MessageKind::Request).then(|| {
                        JsonRpcResponse::error(
                            message.id().cloned(),
                            ErrorCode::InternalError,
                            "internal error",
                            None,
                        )
                        .into_value()
                    })
                }
            };
            if let Some(reply) = reply {
                send_reply(&tx, reply);
            }
        });
    }
}

fn send_reply(tx: &mpsc::UnboundedSender<Value>, reply: Value) {
    if tx.send(reply).is_err() {
        warn!("output closed, dropping reply");
    }
}

fn log_join(joined: Result<(), tokio::task::JoinError>) {
    if let Err(e) = joined {
        error!(error = %e, "dispatch task failed");
    }
}

async fn write_replies<W>(
    mut writer: W,
    mut rx: mpsc::UnboundedReceiver<Value>,
) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    while let Some(reply) = rx.recv().await {
        let mut line = serde_json::to_string(&reply)?;
        line.push('\n');
        writer.write_all(line.as_bytes()).await?;
        writer.flush().await?;
    }
    writer.shutdown().await
}
