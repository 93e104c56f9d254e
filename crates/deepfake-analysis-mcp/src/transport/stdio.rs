//! Stdio transport: reads JSON-RPC from stdin, writes to stdout.

use std::sync::Arc;

use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinSet;

use crate::protocol::ProtocolHandler;
use crate::types::{JsonRpcError, JsonRpcMessage, McpError, McpResult, RequestId};

use super::framing;

/// Stdio transport for desktop MCP clients.
///
/// Requests run on their own tasks so a long analysis does not hold up
/// later messages; all output goes through one writer task.
pub struct StdioTransport {
    handler: Arc<ProtocolHandler>,
}

impl StdioTransport {
    pub fn new(handler: ProtocolHandler) -> Self {
        Self {
            handler: Arc::new(handler),
        }
    }

    /// Run the transport loop: reads from stdin, writes to stdout.
    pub async fn run(&self) -> McpResult<()> {
        let reader = BufReader::new(tokio::io::stdin());
        self.serve(reader, tokio::io::stdout()).await
    }

    /// Serve newline-delimited JSON-RPC until EOF or shutdown.
    ///
    /// On EOF, requests already running are allowed to finish and their
    /// responses are written. Cancelling the handler's shutdown token stops
    /// reading and cancels them instead.
    pub async fn serve<R, W>(&self, reader: R, writer: W) -> McpResult<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let shutdown = self.handler.shutdown_token().clone();
        let (tx, rx) = mpsc::unbounded_channel::<Value>();
        let writer_task = tokio::spawn(write_loop(rx, writer));
        let mut tasks = JoinSet::new();
        let mut lines = reader.lines();

        tracing::info!("Stdio transport started");

        loop {
            let line = tokio::select! {
                _ = shutdown.cancelled() => {
                    tracing::info!("Shutdown signalled, stopping stdio transport");
                    break;
                }
                line = lines.next_line() => line.map_err(McpError::Io)?,
            };

            let Some(line) = line else {
                tracing::info!("EOF on stdin, shutting down");
                break;
            };

            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            match framing::parse_message(trimmed) {
                Ok(JsonRpcMessage::Request(request)) => {
                    // Registered before the next line is read.
                    match self.handler.admit(request).await {
                        Ok(admitted) => {
                            let handler = self.handler.clone();
                            let tx = tx.clone();
                            tasks.spawn(async move {
                                let _ = tx.send(handler.run(admitted).await);
                            });
                        }
                        Err(rejection) => {
                            let _ = tx.send(rejection);
                        }
                    }
                }
                Ok(msg) => {
                    // Notifications are handled inline so a cancellation takes
                    // effect before the next line is read.
                    if let Some(response) = self.handler.handle_message(msg).await {
                        let _ = tx.send(response);
                    }
                }
                Err(e) => {
                    tracing::warn!("Parse error: {e}");
                    let error_response: JsonRpcError = e.to_json_rpc_error(RequestId::Null);
                    let value = serde_json::to_value(error_response)
                        .map_err(|e| McpError::InternalError(e.to_string()))?;
                    let _ = tx.send(value);
                }
            }

            while let Some(joined) = tasks.try_join_next() {
                if let Err(e) = joined {
                    tracing::error!("Request task failed: {e}");
                }
            }
        }

        if !tasks.is_empty() {
            tracing::info!("Waiting for {} in-flight request(s)", tasks.len());
        }
        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                tracing::error!("Request task failed: {e}");
            }
        }

        drop(tx);
        writer_task
            .await
            .map_err(|e| McpError::Transport(format!("Writer task failed: {e}")))?
    }
}

async fn write_loop<W>(mut rx: mpsc::UnboundedReceiver<Value>, mut writer: W) -> McpResult<()>
where
    W: AsyncWrite + Unpin,
{
    while let Some(value) = rx.recv().await {
        let framed = framing::frame_message(&value)?;
        writer
            .write_all(framed.as_bytes())
            .await
            .map_err(McpError::Io)?;
        writer.flush().await.map_err(McpError::Io)?;
    }
    Ok(())
}
