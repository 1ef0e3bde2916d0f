//! STDIO Transport
//!
//! Newline-delimited JSON-RPC over stdin/stdout. The process must keep these
//! streams silent for anything else: diagnostics go to the file sink set up
//! by [`crate::logging::init_stdio_logging`], never to stdout.
//!
//! Inbound response frames are routed to the pending-request table, so the
//! same pipe both serves the client and carries server-initiated requests
//! (elicitation, sampling) back to it. Each inbound request is handled on
//! its own task: a handler that blocks awaiting a client response must not
//! stall the read loop that will deliver that response.

// Layer 1: Standard library imports
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

// Layer 2: Third-party crate imports
use async_trait::async_trait;
use futures::StreamExt;
use tokio::io::{AsyncWriteExt, Stdin, Stdout};
use tokio::sync::mpsc;
use tokio_util::codec::{FramedRead, LinesCodec};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

// Layer 3: Internal module imports
use super::error::{TransportError, TransportResult};
use super::metrics::{TransportMetrics, TransportMetricsSnapshot};
use super::traits::{MessageContext, MessageHandler, SessionTransport};
use crate::protocol::{
    error_codes, JsonRpcMessage, JsonRpcMessageTrait, JsonRpcNotification, JsonRpcRequest,
    JsonRpcResponse, ProtocolError, RequestId,
};
use crate::server::McpServer;
use crate::session::SessionId;

/// Commands consumed by the single writer task
enum WriteCommand {
    Frame(String),
    Shutdown,
}

/// Outbound half of the stdio session
///
/// All writes funnel through one mpsc queue consumed by a single task that
/// owns stdout, which serializes frames per the transport contract.
pub struct StdioSessionTransport {
    sender: mpsc::UnboundedSender<WriteCommand>,
    metrics: TransportMetrics,
    closed: AtomicBool,
}

impl StdioSessionTransport {
    fn new(sender: mpsc::UnboundedSender<WriteCommand>) -> Self {
        Self {
            sender,
            metrics: TransportMetrics::new(),
            closed: AtomicBool::new(false),
        }
    }

    fn enqueue(&self, json: String) -> TransportResult<()> {
        if self.closed.load(Ordering::Relaxed) {
            return Err(TransportError::closed("stdio transport closed"));
        }
        self.metrics.record_sent(json.len() + 1);
        self.sender
            .send(WriteCommand::Frame(json))
            .map_err(|_| TransportError::closed("stdio writer task gone"))
    }
}

impl std::fmt::Debug for StdioSessionTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StdioSessionTransport")
            .field("closed", &self.closed.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl SessionTransport for StdioSessionTransport {
    async fn send_response(&self, response: JsonRpcResponse) -> TransportResult<()> {
        self.enqueue(response.to_json()?)
    }

    async fn send_request(&self, request: JsonRpcRequest) -> TransportResult<()> {
        self.enqueue(request.to_json()?)
    }

    async fn send_notification(&self, notification: JsonRpcNotification) -> TransportResult<()> {
        self.enqueue(notification.to_json()?)
    }

    async fn close(&self) -> TransportResult<()> {
        if !self.closed.swap(true, Ordering::Relaxed) {
            self.metrics.mark_closed();
            let _ = self.sender.send(WriteCommand::Shutdown);
        }
        Ok(())
    }

    fn is_active(&self) -> bool {
        !self.closed.load(Ordering::Relaxed)
    }

    fn metrics(&self) -> TransportMetricsSnapshot {
        self.metrics.snapshot()
    }
}

/// STDIO transport: one session over the process pipes
pub struct StdioTransport {
    server: Arc<McpServer>,
}

impl StdioTransport {
    /// Create a stdio transport bound to a server core
    pub fn new(server: Arc<McpServer>) -> Self {
        Self { server }
    }

    /// Run until stdin reaches EOF
    ///
    /// Registers one session, pumps frames in both directions, and tears the
    /// session down (cancelling its pending requests) on exit.
    ///
    /// # Errors
    ///
    /// Returns a [`TransportError`] when session registration fails; read
    /// errors end the loop and are reported through the handler instead.
    pub async fn run(&self) -> TransportResult<()> {
        self.run_on(tokio::io::stdin(), tokio::io::stdout()).await
    }

    /// Run the frame pump over explicit streams
    async fn run_on(&self, stdin: Stdin, stdout: Stdout) -> TransportResult<()> {
        let session_id: SessionId = format!("stdio-{}", Uuid::new_v4());
        let (sender, receiver) = mpsc::unbounded_channel();
        let transport = Arc::new(StdioSessionTransport::new(sender));

        self.server
            .connections()
            .register(session_id.clone(), Arc::clone(&transport) as Arc<dyn SessionTransport>)?;
        info!(%session_id, "stdio transport started");

        let writer = tokio::spawn(write_loop(stdout, receiver));
        self.read_loop(&session_id, stdin, Arc::clone(&transport))
            .await;

        // EOF or read failure: close our session and stop the writer
        let handler: &dyn MessageHandler = self.server.as_ref();
        handler.handle_close(&session_id).await;
        let _ = transport.close().await;
        let _ = writer.await;
        info!(%session_id, "stdio transport stopped");
        Ok(())
    }

    async fn read_loop(
        &self,
        session_id: &SessionId,
        stdin: Stdin,
        transport: Arc<StdioSessionTransport>,
    ) {
        let mut frames = FramedRead::new(stdin, LinesCodec::new());

        while let Some(line) = frames.next().await {
            let line = match line {
                Ok(line) => line,
                Err(read_error) => {
                    error!(%session_id, %read_error, "stdin read failed");
                    let handler: &dyn MessageHandler = self.server.as_ref();
                    handler
                        .handle_error(session_id, &read_error.to_string())
                        .await;
                    break;
                }
            };

            if line.trim().is_empty() {
                continue;
            }
            transport.metrics.record_received(line.len() + 1);

            match JsonRpcMessage::parse(&line) {
                Ok(JsonRpcMessage::Request(request)) => {
                    // Handlers may await client responses arriving on this
                    // very loop; never handle inline.
                    let server = Arc::clone(&self.server);
                    let transport = Arc::clone(&transport);
                    let context = MessageContext::new(session_id.clone());
                    tokio::spawn(async move {
                        let response = server.handle_request(request, context).await;
                        if let Err(send_error) = transport.send_response(response).await {
                            warn!(%send_error, "failed to write response frame");
                        }
                    });
                }
                Ok(JsonRpcMessage::Notification(notification)) => {
                    let server = Arc::clone(&self.server);
                    let context = MessageContext::new(session_id.clone());
                    tokio::spawn(async move {
                        server.handle_notification(notification, context).await;
                    });
                }
                Ok(JsonRpcMessage::Response(response)) => {
                    let handler: &dyn MessageHandler = self.server.as_ref();
                    handler
                        .handle_response(response, MessageContext::new(session_id.clone()))
                        .await;
                }
                Err(protocol_error) => {
                    debug!(%session_id, %protocol_error, "malformed frame");
                    let response = malformed_frame_response(&line, &protocol_error);
                    if let Err(send_error) = transport.send_response(response).await {
                        warn!(%send_error, "failed to write error frame");
                    }
                }
            }
        }
    }
}

impl std::fmt::Debug for StdioTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StdioTransport").finish_non_exhaustive()
    }
}

/// Build the error response for a frame that failed to decode
///
/// The original id is preserved when the frame parsed as JSON at all;
/// otherwise a fresh opaque id is generated so the client can still observe
/// the failure.
pub fn malformed_frame_response(line: &str, error: &ProtocolError) -> JsonRpcResponse {
    let id = JsonRpcMessage::recover_request_id(line)
        .or_else(|| Some(RequestId::new_string(format!("err-{}", Uuid::new_v4()))));
    JsonRpcResponse::error(
        serde_json::json!({
            "code": error.error_code(),
            "message": error.to_string(),
        }),
        id,
    )
}

async fn write_loop(mut stdout: Stdout, mut receiver: mpsc::UnboundedReceiver<WriteCommand>) {
    while let Some(command) = receiver.recv().await {
        match command {
            WriteCommand::Frame(json) => {
                if stdout.write_all(json.as_bytes()).await.is_err() {
                    break;
                }
                if stdout.write_all(b"\n").await.is_err() {
                    break;
                }
                if stdout.flush().await.is_err() {
                    break;
                }
            }
            WriteCommand::Shutdown => break,
        }
    }
}
