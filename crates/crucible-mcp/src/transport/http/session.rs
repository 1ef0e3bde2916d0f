//! SSE session transport
//!
//! The outbound half of one HTTP session: a single-consumer queue drained by
//! the SSE response stream. The queue is the write-serialization point; no
//! lock is held across handler execution.

// Layer 1: Standard library imports
use std::sync::atomic::{AtomicBool, Ordering};

// Layer 2: Third-party crate imports
use async_trait::async_trait;
use tokio::sync::mpsc;

// Layer 3: Internal module imports
use crate::protocol::{
    JsonRpcMessageTrait, JsonRpcNotification, JsonRpcRequest, JsonRpcResponse,
};
use crate::transport::error::{TransportError, TransportResult};
use crate::transport::metrics::{TransportMetrics, TransportMetricsSnapshot};
use crate::transport::traits::SessionTransport;

/// Frames flowing from the core to one SSE response stream
#[derive(Debug)]
pub enum SseFrame {
    /// One serialized JSON-RPC message, emitted as a `data:` event
    Message(String),
    /// Terminate the stream
    Shutdown,
}

/// Outbound wire of one SSE session
pub struct SseSessionTransport {
    sender: mpsc::UnboundedSender<SseFrame>,
    metrics: TransportMetrics,
    closed: AtomicBool,
}

impl SseSessionTransport {
    /// Create the transport and the receiver its stream will drain
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<SseFrame>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (
            Self {
                sender,
                metrics: TransportMetrics::new(),
                closed: AtomicBool::new(false),
            },
            receiver,
        )
    }

    fn enqueue(&self, json: String) -> TransportResult<()> {
        if self.closed.load(Ordering::Relaxed) {
            return Err(TransportError::closed("sse session closed"));
        }
        self.metrics.record_sent(json.len());
        self.sender
            .send(SseFrame::Message(json))
            .map_err(|_| TransportError::closed("sse stream receiver dropped"))
    }
}

impl std::fmt::Debug for SseSessionTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SseSessionTransport")
            .field("closed", &self.closed.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl SessionTransport for SseSessionTransport {
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
            let _ = self.sender.send(SseFrame::Shutdown);
        }
        Ok(())
    }

    fn record_received(&self, bytes: usize) {
        self.metrics.record_received(bytes);
    }

    fn is_active(&self) -> bool {
        !self.closed.load(Ordering::Relaxed)
    }

    fn metrics(&self) -> TransportMetricsSnapshot {
        self.metrics.snapshot()
    }
}
