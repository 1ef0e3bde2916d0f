//! Transport Abstractions
//!
//! The shared contract between the protocol core and the concrete
//! transports. A transport owns exactly one session's wire: all `send_*`
//! operations are serialized per session (each implementation funnels writes
//! through a single-consumer queue), and inbound frames are delivered to a
//! [`MessageHandler`], the event-driven seam the server core plugs into.

// Layer 1: Standard library imports
use std::fmt;

// Layer 2: Third-party crate imports
use async_trait::async_trait;

// Layer 3: Internal module imports
use super::error::TransportResult;
use super::metrics::TransportMetricsSnapshot;
use crate::protocol::{JsonRpcNotification, JsonRpcRequest, JsonRpcResponse};
use crate::session::SessionId;

/// Context delivered with every inbound frame
#[derive(Debug, Clone)]
pub struct MessageContext {
    /// The session the frame arrived on
    pub session_id: SessionId,
}

impl MessageContext {
    /// Create a context for a session
    pub fn new(session_id: impl Into<SessionId>) -> Self {
        Self {
            session_id: session_id.into(),
        }
    }
}

/// Event-driven handler for inbound transport traffic
///
/// The protocol core implements this once; every transport delivers into it.
/// Requests produce a response frame the transport must write back;
/// notifications and responses are one-way.
#[async_trait]
pub trait MessageHandler: Send + Sync {
    /// Handle an inbound request and produce the response frame
    async fn handle_request(
        &self,
        request: JsonRpcRequest,
        context: MessageContext,
    ) -> JsonRpcResponse;

    /// Handle an inbound notification
    async fn handle_notification(&self, notification: JsonRpcNotification, context: MessageContext);

    /// Handle an inbound response (answers to server-initiated requests)
    async fn handle_response(&self, response: JsonRpcResponse, context: MessageContext);

    /// Observe a transport-level error on a session
    async fn handle_error(&self, session_id: &SessionId, message: &str);

    /// Observe a session closing
    async fn handle_close(&self, session_id: &SessionId);
}

/// One session's outbound wire
///
/// Implementations serialize writes internally; callers may invoke `send_*`
/// concurrently from any task.
#[async_trait]
pub trait SessionTransport: Send + Sync + fmt::Debug {
    /// Send a response frame to the client
    async fn send_response(&self, response: JsonRpcResponse) -> TransportResult<()>;

    /// Send a server-initiated request frame to the client
    async fn send_request(&self, request: JsonRpcRequest) -> TransportResult<()>;

    /// Send a notification frame to the client
    async fn send_notification(&self, notification: JsonRpcNotification) -> TransportResult<()>;

    /// Close the session's wire
    async fn close(&self) -> TransportResult<()>;

    /// Record inbound traffic that arrived out-of-band (HTTP POST ingress)
    fn record_received(&self, _bytes: usize) {}

    /// Whether the wire is still open
    fn is_active(&self) -> bool;

    /// Current traffic counters
    fn metrics(&self) -> TransportMetricsSnapshot;
}
