//! Request Context & Server-Initiated Request Bridge
//!
//! Handlers receive an explicit [`RequestContext`] built by the dispatcher;
//! there is no ambient session accessor. The context carries the session id
//! and a handle to the [`ServerRequester`], which encapsulates the
//! pending-request table behind a small `send(method, params, timeout)`
//! surface.

// Layer 1: Standard library imports
use std::sync::Arc;

// Layer 2: Third-party crate imports
use serde_json::Value;
use tracing::{debug, warn};

// Layer 3: Internal module imports
use crate::correlation::{CorrelationManager, Timeout};
use crate::protocol::{
    client_methods, ElicitParams, ElicitResult, JsonRpcRequest, McpError, McpResult, RequestId,
};
use crate::session::{ConnectionManager, SessionId};

/// Bridge for server-initiated requests routed through an active session
///
/// Owns the interplay between the correlation table and the connection
/// registry: the pending entry is inserted before the transport write, and
/// every failure path removes it exactly once.
#[derive(Debug)]
pub struct ServerRequester {
    correlation: Arc<CorrelationManager>,
    connections: Arc<ConnectionManager>,
}

impl ServerRequester {
    /// Create a bridge over the given correlation and connection managers
    pub fn new(correlation: Arc<CorrelationManager>, connections: Arc<ConnectionManager>) -> Self {
        Self {
            correlation,
            connections,
        }
    }

    /// Send a request to the client behind `session_id` and await its answer
    ///
    /// # Errors
    ///
    /// * `Internal` when the session is gone or the transport write fails
    /// * `RequestTimeout` when the deadline elapses first (a late response is
    ///   then dropped by the correlation table, never dispatched)
    /// * `ServerError` relaying a JSON-RPC error the client returned
    pub async fn send(
        &self,
        session_id: &SessionId,
        method: &str,
        params: Option<Value>,
        timeout: Timeout,
    ) -> McpResult<Value> {
        let transport = self
            .connections
            .transport(session_id)
            .ok_or_else(|| McpError::internal(format!("no active session: {session_id}")))?;

        let (request_id, receiver) = self
            .correlation
            .register_request(session_id, method, timeout)
            .map_err(McpError::from)?;

        let request = JsonRpcRequest::new(method, params, request_id.clone());
        debug!(%session_id, method, %request_id, "sending client request");

        if let Err(error) = transport.send_request(request).await {
            self.correlation.expire_request(&request_id);
            return Err(McpError::internal(format!(
                "failed to send client request: {error}"
            )));
        }

        let deadline = self.correlation.resolve_timeout(timeout);
        let outcome = match deadline {
            Some(delta) => {
                let wait = delta.to_std().unwrap_or_default();
                match tokio::time::timeout(wait, receiver).await {
                    Ok(received) => received,
                    Err(_elapsed) => {
                        // Remove the entry so a late response finds nothing
                        self.correlation.expire_request(&request_id);
                        warn!(%session_id, method, %request_id, "client request timed out");
                        return Err(McpError::request_timeout(
                            delta.num_milliseconds().max(0) as u64,
                        ));
                    }
                }
            }
            None => receiver.await,
        };

        match outcome {
            Ok(result) => result.map_err(McpError::from),
            Err(_closed) => Err(McpError::internal(
                "client request channel closed before a response arrived",
            )),
        }
    }
}

/// Per-request context handed to every handler
///
/// Carries the identity of the inbound request and the bridge for initiating
/// requests back to the connected client. Cloning is cheap; tool handlers
/// may move the context into spawned work.
#[derive(Debug, Clone)]
pub struct RequestContext {
    session_id: SessionId,
    request_id: Option<RequestId>,
    method: String,
    requester: Option<Arc<ServerRequester>>,
}

impl RequestContext {
    /// Build a context for an inbound request on a live session
    pub fn new(
        session_id: impl Into<SessionId>,
        request_id: Option<RequestId>,
        method: impl Into<String>,
        requester: Arc<ServerRequester>,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            request_id,
            method: method.into(),
            requester: Some(requester),
        }
    }

    /// Build a context with no client bridge
    ///
    /// Used by tests and background invocations. Any attempt to initiate a
    /// client request from such a context fails fast with `Internal`.
    pub fn detached(session_id: impl Into<SessionId>) -> Self {
        Self {
            session_id: session_id.into(),
            request_id: None,
            method: String::new(),
            requester: None,
        }
    }

    /// Session this request arrived on
    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    /// Id of the inbound request, absent for notifications
    pub fn request_id(&self) -> Option<&RequestId> {
        self.request_id.as_ref()
    }

    /// Method of the inbound request
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Send an arbitrary request to the connected client
    ///
    /// # Errors
    ///
    /// Fails fast with `Internal` when no session bridge is attached;
    /// otherwise propagates the [`ServerRequester::send`] failure modes.
    pub async fn send_client_request(
        &self,
        method: &str,
        params: Option<Value>,
        timeout: Timeout,
    ) -> McpResult<Value> {
        let requester = self.requester.as_ref().ok_or_else(|| {
            McpError::internal("no session context available for client request")
        })?;
        requester
            .send(&self.session_id, method, params, timeout)
            .await
    }

    /// Ask the connected client for structured user input
    ///
    /// Sends `elicitation/create` with the message and requested schema and
    /// maps the response envelope into a typed [`ElicitResult`].
    ///
    /// # Errors
    ///
    /// Propagates the client bridge failure modes; a malformed response
    /// envelope surfaces as `InvalidParams`.
    pub async fn elicit(
        &self,
        message: impl Into<String>,
        requested_schema: Value,
    ) -> McpResult<ElicitResult> {
        let params = ElicitParams {
            message: message.into(),
            requested_schema,
        };
        let raw = self
            .send_client_request(
                client_methods::ELICITATION_CREATE,
                Some(serde_json::to_value(&params)?),
                Timeout::Default,
            )
            .await?;
        let result: ElicitResult = serde_json::from_value(raw)?;
        Ok(result)
    }

    /// Ask the connected client to sample its language model
    ///
    /// The params and result are passed through untyped; sampling shapes
    /// evolve faster than this server needs to understand them.
    ///
    /// # Errors
    ///
    /// Propagates the client bridge failure modes.
    pub async fn create_message(&self, params: Value) -> McpResult<Value> {
        self.send_client_request(
            client_methods::SAMPLING_CREATE_MESSAGE,
            Some(params),
            Timeout::Default,
        )
        .await
    }
}
