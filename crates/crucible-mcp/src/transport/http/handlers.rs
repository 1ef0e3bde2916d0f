//! HTTP endpoint handlers
//!
//! `GET /mcp` opens the SSE session (handshake headers, initial comment
//! frame, per-session queue); `POST /mcp` is the ingress for client frames,
//! correlated to a session by the `Mcp-Session-Id` header (or the legacy
//! `sessionId` query parameter). Origin and protocol-version policies are
//! enforced here, before any frame reaches the dispatcher.

// Layer 1: Standard library imports
use std::convert::Infallible;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

// Layer 2: Third-party crate imports
use axum::{
    extract::{Extension, Query, State},
    http::{header, header::HeaderName, HeaderMap, HeaderValue, StatusCode},
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Json, Response,
    },
};
use futures::{stream, Stream, StreamExt};
use serde::Deserialize;
use serde_json::json;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::{debug, info, warn};
use uuid::Uuid;

// Layer 3: Internal module imports
use super::config::HttpTransportConfig;
use super::session::{SseFrame, SseSessionTransport};
use crate::oauth2::AuthContext;
use crate::protocol::{headers as mcp_headers, methods, JsonRpcMessage, ProtocolError};
use crate::server::McpServer;
use crate::session::SessionId;
use crate::transport::traits::{MessageContext, MessageHandler};

/// Shared state for the HTTP handlers
#[derive(Clone)]
pub struct HttpState {
    /// The protocol core
    pub server: Arc<McpServer>,
    /// Transport policy
    pub config: Arc<HttpTransportConfig>,
}

#[derive(Debug, Deserialize)]
pub struct SessionQuery {
    /// Legacy session correlation for clients that cannot set headers
    #[serde(rename = "sessionId")]
    session_id: Option<String>,
}

/// JSON error body for non-RPC failures (`{error, message?}`)
fn error_body(status: StatusCode, error: &str, message: Option<String>) -> Response {
    let mut body = json!({"error": error});
    if let Some(message) = message {
        body["message"] = json!(message);
    }
    (status, Json(body)).into_response()
}

fn insert_header(headers: &mut HeaderMap, name: &str, value: &str) {
    if let (Ok(name), Ok(value)) = (
        HeaderName::from_bytes(name.as_bytes()),
        HeaderValue::from_str(value),
    ) {
        headers.insert(name, value);
    }
}

/// SSE stream that unregisters its session when the client disconnects
struct SessionStream {
    receiver: UnboundedReceiverStream<SseFrame>,
    server: Arc<McpServer>,
    session_id: SessionId,
}

impl Stream for SessionStream {
    type Item = Result<Event, Infallible>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        match Pin::new(&mut self.receiver).poll_next(cx) {
            Poll::Ready(Some(SseFrame::Message(json))) => {
                Poll::Ready(Some(Ok(Event::default().data(json))))
            }
            Poll::Ready(Some(SseFrame::Shutdown)) | Poll::Ready(None) => Poll::Ready(None),
            Poll::Pending => Poll::Pending,
        }
    }
}

impl Drop for SessionStream {
    fn drop(&mut self) {
        // Client disconnects surface here; tear the session down off-stream
        let server = Arc::clone(&self.server);
        let session_id = self.session_id.clone();
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            handle.spawn(async move {
                server
                    .connections()
                    .unregister(&session_id, "sse stream closed")
                    .await;
            });
        }
    }
}

/// `GET /mcp`: open a session and stream server-to-client frames
pub async fn handle_sse(
    State(state): State<HttpState>,
    auth: Option<Extension<AuthContext>>,
    headers: HeaderMap,
) -> Response {
    if let Some(response) = reject_origin(&state.config, &headers) {
        return response;
    }

    let session_id: SessionId = Uuid::new_v4().to_string();
    let (transport, receiver) = SseSessionTransport::channel();

    if let Err(error) = state
        .server
        .connections()
        .register(session_id.clone(), Arc::new(transport))
    {
        warn!(%error, "failed to register sse session");
        return error_body(
            StatusCode::INTERNAL_SERVER_ERROR,
            "internal_error",
            Some(error.to_string()),
        );
    }

    if let Some(Extension(auth)) = auth {
        state
            .server
            .connections()
            .add_metadata(&session_id, auth.metadata_entries());
    }

    info!(%session_id, "sse session opened");

    // Empty comment completes the client handshake before any data frame
    let handshake = stream::once(async { Ok(Event::default().comment("")) });
    let body = handshake.chain(SessionStream {
        receiver: UnboundedReceiverStream::new(receiver),
        server: Arc::clone(&state.server),
        session_id: session_id.clone(),
    });

    let mut response_headers = HeaderMap::new();
    insert_header(&mut response_headers, mcp_headers::MCP_SESSION_ID, &session_id);
    response_headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    response_headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));

    (
        response_headers,
        Sse::new(body).keep_alive(KeepAlive::default()),
    )
        .into_response()
}

/// `POST /mcp`: accept one JSON-RPC frame for an existing session
pub async fn handle_post(
    State(state): State<HttpState>,
    auth: Option<Extension<AuthContext>>,
    Query(query): Query<SessionQuery>,
    headers: HeaderMap,
    body: String,
) -> Response {
    if let Some(response) = reject_origin(&state.config, &headers) {
        return response;
    }

    let session_id = match headers
        .get(mcp_headers::MCP_SESSION_ID)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
        .or(query.session_id)
    {
        Some(session_id) => session_id,
        None => {
            return error_body(
                StatusCode::BAD_REQUEST,
                "invalid_request",
                Some(format!("Missing {} header", mcp_headers::MCP_SESSION_ID)),
            )
        }
    };

    let Some(transport) = state.server.connections().transport(&session_id) else {
        return error_body(
            StatusCode::NOT_FOUND,
            "unknown_session",
            Some(format!("No active session: {session_id}")),
        );
    };

    if let Some(Extension(auth)) = auth {
        state
            .server
            .connections()
            .add_metadata(&session_id, auth.metadata_entries());
    }

    let frame = match JsonRpcMessage::parse(&body) {
        Ok(frame) => frame,
        Err(ProtocolError::Parse(message)) => {
            return error_body(StatusCode::BAD_REQUEST, "parse_error", Some(message))
        }
        Err(ProtocolError::InvalidFrame(message)) => {
            return error_body(StatusCode::BAD_REQUEST, "invalid_request", Some(message))
        }
    };

    transport.record_received(body.len());

    // Once a session negotiated a version, every POST must prove it speaks
    // that version; only the initialize request itself is exempt
    let is_initialize = matches!(
        &frame,
        JsonRpcMessage::Request(request) if request.method == methods::INITIALIZE
    );
    if !is_initialize {
        if let Some(response) = reject_protocol_version(&state, &session_id, &headers) {
            return response;
        }
    }

    let context = MessageContext::new(session_id.clone());
    match frame {
        JsonRpcMessage::Request(request) => {
            let response = state.server.handle_request(request, context).await;
            if let Err(error) = transport.send_response(response).await {
                warn!(%session_id, %error, "failed to queue response on sse stream");
            }
        }
        JsonRpcMessage::Notification(notification) => {
            state.server.handle_notification(notification, context).await;
        }
        JsonRpcMessage::Response(response) => {
            debug!(%session_id, "routing response frame to pending-request table");
            state.server.handle_response(response, context).await;
        }
    }

    let mut response_headers = HeaderMap::new();
    insert_header(&mut response_headers, mcp_headers::MCP_SESSION_ID, &session_id);
    if let Some(negotiated) = state.server.connections().protocol_version(&session_id) {
        insert_header(
            &mut response_headers,
            mcp_headers::MCP_PROTOCOL_VERSION,
            &negotiated,
        );
    }

    (StatusCode::ACCEPTED, response_headers).into_response()
}

/// `GET /health`
pub async fn handle_health() -> Response {
    (StatusCode::OK, Json(json!({"status": "ok"}))).into_response()
}

fn reject_origin(config: &HttpTransportConfig, headers: &HeaderMap) -> Option<Response> {
    let origin = headers
        .get(header::ORIGIN)
        .and_then(|value| value.to_str().ok());
    if config.origin_allowed(origin) {
        return None;
    }
    debug!(?origin, "rejecting request from disallowed origin");
    Some(error_body(
        StatusCode::FORBIDDEN,
        "invalid_origin",
        Some("Origin is not in the configured allow-list".to_string()),
    ))
}

/// Enforce the `MCP-Protocol-Version` header once a session negotiated one
fn reject_protocol_version(
    state: &HttpState,
    session_id: &SessionId,
    headers: &HeaderMap,
) -> Option<Response> {
    if !state.config.enforce_protocol_version {
        return None;
    }
    let negotiated = state.server.connections().protocol_version(session_id)?;

    match headers
        .get(mcp_headers::MCP_PROTOCOL_VERSION)
        .and_then(|value| value.to_str().ok())
    {
        Some(version) if version == negotiated => None,
        Some(version) => Some(error_body(
            StatusCode::BAD_REQUEST,
            "invalid_request",
            Some(format!(
                "Unsupported {} header: {version} (negotiated {negotiated})",
                mcp_headers::MCP_PROTOCOL_VERSION
            )),
        )),
        None => Some(error_body(
            StatusCode::BAD_REQUEST,
            "invalid_request",
            Some(format!(
                "Missing {} header",
                mcp_headers::MCP_PROTOCOL_VERSION
            )),
        )),
    }
}
