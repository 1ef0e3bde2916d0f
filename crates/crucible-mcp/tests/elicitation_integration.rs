//! Elicitation round-trip, timeout, and session-isolation integration tests

use async_trait::async_trait;
use chrono::TimeDelta;
use crucible_mcp::correlation::CorrelationConfig;
use crucible_mcp::protocol::{
    JsonRpcNotification, JsonRpcRequest, JsonRpcResponse, RequestId,
};
use crucible_mcp::schema::ToolBuilder;
use crucible_mcp::server::{McpServer, McpServerBuilder};
use crucible_mcp::transport::{
    MessageContext, MessageHandler, SessionTransport, TransportMetrics,
    TransportMetricsSnapshot, TransportResult,
};
use serde_json::json;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Transport that hands every server-initiated request to the test
#[derive(Debug)]
struct CapturingTransport {
    requests: mpsc::UnboundedSender<JsonRpcRequest>,
    metrics: TransportMetrics,
}

impl CapturingTransport {
    fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<JsonRpcRequest>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (
            Arc::new(Self {
                requests: sender,
                metrics: TransportMetrics::new(),
            }),
            receiver,
        )
    }
}

#[async_trait]
impl SessionTransport for CapturingTransport {
    async fn send_response(&self, _response: JsonRpcResponse) -> TransportResult<()> {
        Ok(())
    }
    async fn send_request(&self, request: JsonRpcRequest) -> TransportResult<()> {
        let _ = self.requests.send(request);
        Ok(())
    }
    async fn send_notification(&self, _notification: JsonRpcNotification) -> TransportResult<()> {
        Ok(())
    }
    async fn close(&self) -> TransportResult<()> {
        self.metrics.mark_closed();
        Ok(())
    }
    fn is_active(&self) -> bool {
        self.metrics.is_active()
    }
    fn metrics(&self) -> TransportMetricsSnapshot {
        self.metrics.snapshot()
    }
}

fn server_with_ask_tool(timeout: TimeDelta) -> Arc<McpServer> {
    let server = McpServerBuilder::new()
        .correlation_config(
            CorrelationConfig::default().with_default_timeout(Some(timeout)),
        )
        .build();

    let (tool, specs) = ToolBuilder::new("ask_name").build();
    server
        .tools()
        .register_fn(tool, specs, |_args, ctx| async move {
            let result = ctx
                .elicit(
                    "Name your champion",
                    json!({
                        "type": "object",
                        "properties": {"name": {"type": "string"}},
                        "required": ["name"]
                    }),
                )
                .await?;
            match result.content {
                Some(content) => Ok(format!(
                    "action={:?} name={}",
                    result.action,
                    content["name"].as_str().unwrap_or("?")
                )),
                None => Ok(format!("action={:?}", result.action)),
            }
        })
        .unwrap();
    server
}

fn call_tool_request() -> JsonRpcRequest {
    JsonRpcRequest::new(
        "tools/call",
        Some(json!({"name": "ask_name", "arguments": {}})),
        RequestId::new_number(5),
    )
}

#[tokio::test]
async fn scenario_elicitation_round_trip() {
    let server = server_with_ask_tool(TimeDelta::seconds(10));
    let session = "elicit-session".to_string();

    let (transport, mut requests) = CapturingTransport::new();
    server
        .connections()
        .register(session.clone(), transport)
        .unwrap();

    // Play the client: answer the elicitation when it arrives
    let responder_server = Arc::clone(&server);
    let responder_session = session.clone();
    tokio::spawn(async move {
        if let Some(request) = requests.recv().await {
            assert_eq!(request.method, "elicitation/create");
            let params = request.params.unwrap();
            assert_eq!(params["message"], "Name your champion");
            assert_eq!(params["requestedSchema"]["required"], json!(["name"]));

            responder_server
                .handle_response(
                    JsonRpcResponse::success(
                        json!({"action": "accept", "content": {"name": "Rogue Trader"}}),
                        request.id,
                    ),
                    MessageContext::new(responder_session),
                )
                .await;
        }
    });

    let response = server.dispatch_request(&session, call_tool_request()).await;
    let result = response.result.unwrap();
    assert_eq!(result["isError"], false);
    let text = result["content"][0]["text"].as_str().unwrap();
    assert!(text.contains("Accept"));
    assert!(text.contains("Rogue Trader"));
}

#[tokio::test]
async fn decline_reaches_the_tool() {
    let server = server_with_ask_tool(TimeDelta::seconds(10));
    let session = "decline-session".to_string();

    let (transport, mut requests) = CapturingTransport::new();
    server
        .connections()
        .register(session.clone(), transport)
        .unwrap();

    let responder_server = Arc::clone(&server);
    let responder_session = session.clone();
    tokio::spawn(async move {
        if let Some(request) = requests.recv().await {
            responder_server
                .handle_response(
                    JsonRpcResponse::success(json!({"action": "decline"}), request.id),
                    MessageContext::new(responder_session),
                )
                .await;
        }
    });

    let response = server.dispatch_request(&session, call_tool_request()).await;
    let text = response.result.unwrap()["content"][0]["text"]
        .as_str()
        .unwrap()
        .to_string();
    assert!(text.contains("Decline"));
}

#[tokio::test]
async fn timeout_rejects_and_late_response_is_dropped() {
    let server = server_with_ask_tool(TimeDelta::milliseconds(100));
    let session = "timeout-session".to_string();

    let (transport, mut requests) = CapturingTransport::new();
    server
        .connections()
        .register(session.clone(), transport)
        .unwrap();

    // Nobody answers; the tool observes the timeout as an error result
    let response = server.dispatch_request(&session, call_tool_request()).await;
    let result = response.result.unwrap();
    assert_eq!(result["isError"], true);
    let text = result["content"][0]["text"].as_str().unwrap();
    assert!(text.to_lowercase().contains("timed out"), "got: {text}");

    // The entry is gone; a late response must be dropped, not dispatched
    let request = requests.recv().await.unwrap();
    assert_eq!(server.correlation().pending_count(), 0);
    server
        .handle_response(
            JsonRpcResponse::success(json!({"action": "accept"}), request.id),
            MessageContext::new(session.clone()),
        )
        .await;
    assert_eq!(server.correlation().pending_count(), 0);
}

#[tokio::test]
async fn sessions_cannot_answer_each_others_requests() {
    let server = server_with_ask_tool(TimeDelta::seconds(5));
    let session_a = "session-a".to_string();
    let session_b = "session-b".to_string();

    let (transport_a, mut requests_a) = CapturingTransport::new();
    let (transport_b, _requests_b) = CapturingTransport::new();
    server
        .connections()
        .register(session_a.clone(), transport_a)
        .unwrap();
    server
        .connections()
        .register(session_b.clone(), transport_b)
        .unwrap();

    let responder_server = Arc::clone(&server);
    let intruder = session_b.clone();
    let owner = session_a.clone();
    tokio::spawn(async move {
        if let Some(request) = requests_a.recv().await {
            // Session B tries to answer A's request: must be dropped
            responder_server
                .handle_response(
                    JsonRpcResponse::success(
                        json!({"action": "accept", "content": {"name": "Impostor"}}),
                        request.id.clone(),
                    ),
                    MessageContext::new(intruder),
                )
                .await;

            // The rightful session resolves it
            responder_server
                .handle_response(
                    JsonRpcResponse::success(
                        json!({"action": "accept", "content": {"name": "Legitimate"}}),
                        request.id,
                    ),
                    MessageContext::new(owner),
                )
                .await;
        }
    });

    let response = server
        .dispatch_request(&session_a, call_tool_request())
        .await;
    let text = response.result.unwrap()["content"][0]["text"]
        .as_str()
        .unwrap()
        .to_string();
    assert!(text.contains("Legitimate"), "got: {text}");
    assert!(!text.contains("Impostor"));
}

#[tokio::test]
async fn closing_a_session_cancels_its_pending_requests() {
    let server = server_with_ask_tool(TimeDelta::seconds(30));
    let session = "closing-session".to_string();

    let (transport, mut requests) = CapturingTransport::new();
    server
        .connections()
        .register(session.clone(), transport)
        .unwrap();

    let closer_server = Arc::clone(&server);
    let closer_session = session.clone();
    tokio::spawn(async move {
        // Wait until the elicitation is in flight, then slam the door
        let _ = requests.recv().await;
        closer_server
            .connections()
            .unregister(&closer_session, "client went away")
            .await;
    });

    let response = server.dispatch_request(&session, call_tool_request()).await;
    let result = response.result.unwrap();
    assert_eq!(result["isError"], true);
    assert_eq!(server.correlation().pending_count(), 0);
}

#[tokio::test]
async fn client_error_response_propagates_code() {
    let server = server_with_ask_tool(TimeDelta::seconds(10));
    let session = "error-session".to_string();

    let (transport, mut requests) = CapturingTransport::new();
    server
        .connections()
        .register(session.clone(), transport)
        .unwrap();

    let responder_server = Arc::clone(&server);
    let responder_session = session.clone();
    tokio::spawn(async move {
        if let Some(request) = requests.recv().await {
            responder_server
                .handle_response(
                    JsonRpcResponse::error(
                        json!({"code": -32042, "message": "user unavailable"}),
                        Some(request.id),
                    ),
                    MessageContext::new(responder_session),
                )
                .await;
        }
    });

    let response = server.dispatch_request(&session, call_tool_request()).await;
    let result = response.result.unwrap();
    assert_eq!(result["isError"], true);
    let text = result["content"][0]["text"].as_str().unwrap();
    assert!(text.contains("user unavailable"));
}
