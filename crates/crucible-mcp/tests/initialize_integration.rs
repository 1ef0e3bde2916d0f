//! Initialization and version-negotiation integration tests

use crucible_mcp::protocol::{JsonRpcRequest, RequestId};
use crucible_mcp::schema::{ParamSpec, ParamType, ToolBuilder};
use crucible_mcp::server::{McpServer, McpServerBuilder};
use proptest::prelude::*;
use serde_json::json;
use std::sync::Arc;

fn server_with_tools(names: &[&str]) -> Arc<McpServer> {
    let server = McpServerBuilder::new()
        .name("integration-server")
        .title("Integration Server")
        .version("0.9.9")
        .instructions("Use the registered tools.")
        .build();

    for name in names {
        let (tool, specs) = ToolBuilder::new(*name)
            .param(ParamSpec::optional("input", ParamType::String))
            .build();
        server
            .tools()
            .register_fn(tool, specs, |_args, _ctx| async move {
                Ok("ok".to_string())
            })
            .unwrap();
    }
    server
}

async fn initialize(server: &McpServer, session: &str, version: &str) -> serde_json::Value {
    let response = server
        .dispatch_request(
            &session.to_string(),
            JsonRpcRequest::new(
                "initialize",
                Some(json!({
                    "protocolVersion": version,
                    "capabilities": {},
                    "clientInfo": {"name": "test-client", "version": "1.0"}
                })),
                RequestId::new_number(1),
            ),
        )
        .await;
    response.result.expect("initialize should succeed")
}

#[tokio::test]
async fn scenario_init_then_list_returns_tools_in_insertion_order() {
    let server = server_with_tools(&["roll_dice", "attack", "consult_codex"]);

    let init = initialize(&server, "session-1", "2025-06-18").await;
    assert_eq!(init["protocolVersion"], "2025-06-18");
    assert_eq!(init["serverInfo"]["name"], "integration-server");
    assert_eq!(init["serverInfo"]["title"], "Integration Server");
    assert_eq!(init["instructions"], "Use the registered tools.");
    assert!(init["capabilities"]["tools"].is_object());

    let list = server
        .dispatch_request(
            &"session-1".to_string(),
            JsonRpcRequest::new("tools/list", None, RequestId::new_number(2)),
        )
        .await;
    let tools = list.result.unwrap()["tools"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["name"].as_str().unwrap().to_string())
        .collect::<Vec<_>>();
    assert_eq!(tools, vec!["roll_dice", "attack", "consult_codex"]);
}

#[tokio::test]
async fn supported_versions_are_echoed() {
    let server = server_with_tools(&[]);
    for version in ["2025-06-18", "2024-11-05"] {
        let init = initialize(&server, "session-v", version).await;
        assert_eq!(init["protocolVersion"], version);
    }
}

#[tokio::test]
async fn unsupported_version_gets_latest() {
    let server = server_with_tools(&[]);
    let init = initialize(&server, "session-v", "2023-01-01").await;
    assert_eq!(init["protocolVersion"], "2025-06-18");
}

#[tokio::test]
async fn negotiated_version_is_stored_on_the_session() {
    let server = server_with_tools(&[]);
    let session = "session-store".to_string();

    // Session must exist for the version to stick
    server
        .connections()
        .register(session.clone(), test_support::null_transport())
        .unwrap();

    initialize(&server, &session, "2024-11-05").await;
    assert_eq!(
        server.connections().protocol_version(&session),
        Some("2024-11-05".to_string())
    );
}

#[tokio::test]
async fn capabilities_follow_registry_contents() {
    let server = server_with_tools(&[]);
    let init = initialize(&server, "s", "2025-06-18").await;
    assert_eq!(init["capabilities"], json!({}));

    let server = server_with_tools(&["one"]);
    server
        .completions()
        .register_fn(
            crucible_mcp::services::CompletionRefKind::Prompt,
            "greet",
            |_a, _v| async { Ok(crucible_mcp::protocol::Completion::default()) },
        );
    let init = initialize(&server, "s", "2025-06-18").await;
    assert!(init["capabilities"]["tools"].is_object());
    assert!(init["capabilities"]["completions"].is_object());
    assert!(init["capabilities"].get("resources").is_none());
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    // Response ids must equal request ids byte-for-byte, for both variants
    #[test]
    fn id_preservation_numeric(id in any::<i64>()) {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        runtime.block_on(async {
            let server = McpServerBuilder::new().build();
            let response = server
                .dispatch_request(
                    &"prop-session".to_string(),
                    JsonRpcRequest::new("ping", None, RequestId::new_number(id)),
                )
                .await;
            assert_eq!(response.id, Some(RequestId::new_number(id)));
        });
    }

    #[test]
    fn id_preservation_string(id in "[a-zA-Z0-9_-]{1,40}") {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        runtime.block_on(async {
            let server = McpServerBuilder::new().build();
            let response = server
                .dispatch_request(
                    &"prop-session".to_string(),
                    JsonRpcRequest::new("ping", None, RequestId::new_string(id.clone())),
                )
                .await;
            assert_eq!(response.id, Some(RequestId::new_string(id)));
        });
    }
}

mod test_support {
    use async_trait::async_trait;
    use crucible_mcp::protocol::{JsonRpcNotification, JsonRpcRequest, JsonRpcResponse};
    use crucible_mcp::transport::{
        SessionTransport, TransportMetrics, TransportMetricsSnapshot, TransportResult,
    };
    use std::sync::Arc;

    #[derive(Debug)]
    struct NullTransport {
        metrics: TransportMetrics,
    }

    #[async_trait]
    impl SessionTransport for NullTransport {
        async fn send_response(&self, _response: JsonRpcResponse) -> TransportResult<()> {
            Ok(())
        }
        async fn send_request(&self, _request: JsonRpcRequest) -> TransportResult<()> {
            Ok(())
        }
        async fn send_notification(
            &self,
            _notification: JsonRpcNotification,
        ) -> TransportResult<()> {
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

    pub fn null_transport() -> Arc<dyn SessionTransport> {
        Arc::new(NullTransport {
            metrics: TransportMetrics::new(),
        })
    }
}
