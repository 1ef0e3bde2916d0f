//! Tool Service
//!
//! Registry and invocation path for tools. Listing returns descriptors in
//! insertion order; invocation binds and coerces arguments, then runs the
//! handler. Handler failures are coerced into
//! `CallToolResult { is_error: true }` rather than JSON-RPC errors, so the
//! calling model can observe the failure mode and react to it.

// Layer 1: Standard library imports
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

// Layer 2: Third-party crate imports
use futures::future::BoxFuture;
use serde_json::Value;
use tracing::{debug, warn};

// Layer 3: Internal module imports
use crate::protocol::{defaults, CallToolResult, Content, McpError, McpResult, Tool};
use crate::schema::{bind_arguments, BoundArguments, ParamSpec};
use crate::server::RequestContext;

/// Boxed asynchronous tool handler
pub type ToolHandlerFn = Arc<
    dyn Fn(BoundArguments, RequestContext) -> BoxFuture<'static, McpResult<CallToolResult>>
        + Send
        + Sync,
>;

/// Conversion of handler return values into the wire result shape
///
/// Mirrors the return normalization rules: a full result passes through,
/// strings become a single text block, arbitrary JSON is serialized into one.
pub trait IntoToolResult {
    /// Normalize into a [`CallToolResult`]
    fn into_tool_result(self) -> CallToolResult;
}

impl IntoToolResult for CallToolResult {
    fn into_tool_result(self) -> CallToolResult {
        self
    }
}

impl IntoToolResult for String {
    fn into_tool_result(self) -> CallToolResult {
        CallToolResult::success(vec![Content::text(self)])
    }
}

impl IntoToolResult for &str {
    fn into_tool_result(self) -> CallToolResult {
        CallToolResult::success(vec![Content::text(self)])
    }
}

impl IntoToolResult for Vec<Content> {
    fn into_tool_result(self) -> CallToolResult {
        CallToolResult::success(self)
    }
}

impl IntoToolResult for Value {
    fn into_tool_result(self) -> CallToolResult {
        let text = match self {
            Value::String(s) => s,
            other => other.to_string(),
        };
        CallToolResult::success(vec![Content::text(text)])
    }
}

struct ToolEntry {
    tool: Tool,
    specs: Vec<ParamSpec>,
    handler: ToolHandlerFn,
}

#[derive(Default)]
struct ToolRegistry {
    order: Vec<String>,
    entries: HashMap<String, Arc<ToolEntry>>,
}

/// Tool registry and invocation service
pub struct ToolService {
    registry: Mutex<ToolRegistry>,
}

impl ToolService {
    /// Create an empty tool service
    pub fn new() -> Self {
        Self {
            registry: Mutex::new(ToolRegistry::default()),
        }
    }

    /// Register a tool descriptor with its parameter specs and handler
    ///
    /// # Errors
    ///
    /// Returns `InvalidRequest` when the (case-sensitive) name is taken.
    pub fn register(
        &self,
        tool: Tool,
        specs: Vec<ParamSpec>,
        handler: ToolHandlerFn,
    ) -> McpResult<()> {
        let mut registry = self.lock();
        if registry.entries.contains_key(&tool.name) {
            return Err(McpError::invalid_request(format!(
                "tool already registered: {}",
                tool.name
            )));
        }
        let name = tool.name.clone();
        registry.order.push(name.clone());
        registry.entries.insert(
            name,
            Arc::new(ToolEntry {
                tool,
                specs,
                handler,
            }),
        );
        Ok(())
    }

    /// Register a tool with a handler returning any [`IntoToolResult`] value
    ///
    /// # Errors
    ///
    /// Returns `InvalidRequest` when the name is taken.
    pub fn register_fn<F, Fut, R>(
        &self,
        tool: Tool,
        specs: Vec<ParamSpec>,
        handler: F,
    ) -> McpResult<()>
    where
        F: Fn(BoundArguments, RequestContext) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = McpResult<R>> + Send + 'static,
        R: IntoToolResult,
    {
        let wrapped: ToolHandlerFn = Arc::new(move |arguments, context| {
            let fut = handler(arguments, context);
            Box::pin(async move { fut.await.map(IntoToolResult::into_tool_result) })
        });
        self.register(tool, specs, wrapped)
    }

    /// Whether any tool is registered (drives capability advertisement)
    pub fn is_empty(&self) -> bool {
        self.lock().order.is_empty()
    }

    /// All descriptors in insertion order
    pub fn list_tools(&self) -> Vec<Tool> {
        let registry = self.lock();
        registry
            .order
            .iter()
            .filter_map(|name| registry.entries.get(name).map(|entry| entry.tool.clone()))
            .collect()
    }

    /// Invoke a tool by name
    ///
    /// Binding failures (unknown tool, missing required parameter) surface
    /// as JSON-RPC errors; execution failures inside the handler become an
    /// `is_error` result.
    ///
    /// # Errors
    ///
    /// Returns `InvalidParams` for an unknown name or unbindable arguments.
    pub async fn call_tool(
        &self,
        name: &str,
        arguments: Option<&Value>,
        context: RequestContext,
    ) -> McpResult<CallToolResult> {
        let entry = {
            let registry = self.lock();
            registry.entries.get(name).cloned()
        }
        .ok_or_else(|| McpError::invalid_params(format!("Tool not found: {name}")))?;

        debug!(
            tool = name,
            arguments = %truncate_for_log(arguments),
            "executing tool"
        );

        let bound = bind_arguments(&entry.specs, arguments)?;
        match (entry.handler)(bound, context).await {
            Ok(result) => Ok(result),
            Err(error) => {
                warn!(tool = name, %error, "tool execution failed");
                Ok(CallToolResult::error(vec![
                    Content::text(error.to_string()),
                    Content::text(format!("{error:?}")),
                ]))
            }
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ToolRegistry> {
        self.registry
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for ToolService {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ToolService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolService")
            .field("tools", &self.lock().order)
            .finish()
    }
}

/// Render arguments for logging, truncated to the configured limit
fn truncate_for_log(arguments: Option<&Value>) -> String {
    let mut rendered = match arguments {
        Some(value) => value.to_string(),
        None => "null".to_string(),
    };
    if rendered.len() > defaults::ARGUMENT_LOG_LIMIT {
        let mut cut = defaults::ARGUMENT_LOG_LIMIT;
        while !rendered.is_char_boundary(cut) {
            cut -= 1;
        }
        rendered.truncate(cut);
        rendered.push('…');
    }
    rendered
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ParamType, ToolBuilder};
    use crate::server::RequestContext;
    use serde_json::json;

    fn echo_service() -> ToolService {
        let service = ToolService::new();
        let (tool, specs) = ToolBuilder::new("echo")
            .description("Echo a message back")
            .param(ParamSpec::required("message", ParamType::String))
            .build();
        service
            .register_fn(tool, specs, |args, _ctx| async move {
                let message = args.get_str("message").unwrap_or_default().to_string();
                Ok(message)
            })
            .unwrap();
        service
    }

    #[tokio::test]
    async fn echo_round_trip() {
        let service = echo_service();
        let result = service
            .call_tool(
                "echo",
                Some(&json!({"message": "Hello"})),
                RequestContext::detached("test"),
            )
            .await
            .unwrap();

        assert!(!result.is_error);
        assert_eq!(result.content, vec![Content::text("Hello")]);
    }

    #[tokio::test]
    async fn unknown_tool_is_invalid_params() {
        let service = echo_service();
        let err = service
            .call_tool("missing", None, RequestContext::detached("test"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Tool not found: missing"));
    }

    #[tokio::test]
    async fn handler_failure_becomes_error_result() {
        let service = ToolService::new();
        let (tool, specs) = ToolBuilder::new("explode").build();
        service
            .register_fn(tool, specs, |_args, _ctx| async move {
                Err::<String, _>(McpError::internal("the warp claimed it"))
            })
            .unwrap();

        let result = service
            .call_tool("explode", None, RequestContext::detached("test"))
            .await
            .unwrap();

        assert!(result.is_error);
        assert_eq!(result.content.len(), 2);
        match &result.content[0] {
            Content::Text { text } => assert!(text.contains("the warp claimed it")),
            other => panic!("expected text content, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn missing_required_argument_is_rpc_error() {
        let service = echo_service();
        let err = service
            .call_tool("echo", Some(&json!({})), RequestContext::detached("test"))
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), -32602);
    }

    #[test]
    fn duplicate_name_rejected() {
        let service = echo_service();
        let (tool, specs) = ToolBuilder::new("echo").build();
        assert!(service
            .register_fn(tool, specs, |_a, _c| async move { Ok("x".to_string()) })
            .is_err());
    }

    #[test]
    fn list_preserves_insertion_order() {
        let service = ToolService::new();
        for name in ["zeta", "alpha", "mid"] {
            let (tool, specs) = ToolBuilder::new(name).build();
            service
                .register_fn(tool, specs, |_a, _c| async move { Ok("ok".to_string()) })
                .unwrap();
        }
        let names: Vec<String> = service.list_tools().into_iter().map(|t| t.name).collect();
        assert_eq!(names, vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn object_return_serializes_to_text() {
        let value = json!({"hits": 3}).into_tool_result();
        assert_eq!(value.content, vec![Content::text(r#"{"hits":3}"#)]);
    }

    #[test]
    fn truncation_limits_log_payload() {
        let huge = json!({"blob": "x".repeat(2000)});
        let rendered = truncate_for_log(Some(&huge));
        assert!(rendered.len() <= defaults::ARGUMENT_LOG_LIMIT + '…'.len_utf8());
    }
}
