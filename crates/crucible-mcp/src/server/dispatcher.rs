//! Protocol Dispatcher
//!
//! The method table routing typed JSON-RPC requests to their handlers.
//! Dispatch resolves the handler by method name, deserializes params with
//! case-insensitive property matching (tool *argument* binding preserves
//! exact casing separately, in the binder), invokes the handler inside a
//! per-request tracing scope, and maps every failure onto a JSON-RPC error
//! envelope.

// Layer 1: Standard library imports
use std::collections::HashMap;
use std::sync::Arc;

// Layer 2: Third-party crate imports
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::{json, Map, Value};
use tracing::{debug, info, Instrument};

// Layer 3: Internal module imports
use super::context::RequestContext;
use crate::protocol::{
    constants::protocol, methods, CallToolParams, CompleteParams, CompletionCapabilities,
    GetPromptParams, InitializeParams, InitializeResult, JsonRpcRequest, JsonRpcResponse,
    McpError, McpResult, PromptCapabilities, ReadResourceParams, ResourceCapabilities,
    ServerCapabilities, ServerInfo, ToolCapabilities,
};
use crate::services::{
    CompletionRefKind, CompletionService, PromptService, ResourceService, ToolService,
};
use crate::session::ConnectionManager;

/// Deserialize request params with case-insensitive property matching
///
/// Incoming top-level keys are canonicalized against the target's known
/// field names before deserialization; unknown keys pass through untouched.
///
/// # Errors
///
/// Returns `InvalidParams` when the value does not match the target shape.
pub fn deserialize_params<T: DeserializeOwned>(
    params: Option<Value>,
    fields: &[&str],
) -> McpResult<T> {
    let value = match params {
        Some(Value::Object(object)) => {
            let mut canonical = Map::new();
            for (key, value) in object {
                let renamed = fields
                    .iter()
                    .find(|field| field.eq_ignore_ascii_case(&key))
                    .map(|field| (*field).to_string())
                    .unwrap_or(key);
                canonical.insert(renamed, value);
            }
            Value::Object(canonical)
        }
        Some(other) => other,
        None => Value::Object(Map::new()),
    };
    Ok(serde_json::from_value(value)?)
}

/// One entry in the method table
#[async_trait]
pub trait RequestHandler: Send + Sync {
    /// Handle a request's params and produce the result payload
    async fn handle(&self, params: Option<Value>, context: RequestContext) -> McpResult<Value>;
}

/// Method table and error-mapping front door
pub struct Dispatcher {
    handlers: HashMap<&'static str, Arc<dyn RequestHandler>>,
}

impl Dispatcher {
    /// Build the method table over the feature services
    pub fn new(
        server_info: ServerInfo,
        instructions: Option<String>,
        tools: Arc<ToolService>,
        resources: Arc<ResourceService>,
        prompts: Arc<PromptService>,
        completions: Arc<CompletionService>,
        connections: Arc<ConnectionManager>,
    ) -> Self {
        let mut handlers: HashMap<&'static str, Arc<dyn RequestHandler>> = HashMap::new();

        handlers.insert(methods::PING, Arc::new(PingHandler));
        handlers.insert(
            methods::INITIALIZE,
            Arc::new(InitializeHandler {
                server_info,
                instructions,
                tools: Arc::clone(&tools),
                resources: Arc::clone(&resources),
                prompts: Arc::clone(&prompts),
                completions: Arc::clone(&completions),
                connections,
            }),
        );
        handlers.insert(
            methods::TOOLS_LIST,
            Arc::new(ToolsListHandler {
                tools: Arc::clone(&tools),
            }),
        );
        handlers.insert(methods::TOOLS_CALL, Arc::new(ToolsCallHandler { tools }));
        handlers.insert(
            methods::RESOURCES_LIST,
            Arc::new(ResourcesListHandler {
                resources: Arc::clone(&resources),
            }),
        );
        handlers.insert(
            methods::RESOURCES_READ,
            Arc::new(ResourcesReadHandler { resources }),
        );
        handlers.insert(
            methods::PROMPTS_LIST,
            Arc::new(PromptsListHandler {
                prompts: Arc::clone(&prompts),
            }),
        );
        handlers.insert(methods::PROMPTS_GET, Arc::new(PromptsGetHandler { prompts }));
        handlers.insert(
            methods::COMPLETION_COMPLETE,
            Arc::new(CompletionCompleteHandler { completions }),
        );

        Self { handlers }
    }

    /// Dispatch one request to its handler and shape the response frame
    ///
    /// Never fails: every error becomes a JSON-RPC error envelope carrying
    /// the request's id byte-for-byte.
    pub async fn dispatch(
        &self,
        request: JsonRpcRequest,
        context: RequestContext,
    ) -> JsonRpcResponse {
        let span = tracing::info_span!(
            "mcp_request",
            method = %request.method,
            request_id = %request.id,
            session_id = %context.session_id(),
        );

        async move {
            let result = match self.handlers.get(request.method.as_str()) {
                Some(handler) => handler.handle(request.params, context).await,
                None => Err(McpError::method_not_found(&request.method)),
            };

            match result {
                Ok(value) => JsonRpcResponse::success(value, request.id),
                Err(error) => {
                    debug!(%error, code = error.error_code(), "request failed");
                    JsonRpcResponse::error(error.to_error_value(), Some(request.id))
                }
            }
        }
        .instrument(span)
        .await
    }

    /// Whether a method exists in the table
    pub fn has_method(&self, method: &str) -> bool {
        self.handlers.contains_key(method)
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("methods", &self.handlers.len())
            .finish()
    }
}

struct PingHandler;

#[async_trait]
impl RequestHandler for PingHandler {
    async fn handle(&self, _params: Option<Value>, _context: RequestContext) -> McpResult<Value> {
        Ok(json!({}))
    }
}

struct InitializeHandler {
    server_info: ServerInfo,
    instructions: Option<String>,
    tools: Arc<ToolService>,
    resources: Arc<ResourceService>,
    prompts: Arc<PromptService>,
    completions: Arc<CompletionService>,
    connections: Arc<ConnectionManager>,
}

impl InitializeHandler {
    /// Advertise a capability section only when its registry is non-empty
    fn capabilities(&self) -> ServerCapabilities {
        ServerCapabilities {
            tools: (!self.tools.is_empty()).then(|| ToolCapabilities {
                list_changed: Some(false),
            }),
            resources: (!self.resources.is_empty()).then(|| ResourceCapabilities {
                subscribe: Some(false),
                list_changed: Some(false),
            }),
            prompts: (!self.prompts.is_empty()).then(|| PromptCapabilities {
                list_changed: Some(false),
            }),
            completions: (!self.completions.is_empty()).then(CompletionCapabilities::default),
        }
    }
}

#[async_trait]
impl RequestHandler for InitializeHandler {
    async fn handle(&self, params: Option<Value>, context: RequestContext) -> McpResult<Value> {
        let params: InitializeParams = deserialize_params(
            params,
            &["protocolVersion", "capabilities", "clientInfo"],
        )
        .map_err(|_| McpError::invalid_params("protocolVersion is required"))?;

        // Echo a supported version, otherwise offer the latest
        let negotiated = if protocol::SUPPORTED_VERSIONS
            .contains(&params.protocol_version.as_str())
        {
            params.protocol_version.clone()
        } else {
            protocol::LATEST_VERSION.to_string()
        };

        self.connections
            .set_protocol_version(context.session_id(), &negotiated);

        let client_name = params
            .client_info
            .as_ref()
            .map(|info| info.name.as_str())
            .unwrap_or("unknown");
        info!(
            client = client_name,
            requested = %params.protocol_version,
            negotiated = %negotiated,
            "session initialized"
        );

        let result = InitializeResult {
            protocol_version: negotiated,
            capabilities: self.capabilities(),
            server_info: self.server_info.clone(),
            instructions: self.instructions.clone(),
        };
        Ok(serde_json::to_value(result)?)
    }
}

struct ToolsListHandler {
    tools: Arc<ToolService>,
}

#[async_trait]
impl RequestHandler for ToolsListHandler {
    async fn handle(&self, _params: Option<Value>, _context: RequestContext) -> McpResult<Value> {
        Ok(json!({"tools": self.tools.list_tools()}))
    }
}

struct ToolsCallHandler {
    tools: Arc<ToolService>,
}

#[async_trait]
impl RequestHandler for ToolsCallHandler {
    async fn handle(&self, params: Option<Value>, context: RequestContext) -> McpResult<Value> {
        let params: CallToolParams = deserialize_params(params, &["name", "arguments"])
            .map_err(|_| McpError::invalid_params("name is required"))?;

        let result = self
            .tools
            .call_tool(&params.name, params.arguments.as_ref(), context)
            .await?;
        Ok(serde_json::to_value(result)?)
    }
}

struct ResourcesListHandler {
    resources: Arc<ResourceService>,
}

#[async_trait]
impl RequestHandler for ResourcesListHandler {
    async fn handle(&self, _params: Option<Value>, _context: RequestContext) -> McpResult<Value> {
        Ok(json!({"resources": self.resources.list_resources()}))
    }
}

struct ResourcesReadHandler {
    resources: Arc<ResourceService>,
}

#[async_trait]
impl RequestHandler for ResourcesReadHandler {
    async fn handle(&self, params: Option<Value>, _context: RequestContext) -> McpResult<Value> {
        let params: ReadResourceParams = deserialize_params(params, &["uri"])
            .map_err(|_| McpError::invalid_params("uri is required"))?;
        let contents = self.resources.read_resource(&params.uri).await?;
        Ok(json!({"contents": contents}))
    }
}

struct PromptsListHandler {
    prompts: Arc<PromptService>,
}

#[async_trait]
impl RequestHandler for PromptsListHandler {
    async fn handle(&self, _params: Option<Value>, _context: RequestContext) -> McpResult<Value> {
        Ok(json!({"prompts": self.prompts.list_prompts()}))
    }
}

struct PromptsGetHandler {
    prompts: Arc<PromptService>,
}

#[async_trait]
impl RequestHandler for PromptsGetHandler {
    async fn handle(&self, params: Option<Value>, _context: RequestContext) -> McpResult<Value> {
        let params: GetPromptParams = deserialize_params(params, &["name", "arguments"])
            .map_err(|_| McpError::invalid_params("name is required"))?;
        let result = self.prompts.get_prompt(&params.name, params.arguments).await?;
        Ok(serde_json::to_value(result)?)
    }
}

struct CompletionCompleteHandler {
    completions: Arc<CompletionService>,
}

#[async_trait]
impl RequestHandler for CompletionCompleteHandler {
    async fn handle(&self, params: Option<Value>, _context: RequestContext) -> McpResult<Value> {
        let params: CompleteParams = deserialize_params(params, &["ref", "argument"])?;

        let kind = CompletionRefKind::parse(&params.reference.reference_type)?;
        let identifier = match kind {
            CompletionRefKind::Prompt => params.reference.name.as_deref(),
            CompletionRefKind::Resource => params.reference.uri.as_deref(),
        }
        .ok_or_else(|| McpError::invalid_params("completion reference identifier is required"))?;

        let result = self
            .completions
            .complete(kind, identifier, &params.argument.name, &params.argument.value)
            .await?;
        Ok(serde_json::to_value(result)?)
    }
}
