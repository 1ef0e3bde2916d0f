//! MCP Server Core
//!
//! [`McpServer`] ties the protocol pieces together: the method-table
//! dispatcher, the feature services, the connection manager, and the
//! correlation table for server-initiated requests. Transports deliver
//! inbound frames through the [`MessageHandler`] implementation and receive
//! response frames to write back.

pub mod context;
pub mod dispatcher;

// Layer 1: Standard library imports
use std::sync::Arc;

// Layer 2: Third-party crate imports
use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, warn};

// Layer 3: Internal module imports
use crate::correlation::{CorrelationConfig, CorrelationError, CorrelationManager};
use crate::protocol::{
    defaults, methods, JsonRpcNotification, JsonRpcRequest, JsonRpcResponse, McpError, ServerInfo,
};
use crate::services::{CompletionService, PromptService, ResourceService, ToolService};
use crate::session::{ConnectionManager, SessionConfig, SessionId};
use crate::transport::{MessageContext, MessageHandler};

pub use context::{RequestContext, ServerRequester};
pub use dispatcher::{deserialize_params, Dispatcher, RequestHandler};

/// Builder for [`McpServer`]
///
/// # Examples
///
/// ```rust
/// use crucible_mcp::server::McpServerBuilder;
///
/// # async fn example() {
/// let server = McpServerBuilder::new()
///     .name("codex-server")
///     .version("1.0.0")
///     .instructions("Query the codex before acting.")
///     .build();
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct McpServerBuilder {
    name: String,
    title: Option<String>,
    version: String,
    instructions: Option<String>,
    correlation_config: CorrelationConfig,
    session_config: SessionConfig,
}

impl McpServerBuilder {
    /// Start a builder with default identity and timeouts
    pub fn new() -> Self {
        Self {
            name: defaults::SERVER_NAME.to_string(),
            title: None,
            version: env!("CARGO_PKG_VERSION").to_string(),
            instructions: None,
            correlation_config: CorrelationConfig::default(),
            session_config: SessionConfig::default(),
        }
    }

    /// Set the server name
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the human-readable title
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Set the server version
    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// Set the instructions string returned at `initialize`
    pub fn instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = Some(instructions.into());
        self
    }

    /// Override the correlation (client-request) configuration
    pub fn correlation_config(mut self, config: CorrelationConfig) -> Self {
        self.correlation_config = config;
        self
    }

    /// Override the session lifecycle configuration
    pub fn session_config(mut self, config: SessionConfig) -> Self {
        self.session_config = config;
        self
    }

    /// Assemble the server
    pub fn build(self) -> Arc<McpServer> {
        let correlation = CorrelationManager::new(self.correlation_config);
        let connections =
            ConnectionManager::new(self.session_config, Arc::clone(&correlation));

        let tools = Arc::new(ToolService::new());
        let resources = Arc::new(ResourceService::new());
        let prompts = Arc::new(PromptService::new());
        let completions = Arc::new(CompletionService::new());

        let requester = Arc::new(ServerRequester::new(
            Arc::clone(&correlation),
            Arc::clone(&connections),
        ));

        let server_info = ServerInfo {
            name: self.name,
            title: self.title,
            version: self.version,
        };

        let dispatcher = Dispatcher::new(
            server_info.clone(),
            self.instructions,
            Arc::clone(&tools),
            Arc::clone(&resources),
            Arc::clone(&prompts),
            Arc::clone(&completions),
            Arc::clone(&connections),
        );

        Arc::new(McpServer {
            server_info,
            dispatcher,
            tools,
            resources,
            prompts,
            completions,
            connections,
            correlation,
            requester,
        })
    }
}

impl Default for McpServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// The MCP server runtime core
///
/// One instance serves any number of concurrent sessions across any number
/// of transports. All state behind it is either immutable after build or
/// concurrent (registries behind locks, sessions and pending requests in
/// concurrent maps).
#[derive(Debug)]
pub struct McpServer {
    server_info: ServerInfo,
    dispatcher: Dispatcher,
    tools: Arc<ToolService>,
    resources: Arc<ResourceService>,
    prompts: Arc<PromptService>,
    completions: Arc<CompletionService>,
    connections: Arc<ConnectionManager>,
    correlation: Arc<CorrelationManager>,
    requester: Arc<ServerRequester>,
}

impl McpServer {
    /// Server identity advertised at `initialize`
    pub fn server_info(&self) -> &ServerInfo {
        &self.server_info
    }

    /// Tool registry, for registration at startup
    pub fn tools(&self) -> &Arc<ToolService> {
        &self.tools
    }

    /// Resource registry, for registration at startup
    pub fn resources(&self) -> &Arc<ResourceService> {
        &self.resources
    }

    /// Prompt registry, for registration at startup
    pub fn prompts(&self) -> &Arc<PromptService> {
        &self.prompts
    }

    /// Completion handler table, for registration at startup
    pub fn completions(&self) -> &Arc<CompletionService> {
        &self.completions
    }

    /// The session registry
    pub fn connections(&self) -> &Arc<ConnectionManager> {
        &self.connections
    }

    /// The pending-request table
    pub fn correlation(&self) -> &Arc<CorrelationManager> {
        &self.correlation
    }

    /// The server-initiated request bridge
    pub fn requester(&self) -> &Arc<ServerRequester> {
        &self.requester
    }

    /// Dispatch one request on behalf of a session
    ///
    /// Builds the per-request context (explicitly, never ambiently) and runs
    /// the method table. Used by transports and by in-process tests.
    pub async fn dispatch_request(
        &self,
        session_id: &SessionId,
        request: JsonRpcRequest,
    ) -> JsonRpcResponse {
        self.connections.touch(session_id);
        let context = RequestContext::new(
            session_id.clone(),
            Some(request.id.clone()),
            request.method.clone(),
            Arc::clone(&self.requester),
        );
        self.dispatcher.dispatch(request, context).await
    }

    /// Whether a method exists in the dispatch table
    pub fn has_method(&self, method: &str) -> bool {
        self.dispatcher.has_method(method)
    }

    /// Route an inbound response frame to the pending-request table
    ///
    /// Unknown and duplicate ids are logged and dropped, never raised.
    pub fn route_response(&self, response: JsonRpcResponse) {
        self.route_response_inner(None, response);
    }

    /// Route a response frame, verifying the responding session owns it
    ///
    /// Used by transports: a session must never resolve another session's
    /// pending request, even with a guessed id.
    pub fn route_response_from(&self, session_id: &SessionId, response: JsonRpcResponse) {
        self.route_response_inner(Some(session_id), response);
    }

    fn route_response_inner(&self, session_id: Option<&SessionId>, response: JsonRpcResponse) {
        let Some(id) = response.id else {
            warn!("dropping response frame without id");
            return;
        };

        let outcome = match response.error {
            Some(error) => {
                let relayed = McpError::from_error_value(&error);
                Err(CorrelationError::ErrorResponse {
                    code: relayed.error_code(),
                    message: relayed.to_string(),
                    data: error.get("data").cloned(),
                })
            }
            None => Ok(response.result.unwrap_or(Value::Null)),
        };

        let correlated = match session_id {
            Some(session_id) => self
                .correlation
                .correlate_response_from(session_id, &id, outcome),
            None => self.correlation.correlate_response(&id, outcome),
        };
        if let Err(error) = correlated {
            debug!(%id, %error, "dropping unmatched response");
        }
    }

    /// Graceful shutdown: close sessions, cancel pending requests
    pub async fn shutdown(&self) {
        self.connections.shutdown().await;
        self.correlation.shutdown().await;
    }
}

#[async_trait]
impl MessageHandler for McpServer {
    async fn handle_request(
        &self,
        request: JsonRpcRequest,
        context: MessageContext,
    ) -> JsonRpcResponse {
        self.dispatch_request(&context.session_id, request).await
    }

    async fn handle_notification(
        &self,
        notification: JsonRpcNotification,
        context: MessageContext,
    ) {
        self.connections.touch(&context.session_id);
        match notification.method.as_str() {
            methods::INITIALIZED => {
                debug!(session_id = %context.session_id, "client reported initialized");
            }
            other => {
                debug!(session_id = %context.session_id, method = other, "ignoring notification");
            }
        }
    }

    async fn handle_response(&self, response: JsonRpcResponse, context: MessageContext) {
        self.connections.touch(&context.session_id);
        self.route_response_from(&context.session_id, response);
    }

    async fn handle_error(&self, session_id: &SessionId, message: &str) {
        warn!(%session_id, message, "transport error");
    }

    async fn handle_close(&self, session_id: &SessionId) {
        self.connections
            .unregister(session_id, "transport closed")
            .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::RequestId;
    use serde_json::json;

    #[tokio::test]
    async fn builder_defaults() {
        let server = McpServerBuilder::new().build();
        assert_eq!(server.server_info().name, defaults::SERVER_NAME);
        assert!(server.has_method("initialize"));
        assert!(server.has_method("completion/complete"));
        assert!(!server.has_method("resources/subscribe"));
    }

    #[tokio::test]
    async fn unknown_response_id_is_dropped() {
        let server = McpServerBuilder::new().build();
        // Must not panic or disturb anything
        server.route_response(JsonRpcResponse::success(
            json!({}),
            RequestId::new_string("never-sent"),
        ));
        assert_eq!(server.correlation().pending_count(), 0);
    }

    #[tokio::test]
    async fn dispatch_preserves_numeric_id() {
        let server = McpServerBuilder::new().build();
        let response = server
            .dispatch_request(
                &"session-1".to_string(),
                JsonRpcRequest::new("ping", None, RequestId::new_number(99)),
            )
            .await;
        assert_eq!(response.id, Some(RequestId::new_number(99)));
    }
}
