//! HTTP transport assembly
//!
//! Wires the MCP endpoints, the health check, the OAuth discovery metadata,
//! and the embedded demo authorization server into one axum router. TLS
//! termination and process bootstrap belong to the host; this module only
//! builds the router and, for convenience, serves it on a TCP listener.

// Layer 1: Standard library imports
use std::sync::Arc;

// Layer 2: Third-party crate imports
use axum::{middleware, routing::get, Router};
use tower_http::trace::TraceLayer;
use tracing::info;

// Layer 3: Internal module imports
use super::config::HttpTransportConfig;
use super::handlers::{handle_health, handle_post, handle_sse, HttpState};
use crate::authserver::{authserver_router, AuthServerState};
use crate::oauth2::{
    metadata_router, require_bearer, AuthorizationServerMetadata, BearerValidator,
};
use crate::server::McpServer;
use crate::transport::error::TransportResult;

/// The HTTP/SSE transport for one server core
pub struct HttpTransport {
    server: Arc<McpServer>,
    config: Arc<HttpTransportConfig>,
    validator: Option<Arc<BearerValidator>>,
    auth_server: Option<Arc<AuthServerState>>,
}

impl HttpTransport {
    /// Create a transport over a server core
    pub fn new(server: Arc<McpServer>, config: HttpTransportConfig) -> Self {
        Self {
            server,
            config: Arc::new(config),
            validator: None,
            auth_server: None,
        }
    }

    /// Guard the MCP endpoints with bearer authentication
    pub fn with_bearer_validator(mut self, validator: Arc<BearerValidator>) -> Self {
        self.validator = Some(validator);
        self
    }

    /// Attach the embedded demo authorization server
    pub fn with_authorization_server(mut self, state: Arc<AuthServerState>) -> Self {
        self.auth_server = Some(state);
        self
    }

    /// Build the complete router
    pub fn router(&self) -> Router {
        self.config.warn_if_permissive();

        let state = HttpState {
            server: Arc::clone(&self.server),
            config: Arc::clone(&self.config),
        };

        let mut mcp_routes = Router::new()
            .route(
                &self.config.mcp_path,
                get(handle_sse).post(handle_post),
            )
            .with_state(state);

        if let Some(validator) = &self.validator {
            mcp_routes = mcp_routes.layer(middleware::from_fn_with_state(
                Arc::clone(validator),
                require_bearer,
            ));
        }

        let mut router = Router::new()
            .merge(mcp_routes)
            .route("/health", get(handle_health));

        if let Some(validator) = &self.validator {
            let embedded = self
                .auth_server
                .as_ref()
                .map(|auth_server| AuthorizationServerMetadata {
                    issuer: auth_server.config.issuer.clone(),
                });
            router = router.merge(metadata_router(
                Arc::new(validator.config().clone()),
                embedded,
            ));
        }

        if let Some(auth_server) = &self.auth_server {
            router = router.merge(authserver_router(Arc::clone(auth_server)));
        }

        router.layer(TraceLayer::new_for_http())
    }

    /// Bind and serve until the process is stopped
    ///
    /// # Errors
    ///
    /// Returns a transport error when binding or serving fails.
    pub async fn serve(&self) -> TransportResult<()> {
        let listener = tokio::net::TcpListener::bind(self.config.bind_addr).await?;
        info!(addr = %self.config.bind_addr, path = %self.config.mcp_path, "http transport listening");
        axum::serve(listener, self.router()).await?;
        Ok(())
    }
}

impl std::fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTransport")
            .field("config", &self.config)
            .field("authenticated", &self.validator.is_some())
            .field("embedded_as", &self.auth_server.is_some())
            .finish_non_exhaustive()
    }
}
