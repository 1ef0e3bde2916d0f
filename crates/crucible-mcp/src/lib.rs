//! Crucible MCP - Model Context Protocol Server Runtime
//!
//! A complete MCP server runtime built on a JSON-RPC 2.0 foundation: a
//! typed protocol dispatcher, a duplex correlation engine for
//! server-initiated requests, a session/connection manager, an HTTP
//! Server-Sent-Events transport with its POST ingress path, a stdio
//! transport, declarative tool registration with schema emission and
//! argument binding, and an OAuth 2.1 security surface (bearer validation
//! plus an embedded demonstration authorization server).
//!
//! # Architecture
//!
//! The crate is organized in layers:
//!
//! - **Protocol Layer** (`protocol`): JSON-RPC 2.0 frames, MCP domain
//!   types, constants, and the error taxonomy
//! - **Correlation Layer** (`correlation`): pending-request table for
//!   server-initiated requests with timeout and cancellation
//! - **Transport Layer** (`transport`): the transport contract, the
//!   HTTP/SSE transport, and the stdio transport
//! - **Session Layer** (`session`): the connection manager keying live
//!   transports by session id
//! - **Server Layer** (`server`): the dispatcher, capability negotiation,
//!   and the explicit per-request context
//! - **Services Layer** (`services`): tool, resource, prompt, and
//!   completion registries
//! - **Schema Layer** (`schema`): declarative tool parameter specs, JSON
//!   Schema emission, and the argument binder
//! - **Security Layer** (`oauth2`, `authserver`): bearer validation and the
//!   demo authorization server
//!
//! # Quick Start
//!
//! ```rust
//! use crucible_mcp::schema::{ParamSpec, ParamType, ToolBuilder};
//! use crucible_mcp::server::McpServerBuilder;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let server = McpServerBuilder::new()
//!     .name("echo-server")
//!     .version("1.0.0")
//!     .build();
//!
//! let (tool, params) = ToolBuilder::new("echo")
//!     .description("Echo a message back")
//!     .param(ParamSpec::required("message", ParamType::String))
//!     .build();
//!
//! server.tools().register_fn(tool, params, |args, _ctx| async move {
//!     Ok(args.get_str("message").unwrap_or_default().to_string())
//! })?;
//! # Ok(())
//! # }
//! ```
//!
//! Serving the result over HTTP/SSE or stdio is one more call:
//! `HttpTransport::new(server, config).serve()` or
//! `StdioTransport::new(server).run()`.

// Demo OAuth 2.1 authorization server
pub mod authserver;

// Environment configuration
pub mod config;

// Correlation layer modules
pub mod correlation;

// Diagnostics sinks
pub mod logging;

// OAuth 2.1 resource-server modules
pub mod oauth2;

// Protocol layer modules
pub mod protocol;

// Tool schema and argument binding
pub mod schema;

// Server core modules
pub mod server;

// Feature service registries
pub mod services;

// Session registry modules
pub mod session;

// Transport layer modules
pub mod transport;

// Re-export commonly used types for convenience
pub use protocol::{
    CallToolResult,
    Content,
    // JSON-RPC 2.0 Message Types
    JsonRpcMessage,
    JsonRpcMessageTrait,
    JsonRpcNotification,
    JsonRpcRequest,
    JsonRpcResponse,
    // Error Types
    McpError,
    McpResult,
    ProtocolError,
    ProtocolResult,
    RequestId,
    ServerInfo,
};

pub use correlation::{CorrelationConfig, CorrelationManager, Timeout};
pub use server::{McpServer, McpServerBuilder, RequestContext};
pub use session::{ConnectionManager, SessionConfig, SessionId};
pub use transport::{HttpTransport, HttpTransportConfig, StdioTransport};

/// Crate version string
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get the crate version as a string
pub fn version() -> &'static str {
    VERSION
}

#[cfg(test)]
mod integration_tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn crate_public_api_is_reachable() {
        let request = JsonRpcRequest::new(
            "tools/list",
            Some(json!({})),
            RequestId::new_string("surface-check"),
        );
        let response = JsonRpcResponse::success(json!({"tools": []}), RequestId::new_number(1));
        let notification = JsonRpcNotification::new("notifications/initialized", None);

        assert!(request.to_json().is_ok());
        assert!(response.to_json().is_ok());
        assert!(notification.to_json().is_ok());
    }

    #[test]
    fn version_info_is_present() {
        assert!(!version().is_empty());
        assert_eq!(version(), VERSION);
    }
}
