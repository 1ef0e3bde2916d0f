//! MCP Protocol Constants
//!
//! This module defines constants for MCP protocol method names, JSON-RPC
//! error codes, HTTP headers, and other standardized values to ensure
//! consistency and reduce typos.

/// MCP protocol method names (client to server)
pub mod methods {
    /// Initialization method
    pub const INITIALIZE: &str = "initialize";
    /// Initialized notification
    pub const INITIALIZED: &str = "notifications/initialized";

    /// Resource-related methods
    pub const RESOURCES_LIST: &str = "resources/list";
    pub const RESOURCES_READ: &str = "resources/read";

    /// Tool-related methods
    pub const TOOLS_LIST: &str = "tools/list";
    pub const TOOLS_CALL: &str = "tools/call";

    /// Prompt-related methods
    pub const PROMPTS_LIST: &str = "prompts/list";
    pub const PROMPTS_GET: &str = "prompts/get";

    /// Completion method
    pub const COMPLETION_COMPLETE: &str = "completion/complete";

    /// Connectivity testing method
    pub const PING: &str = "ping";
}

/// Server-initiated method names (server to client)
pub mod client_methods {
    /// Ask the connected client for structured user input
    pub const ELICITATION_CREATE: &str = "elicitation/create";

    /// Ask the connected client to sample its language model
    pub const SAMPLING_CREATE_MESSAGE: &str = "sampling/createMessage";
}

/// JSON-RPC error codes
pub mod error_codes {
    /// Parse error - Invalid JSON was received by the server
    pub const PARSE_ERROR: i32 = -32700;

    /// Invalid Request - The JSON sent is not a valid Request object
    pub const INVALID_REQUEST: i32 = -32600;

    /// Method not found - The method does not exist / is not available
    pub const METHOD_NOT_FOUND: i32 = -32601;

    /// Invalid params - Invalid method parameter(s)
    pub const INVALID_PARAMS: i32 = -32602;

    /// Internal error - Internal JSON-RPC error
    pub const INTERNAL_ERROR: i32 = -32603;

    /// Server error range reserved for implementation-defined errors
    pub const SERVER_ERROR_START: i32 = -32099;
    pub const SERVER_ERROR_END: i32 = -32000;

    /// A server-initiated client request exceeded its deadline
    pub const REQUEST_TIMEOUT: i32 = -32001;

    /// Unknown resource URI on `resources/read`
    pub const RESOURCE_NOT_FOUND: i32 = -32002;

    /// Unknown prompt name on `prompts/get`
    pub const PROMPT_NOT_FOUND: i32 = -32003;
}

/// Protocol version constants
pub mod protocol {
    /// JSON-RPC version spoken on the wire
    pub const JSONRPC_VERSION: &str = "2.0";

    /// Protocol revisions this server understands, latest first
    pub const SUPPORTED_VERSIONS: &[&str] = &["2025-06-18", "2024-11-05"];

    /// Latest protocol revision, offered when the client requests an
    /// unsupported one
    pub const LATEST_VERSION: &str = SUPPORTED_VERSIONS[0];
}

/// HTTP header names used by the SSE transport
pub mod headers {
    /// Session correlation header, set on the SSE handshake and required on
    /// every POST
    pub const MCP_SESSION_ID: &str = "Mcp-Session-Id";

    /// Negotiated protocol revision, required on every POST after initialize
    pub const MCP_PROTOCOL_VERSION: &str = "MCP-Protocol-Version";
}

/// Default values for the runtime
pub mod defaults {
    /// Default server name
    pub const SERVER_NAME: &str = "crucible-mcp-server";

    /// Default timeout for server-initiated client requests, in seconds
    pub const CLIENT_REQUEST_TIMEOUT_SECONDS: i64 = 60;

    /// Default session idle timeout, in seconds (30 minutes)
    pub const SESSION_IDLE_TIMEOUT_SECONDS: i64 = 30 * 60;

    /// Bounded wait applied per session during a broadcast close, in seconds
    pub const CLOSE_ALL_WAIT_SECONDS: u64 = 10;

    /// Maximum number of values a completion response carries
    pub const MAX_COMPLETION_VALUES: usize = 100;

    /// Tool argument payloads are truncated to this many characters in logs
    pub const ARGUMENT_LOG_LIMIT: usize = 500;
}
