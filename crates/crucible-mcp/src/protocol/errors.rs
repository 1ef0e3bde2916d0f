//! Protocol Error Types
//!
//! Two error layers live here:
//!
//! - [`ProtocolError`]: frame-level failures (parse, structure) raised by the
//!   codec before a method is ever resolved
//! - [`McpError`]: method-level failures raised by the dispatcher and the
//!   feature services, each mapping to a JSON-RPC error code
//!
//! The dispatcher converts both into JSON-RPC error envelopes; transports
//! never see a Rust panic cross the wire.

// Layer 2: Third-party crate imports
use serde_json::{json, Value};
use thiserror::Error;

// Layer 3: Internal module imports
use super::constants::error_codes;

/// Frame-level errors raised while decoding a wire frame
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProtocolError {
    /// Frame is not valid JSON
    #[error("Parse error: {0}")]
    Parse(String),

    /// Frame is valid JSON but not a valid JSON-RPC 2.0 frame
    #[error("Invalid frame: {0}")]
    InvalidFrame(String),
}

impl ProtocolError {
    /// Create an invalid frame error
    pub fn invalid_frame(message: impl Into<String>) -> Self {
        Self::InvalidFrame(message.into())
    }

    /// JSON-RPC error code for this failure
    pub fn error_code(&self) -> i32 {
        match self {
            ProtocolError::Parse(_) => error_codes::PARSE_ERROR,
            ProtocolError::InvalidFrame(_) => error_codes::INVALID_REQUEST,
        }
    }
}

/// Convenient result type for frame decoding
pub type ProtocolResult<T> = Result<T, ProtocolError>;

/// Method-level MCP errors with JSON-RPC code mapping
///
/// Handlers raise these; the dispatcher serializes them into JSON-RPC error
/// objects. Tool *execution* failures deliberately never become one of these
/// (they are coerced into `CallToolResult { is_error: true }` so the calling
/// model can observe the failure mode).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum McpError {
    /// Unknown method, or the backing capability was not advertised
    #[error("Method not found: {method}")]
    MethodNotFound { method: String },

    /// Malformed request at the envelope level
    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    /// Missing required field, unknown tool/prompt, invalid reference type
    #[error("Invalid params: {message}")]
    InvalidParams { message: String },

    /// Unhandled failure inside a service
    #[error("Internal error: {message}")]
    Internal { message: String },

    /// A server-initiated client request exceeded its deadline
    #[error("Request timed out after {timeout_ms}ms")]
    RequestTimeout { timeout_ms: u64 },

    /// Unknown resource URI
    #[error("Resource not found: {uri}")]
    ResourceNotFound { uri: String },

    /// Unknown prompt name
    #[error("Prompt not found: {name}")]
    PromptNotFound { name: String },

    /// Error relayed from the connected client, or a custom server error
    #[error("Server error {code}: {message}")]
    ServerError {
        code: i32,
        message: String,
        data: Option<Value>,
    },
}

/// Convenient result type for dispatcher and service operations
pub type McpResult<T> = Result<T, McpError>;

impl McpError {
    /// Create a method not found error
    pub fn method_not_found(method: impl Into<String>) -> Self {
        Self::MethodNotFound {
            method: method.into(),
        }
    }

    /// Create an invalid request error
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    /// Create an invalid parameters error
    pub fn invalid_params(message: impl Into<String>) -> Self {
        Self::InvalidParams {
            message: message.into(),
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Create a request timeout error
    pub fn request_timeout(timeout_ms: u64) -> Self {
        Self::RequestTimeout { timeout_ms }
    }

    /// Create a resource not found error
    pub fn resource_not_found(uri: impl Into<String>) -> Self {
        Self::ResourceNotFound { uri: uri.into() }
    }

    /// Create a prompt not found error
    pub fn prompt_not_found(name: impl Into<String>) -> Self {
        Self::PromptNotFound { name: name.into() }
    }

    /// Create a server error with a custom code and optional data payload
    pub fn server_error(code: i32, message: impl Into<String>, data: Option<Value>) -> Self {
        Self::ServerError {
            code,
            message: message.into(),
            data,
        }
    }

    /// JSON-RPC error code for this error
    pub fn error_code(&self) -> i32 {
        match self {
            McpError::MethodNotFound { .. } => error_codes::METHOD_NOT_FOUND,
            McpError::InvalidRequest { .. } => error_codes::INVALID_REQUEST,
            McpError::InvalidParams { .. } => error_codes::INVALID_PARAMS,
            McpError::Internal { .. } => error_codes::INTERNAL_ERROR,
            McpError::RequestTimeout { .. } => error_codes::REQUEST_TIMEOUT,
            McpError::ResourceNotFound { .. } => error_codes::RESOURCE_NOT_FOUND,
            McpError::PromptNotFound { .. } => error_codes::PROMPT_NOT_FOUND,
            McpError::ServerError { code, .. } => *code,
        }
    }

    /// Serialize into a JSON-RPC error object (`{code, message, data?}`)
    pub fn to_error_value(&self) -> Value {
        match self {
            McpError::ServerError {
                code,
                message,
                data: Some(data),
            } => json!({"code": code, "message": message, "data": data}),
            other => json!({"code": other.error_code(), "message": other.to_string()}),
        }
    }

    /// Rebuild a typed error from a JSON-RPC error object received from the
    /// connected client
    pub fn from_error_value(error: &Value) -> Self {
        let code = error
            .get("code")
            .and_then(Value::as_i64)
            .unwrap_or(i64::from(error_codes::INTERNAL_ERROR)) as i32;
        let message = error
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("unknown error")
            .to_string();
        Self::ServerError {
            code,
            message,
            data: error.get("data").cloned(),
        }
    }
}

impl From<serde_json::Error> for McpError {
    fn from(err: serde_json::Error) -> Self {
        // Typed parameter deserialization failures surface as InvalidParams
        Self::InvalidParams {
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_mapping_matches_jsonrpc_spec() {
        assert_eq!(McpError::method_not_found("x").error_code(), -32601);
        assert_eq!(McpError::invalid_request("x").error_code(), -32600);
        assert_eq!(McpError::invalid_params("x").error_code(), -32602);
        assert_eq!(McpError::internal("x").error_code(), -32603);
    }

    #[test]
    fn implementation_defined_codes_stay_in_server_range() {
        for error in [
            McpError::request_timeout(1000),
            McpError::resource_not_found("mem://x"),
            McpError::prompt_not_found("greet"),
        ] {
            let code = error.error_code();
            assert!(
                (error_codes::SERVER_ERROR_START..=error_codes::SERVER_ERROR_END).contains(&code),
                "{code} outside server error range"
            );
        }
    }

    #[test]
    fn error_value_round_trip() {
        let original = McpError::server_error(-32010, "boom", Some(json!({"detail": 1})));
        let value = original.to_error_value();
        let rebuilt = McpError::from_error_value(&value);
        assert_eq!(rebuilt.error_code(), -32010);
        assert!(rebuilt.to_string().contains("boom"));
    }

    #[test]
    fn json_error_maps_to_invalid_params() {
        let err = serde_json::from_str::<i32>("not a number").unwrap_err();
        let mapped: McpError = err.into();
        assert_eq!(mapped.error_code(), -32602);
    }
}
