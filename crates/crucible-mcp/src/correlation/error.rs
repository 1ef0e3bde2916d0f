//! Error types for the pending-request correlation system

// Layer 2: Third-party crate imports
use chrono::TimeDelta;
use serde_json::Value;
use thiserror::Error;

// Layer 3: Internal module imports
use crate::protocol::McpError;

/// Request ID type alias for consistency with the JSON-RPC base types
pub type RequestId = crate::protocol::RequestId;

/// Correlation error types
///
/// Each variant represents one of the ways a server-initiated request can
/// fail to produce a client response, carrying enough context to map it back
/// into an [`McpError`] at the call site.
#[derive(Debug, Clone, Error)]
pub enum CorrelationError {
    /// Request timed out waiting for a response
    #[error("Request {id} timed out after {duration}")]
    Timeout { id: RequestId, duration: TimeDelta },

    /// Request was not found in the correlation table
    #[error("Request {id} not found (may have completed or been cancelled)")]
    RequestNotFound { id: RequestId },

    /// A response arrived on a session that does not own the request
    #[error("Request {id} is not owned by the responding session")]
    SessionMismatch { id: RequestId },

    /// Communication channel was closed unexpectedly
    #[error("Channel error for request {id}: {details}")]
    ChannelClosed { id: RequestId, details: String },

    /// Request was cancelled before a response arrived (session closed,
    /// transport failure, explicit cancellation)
    #[error("Request {id} was cancelled: {reason}")]
    Cancelled { id: RequestId, reason: String },

    /// The client answered with a JSON-RPC error envelope
    #[error("Client returned error {code}: {message}")]
    ErrorResponse {
        code: i32,
        message: String,
        data: Option<Value>,
    },

    /// Internal correlation system error
    #[error("Internal correlation error: {message}")]
    Internal { message: String },
}

/// Single result type for all correlation operations
pub type CorrelationResult<T> = std::result::Result<T, CorrelationError>;

impl From<CorrelationError> for McpError {
    fn from(err: CorrelationError) -> Self {
        match err {
            CorrelationError::Timeout { duration, .. } => {
                McpError::request_timeout(duration.num_milliseconds().max(0) as u64)
            }
            CorrelationError::ErrorResponse {
                code,
                message,
                data,
            } => McpError::server_error(code, message, data),
            other => McpError::internal(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::error_codes;

    #[test]
    fn timeout_maps_to_request_timeout_code() {
        let err = CorrelationError::Timeout {
            id: RequestId::new_string("r1"),
            duration: TimeDelta::seconds(60),
        };
        let mapped: McpError = err.into();
        assert_eq!(mapped.error_code(), error_codes::REQUEST_TIMEOUT);
    }

    #[test]
    fn error_response_preserves_client_code() {
        let err = CorrelationError::ErrorResponse {
            code: -32042,
            message: "client declined".to_string(),
            data: None,
        };
        let mapped: McpError = err.into();
        assert_eq!(mapped.error_code(), -32042);
    }
}
