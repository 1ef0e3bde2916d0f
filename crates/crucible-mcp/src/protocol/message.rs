//! JSON-RPC 2.0 Message Implementation
//!
//! This module provides the JSON-RPC 2.0 message types spoken by every
//! transport, with shared serialization behavior through the
//! [`JsonRpcMessageTrait`] and an explicit frame classifier.
//!
//! # Classification
//!
//! A single wire object is classified by field presence, never by serde's
//! untagged fallthrough (a bare notification would otherwise satisfy the
//! all-optional response shape):
//!
//! - `method` present, `id` absent: notification
//! - `method` and `id` present: request
//! - `method` absent: response (must carry `result` or `error`)
//!
//! # Examples
//!
//! ```rust
//! use crucible_mcp::protocol::{JsonRpcMessage, JsonRpcRequest, RequestId};
//!
//! let frame = r#"{"jsonrpc":"2.0","method":"ping","id":1}"#;
//! let message = JsonRpcMessage::parse(frame).unwrap();
//! assert!(matches!(message, JsonRpcMessage::Request(_)));
//! ```

// Layer 1: Standard library imports
use std::fmt;

// Layer 2: Third-party crate imports
use bytes::{BufMut, Bytes, BytesMut};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

// Layer 3: Internal module imports
use super::constants::protocol::JSONRPC_VERSION;
use super::errors::ProtocolError;

/// JSON-RPC message types supporting requests, responses, and notifications
///
/// This enum unifies all JSON-RPC 2.0 message types into a single type for
/// transport and handling. Serialization is untagged (each variant serializes
/// as its own wire object); deserialization goes through the explicit
/// classifier so that notifications are never mistaken for responses.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum JsonRpcMessage {
    /// JSON-RPC request message
    Request(JsonRpcRequest),
    /// JSON-RPC response message
    Response(JsonRpcResponse),
    /// JSON-RPC notification message
    Notification(JsonRpcNotification),
}

impl<'de> Deserialize<'de> for JsonRpcMessage {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        JsonRpcMessage::classify(value).map_err(serde::de::Error::custom)
    }
}

/// Trait for JSON-RPC message serialization and deserialization
///
/// Provides common functionality for all JSON-RPC message types, eliminating
/// duplication and ensuring consistent serialization behavior. Any type that
/// implements `Serialize + Deserialize` gets the default implementations.
pub trait JsonRpcMessageTrait: Serialize + for<'de> Deserialize<'de> {
    /// Serialize this message to a JSON string
    ///
    /// # Errors
    ///
    /// Returns `serde_json::Error` if serialization fails, which should be
    /// rare given the controlled structure of JSON-RPC messages.
    fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Serialize this message to pretty-printed JSON, for debugging and logs
    ///
    /// # Errors
    ///
    /// Returns `serde_json::Error` if serialization fails.
    fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Deserialize from a JSON string
    ///
    /// # Errors
    ///
    /// Returns `serde_json::Error` if the input is not valid JSON or does not
    /// match this message shape.
    fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Serialize directly into a reusable buffer, avoiding the intermediate
    /// `String` allocation
    ///
    /// # Errors
    ///
    /// Returns `serde_json::Error` if serialization fails.
    fn serialize_to_buffer(&self, buffer: &mut BytesMut) -> Result<(), serde_json::Error> {
        serde_json::to_writer(buffer.writer(), self)
    }

    /// Serialize this message to bytes
    ///
    /// # Errors
    ///
    /// Returns `serde_json::Error` if serialization fails.
    fn to_bytes(&self) -> Result<Bytes, serde_json::Error> {
        let mut buffer = BytesMut::with_capacity(256);
        self.serialize_to_buffer(&mut buffer)?;
        Ok(buffer.freeze())
    }

    /// Deserialize a message from JSON bytes
    ///
    /// # Errors
    ///
    /// Returns `serde_json::Error` if the input is not valid JSON or does not
    /// match this message shape.
    fn from_json_bytes(json: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(json)
    }
}

impl JsonRpcMessage {
    /// Parse one wire frame and classify it per field presence
    ///
    /// # Errors
    ///
    /// - [`ProtocolError::Parse`] when the frame is not valid JSON
    /// - [`ProtocolError::InvalidFrame`] when `jsonrpc` is not `"2.0"`, the
    ///   frame is not an object, or a method-less frame carries neither
    ///   `result` nor `error`
    pub fn parse(json: &str) -> Result<Self, ProtocolError> {
        let value: Value =
            serde_json::from_str(json).map_err(|e| ProtocolError::Parse(e.to_string()))?;
        Self::classify(value)
    }

    /// Classify an already-parsed JSON value into a typed frame
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::InvalidFrame`] for frames that violate the
    /// JSON-RPC 2.0 structural rules.
    pub fn classify(value: Value) -> Result<Self, ProtocolError> {
        let object = value
            .as_object()
            .ok_or_else(|| ProtocolError::invalid_frame("frame is not a JSON object"))?;

        match object.get("jsonrpc").and_then(Value::as_str) {
            Some(JSONRPC_VERSION) => {}
            Some(other) => {
                return Err(ProtocolError::invalid_frame(format!(
                    "unsupported jsonrpc version: {other}"
                )))
            }
            None => return Err(ProtocolError::invalid_frame("missing jsonrpc field")),
        }

        let has_method = object.contains_key("method");
        let has_id = object.contains_key("id") && !object["id"].is_null();

        if has_method {
            if has_id {
                let request: JsonRpcRequest = serde_json::from_value(value)
                    .map_err(|e| ProtocolError::invalid_frame(e.to_string()))?;
                Ok(JsonRpcMessage::Request(request))
            } else {
                let notification: JsonRpcNotification = serde_json::from_value(value)
                    .map_err(|e| ProtocolError::invalid_frame(e.to_string()))?;
                Ok(JsonRpcMessage::Notification(notification))
            }
        } else {
            if !object.contains_key("result") && !object.contains_key("error") {
                return Err(ProtocolError::invalid_frame(
                    "response frame carries neither result nor error",
                ));
            }
            let response: JsonRpcResponse = serde_json::from_value(value)
                .map_err(|e| ProtocolError::invalid_frame(e.to_string()))?;
            Ok(JsonRpcMessage::Response(response))
        }
    }

    /// Best-effort recovery of a request id from a malformed frame
    ///
    /// Used to build `ParseError` responses that still correlate: the id is
    /// recoverable whenever the frame parses as JSON at all.
    pub fn recover_request_id(json: &str) -> Option<RequestId> {
        let value: Value = serde_json::from_str(json).ok()?;
        serde_json::from_value(value.get("id")?.clone()).ok()
    }

    /// Create a new request message
    pub fn from_request(method: &str, params: Option<Value>, id: RequestId) -> Self {
        JsonRpcMessage::Request(JsonRpcRequest::new(method, params, id))
    }

    /// Create a new notification message
    pub fn from_notification(method: &str, params: Option<Value>) -> Self {
        JsonRpcMessage::Notification(JsonRpcNotification::new(method, params))
    }
}

/// Request ID supporting both string and numeric formats per JSON-RPC 2.0
///
/// Ids are preserved verbatim across the round trip: a numeric id never
/// becomes a string and vice versa.
///
/// # Examples
///
/// ```rust
/// use crucible_mcp::protocol::RequestId;
///
/// let string_id = RequestId::new_string("req-123");
/// let numeric_id = RequestId::new_number(42);
///
/// assert_eq!(serde_json::to_string(&string_id).unwrap(), r#""req-123""#);
/// assert_eq!(serde_json::to_string(&numeric_id).unwrap(), "42");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestId {
    /// String-based request identifier
    String(String),
    /// Numeric request identifier
    Number(i64),
}

impl RequestId {
    /// Create a new string-based request ID
    pub fn new_string(id: impl Into<String>) -> Self {
        RequestId::String(id.into())
    }

    /// Create a new numeric request ID
    pub fn new_number(id: i64) -> Self {
        RequestId::Number(id)
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestId::String(s) => write!(f, "{s}"),
            RequestId::Number(n) => write!(f, "{n}"),
        }
    }
}

/// JSON-RPC 2.0 Request Message
///
/// Represents a request to invoke a method on the remote peer. All fields are
/// required except `params`, which may be omitted if the method takes no
/// parameters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JsonRpcRequest {
    /// Protocol version - always "2.0"
    pub jsonrpc: String,

    /// Name of the method to invoke
    pub method: String,

    /// Parameters for the method (object or array)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,

    /// Unique identifier for this request
    pub id: RequestId,
}

impl JsonRpcRequest {
    /// Create a new JSON-RPC 2.0 request
    pub fn new(method: impl Into<String>, params: Option<Value>, id: RequestId) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            method: method.into(),
            params,
            id,
        }
    }
}

impl JsonRpcMessageTrait for JsonRpcRequest {}

/// JSON-RPC 2.0 Response Message
///
/// Contains either a successful result or error information, never both. The
/// `id` echoes the originating request byte-for-byte, and is null only for
/// parse errors where no id could be recovered.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JsonRpcResponse {
    /// Protocol version - always "2.0"
    pub jsonrpc: String,

    /// Result of successful method invocation (mutually exclusive with error)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,

    /// Error information for failed invocation (mutually exclusive with result)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<Value>,

    /// Request identifier from the original request
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<RequestId>,
}

impl JsonRpcResponse {
    /// Create a successful JSON-RPC 2.0 response
    pub fn success(result: Value, id: RequestId) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            result: Some(result),
            error: None,
            id: Some(id),
        }
    }

    /// Create an error JSON-RPC 2.0 response
    ///
    /// The error value should conform to the JSON-RPC error object structure
    /// (`{code, message, data?}`). The id is `None` only for parse errors
    /// where no id could be recovered from the frame.
    pub fn error(error: Value, id: Option<RequestId>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            result: None,
            error: Some(error),
            id,
        }
    }
}

impl JsonRpcMessageTrait for JsonRpcResponse {}

/// JSON-RPC 2.0 Notification Message
///
/// A request that does not expect a response. The absence of `id` is what
/// distinguishes notifications from requests.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JsonRpcNotification {
    /// Protocol version - always "2.0"
    pub jsonrpc: String,

    /// Name of the notification method
    pub method: String,

    /// Parameters for the notification (object or array)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl JsonRpcNotification {
    /// Create a new JSON-RPC 2.0 notification
    pub fn new(method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            method: method.into(),
            params,
        }
    }
}

impl JsonRpcMessageTrait for JsonRpcNotification {}

impl JsonRpcMessageTrait for JsonRpcMessage {}
