//! MCP Domain Types
//!
//! Typed structures for the MCP operations this runtime serves: capability
//! negotiation, tools, resources, prompts, completion, and the
//! server-initiated elicitation/sampling envelopes. Wire casing is camelCase
//! per the MCP specification; Rust fields stay snake_case behind serde
//! renames.

// Layer 2: Third-party crate imports
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Server identity advertised during initialization
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServerInfo {
    /// Server name
    pub name: String,

    /// Human-readable title
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// Server version
    pub version: String,
}

/// Client identity received during initialization
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClientInfo {
    /// Client name
    pub name: String,

    /// Client version
    #[serde(default)]
    pub version: Option<String>,
}

/// Tool execution capabilities
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct ToolCapabilities {
    /// Whether the server emits `notifications/tools/list_changed`
    #[serde(rename = "listChanged", skip_serializing_if = "Option::is_none")]
    pub list_changed: Option<bool>,
}

/// Resource management capabilities
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct ResourceCapabilities {
    /// Whether resource subscriptions are supported
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subscribe: Option<bool>,

    /// Whether the server emits list-change notifications
    #[serde(rename = "listChanged", skip_serializing_if = "Option::is_none")]
    pub list_changed: Option<bool>,
}

/// Prompt template capabilities
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct PromptCapabilities {
    /// Whether the server emits list-change notifications
    #[serde(rename = "listChanged", skip_serializing_if = "Option::is_none")]
    pub list_changed: Option<bool>,
}

/// Completion capabilities (presence alone advertises the feature)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct CompletionCapabilities {}

/// Server capabilities advertised at `initialize`
///
/// A capability section is present only when the corresponding registry has
/// at least one entry; clients treat absence as "not supported".
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct ServerCapabilities {
    /// Tool execution capabilities
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<ToolCapabilities>,

    /// Resource management capabilities
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resources: Option<ResourceCapabilities>,

    /// Prompt template capabilities
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompts: Option<PromptCapabilities>,

    /// Completion capabilities
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completions: Option<CompletionCapabilities>,
}

/// `initialize` request parameters
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InitializeParams {
    /// Protocol revision the client wants to speak
    #[serde(rename = "protocolVersion")]
    pub protocol_version: String,

    /// Client capability declaration (opaque to this server)
    #[serde(default)]
    pub capabilities: Option<Value>,

    /// Client identity
    #[serde(rename = "clientInfo", default)]
    pub client_info: Option<ClientInfo>,
}

/// `initialize` response payload
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InitializeResult {
    /// Negotiated protocol revision
    #[serde(rename = "protocolVersion")]
    pub protocol_version: String,

    /// Advertised server capabilities
    pub capabilities: ServerCapabilities,

    /// Server identity
    #[serde(rename = "serverInfo")]
    pub server_info: ServerInfo,

    /// Optional usage instructions for the connected model
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
}

/// Content block inside tool results, resources, and prompt messages
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum Content {
    /// Plain text content
    #[serde(rename = "text")]
    Text {
        /// The text payload
        text: String,
    },

    /// Base64-encoded image content
    #[serde(rename = "image")]
    Image {
        /// Base64 image payload
        data: String,
        /// MIME type of the image
        #[serde(rename = "mimeType")]
        mime_type: String,
    },

    /// Embedded resource content
    #[serde(rename = "resource")]
    Resource {
        /// The embedded resource payload
        resource: ResourceContent,
    },
}

impl Content {
    /// Create a text content block
    pub fn text(text: impl Into<String>) -> Self {
        Content::Text { text: text.into() }
    }
}

/// Tool descriptor exposed through `tools/list`
///
/// `name` is unique and case-sensitive within a server; `input_schema` is
/// always an object schema whose property names preserve source casing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Tool {
    /// Unique tool name
    pub name: String,

    /// Human-readable description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// JSON Schema describing the tool's arguments
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,

    /// Category annotations carried from registration
    #[serde(skip_serializing_if = "Option::is_none")]
    pub annotations: Option<Value>,
}

/// `tools/call` request parameters
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CallToolParams {
    /// Name of the tool to invoke
    pub name: String,

    /// Arguments object for the tool
    #[serde(default)]
    pub arguments: Option<Value>,
}

/// `tools/call` response payload
///
/// Execution failures are carried here with `is_error = true`, never as
/// JSON-RPC errors, so the calling model can observe the failure mode.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CallToolResult {
    /// Result content blocks
    pub content: Vec<Content>,

    /// Whether the tool execution failed
    #[serde(rename = "isError", default)]
    pub is_error: bool,
}

impl CallToolResult {
    /// Successful result from content blocks
    pub fn success(content: Vec<Content>) -> Self {
        Self {
            content,
            is_error: false,
        }
    }

    /// Failed result carrying the failure description
    pub fn error(content: Vec<Content>) -> Self {
        Self {
            content,
            is_error: true,
        }
    }
}

/// Resource descriptor exposed through `resources/list`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Resource {
    /// Resource URI (unique per server, compared case-insensitively)
    pub uri: String,

    /// Human-readable name
    pub name: String,

    /// Human-readable description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// MIME type of the content
    #[serde(rename = "mimeType", skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,

    /// Annotations carried from registration
    #[serde(skip_serializing_if = "Option::is_none")]
    pub annotations: Option<Value>,
}

/// One piece of resource content returned from `resources/read`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResourceContent {
    /// URI of the resource this content belongs to
    pub uri: String,

    /// MIME type of this content piece
    #[serde(rename = "mimeType", skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,

    /// Text payload (mutually exclusive with blob)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    /// Base64 binary payload (mutually exclusive with text)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blob: Option<String>,
}

impl ResourceContent {
    /// Text content for a resource URI
    pub fn text(uri: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            mime_type: Some("text/plain".to_string()),
            text: Some(text.into()),
            blob: None,
        }
    }
}

/// `resources/read` request parameters
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReadResourceParams {
    /// URI of the resource to read
    pub uri: String,
}

/// Prompt argument descriptor
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PromptArgument {
    /// Argument name
    pub name: String,

    /// Human-readable description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Whether the argument must be supplied
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required: Option<bool>,

    /// Default value substituted when the argument is absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
}

/// Prompt descriptor exposed through `prompts/list`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Prompt {
    /// Unique prompt name (compared case-insensitively)
    pub name: String,

    /// Human-readable title
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// Human-readable description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Arguments the prompt accepts
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub arguments: Vec<PromptArgument>,
}

/// One message produced by a prompt factory
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PromptMessage {
    /// Message role (`user` or `assistant`)
    pub role: String,

    /// Message content
    pub content: Content,
}

/// `prompts/get` request parameters
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GetPromptParams {
    /// Name of the prompt to render
    pub name: String,

    /// Argument values keyed by argument name
    #[serde(default)]
    pub arguments: Option<Value>,
}

/// `prompts/get` response payload
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GetPromptResult {
    /// Prompt description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Rendered messages
    pub messages: Vec<PromptMessage>,
}

/// Reference inside a `completion/complete` request
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CompletionReference {
    /// Reference kind: `ref/prompt` or `ref/resource`
    #[serde(rename = "type")]
    pub reference_type: String,

    /// Prompt name, when the reference targets a prompt
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Resource URI, when the reference targets a resource
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
}

/// Argument being completed
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CompletionArgument {
    /// Argument name
    pub name: String,

    /// Partial value typed so far
    #[serde(default)]
    pub value: String,
}

/// `completion/complete` request parameters
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CompleteParams {
    /// What is being completed
    #[serde(rename = "ref")]
    pub reference: CompletionReference,

    /// The argument under the cursor
    pub argument: CompletionArgument,
}

/// Completion values returned by a handler
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Completion {
    /// Suggested values, at most 100
    pub values: Vec<String>,

    /// Total number of matches available
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,

    /// Whether more values exist beyond this page
    #[serde(rename = "hasMore", skip_serializing_if = "Option::is_none")]
    pub has_more: Option<bool>,
}

/// `completion/complete` response payload
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CompleteResult {
    /// The completion values envelope
    pub completion: Completion,
}

/// Client decision on an elicitation request
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ElicitationAction {
    /// The user supplied the requested input
    Accept,
    /// The user declined to supply input
    Decline,
    /// The user dismissed the request
    Cancel,
}

/// `elicitation/create` request parameters (server to client)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ElicitParams {
    /// Message shown to the user
    pub message: String,

    /// JSON Schema the response content must satisfy
    #[serde(rename = "requestedSchema")]
    pub requested_schema: Value,
}

/// `elicitation/create` response payload (client to server)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ElicitResult {
    /// The user's decision
    pub action: ElicitationAction,

    /// Structured content matching the requested schema (accept only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn initialize_params_wire_casing() {
        let params: InitializeParams = serde_json::from_value(json!({
            "protocolVersion": "2025-06-18",
            "capabilities": {},
            "clientInfo": {"name": "test-client", "version": "1.0"}
        }))
        .unwrap();
        assert_eq!(params.protocol_version, "2025-06-18");
        assert_eq!(params.client_info.unwrap().name, "test-client");
    }

    #[test]
    fn initialize_result_serializes_camel_case() {
        let result = InitializeResult {
            protocol_version: "2025-06-18".to_string(),
            capabilities: ServerCapabilities::default(),
            server_info: ServerInfo {
                name: "srv".to_string(),
                title: None,
                version: "0.1.0".to_string(),
            },
            instructions: None,
        };
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["protocolVersion"], "2025-06-18");
        assert_eq!(value["serverInfo"]["name"], "srv");
        assert!(value.get("instructions").is_none());
    }

    #[test]
    fn empty_capabilities_serialize_empty() {
        let value = serde_json::to_value(ServerCapabilities::default()).unwrap();
        assert_eq!(value, json!({}));
    }

    #[test]
    fn content_text_tagging() {
        let content = Content::text("Hello");
        let value = serde_json::to_value(&content).unwrap();
        assert_eq!(value, json!({"type": "text", "text": "Hello"}));
    }

    #[test]
    fn call_tool_result_error_flag() {
        let result = CallToolResult::error(vec![Content::text("boom")]);
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["isError"], true);
    }

    #[test]
    fn elicit_result_actions() {
        let accepted: ElicitResult = serde_json::from_value(json!({
            "action": "accept",
            "content": {"name": "Rogue Trader"}
        }))
        .unwrap();
        assert_eq!(accepted.action, ElicitationAction::Accept);

        let declined: ElicitResult =
            serde_json::from_value(json!({"action": "decline"})).unwrap();
        assert_eq!(declined.action, ElicitationAction::Decline);
        assert!(declined.content.is_none());
    }

    #[test]
    fn completion_reference_ref_field() {
        let params: CompleteParams = serde_json::from_value(json!({
            "ref": {"type": "ref/prompt", "name": "greet"},
            "argument": {"name": "who", "value": "Ro"}
        }))
        .unwrap();
        assert_eq!(params.reference.reference_type, "ref/prompt");
        assert_eq!(params.argument.value, "Ro");
    }
}
