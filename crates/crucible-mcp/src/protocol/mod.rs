//! Protocol Layer
//!
//! JSON-RPC 2.0 message types with explicit frame classification, MCP domain
//! types, protocol constants, and the error taxonomy shared by every
//! transport and service.

pub mod constants;
pub mod errors;
pub mod message;
pub mod types;

// Re-export the protocol surface for convenient internal use
pub use constants::{client_methods, defaults, error_codes, headers, methods};
pub use errors::{McpError, McpResult, ProtocolError, ProtocolResult};
pub use message::{
    JsonRpcMessage, JsonRpcMessageTrait, JsonRpcNotification, JsonRpcRequest, JsonRpcResponse,
    RequestId,
};
pub use types::{
    CallToolParams, CallToolResult, ClientInfo, CompleteParams, CompleteResult, Completion,
    CompletionArgument, CompletionCapabilities, CompletionReference, Content, ElicitParams,
    ElicitResult, ElicitationAction, GetPromptParams, GetPromptResult, InitializeParams,
    InitializeResult, Prompt, PromptArgument, PromptCapabilities, PromptMessage,
    ReadResourceParams, Resource, ResourceCapabilities, ResourceContent, ServerCapabilities,
    ServerInfo, Tool, ToolCapabilities,
};
