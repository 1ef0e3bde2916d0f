//! HTTP/SSE Transport
//!
//! One long-lived `GET` per session carries the server-to-client SSE stream;
//! client frames arrive through paired `POST`s on the same endpoint,
//! correlated by the `Mcp-Session-Id` header. Origin and protocol-version
//! policies live on the ingress path.

pub mod config;
pub mod handlers;
pub mod server;
pub mod session;

pub use config::HttpTransportConfig;
pub use handlers::HttpState;
pub use server::HttpTransport;
pub use session::{SseFrame, SseSessionTransport};
