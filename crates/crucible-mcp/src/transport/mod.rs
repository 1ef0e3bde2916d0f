//! Transport Layer
//!
//! The shared transport contract and the two concrete transports: a
//! long-lived HTTP Server-Sent-Events session (with its POST ingress path)
//! and a newline-delimited stdio pipe. Both deliver inbound frames into the
//! same protocol core and serialize outbound writes per session.

pub mod error;
pub mod http;
pub mod metrics;
pub mod stdio;
pub mod traits;

pub use error::{TransportError, TransportResult};
pub use http::{HttpTransport, HttpTransportConfig};
pub use metrics::{TransportMetrics, TransportMetricsSnapshot};
pub use stdio::StdioTransport;
pub use traits::{MessageContext, MessageHandler, SessionTransport};
