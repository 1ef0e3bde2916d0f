//! HTTP transport configuration

// Layer 1: Standard library imports
use std::net::SocketAddr;

// Layer 2: Third-party crate imports
use tracing::warn;

/// Configuration for the HTTP/SSE transport
#[derive(Debug, Clone)]
pub struct HttpTransportConfig {
    /// Bind address for [`super::HttpTransport::serve`]
    pub bind_addr: SocketAddr,

    /// Path serving the SSE handshake and the POST ingress
    pub mcp_path: String,

    /// Origins allowed to connect; empty permits all (logged as a warning)
    pub allowed_origins: Vec<String>,

    /// Whether POSTs after `initialize` must carry the negotiated
    /// `MCP-Protocol-Version` header
    pub enforce_protocol_version: bool,
}

impl Default for HttpTransportConfig {
    fn default() -> Self {
        Self {
            bind_addr: ([127, 0, 0, 1], 5000).into(),
            mcp_path: "/mcp".to_string(),
            allowed_origins: Vec::new(),
            enforce_protocol_version: true,
        }
    }
}

impl HttpTransportConfig {
    /// Create a configuration with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the bind address
    pub fn with_bind_addr(mut self, bind_addr: SocketAddr) -> Self {
        self.bind_addr = bind_addr;
        self
    }

    /// Set the MCP endpoint path
    pub fn with_mcp_path(mut self, path: impl Into<String>) -> Self {
        self.mcp_path = path.into();
        self
    }

    /// Set the origin allow-list
    pub fn with_allowed_origins<I, S>(mut self, origins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_origins = origins.into_iter().map(Into::into).collect();
        self
    }

    /// Disable protocol-version header enforcement (testing only)
    pub fn without_protocol_version_enforcement(mut self) -> Self {
        self.enforce_protocol_version = false;
        self
    }

    /// Whether the given origin value may connect
    ///
    /// An empty allow-list permits every origin; this is the configured
    /// behavior, not the recommended one, and is logged at construction by
    /// [`Self::warn_if_permissive`].
    pub fn origin_allowed(&self, origin: Option<&str>) -> bool {
        if self.allowed_origins.is_empty() {
            return true;
        }
        match origin {
            Some(origin) => self
                .allowed_origins
                .iter()
                .any(|allowed| allowed.eq_ignore_ascii_case(origin)),
            None => false,
        }
    }

    /// Log a warning when the origin allow-list is empty
    pub fn warn_if_permissive(&self) {
        if self.allowed_origins.is_empty() {
            warn!("origin allow-list is empty; all origins will be accepted");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_allow_list_permits_all() {
        let config = HttpTransportConfig::default();
        assert!(config.origin_allowed(Some("https://evil.example")));
        assert!(config.origin_allowed(None));
    }

    #[test]
    fn configured_list_rejects_unknown_origins() {
        let config = HttpTransportConfig::default()
            .with_allowed_origins(["https://app.example", "http://localhost:3000"]);
        assert!(config.origin_allowed(Some("https://app.example")));
        assert!(config.origin_allowed(Some("HTTPS://APP.EXAMPLE")));
        assert!(!config.origin_allowed(Some("https://evil.example")));
        assert!(!config.origin_allowed(None));
    }
}
