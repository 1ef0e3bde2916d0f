//! Server configuration from the environment
//!
//! Recognized variables: `PORT`, `HOSTNAME`, `SERVER_NAME`, `LOG_LEVEL`.
//! Everything has a sensible default; malformed values fall back rather
//! than aborting startup.

// Layer 1: Standard library imports
use std::net::{IpAddr, SocketAddr};

// Layer 2: Third-party crate imports
use tracing::warn;

// Layer 3: Internal module imports
use crate::protocol::defaults;

/// Process-level server configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// TCP port for the HTTP transport
    pub port: u16,

    /// Bind host for the HTTP transport
    pub hostname: String,

    /// Server name advertised at `initialize`
    pub server_name: String,

    /// Log filter directive (`error`..`trace` or an `EnvFilter` expression)
    pub log_level: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 5000,
            hostname: "127.0.0.1".to_string(),
            server_name: defaults::SERVER_NAME.to_string(),
            log_level: "info".to_string(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from the environment
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(port) = std::env::var("PORT") {
            match port.parse::<u16>() {
                Ok(port) => config.port = port,
                Err(_) => warn!(%port, "ignoring non-numeric PORT"),
            }
        }
        if let Ok(hostname) = std::env::var("HOSTNAME") {
            if !hostname.is_empty() {
                config.hostname = hostname;
            }
        }
        if let Ok(server_name) = std::env::var("SERVER_NAME") {
            if !server_name.is_empty() {
                config.server_name = server_name;
            }
        }
        if let Ok(log_level) = std::env::var("LOG_LEVEL") {
            if !log_level.is_empty() {
                config.log_level = log_level;
            }
        }

        config
    }

    /// Bind address for the HTTP transport
    ///
    /// A hostname that is not a literal IP falls back to loopback; DNS
    /// resolution belongs to the host environment, not this library.
    pub fn bind_addr(&self) -> SocketAddr {
        let ip: IpAddr = self
            .hostname
            .parse()
            .unwrap_or_else(|_| IpAddr::from([127, 0, 0, 1]));
        SocketAddr::new(ip, self.port)
    }
}
