//! OAuth2 resource-server error types

// Layer 2: Third-party crate imports
use thiserror::Error;

/// Bearer validation failures
///
/// Every variant maps to a 401 with an RFC 6750-style error string; the
/// human-readable half lands in the response body's `message`.
#[derive(Debug, Clone, Error)]
pub enum OAuth2Error {
    /// No bearer token on the request
    #[error("Missing bearer token")]
    MissingToken,

    /// Token failed signature or structural validation
    #[error("Invalid token: {reason}")]
    InvalidToken { reason: String },

    /// Token audience does not cover the configured resource
    #[error("Invalid audience: {reason}")]
    InvalidAudience { reason: String },

    /// Token issuer does not match
    #[error("Invalid issuer: {reason}")]
    InvalidIssuer { reason: String },

    /// Token expired (or not yet valid) beyond the configured skew
    #[error("Token expired: {reason}")]
    Expired { reason: String },

    /// RFC 8707 resource indicator does not match the configured resource
    #[error("Invalid resource indicator: {reason}")]
    InvalidResource { reason: String },

    /// Configuration problem (bad key material)
    #[error("OAuth2 configuration error: {reason}")]
    Configuration { reason: String },
}

impl OAuth2Error {
    /// RFC 6750 error code for the 401 body
    pub fn error_code(&self) -> &'static str {
        match self {
            OAuth2Error::MissingToken => "invalid_request",
            OAuth2Error::Configuration { .. } => "server_error",
            _ => "invalid_token",
        }
    }

    /// Create an invalid-token error
    pub fn invalid_token(reason: impl Into<String>) -> Self {
        Self::InvalidToken {
            reason: reason.into(),
        }
    }

    /// Create a configuration error
    pub fn configuration(reason: impl Into<String>) -> Self {
        Self::Configuration {
            reason: reason.into(),
        }
    }
}

/// Convenient result type for OAuth2 operations
pub type OAuth2Result<T> = Result<T, OAuth2Error>;
