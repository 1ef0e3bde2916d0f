//! OAuth2 resource-server configuration

// Layer 2: Third-party crate imports
use chrono::TimeDelta;

/// One accepted symmetric validation key
///
/// The secret may be standard base64, base64url, or raw text; the validator
/// tries each decoding in that order.
#[derive(Debug, Clone)]
pub struct ValidationKey {
    /// Key id advertised in the JWK set
    pub kid: String,

    /// Shared secret material
    pub secret: String,
}

impl ValidationKey {
    /// Create a validation key
    pub fn new(kid: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            kid: kid.into(),
            secret: secret.into(),
        }
    }
}

/// Configuration for bearer validation on the MCP endpoints
#[derive(Debug, Clone)]
pub struct OAuth2Config {
    /// Canonical URI of this protected resource (the expected audience)
    pub resource: String,

    /// Expected issuer; `None` skips issuer validation
    pub issuer: Option<String>,

    /// Accepted symmetric keys (multiple, for rotation)
    pub keys: Vec<ValidationKey>,

    /// Clock skew tolerated on `exp`/`nbf`
    pub leeway: TimeDelta,

    /// Whether the RFC 8707 resource indicator claim must match `resource`
    pub enforce_resource_indicator: bool,

    /// Authorization servers advertised in the protected-resource metadata
    pub authorization_servers: Vec<String>,
}

impl OAuth2Config {
    /// Create a configuration for a resource with one key
    pub fn new(resource: impl Into<String>, key: ValidationKey) -> Self {
        Self {
            resource: resource.into(),
            issuer: None,
            keys: vec![key],
            leeway: TimeDelta::seconds(30),
            enforce_resource_indicator: false,
            authorization_servers: Vec::new(),
        }
    }

    /// Require a specific issuer
    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = Some(issuer.into());
        self
    }

    /// Add an accepted key
    pub fn with_key(mut self, key: ValidationKey) -> Self {
        self.keys.push(key);
        self
    }

    /// Set the tolerated clock skew
    pub fn with_leeway(mut self, leeway: TimeDelta) -> Self {
        self.leeway = leeway;
        self
    }

    /// Turn on RFC 8707 resource-indicator enforcement
    pub fn with_resource_indicator_enforcement(mut self) -> Self {
        self.enforce_resource_indicator = true;
        self
    }

    /// Advertise an authorization server in the resource metadata
    pub fn with_authorization_server(mut self, url: impl Into<String>) -> Self {
        self.authorization_servers.push(url.into());
        self
    }
}
