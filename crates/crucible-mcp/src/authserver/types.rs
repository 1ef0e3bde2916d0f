//! Wire and storage types for the demo authorization server

// Layer 2: Third-party crate imports
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// RFC 7591 dynamic registration request (supported subset)
#[derive(Debug, Clone, Deserialize)]
pub struct RegistrationRequest {
    /// Redirect URIs the client will use (absolute; https or loopback http)
    #[serde(default)]
    pub redirect_uris: Vec<String>,

    /// Requested grant types; defaults to `authorization_code`
    #[serde(default)]
    pub grant_types: Vec<String>,

    /// Requested response types; only `code` is supported
    #[serde(default)]
    pub response_types: Vec<String>,

    /// Token endpoint auth method; only `none` in the demo
    #[serde(default)]
    pub token_endpoint_auth_method: Option<String>,

    /// Human-readable client name
    #[serde(default)]
    pub client_name: Option<String>,
}

/// RFC 7591 registration response
#[derive(Debug, Clone, Serialize)]
pub struct RegistrationResponse {
    pub client_id: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,

    pub client_id_issued_at: i64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_secret_expires_at: Option<i64>,

    pub redirect_uris: Vec<String>,
    pub grant_types: Vec<String>,
    pub response_types: Vec<String>,
    pub token_endpoint_auth_method: String,
}

/// One dynamically registered client
#[derive(Debug, Clone)]
pub struct RegisteredClient {
    pub client_id: String,
    pub client_secret: Option<String>,
    pub token_endpoint_auth_method: String,
    pub redirect_uris: Vec<String>,
    pub grant_types: Vec<String>,
    pub response_types: Vec<String>,
    pub require_pkce: bool,
    pub issued_at: DateTime<Utc>,
    pub secret_expires_at: Option<DateTime<Utc>>,
}

/// Query parameters of `GET /oauth/authorize`
#[derive(Debug, Clone, Deserialize)]
pub struct AuthorizeParams {
    #[serde(default)]
    pub response_type: Option<String>,
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub redirect_uri: Option<String>,
    #[serde(default)]
    pub code_challenge: Option<String>,
    #[serde(default)]
    pub code_challenge_method: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub resource: Option<String>,
}

/// Stored authorization code, single-use
#[derive(Debug, Clone)]
pub struct AuthorizationCodeRecord {
    pub client_id: String,
    pub subject: String,
    pub redirect_uri: String,
    pub resource: String,
    pub code_challenge: String,
    pub scope: Option<String>,
    pub expires_at: DateTime<Utc>,
}

/// Stored refresh token, single-use
#[derive(Debug, Clone)]
pub struct RefreshTokenRecord {
    pub client_id: String,
    pub subject: String,
    pub resource: String,
    pub scope: Option<String>,
    pub expires_at: DateTime<Utc>,
}

/// Form body of `POST /oauth/token`
#[derive(Debug, Clone, Deserialize)]
pub struct TokenParams {
    #[serde(default)]
    pub grant_type: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub redirect_uri: Option<String>,
    #[serde(default)]
    pub code_verifier: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub client_secret: Option<String>,
    #[serde(default)]
    pub resource: Option<String>,
}

/// Successful token response
#[derive(Debug, Clone, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}
