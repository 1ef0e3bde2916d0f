//! Demo authorization-server state and token minting
//!
//! Everything lives in concurrent maps; registrations do not survive a
//! restart (a stated non-goal). Tokens are HS256 JWTs signed with the same
//! secret the resource server validates against.

// Layer 2: Third-party crate imports
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use chrono::{TimeDelta, Utc};
use dashmap::DashMap;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use rand::RngCore;
use sha2::{Digest, Sha256};

// Layer 3: Internal module imports
use super::error::{AuthServerError, AuthServerResult};
use super::types::{AuthorizationCodeRecord, RefreshTokenRecord, RegisteredClient};
use crate::oauth2::{decode_secret, JwtClaims};

/// Configuration for the demo authorization server
#[derive(Debug, Clone)]
pub struct AuthServerConfig {
    /// Token issuer (the AS's external base URL)
    pub issuer: String,

    /// Canonical resource URI, used as the default resource indicator
    pub resource: String,

    /// HS256 signing secret (base64/base64url/raw)
    pub signing_key: String,

    /// Key id stamped into token headers and the JWK set
    pub signing_kid: String,

    /// Static demo credentials for `client_credentials`
    pub demo_client_id: String,
    pub demo_client_secret: String,

    /// Authorization code lifetime
    pub code_ttl: TimeDelta,

    /// Access token lifetime
    pub access_token_ttl: TimeDelta,

    /// Refresh token lifetime
    pub refresh_token_ttl: TimeDelta,
}

impl AuthServerConfig {
    /// Create a config with the demo defaults (5 min codes, 30 min access
    /// tokens, 12 h refresh tokens)
    pub fn new(
        issuer: impl Into<String>,
        resource: impl Into<String>,
        signing_key: impl Into<String>,
    ) -> Self {
        Self {
            issuer: issuer.into(),
            resource: resource.into(),
            signing_key: signing_key.into(),
            signing_kid: "demo-hs256".to_string(),
            demo_client_id: "demo-service".to_string(),
            demo_client_secret: "demo-secret".to_string(),
            code_ttl: TimeDelta::minutes(5),
            access_token_ttl: TimeDelta::minutes(30),
            refresh_token_ttl: TimeDelta::hours(12),
        }
    }

    /// Override the static demo client credentials
    pub fn with_demo_credentials(
        mut self,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        self.demo_client_id = client_id.into();
        self.demo_client_secret = client_secret.into();
        self
    }
}

/// In-memory state of the demo authorization server
#[derive(Debug)]
pub struct AuthServerState {
    /// Server configuration
    pub config: AuthServerConfig,

    /// Dynamically registered clients
    pub clients: DashMap<String, RegisteredClient>,

    /// Outstanding authorization codes, removed on first redemption
    pub authorization_codes: DashMap<String, AuthorizationCodeRecord>,

    /// Outstanding refresh tokens, removed on first redemption
    pub refresh_tokens: DashMap<String, RefreshTokenRecord>,
}

impl AuthServerState {
    /// Create empty state for a configuration
    pub fn new(config: AuthServerConfig) -> Self {
        Self {
            config,
            clients: DashMap::new(),
            authorization_codes: DashMap::new(),
            refresh_tokens: DashMap::new(),
        }
    }

    /// Generate an opaque 32-byte base64url value (codes, refresh tokens)
    pub fn generate_opaque_value() -> String {
        let mut bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut bytes);
        URL_SAFE_NO_PAD.encode(bytes)
    }

    /// Mint an HS256 access token
    ///
    /// # Errors
    ///
    /// Returns `server_error` when signing fails (bad key material).
    pub fn mint_access_token(
        &self,
        subject: &str,
        client_id: &str,
        resource: &str,
    ) -> AuthServerResult<String> {
        let now = Utc::now();
        let claims = JwtClaims {
            sub: subject.to_string(),
            aud: Some(resource.to_string()),
            iss: Some(self.config.issuer.clone()),
            client_id: Some(client_id.to_string()),
            nbf: Some(now.timestamp()),
            exp: Some((now + self.config.access_token_ttl).timestamp()),
            resource: None,
            extra: Default::default(),
        };

        let mut header = Header::new(Algorithm::HS256);
        header.kid = Some(self.config.signing_kid.clone());

        encode(
            &header,
            &claims,
            &EncodingKey::from_secret(&decode_secret(&self.config.signing_key)),
        )
        .map_err(|error| AuthServerError::ServerError(format!("token signing failed: {error}")))
    }

    /// Issue and store a refresh token bound to the grant
    pub fn issue_refresh_token(
        &self,
        client_id: &str,
        subject: &str,
        resource: &str,
        scope: Option<String>,
    ) -> String {
        let token = Self::generate_opaque_value();
        self.refresh_tokens.insert(
            token.clone(),
            RefreshTokenRecord {
                client_id: client_id.to_string(),
                subject: subject.to_string(),
                resource: resource.to_string(),
                scope,
                expires_at: Utc::now() + self.config.refresh_token_ttl,
            },
        );
        token
    }
}

/// PKCE S256: base64url(sha256(code_verifier)), unpadded
pub fn pkce_challenge(code_verifier: &str) -> String {
    URL_SAFE_NO_PAD.encode(Sha256::digest(code_verifier.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pkce_challenge_matches_rfc7636_appendix_b() {
        // Test vector from RFC 7636 Appendix B
        let verifier = "dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk";
        assert_eq!(
            pkce_challenge(verifier),
            "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM"
        );
    }

    #[test]
    fn opaque_values_are_unique_and_url_safe() {
        let a = AuthServerState::generate_opaque_value();
        let b = AuthServerState::generate_opaque_value();
        assert_ne!(a, b);
        assert_eq!(URL_SAFE_NO_PAD.decode(&a).unwrap().len(), 32);
    }

    #[test]
    fn minted_token_validates_against_shared_secret() {
        use crate::oauth2::{BearerValidator, OAuth2Config, ValidationKey};

        let secret = "c2hhcmVkLWRlbW8tc2VjcmV0LWJ5dGVz";
        let state = AuthServerState::new(AuthServerConfig::new(
            "https://as.example",
            "https://mcp.example/mcp",
            secret,
        ));

        let token = state
            .mint_access_token("client-1", "client-1", "https://mcp.example/mcp")
            .unwrap();

        let validator = BearerValidator::new(
            OAuth2Config::new("https://mcp.example/mcp", ValidationKey::new("k", secret))
                .with_issuer("https://as.example"),
        )
        .unwrap();

        let claims = validator.validate(&token).unwrap();
        assert_eq!(claims.sub, "client-1");
        assert_eq!(claims.aud.as_deref(), Some("https://mcp.example/mcp"));
        assert_eq!(claims.client_id.as_deref(), Some("client-1"));
    }
}
