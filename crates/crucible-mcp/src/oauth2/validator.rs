//! Bearer token validation
//!
//! HS256 validation against one or more configured symmetric keys, with
//! audience, optional issuer, clock-skew, and RFC 8707 resource-indicator
//! checks. Key material may arrive base64, base64url, or raw; the same
//! decoding rules are shared with the demo authorization server so both
//! sides derive identical bytes from one configured secret.

// Layer 1: Standard library imports
use std::collections::HashMap;

// Layer 2: Third-party crate imports
use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use base64::Engine as _;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

// Layer 3: Internal module imports
use super::config::OAuth2Config;
use super::error::{OAuth2Error, OAuth2Result};

/// Decode configured secret material into raw key bytes
///
/// Tries standard base64, then base64url (unpadded), then falls back to the
/// raw UTF-8 bytes.
pub fn decode_secret(secret: &str) -> Vec<u8> {
    if let Ok(bytes) = STANDARD.decode(secret) {
        return bytes;
    }
    if let Ok(bytes) = URL_SAFE_NO_PAD.decode(secret) {
        return bytes;
    }
    secret.as_bytes().to_vec()
}

/// JWT claims carried by access tokens
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtClaims {
    /// Token subject
    pub sub: String,

    /// Token audience
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aud: Option<String>,

    /// Token issuer
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,

    /// Client the token was issued to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,

    /// Not-before (Unix timestamp)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nbf: Option<i64>,

    /// Expiry (Unix timestamp)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,

    /// RFC 8707 resource indicator, when minted explicitly
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource: Option<String>,

    /// Any further claims, preserved for session metadata
    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

/// Validates bearer tokens for the protected MCP endpoints
pub struct BearerValidator {
    config: OAuth2Config,
    keys: Vec<DecodingKey>,
    validation: Validation,
}

impl std::fmt::Debug for BearerValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BearerValidator")
            .field("config", &self.config)
            .field("keys", &format_args!("<{} keys>", self.keys.len()))
            .field("validation", &self.validation)
            .finish()
    }
}

impl BearerValidator {
    /// Build a validator from configuration
    ///
    /// # Errors
    ///
    /// Returns [`OAuth2Error::Configuration`] when no keys are configured.
    pub fn new(config: OAuth2Config) -> OAuth2Result<Self> {
        if config.keys.is_empty() {
            return Err(OAuth2Error::configuration("no validation keys configured"));
        }

        let keys = config
            .keys
            .iter()
            .map(|key| DecodingKey::from_secret(&decode_secret(&key.secret)))
            .collect();

        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = config.leeway.num_seconds().max(0) as u64;
        validation.validate_exp = true;
        validation.validate_nbf = true;
        validation.set_audience(&[config.resource.clone()]);
        if let Some(issuer) = &config.issuer {
            validation.set_issuer(&[issuer.clone()]);
        }

        Ok(Self {
            config,
            keys,
            validation,
        })
    }

    /// The configured resource URI (audience)
    pub fn resource(&self) -> &str {
        &self.config.resource
    }

    /// The configuration this validator was built from
    pub fn config(&self) -> &OAuth2Config {
        &self.config
    }

    /// Validate a bearer token and return its claims
    ///
    /// # Errors
    ///
    /// Maps `jsonwebtoken` failures onto the [`OAuth2Error`] taxonomy; the
    /// resource-indicator check runs after signature validation when
    /// enforcement is on.
    pub fn validate(&self, token: &str) -> OAuth2Result<JwtClaims> {
        let mut last_error = OAuth2Error::invalid_token("no keys attempted");

        for key in &self.keys {
            match decode::<JwtClaims>(token, key, &self.validation) {
                Ok(data) => {
                    let claims = data.claims;
                    if self.config.enforce_resource_indicator {
                        if let Some(resource) = &claims.resource {
                            if resource != &self.config.resource {
                                return Err(OAuth2Error::InvalidResource {
                                    reason: format!(
                                        "token resource '{resource}' does not match '{}'",
                                        self.config.resource
                                    ),
                                });
                            }
                        }
                    }
                    debug!(sub = %claims.sub, "bearer token validated");
                    return Ok(claims);
                }
                Err(error) => {
                    last_error = map_jwt_error(&error);
                    // Signature mismatch may just mean a rotated key; try
                    // the next one. Other failures are terminal.
                    if !matches!(
                        error.kind(),
                        jsonwebtoken::errors::ErrorKind::InvalidSignature
                    ) {
                        return Err(last_error);
                    }
                }
            }
        }

        Err(last_error)
    }
}

fn map_jwt_error(error: &jsonwebtoken::errors::Error) -> OAuth2Error {
    use jsonwebtoken::errors::ErrorKind;
    match error.kind() {
        ErrorKind::ExpiredSignature => OAuth2Error::Expired {
            reason: "token expired".to_string(),
        },
        ErrorKind::ImmatureSignature => OAuth2Error::Expired {
            reason: "token not yet valid".to_string(),
        },
        ErrorKind::InvalidAudience => OAuth2Error::InvalidAudience {
            reason: "audience does not cover this resource".to_string(),
        },
        ErrorKind::InvalidIssuer => OAuth2Error::InvalidIssuer {
            reason: "issuer mismatch".to_string(),
        },
        other => OAuth2Error::invalid_token(format!("{other:?}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oauth2::config::ValidationKey;
    use chrono::{TimeDelta, Utc};
    use jsonwebtoken::{encode, EncodingKey, Header};

    const SECRET: &str = "dGVzdC1zZWNyZXQtd2l0aC1lbm91Z2gtYnl0ZXM";
    const RESOURCE: &str = "https://mcp.example/mcp";

    fn mint(claims: &JwtClaims, secret: &str) -> String {
        encode(
            &Header::new(Algorithm::HS256),
            claims,
            &EncodingKey::from_secret(&decode_secret(secret)),
        )
        .unwrap()
    }

    fn claims(aud: &str, offset_seconds: i64) -> JwtClaims {
        let now = Utc::now().timestamp();
        JwtClaims {
            sub: "client-1".to_string(),
            aud: Some(aud.to_string()),
            iss: Some("https://as.example".to_string()),
            client_id: Some("client-1".to_string()),
            nbf: Some(now - 10),
            exp: Some(now + offset_seconds),
            resource: None,
            extra: HashMap::new(),
        }
    }

    fn validator() -> BearerValidator {
        BearerValidator::new(OAuth2Config::new(
            RESOURCE,
            ValidationKey::new("k1", SECRET),
        ))
        .unwrap()
    }

    #[test]
    fn valid_token_passes() {
        let token = mint(&claims(RESOURCE, 600), SECRET);
        let claims = validator().validate(&token).unwrap();
        assert_eq!(claims.sub, "client-1");
    }

    #[test]
    fn wrong_audience_fails() {
        let token = mint(&claims("https://other.example", 600), SECRET);
        assert!(matches!(
            validator().validate(&token),
            Err(OAuth2Error::InvalidAudience { .. })
        ));
    }

    #[test]
    fn expired_token_fails() {
        let token = mint(&claims(RESOURCE, -600), SECRET);
        assert!(matches!(
            validator().validate(&token),
            Err(OAuth2Error::Expired { .. })
        ));
    }

    #[test]
    fn wrong_key_fails() {
        let token = mint(&claims(RESOURCE, 600), "b3RoZXItc2VjcmV0LXZhbHVlLWhlcmU");
        assert!(validator().validate(&token).is_err());
    }

    #[test]
    fn second_key_accepted_after_rotation() {
        let rotated = "b3RoZXItc2VjcmV0LXZhbHVlLWhlcmU";
        let validator = BearerValidator::new(
            OAuth2Config::new(RESOURCE, ValidationKey::new("k1", SECRET))
                .with_key(ValidationKey::new("k2", rotated)),
        )
        .unwrap();

        let token = mint(&claims(RESOURCE, 600), rotated);
        assert!(validator.validate(&token).is_ok());
    }

    #[test]
    fn resource_indicator_mismatch_fails_when_enforced() {
        let validator = BearerValidator::new(
            OAuth2Config::new(RESOURCE, ValidationKey::new("k1", SECRET))
                .with_resource_indicator_enforcement(),
        )
        .unwrap();

        let mut bad = claims(RESOURCE, 600);
        bad.resource = Some("https://elsewhere.example".to_string());
        let token = mint(&bad, SECRET);
        assert!(matches!(
            validator.validate(&token),
            Err(OAuth2Error::InvalidResource { .. })
        ));
    }

    #[test]
    fn issuer_mismatch_fails_when_configured() {
        let validator = BearerValidator::new(
            OAuth2Config::new(RESOURCE, ValidationKey::new("k1", SECRET))
                .with_issuer("https://expected.example"),
        )
        .unwrap();

        let token = mint(&claims(RESOURCE, 600), SECRET);
        assert!(matches!(
            validator.validate(&token),
            Err(OAuth2Error::InvalidIssuer { .. })
        ));
    }

    #[test]
    fn leeway_tolerates_small_skew() {
        let validator = BearerValidator::new(
            OAuth2Config::new(RESOURCE, ValidationKey::new("k1", SECRET))
                .with_leeway(TimeDelta::seconds(120)),
        )
        .unwrap();

        // Expired 60s ago, inside the 120s leeway
        let token = mint(&claims(RESOURCE, -60), SECRET);
        assert!(validator.validate(&token).is_ok());
    }
}
