//! OAuth discovery metadata endpoints
//!
//! Served unauthenticated: protected-resource metadata (RFC 9728),
//! authorization-server metadata (RFC 8414) for the embedded demo AS, and
//! the JWK set for the configured symmetric keys.

// Layer 1: Standard library imports
use std::sync::Arc;

// Layer 2: Third-party crate imports
use axum::{extract::State, response::Json, routing::get, Router};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use serde_json::{json, Value};

// Layer 3: Internal module imports
use super::config::OAuth2Config;
use super::validator::decode_secret;

/// Identity of the embedded authorization server, for metadata emission
#[derive(Debug, Clone)]
pub struct AuthorizationServerMetadata {
    /// External base URL of the authorization server (the token issuer)
    pub issuer: String,
}

#[derive(Clone)]
struct MetadataState {
    config: Arc<OAuth2Config>,
    authorization_server: Option<AuthorizationServerMetadata>,
}

/// Router serving the `/.well-known` endpoints
pub fn metadata_router(
    config: Arc<OAuth2Config>,
    authorization_server: Option<AuthorizationServerMetadata>,
) -> Router {
    let state = MetadataState {
        config,
        authorization_server,
    };
    Router::new()
        .route(
            "/.well-known/oauth-protected-resource",
            get(protected_resource),
        )
        .route(
            "/.well-known/oauth-authorization-server",
            get(authorization_server_metadata),
        )
        .route("/.well-known/jwks.json", get(jwks))
        .with_state(state)
}

async fn protected_resource(State(state): State<MetadataState>) -> Json<Value> {
    // Advertise the embedded AS when no external one is configured
    let mut servers = state.config.authorization_servers.clone();
    if servers.is_empty() {
        if let Some(embedded) = &state.authorization_server {
            servers.push(embedded.issuer.clone());
        }
    }
    Json(json!({
        "resource": state.config.resource,
        "authorization_servers": servers,
    }))
}

async fn authorization_server_metadata(State(state): State<MetadataState>) -> Json<Value> {
    match &state.authorization_server {
        Some(embedded) => {
            let issuer = embedded.issuer.trim_end_matches('/');
            Json(json!({
                "issuer": issuer,
                "authorization_endpoint": format!("{issuer}/oauth/authorize"),
                "token_endpoint": format!("{issuer}/oauth/token"),
                "jwks_uri": format!("{issuer}/.well-known/jwks.json"),
                "device_authorization_endpoint": format!("{issuer}/oauth/device"),
            }))
        }
        None => Json(json!({})),
    }
}

async fn jwks(State(state): State<MetadataState>) -> Json<Value> {
    let keys: Vec<Value> = state
        .config
        .keys
        .iter()
        .map(|key| {
            json!({
                "kty": "oct",
                "use": "sig",
                "alg": "HS256",
                "kid": key.kid,
                "k": URL_SAFE_NO_PAD.encode(decode_secret(&key.secret)),
            })
        })
        .collect();
    Json(json!({"keys": keys}))
}
