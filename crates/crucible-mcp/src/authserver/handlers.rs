//! Demo authorization-server endpoints
//!
//! `POST /oauth/register` (RFC 7591 subset), `GET /oauth/authorize`
//! (authorization code + PKCE S256), `POST /oauth/token` (authorization_code,
//! refresh_token, client_credentials). Codes and refresh tokens are
//! single-use: redemption removes the record atomically before any check, so
//! a second attempt always fails with `invalid_grant`.

// Layer 1: Standard library imports
use std::sync::Arc;

// Layer 2: Third-party crate imports
use axum::{
    extract::{Form, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use chrono::Utc;
use tracing::{debug, info};
use url::Url;
use uuid::Uuid;

// Layer 3: Internal module imports
use super::error::{AuthServerError, AuthServerResult};
use super::state::{pkce_challenge, AuthServerState};
use super::types::{
    AuthorizationCodeRecord, AuthorizeParams, RegisteredClient, RegistrationRequest,
    RegistrationResponse, TokenParams, TokenResponse,
};

/// Compare two secrets without an early exit on the first differing byte
fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.bytes()
        .zip(b.bytes())
        .fold(0u8, |acc, (x, y)| acc | (x ^ y))
        == 0
}

const SUPPORTED_GRANT_TYPES: &[&str] = &["authorization_code", "refresh_token", "client_credentials"];

/// Router serving the demo authorization server
pub fn authserver_router(state: Arc<AuthServerState>) -> Router {
    Router::new()
        .route("/oauth/register", post(handle_register))
        .route("/oauth/authorize", get(handle_authorize))
        .route("/oauth/token", post(handle_token))
        .with_state(state)
}

/// Validate a redirect URI: absolute, https, or loopback http
fn validate_redirect_uri(raw: &str) -> AuthServerResult<Url> {
    let url = Url::parse(raw).map_err(|_| {
        AuthServerError::InvalidRedirectUri(format!("redirect_uri is not absolute: {raw}"))
    })?;

    match url.scheme() {
        "https" => Ok(url),
        "http" => {
            let loopback = matches!(url.host_str(), Some("127.0.0.1" | "::1" | "localhost"));
            if loopback {
                Ok(url)
            } else {
                Err(AuthServerError::InvalidRedirectUri(format!(
                    "http redirect_uri must be loopback: {raw}"
                )))
            }
        }
        other => Err(AuthServerError::InvalidRedirectUri(format!(
            "unsupported redirect_uri scheme: {other}"
        ))),
    }
}

/// `POST /oauth/register`
async fn handle_register(
    State(state): State<Arc<AuthServerState>>,
    Json(request): Json<RegistrationRequest>,
) -> Response {
    match register_client(&state, request) {
        Ok(response) => (StatusCode::CREATED, Json(response)).into_response(),
        Err(error) => error.into_response(),
    }
}

fn register_client(
    state: &AuthServerState,
    request: RegistrationRequest,
) -> AuthServerResult<RegistrationResponse> {
    let grant_types = if request.grant_types.is_empty() {
        vec!["authorization_code".to_string()]
    } else {
        request.grant_types
    };
    for grant in &grant_types {
        if !SUPPORTED_GRANT_TYPES.contains(&grant.as_str()) {
            return Err(AuthServerError::InvalidRequest(format!(
                "unsupported grant_type: {grant}"
            )));
        }
    }

    let response_types = if request.response_types.is_empty() {
        vec!["code".to_string()]
    } else {
        request.response_types
    };
    for response_type in &response_types {
        if response_type != "code" {
            return Err(AuthServerError::UnsupportedResponseType(
                response_type.clone(),
            ));
        }
    }

    let auth_method = request
        .token_endpoint_auth_method
        .unwrap_or_else(|| "none".to_string());
    if auth_method != "none" {
        return Err(AuthServerError::InvalidRequest(format!(
            "unsupported token_endpoint_auth_method: {auth_method}"
        )));
    }

    if grant_types.iter().any(|g| g == "authorization_code") && request.redirect_uris.is_empty() {
        return Err(AuthServerError::InvalidRequest(
            "redirect_uris is required for the authorization_code grant".to_string(),
        ));
    }
    for uri in &request.redirect_uris {
        validate_redirect_uri(uri)?;
    }

    let client = RegisteredClient {
        client_id: Uuid::new_v4().simple().to_string(),
        client_secret: None,
        token_endpoint_auth_method: auth_method.clone(),
        redirect_uris: request.redirect_uris.clone(),
        grant_types: grant_types.clone(),
        response_types: response_types.clone(),
        // Public clients must prove possession of the code
        require_pkce: true,
        issued_at: Utc::now(),
        secret_expires_at: None,
    };

    // Add-or-keep on a duplicate id; the generated id makes collisions
    // purely theoretical but the semantics stay deterministic
    let stored = state
        .clients
        .entry(client.client_id.clone())
        .or_insert(client);
    info!(client_id = %stored.client_id, name = ?request.client_name, "client registered");

    Ok(RegistrationResponse {
        client_id: stored.client_id.clone(),
        client_secret: None,
        client_id_issued_at: stored.issued_at.timestamp(),
        client_secret_expires_at: None,
        redirect_uris: stored.redirect_uris.clone(),
        grant_types: stored.grant_types.clone(),
        response_types: stored.response_types.clone(),
        token_endpoint_auth_method: stored.token_endpoint_auth_method.clone(),
    })
}

/// `GET /oauth/authorize`
async fn handle_authorize(
    State(state): State<Arc<AuthServerState>>,
    Query(params): Query<AuthorizeParams>,
) -> Response {
    match authorize(&state, params) {
        Ok(location) => (
            StatusCode::FOUND,
            [(header::LOCATION, location)],
        )
            .into_response(),
        Err(error) => error.into_response(),
    }
}

fn authorize(state: &AuthServerState, params: AuthorizeParams) -> AuthServerResult<String> {
    match params.response_type.as_deref() {
        Some("code") => {}
        Some(other) => return Err(AuthServerError::UnsupportedResponseType(other.to_string())),
        None => {
            return Err(AuthServerError::InvalidRequest(
                "response_type is required".to_string(),
            ))
        }
    }

    let client_id = params
        .client_id
        .ok_or_else(|| AuthServerError::InvalidRequest("client_id is required".to_string()))?;
    let client = state
        .clients
        .get(&client_id)
        .ok_or_else(|| AuthServerError::InvalidClient(format!("unknown client: {client_id}")))?;

    let redirect_raw = params.redirect_uri.ok_or_else(|| {
        AuthServerError::InvalidRequest("redirect_uri is required".to_string())
    })?;
    let submitted = validate_redirect_uri(&redirect_raw)?;
    let registered_match = client.redirect_uris.iter().any(|registered| {
        Url::parse(registered)
            .map(|registered| registered == submitted)
            .unwrap_or(false)
    });
    if !registered_match {
        return Err(AuthServerError::InvalidRedirectUri(format!(
            "redirect_uri does not match a registered URI: {redirect_raw}"
        )));
    }

    let code_challenge = params.code_challenge.ok_or_else(|| {
        AuthServerError::InvalidRequest("code_challenge is required (PKCE)".to_string())
    })?;
    match params.code_challenge_method.as_deref() {
        Some("S256") => {}
        other => {
            return Err(AuthServerError::InvalidRequest(format!(
                "code_challenge_method must be S256, got {other:?}"
            )))
        }
    }

    let resource = params
        .resource
        .unwrap_or_else(|| state.config.resource.clone());

    let code = AuthServerState::generate_opaque_value();
    state.authorization_codes.insert(
        code.clone(),
        AuthorizationCodeRecord {
            client_id: client_id.clone(),
            subject: client_id.clone(),
            redirect_uri: redirect_raw,
            resource,
            code_challenge,
            scope: params.scope,
            expires_at: Utc::now() + state.config.code_ttl,
        },
    );
    debug!(%client_id, "authorization code issued");

    let mut location = submitted;
    {
        let mut query = location.query_pairs_mut();
        query.append_pair("code", &code);
        if let Some(state_value) = &params.state {
            query.append_pair("state", state_value);
        }
    }
    Ok(location.to_string())
}

/// `POST /oauth/token`
async fn handle_token(
    State(state): State<Arc<AuthServerState>>,
    Form(params): Form<TokenParams>,
) -> Response {
    let outcome = match params.grant_type.as_deref() {
        Some("authorization_code") => redeem_authorization_code(&state, params),
        Some("refresh_token") => redeem_refresh_token(&state, params),
        Some("client_credentials") => client_credentials(&state, params),
        Some(other) => Err(AuthServerError::UnsupportedGrantType(other.to_string())),
        None => Err(AuthServerError::InvalidRequest(
            "grant_type is required".to_string(),
        )),
    };

    match outcome {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(error) => error.into_response(),
    }
}

fn redeem_authorization_code(
    state: &AuthServerState,
    params: TokenParams,
) -> AuthServerResult<TokenResponse> {
    let code = params
        .code
        .ok_or_else(|| AuthServerError::InvalidRequest("code is required".to_string()))?;

    // Remove before validating: redemption is at-most-once even when the
    // subsequent checks fail
    let (_, record) = state
        .authorization_codes
        .remove(&code)
        .ok_or_else(|| AuthServerError::InvalidGrant("unknown or redeemed code".to_string()))?;

    if Utc::now() > record.expires_at {
        return Err(AuthServerError::InvalidGrant(
            "authorization code expired".to_string(),
        ));
    }

    if let Some(client_id) = &params.client_id {
        if client_id != &record.client_id {
            return Err(AuthServerError::InvalidGrant(
                "code was issued to a different client".to_string(),
            ));
        }
    }

    let redirect_uri = params.redirect_uri.ok_or_else(|| {
        AuthServerError::InvalidRequest("redirect_uri is required".to_string())
    })?;
    let matches = match (Url::parse(&redirect_uri), Url::parse(&record.redirect_uri)) {
        (Ok(submitted), Ok(stored)) => submitted == stored,
        _ => false,
    };
    if !matches {
        return Err(AuthServerError::InvalidGrant(
            "redirect_uri does not match the authorization request".to_string(),
        ));
    }

    let verifier = params.code_verifier.ok_or_else(|| {
        AuthServerError::InvalidRequest("code_verifier is required (PKCE)".to_string())
    })?;
    if !constant_time_eq(&pkce_challenge(&verifier), &record.code_challenge) {
        return Err(AuthServerError::InvalidGrant(
            "code_verifier does not match the code_challenge".to_string(),
        ));
    }

    if let Some(resource) = &params.resource {
        if resource != &record.resource {
            return Err(AuthServerError::InvalidGrant(format!(
                "resource does not match the authorization request: {resource}"
            )));
        }
    }

    let access_token =
        state.mint_access_token(&record.subject, &record.client_id, &record.resource)?;
    let refresh_token = state.issue_refresh_token(
        &record.client_id,
        &record.subject,
        &record.resource,
        record.scope.clone(),
    );

    Ok(TokenResponse {
        access_token,
        token_type: "Bearer".to_string(),
        expires_in: state.config.access_token_ttl.num_seconds(),
        refresh_token: Some(refresh_token),
        scope: record.scope,
    })
}

fn redeem_refresh_token(
    state: &AuthServerState,
    params: TokenParams,
) -> AuthServerResult<TokenResponse> {
    let token = params.refresh_token.ok_or_else(|| {
        AuthServerError::InvalidRequest("refresh_token is required".to_string())
    })?;

    let (_, record) = state
        .refresh_tokens
        .remove(&token)
        .ok_or_else(|| AuthServerError::InvalidGrant("unknown or redeemed refresh token".to_string()))?;

    if Utc::now() > record.expires_at {
        return Err(AuthServerError::InvalidGrant(
            "refresh token expired".to_string(),
        ));
    }

    if let Some(client_id) = &params.client_id {
        if client_id != &record.client_id {
            return Err(AuthServerError::InvalidGrant(
                "refresh token was issued to a different client".to_string(),
            ));
        }
    }

    if let Some(resource) = &params.resource {
        if resource != &record.resource {
            return Err(AuthServerError::InvalidGrant(format!(
                "resource does not match the refresh grant: {resource}"
            )));
        }
    }

    let access_token =
        state.mint_access_token(&record.subject, &record.client_id, &record.resource)?;
    let refresh_token = state.issue_refresh_token(
        &record.client_id,
        &record.subject,
        &record.resource,
        record.scope.clone(),
    );

    Ok(TokenResponse {
        access_token,
        token_type: "Bearer".to_string(),
        expires_in: state.config.access_token_ttl.num_seconds(),
        refresh_token: Some(refresh_token),
        scope: record.scope,
    })
}

fn client_credentials(
    state: &AuthServerState,
    params: TokenParams,
) -> AuthServerResult<TokenResponse> {
    let client_id = params
        .client_id
        .ok_or_else(|| AuthServerError::InvalidRequest("client_id is required".to_string()))?;
    let client_secret = params.client_secret.ok_or_else(|| {
        AuthServerError::InvalidRequest("client_secret is required".to_string())
    })?;

    if client_id != state.config.demo_client_id
        || !constant_time_eq(&client_secret, &state.config.demo_client_secret)
    {
        return Err(AuthServerError::InvalidClient(
            "invalid client credentials".to_string(),
        ));
    }

    let resource = params
        .resource
        .unwrap_or_else(|| state.config.resource.clone());
    let access_token = state.mint_access_token(&client_id, &client_id, &resource)?;

    Ok(TokenResponse {
        access_token,
        token_type: "Bearer".to_string(),
        expires_in: state.config.access_token_ttl.num_seconds(),
        refresh_token: None,
        scope: None,
    })
}
