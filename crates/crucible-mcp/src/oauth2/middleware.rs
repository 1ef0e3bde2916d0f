//! Bearer authentication middleware
//!
//! Guards the MCP endpoints. On success the request gains an
//! [`AuthContext`] extension for the transport handlers to merge into
//! session metadata; on failure the request ends here with a 401 and an
//! `{error, message}` body.

// Layer 1: Standard library imports
use std::sync::Arc;

// Layer 2: Third-party crate imports
use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Json, Response},
};
use serde_json::json;
use tracing::debug;

// Layer 3: Internal module imports
use super::context::AuthContext;
use super::error::OAuth2Error;
use super::validator::BearerValidator;

/// Extract the bearer token from the `Authorization` header
fn bearer_token(request: &Request) -> Option<&str> {
    request
        .headers()
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

/// Axum middleware enforcing bearer authentication
pub async fn require_bearer(
    State(validator): State<Arc<BearerValidator>>,
    mut request: Request,
    next: Next,
) -> Response {
    let token = match bearer_token(&request) {
        Some(token) => token.to_string(),
        None => return unauthorized(&OAuth2Error::MissingToken),
    };

    match validator.validate(&token) {
        Ok(claims) => {
            request
                .extensions_mut()
                .insert(AuthContext::from_claims(&claims));
            next.run(request).await
        }
        Err(error) => {
            debug!(%error, "bearer validation failed");
            unauthorized(&error)
        }
    }
}

fn unauthorized(error: &OAuth2Error) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        [(
            header::WWW_AUTHENTICATE,
            format!(r#"Bearer error="{}""#, error.error_code()),
        )],
        Json(json!({
            "error": error.error_code(),
            "message": error.to_string(),
        })),
    )
        .into_response()
}
