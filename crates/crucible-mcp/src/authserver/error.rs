//! RFC 6749 error responses for the demo authorization server

// Layer 2: Third-party crate imports
use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde_json::json;
use thiserror::Error;

/// Authorization-server failures, each carrying its RFC 6749 error code
#[derive(Debug, Clone, Error)]
pub enum AuthServerError {
    /// Malformed or missing request parameter
    #[error("{0}")]
    InvalidRequest(String),

    /// Unknown client or failed client authentication
    #[error("{0}")]
    InvalidClient(String),

    /// Invalid, expired, or already-redeemed grant; PKCE or resource mismatch
    #[error("{0}")]
    InvalidGrant(String),

    /// Grant type outside the supported set
    #[error("unsupported grant_type: {0}")]
    UnsupportedGrantType(String),

    /// Response type other than `code`
    #[error("unsupported response_type: {0}")]
    UnsupportedResponseType(String),

    /// Redirect URI failed validation
    #[error("{0}")]
    InvalidRedirectUri(String),

    /// Internal failure while minting tokens
    #[error("{0}")]
    ServerError(String),
}

impl AuthServerError {
    /// RFC 6749 error code string
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthServerError::InvalidRequest(_) => "invalid_request",
            AuthServerError::InvalidClient(_) => "invalid_client",
            AuthServerError::InvalidGrant(_) => "invalid_grant",
            AuthServerError::UnsupportedGrantType(_) => "unsupported_grant_type",
            AuthServerError::UnsupportedResponseType(_) => "unsupported_response_type",
            AuthServerError::InvalidRedirectUri(_) => "invalid_redirect_uri",
            AuthServerError::ServerError(_) => "server_error",
        }
    }
}

impl IntoResponse for AuthServerError {
    fn into_response(self) -> Response {
        let status = match self {
            AuthServerError::ServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        };
        (
            status,
            Json(json!({
                "error": self.error_code(),
                "error_description": self.to_string(),
            })),
        )
            .into_response()
    }
}

/// Convenient result type for authorization-server handlers
pub type AuthServerResult<T> = Result<T, AuthServerError>;
