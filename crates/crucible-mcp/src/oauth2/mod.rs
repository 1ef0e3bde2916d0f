//! OAuth 2.1 Resource Server
//!
//! Bearer validation for the protected MCP endpoints (HS256 against
//! configured symmetric keys, audience/issuer/skew checks, RFC 8707
//! resource-indicator enforcement), the auth middleware, and the
//! unauthenticated discovery metadata endpoints.

pub mod config;
pub mod context;
pub mod error;
pub mod metadata;
pub mod middleware;
pub mod validator;

pub use config::{OAuth2Config, ValidationKey};
pub use context::AuthContext;
pub use error::{OAuth2Error, OAuth2Result};
pub use metadata::{metadata_router, AuthorizationServerMetadata};
pub use middleware::require_bearer;
pub use validator::{decode_secret, BearerValidator, JwtClaims};
