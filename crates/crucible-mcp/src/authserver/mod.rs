//! Demo OAuth 2.1 Authorization Server
//!
//! An embedded, in-memory authorization server for exercising the OAuth
//! resource surface end to end: dynamic client registration (RFC 7591
//! subset), the authorization-code flow with mandatory PKCE S256, refresh
//! token rotation, and a static-credential `client_credentials` grant.
//! Nothing here persists across restarts; that is a stated non-goal.

pub mod error;
pub mod handlers;
pub mod state;
pub mod types;

pub use error::{AuthServerError, AuthServerResult};
pub use handlers::authserver_router;
pub use state::{pkce_challenge, AuthServerConfig, AuthServerState};
pub use types::{
    AuthorizationCodeRecord, RefreshTokenRecord, RegisteredClient, RegistrationRequest,
    RegistrationResponse, TokenResponse,
};
