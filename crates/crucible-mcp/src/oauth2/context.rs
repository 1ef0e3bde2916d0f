//! Authenticated request context
//!
//! Attached to HTTP requests by the auth middleware and merged into session
//! metadata by the transport handlers.

// Layer 1: Standard library imports
use std::collections::HashMap;

// Layer 2: Third-party crate imports
use serde_json::Value;

// Layer 3: Internal module imports
use super::validator::JwtClaims;

/// Outcome of a successful authentication
#[derive(Debug, Clone)]
pub struct AuthContext {
    /// Authenticated principal (the token subject)
    pub user_id: String,

    /// Flattened claims, stringified for session metadata
    pub claims: HashMap<String, String>,
}

impl AuthContext {
    /// Build a context from validated claims
    pub fn from_claims(claims: &JwtClaims) -> Self {
        let mut flattened = HashMap::new();
        if let Some(aud) = &claims.aud {
            flattened.insert("aud".to_string(), aud.clone());
        }
        if let Some(iss) = &claims.iss {
            flattened.insert("iss".to_string(), iss.clone());
        }
        if let Some(client_id) = &claims.client_id {
            flattened.insert("client_id".to_string(), client_id.clone());
        }
        for (key, value) in &claims.extra {
            flattened.insert(key.clone(), stringify(value));
        }

        Self {
            user_id: claims.sub.clone(),
            claims: flattened,
        }
    }

    /// Session metadata entries: `user_id` plus one `claim_<k>` per claim
    pub fn metadata_entries(&self) -> Vec<(String, String)> {
        let mut entries = vec![("user_id".to_string(), self.user_id.clone())];
        for (key, value) in &self.claims {
            entries.push((format!("claim_{key}"), value.clone()));
        }
        entries
    }
}

fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
