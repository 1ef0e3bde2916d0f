//! Type definitions for the correlation system
//!
//! Core types used for tracking server-initiated requests: the pending entry
//! itself and the opaque request-id generator.

// Layer 1: Standard library imports
use std::sync::atomic::{AtomicU64, Ordering};

// Layer 2: Third-party crate imports
use chrono::{DateTime, TimeDelta, Utc};
use serde_json::Value;
use tokio::sync::oneshot;
use uuid::Uuid;

// Layer 3: Internal module imports
use super::error::{CorrelationResult, RequestId};
use crate::session::SessionId;

/// A pending server-initiated request awaiting its client response
///
/// Holds the delivery channel, the owning session (so a session close can
/// cancel exactly its own requests), and the deadline. `deadline` is `None`
/// when the caller disabled the timeout.
#[derive(Debug)]
pub struct PendingRequest {
    /// Channel sender for delivering the correlated response or error
    pub sender: oneshot::Sender<CorrelationResult<Value>>,

    /// Session this request was sent through
    pub session_id: SessionId,

    /// Method name, for diagnostics
    pub method: String,

    /// Timestamp when the request was created (UTC)
    pub created_at: DateTime<Utc>,

    /// Absolute deadline, `None` when the timeout is disabled
    pub deadline: Option<DateTime<Utc>>,
}

impl PendingRequest {
    /// Create a new pending request
    pub fn new(
        sender: oneshot::Sender<CorrelationResult<Value>>,
        session_id: SessionId,
        method: impl Into<String>,
        timeout: Option<TimeDelta>,
    ) -> Self {
        let created_at = Utc::now();
        Self {
            sender,
            session_id,
            method: method.into(),
            created_at,
            deadline: timeout.map(|t| created_at + t),
        }
    }

    /// Check whether this request has expired at the given timestamp
    ///
    /// Taking the timestamp as an argument avoids repeated clock reads when
    /// the sweeper scans many entries.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        match self.deadline {
            Some(deadline) => now > deadline,
            None => false,
        }
    }

    /// Timeout that was applied to this request, if any
    pub fn timeout(&self) -> Option<TimeDelta> {
        self.deadline.map(|d| d - self.created_at)
    }
}

/// Generator of opaque server-side request ids
///
/// Ids combine a monotonic counter with a per-process random component so
/// they never collide with client-chosen ids on the same wire.
#[derive(Debug)]
pub struct RequestIdGenerator {
    prefix: String,
    counter: AtomicU64,
}

impl RequestIdGenerator {
    /// Create a new generator with a fresh random prefix
    pub fn new() -> Self {
        Self {
            prefix: Uuid::new_v4().simple().to_string()[..8].to_string(),
            counter: AtomicU64::new(0),
        }
    }

    /// Produce the next opaque request id
    pub fn next_id(&self) -> RequestId {
        let n = self.counter.fetch_add(1, Ordering::Relaxed);
        RequestId::new_string(format!("srv-{}-{}", self.prefix, n))
    }
}

impl Default for RequestIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_are_unique_and_opaque() {
        let generator = RequestIdGenerator::new();
        let first = generator.next_id();
        let second = generator.next_id();
        assert_ne!(first, second);
        assert!(matches!(first, RequestId::String(_)));
    }

    #[test]
    fn expiry_uses_deadline() {
        let (sender, _receiver) = oneshot::channel();
        let pending = PendingRequest::new(
            sender,
            "session-1".to_string(),
            "elicitation/create",
            Some(TimeDelta::seconds(30)),
        );
        let now = Utc::now();
        assert!(!pending.is_expired_at(now));
        assert!(pending.is_expired_at(now + TimeDelta::seconds(31)));
    }

    #[test]
    fn no_deadline_never_expires() {
        let (sender, _receiver) = oneshot::channel();
        let pending = PendingRequest::new(sender, "session-1".to_string(), "ping", None);
        assert!(!pending.is_expired_at(Utc::now() + TimeDelta::days(365)));
    }
}
