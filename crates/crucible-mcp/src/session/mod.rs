//! Session Registry
//!
//! The connection manager owns the `session id -> transport` registry:
//! uniqueness enforcement, activity tracking, idle timeout, and the
//! cancellation of pending server-initiated requests when a session closes.

pub mod manager;

pub use manager::{ConnectionManager, SessionConfig, SessionSnapshot};

/// Opaque session identifier, generated by the transport that opened it
pub type SessionId = String;
