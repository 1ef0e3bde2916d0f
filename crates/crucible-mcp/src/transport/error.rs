//! Transport error types

// Layer 2: Third-party crate imports
use thiserror::Error;

/// Transport error types for comprehensive error handling
///
/// Covers all transport-level failures. A transport failure never aborts the
/// process; it cancels pending work on the affected session only.
#[derive(Error, Debug)]
pub enum TransportError {
    /// Connection-related errors
    #[error("Connection error: {message}")]
    Connection { message: String },

    /// I/O operation errors
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    /// Message serialization/deserialization errors
    #[error("Serialization error: {source}")]
    Serialization {
        #[from]
        source: serde_json::Error,
    },

    /// The session is closed or was never registered
    #[error("Session not found: {session_id}")]
    SessionNotFound { session_id: String },

    /// A session id collided with an existing registration
    #[error("Session already registered: {session_id}")]
    DuplicateSession { session_id: String },

    /// The transport's write channel is gone
    #[error("Transport closed: {message}")]
    Closed { message: String },

    /// Protocol-level errors
    #[error("Protocol error: {message}")]
    Protocol { message: String },

    /// Generic transport errors
    #[error("Transport error: {message}")]
    Other { message: String },
}

impl TransportError {
    /// Create a connection error
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Create a session-not-found error
    pub fn session_not_found(session_id: impl Into<String>) -> Self {
        Self::SessionNotFound {
            session_id: session_id.into(),
        }
    }

    /// Create a closed-transport error
    pub fn closed(message: impl Into<String>) -> Self {
        Self::Closed {
            message: message.into(),
        }
    }

    /// Create a protocol error
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    /// Create a generic transport error
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other {
            message: message.into(),
        }
    }
}

/// Convenient result type for transport operations
pub type TransportResult<T> = Result<T, TransportError>;
