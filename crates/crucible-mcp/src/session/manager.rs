//! Connection Manager
//!
//! Registry of active sessions keyed by session id. Each entry owns the
//! session's transport handle plus the lifecycle metadata the dispatcher
//! needs (negotiated protocol version, auth metadata, activity stamps).
//! An idle sweeper closes sessions that exceed the configured idle timeout,
//! and every close path cancels that session's pending server-initiated
//! requests exactly once.

// Layer 1: Standard library imports
use std::collections::HashMap;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

// Layer 2: Third-party crate imports
use chrono::{DateTime, TimeDelta, Utc};
use dashmap::DashMap;
use tokio::{
    task::JoinHandle,
    time::{interval, Duration},
};
use tracing::{debug, info, warn};

// Layer 3: Internal module imports
use super::SessionId;
use crate::correlation::CorrelationManager;
use crate::protocol::defaults;
use crate::transport::{SessionTransport, TransportError, TransportResult};

/// Configuration for session lifecycle management
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Idle time after which a session is closed
    pub idle_timeout: TimeDelta,

    /// How often the idle sweeper runs
    pub sweep_interval: Duration,

    /// Bounded wait applied per session during `close_all`
    pub close_wait: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            idle_timeout: TimeDelta::seconds(defaults::SESSION_IDLE_TIMEOUT_SECONDS),
            sweep_interval: Duration::from_secs(60),
            close_wait: Duration::from_secs(defaults::CLOSE_ALL_WAIT_SECONDS),
        }
    }
}

impl SessionConfig {
    /// Set the idle timeout
    pub fn with_idle_timeout(mut self, idle_timeout: TimeDelta) -> Self {
        self.idle_timeout = idle_timeout;
        self
    }
}

/// One registered session
struct SessionEntry {
    transport: Arc<dyn SessionTransport>,
    metadata: HashMap<String, String>,
    negotiated_protocol_version: Option<String>,
    created_at: DateTime<Utc>,
    last_activity: DateTime<Utc>,
}

/// Read-only view of a session's lifecycle state
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    pub session_id: SessionId,
    pub metadata: HashMap<String, String>,
    pub negotiated_protocol_version: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
}

/// Registry of active sessions with lifecycle management
pub struct ConnectionManager {
    sessions: Arc<DashMap<SessionId, SessionEntry>>,
    correlation: Arc<CorrelationManager>,
    config: SessionConfig,
    sweeper: std::sync::Mutex<Option<JoinHandle<()>>>,
    shutdown: Arc<AtomicBool>,
}

impl ConnectionManager {
    /// Create a connection manager and start its idle sweeper
    pub fn new(config: SessionConfig, correlation: Arc<CorrelationManager>) -> Arc<Self> {
        let manager = Arc::new(Self {
            sessions: Arc::new(DashMap::new()),
            correlation,
            config,
            sweeper: std::sync::Mutex::new(None),
            shutdown: Arc::new(AtomicBool::new(false)),
        });

        if let Some(handle) = Arc::clone(&manager).spawn_idle_sweeper() {
            if let Ok(mut slot) = manager.sweeper.lock() {
                *slot = Some(handle);
            }
        }
        manager
    }

    /// Register a new session
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::DuplicateSession`] when the id is taken.
    pub fn register(
        &self,
        session_id: SessionId,
        transport: Arc<dyn SessionTransport>,
    ) -> TransportResult<()> {
        let now = Utc::now();
        let entry = SessionEntry {
            transport,
            metadata: HashMap::new(),
            negotiated_protocol_version: None,
            created_at: now,
            last_activity: now,
        };

        // Entry API keeps check-and-insert atomic under concurrent opens
        match self.sessions.entry(session_id.clone()) {
            dashmap::mapref::entry::Entry::Occupied(_) => {
                Err(TransportError::DuplicateSession { session_id })
            }
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(entry);
                info!(%session_id, "session registered");
                Ok(())
            }
        }
    }

    /// Look up a session's transport handle
    pub fn transport(&self, session_id: &SessionId) -> Option<Arc<dyn SessionTransport>> {
        self.sessions
            .get(session_id)
            .map(|entry| Arc::clone(&entry.transport))
    }

    /// Whether the session is registered
    pub fn contains(&self, session_id: &SessionId) -> bool {
        self.sessions.contains_key(session_id)
    }

    /// Number of active sessions
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Stamp activity on a session
    pub fn touch(&self, session_id: &SessionId) {
        if let Some(mut entry) = self.sessions.get_mut(session_id) {
            entry.last_activity = Utc::now();
        }
    }

    /// Store the negotiated protocol version after `initialize`
    pub fn set_protocol_version(&self, session_id: &SessionId, version: impl Into<String>) {
        if let Some(mut entry) = self.sessions.get_mut(session_id) {
            entry.negotiated_protocol_version = Some(version.into());
        }
    }

    /// Negotiated protocol version, if `initialize` completed
    pub fn protocol_version(&self, session_id: &SessionId) -> Option<String> {
        self.sessions
            .get(session_id)?
            .negotiated_protocol_version
            .clone()
    }

    /// Merge metadata entries into a session (auth claims, client details)
    pub fn add_metadata<I, K, V>(&self, session_id: &SessionId, entries: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        if let Some(mut entry) = self.sessions.get_mut(session_id) {
            for (key, value) in entries {
                entry.metadata.insert(key.into(), value.into());
            }
        }
    }

    /// Read-only snapshot of a session's lifecycle state
    pub fn snapshot(&self, session_id: &SessionId) -> Option<SessionSnapshot> {
        self.sessions.get(session_id).map(|entry| SessionSnapshot {
            session_id: session_id.clone(),
            metadata: entry.metadata.clone(),
            negotiated_protocol_version: entry.negotiated_protocol_version.clone(),
            created_at: entry.created_at,
            last_activity: entry.last_activity,
        })
    }

    /// Unregister a session and cancel its pending server-initiated requests
    ///
    /// Safe to call from any close path; only the first call finds the entry.
    pub async fn unregister(&self, session_id: &SessionId, reason: &str) {
        let Some((_, entry)) = self.sessions.remove(session_id) else {
            return;
        };

        let cancelled = self.correlation.cancel_for_session(session_id, reason);
        let _ = entry.transport.close().await;

        let metrics = entry.transport.metrics();
        info!(
            %session_id,
            reason,
            cancelled_requests = cancelled,
            bytes_sent = metrics.bytes_sent,
            bytes_received = metrics.bytes_received,
            messages_sent = metrics.messages_sent,
            messages_received = metrics.messages_received,
            uptime_seconds = metrics.uptime_seconds,
            "session closed"
        );
    }

    /// Close every session, bounded-waiting per session
    pub async fn close_all(&self) {
        let ids: Vec<SessionId> = self.sessions.iter().map(|e| e.key().clone()).collect();
        for session_id in ids {
            let close = self.unregister(&session_id, "server shutting down");
            if tokio::time::timeout(self.config.close_wait, close)
                .await
                .is_err()
            {
                warn!(%session_id, "session close exceeded bounded wait");
            }
        }
    }

    /// Stop the sweeper and close everything
    pub async fn shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
        if let Ok(mut slot) = self.sweeper.lock() {
            if let Some(handle) = slot.take() {
                handle.abort();
            }
        }
        self.close_all().await;
    }

    fn spawn_idle_sweeper(self: Arc<Self>) -> Option<JoinHandle<()>> {
        let handle = tokio::runtime::Handle::try_current().ok()?;
        let period = self.config.sweep_interval;
        Some(handle.spawn(async move {
            let mut ticker = interval(period);
            loop {
                ticker.tick().await;
                if self.shutdown.load(Ordering::SeqCst) {
                    break;
                }
                let now = Utc::now();
                let idle: Vec<SessionId> = self
                    .sessions
                    .iter()
                    .filter(|entry| now - entry.value().last_activity > self.config.idle_timeout)
                    .map(|entry| entry.key().clone())
                    .collect();
                for session_id in idle {
                    debug!(%session_id, "closing idle session");
                    self.unregister(&session_id, "idle timeout").await;
                }
            }
        }))
    }
}

impl std::fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("sessions", &self.sessions.len())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
