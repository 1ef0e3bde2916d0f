//! Correlation Manager implementation
//!
//! The pending-request table behind every server-initiated request. Entries
//! are inserted before the transport write and removed by exactly one of:
//! a matching response, the deadline, explicit cancellation, or the owning
//! session closing.

// Layer 1: Standard library imports
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

// Layer 2: Third-party crate imports
use chrono::{TimeDelta, Utc};
use dashmap::DashMap;
use serde_json::Value;
use tokio::{
    sync::{oneshot, RwLock},
    task::JoinHandle,
    time::{interval, Duration},
};
use tracing::{debug, trace, warn};

// Layer 3: Internal module imports
use super::{
    error::{CorrelationError, CorrelationResult, RequestId},
    types::{PendingRequest, RequestIdGenerator},
};
use crate::protocol::defaults;
use crate::session::SessionId;

/// Timeout selection for one server-initiated request
#[derive(Debug, Clone, Copy, Default)]
pub enum Timeout {
    /// Use the configured default
    #[default]
    Default,
    /// Wait forever
    Infinite,
    /// Wait this long
    After(TimeDelta),
}

/// Configuration for the correlation manager
#[derive(Debug, Clone)]
pub struct CorrelationConfig {
    /// Default timeout for requests; `None` disables the deadline entirely
    pub default_timeout: Option<TimeDelta>,

    /// How often the sweeper scans for expired entries
    pub cleanup_interval: Duration,

    /// Maximum number of pending requests (0 = unlimited)
    pub max_pending_requests: usize,
}

impl Default for CorrelationConfig {
    fn default() -> Self {
        Self {
            default_timeout: Some(TimeDelta::seconds(
                defaults::CLIENT_REQUEST_TIMEOUT_SECONDS,
            )),
            cleanup_interval: Duration::from_secs(5),
            max_pending_requests: 1000,
        }
    }
}

impl CorrelationConfig {
    /// Set the default timeout (`None` = infinite)
    pub fn with_default_timeout(mut self, timeout: Option<TimeDelta>) -> Self {
        self.default_timeout = timeout;
        self
    }
}

/// Pending-request table for server-initiated JSON-RPC requests
///
/// Thread-safe management of in-flight requests keyed by their opaque id,
/// with session-scoped cancellation and a background sweeper that expires
/// entries whose deadline passed without a caller noticing (e.g. after the
/// awaiting task was dropped).
#[derive(Debug)]
pub struct CorrelationManager {
    /// Pending requests keyed by their ID
    requests: Arc<DashMap<RequestId, PendingRequest>>,

    /// Generates unique opaque request IDs
    id_generator: RequestIdGenerator,

    /// Configuration settings
    config: CorrelationConfig,

    /// Background sweeper task handle
    cleanup_task: RwLock<Option<JoinHandle<()>>>,

    /// Shutdown signal for the sweeper
    shutdown_signal: Arc<AtomicBool>,
}

impl CorrelationManager {
    /// Create a new correlation manager and start its background sweeper
    pub fn new(config: CorrelationConfig) -> Arc<Self> {
        let manager = Arc::new(Self {
            requests: Arc::new(DashMap::new()),
            id_generator: RequestIdGenerator::new(),
            config,
            cleanup_task: RwLock::new(None),
            shutdown_signal: Arc::new(AtomicBool::new(false)),
        });

        // The sweeper needs a runtime; without one the caller-side timeout
        // in ServerRequester still bounds every request.
        if let Some(handle) = manager.spawn_sweeper() {
            // The lock is uncontended here; the manager has not escaped yet.
            if let Ok(mut slot) = manager.cleanup_task.try_write() {
                *slot = Some(handle);
            }
        }

        debug!(?manager.config, "correlation manager initialized");
        manager
    }

    /// Resolve a [`Timeout`] selection against the configured default
    pub fn resolve_timeout(&self, timeout: Timeout) -> Option<TimeDelta> {
        match timeout {
            Timeout::Default => self.config.default_timeout,
            Timeout::Infinite => None,
            Timeout::After(delta) => Some(delta),
        }
    }

    /// Register a new request for correlation
    ///
    /// Allocates a fresh opaque id, stores the awaiter, and returns both.
    /// The entry must be inserted before the transport write so a fast
    /// client response always finds it.
    ///
    /// # Errors
    ///
    /// Returns `CorrelationError::Internal` when the table is at capacity.
    pub fn register_request(
        &self,
        session_id: &SessionId,
        method: &str,
        timeout: Timeout,
    ) -> CorrelationResult<(RequestId, oneshot::Receiver<CorrelationResult<Value>>)> {
        if self.config.max_pending_requests > 0
            && self.requests.len() >= self.config.max_pending_requests
        {
            return Err(CorrelationError::Internal {
                message: "Maximum pending requests exceeded".to_string(),
            });
        }

        let (sender, receiver) = oneshot::channel();
        let request_id = self.id_generator.next_id();
        let timeout = self.resolve_timeout(timeout);

        let pending = PendingRequest::new(sender, session_id.clone(), method, timeout);
        debug!(%request_id, %session_id, method, ?timeout, "registering client request");
        self.requests.insert(request_id.clone(), pending);

        Ok((request_id, receiver))
    }

    /// Correlate a response with a pending request
    ///
    /// The first matching response resolves (or errors) the awaiter; the
    /// entry is removed atomically, so duplicates land in
    /// `RequestNotFound` and are dropped by the caller.
    ///
    /// # Errors
    ///
    /// * `CorrelationError::RequestNotFound` - no pending request with this id
    /// * `CorrelationError::ChannelClosed` - the awaiter went away
    pub fn correlate_response(
        &self,
        request_id: &RequestId,
        response: CorrelationResult<Value>,
    ) -> CorrelationResult<()> {
        let (_, pending) =
            self.requests
                .remove(request_id)
                .ok_or_else(|| CorrelationError::RequestNotFound {
                    id: request_id.clone(),
                })?;

        debug!(%request_id, session_id = %pending.session_id, "correlating response");
        if let Ok(ref value) = response {
            trace!(%request_id, %value, "response data");
        }

        pending
            .sender
            .send(response)
            .map_err(|_| CorrelationError::ChannelClosed {
                id: request_id.clone(),
                details: "Response channel was closed".to_string(),
            })?;

        Ok(())
    }

    /// Correlate a response, verifying the responding session owns the entry
    ///
    /// Two concurrent sessions must never observe each other's requests: a
    /// response whose id matches a pending entry owned by a *different*
    /// session is refused (and dropped by the caller).
    ///
    /// # Errors
    ///
    /// * `CorrelationError::RequestNotFound` - no pending request with this id
    /// * `CorrelationError::SessionMismatch` - the entry belongs to another session
    /// * `CorrelationError::ChannelClosed` - the awaiter went away
    pub fn correlate_response_from(
        &self,
        session_id: &SessionId,
        request_id: &RequestId,
        response: CorrelationResult<Value>,
    ) -> CorrelationResult<()> {
        {
            let entry =
                self.requests
                    .get(request_id)
                    .ok_or_else(|| CorrelationError::RequestNotFound {
                        id: request_id.clone(),
                    })?;
            if &entry.session_id != session_id {
                return Err(CorrelationError::SessionMismatch {
                    id: request_id.clone(),
                });
            }
        }
        // The entry may have been resolved between the check and here; the
        // removal inside correlate_response stays the single source of truth.
        self.correlate_response(request_id, response)
    }

    /// Remove an entry without notifying the awaiter
    ///
    /// Used by the caller's own timeout path: the awaiter already gave up,
    /// so a late response must find nothing and be dropped.
    pub fn expire_request(&self, request_id: &RequestId) -> bool {
        self.requests.remove(request_id).is_some()
    }

    /// Cancel a pending request, delivering a cancellation error
    ///
    /// # Errors
    ///
    /// * `CorrelationError::RequestNotFound` - no pending request with this id
    pub fn cancel_request(
        &self,
        request_id: &RequestId,
        reason: impl Into<String>,
    ) -> CorrelationResult<()> {
        let (_, pending) =
            self.requests
                .remove(request_id)
                .ok_or_else(|| CorrelationError::RequestNotFound {
                    id: request_id.clone(),
                })?;

        debug!(%request_id, "cancelling request");
        let _ = pending.sender.send(Err(CorrelationError::Cancelled {
            id: request_id.clone(),
            reason: reason.into(),
        }));

        Ok(())
    }

    /// Cancel every pending request owned by one session
    ///
    /// Called by the connection manager when a transport closes. Returns the
    /// number of requests cancelled.
    pub fn cancel_for_session(&self, session_id: &SessionId, reason: &str) -> usize {
        let ids: Vec<RequestId> = self
            .requests
            .iter()
            .filter(|entry| &entry.value().session_id == session_id)
            .map(|entry| entry.key().clone())
            .collect();

        let mut cancelled = 0;
        for id in ids {
            if self.cancel_request(&id, reason).is_ok() {
                cancelled += 1;
            }
        }

        if cancelled > 0 {
            debug!(%session_id, cancelled, "cancelled pending requests for closed session");
        }
        cancelled
    }

    /// Current number of pending requests
    pub fn pending_count(&self) -> usize {
        self.requests.len()
    }

    /// Check whether a request is currently pending
    pub fn is_pending(&self, request_id: &RequestId) -> bool {
        self.requests.contains_key(request_id)
    }

    /// Expire every entry whose deadline has passed
    ///
    /// Called by the background sweeper; also callable directly from tests.
    pub fn cleanup_expired(&self) -> usize {
        let now = Utc::now();
        let expired: Vec<RequestId> = self
            .requests
            .iter()
            .filter(|entry| entry.value().is_expired_at(now))
            .map(|entry| entry.key().clone())
            .collect();

        let mut count = 0;
        for id in expired {
            if let Some((_, pending)) = self.requests.remove(&id) {
                let duration = pending.timeout().unwrap_or_else(TimeDelta::zero);
                warn!(request_id = %id, method = %pending.method, "expiring timed-out request");
                let _ = pending
                    .sender
                    .send(Err(CorrelationError::Timeout { id, duration }));
                count += 1;
            }
        }
        count
    }

    /// Shut the manager down: stop the sweeper and cancel everything pending
    pub async fn shutdown(&self) {
        self.shutdown_signal.store(true, Ordering::SeqCst);
        if let Some(handle) = self.cleanup_task.write().await.take() {
            handle.abort();
        }

        let ids: Vec<RequestId> = self.requests.iter().map(|e| e.key().clone()).collect();
        for id in ids {
            let _ = self.cancel_request(&id, "correlation manager shut down");
        }
    }

    fn spawn_sweeper(self: &Arc<Self>) -> Option<JoinHandle<()>> {
        let handle = tokio::runtime::Handle::try_current().ok()?;
        let requests = Arc::clone(&self.requests);
        let shutdown = Arc::clone(&self.shutdown_signal);
        let period = self.config.cleanup_interval;

        Some(handle.spawn(async move {
            let mut ticker = interval(period);
            loop {
                ticker.tick().await;
                if shutdown.load(Ordering::SeqCst) {
                    break;
                }
                let now = Utc::now();
                let expired: Vec<RequestId> = requests
                    .iter()
                    .filter(|entry| entry.value().is_expired_at(now))
                    .map(|entry| entry.key().clone())
                    .collect();
                for id in expired {
                    if let Some((_, pending)) = requests.remove(&id) {
                        let duration = pending.timeout().unwrap_or_else(TimeDelta::zero);
                        warn!(request_id = %id, "sweeper expired timed-out request");
                        let _ = pending
                            .sender
                            .send(Err(CorrelationError::Timeout { id, duration }));
                    }
                }
            }
        }))
    }
}
