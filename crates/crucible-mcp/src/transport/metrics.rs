//! Per-session transport traffic metrics
//!
//! Counters are lock-free atomics updated on every frame; a snapshot is
//! taken for logging when the session closes.

// Layer 1: Standard library imports
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

// Layer 2: Third-party crate imports
use chrono::{DateTime, Utc};

/// Live traffic counters for one session
#[derive(Debug)]
pub struct TransportMetrics {
    /// Bytes written to the client
    bytes_sent: AtomicU64,
    /// Bytes received from the client
    bytes_received: AtomicU64,
    /// Frames written to the client
    messages_sent: AtomicU64,
    /// Frames received from the client
    messages_received: AtomicU64,
    /// Whether the session is still open
    active: AtomicBool,
    /// When the session was established
    connected_at: DateTime<Utc>,
}

impl TransportMetrics {
    /// Create counters for a freshly opened session
    pub fn new() -> Self {
        Self {
            bytes_sent: AtomicU64::new(0),
            bytes_received: AtomicU64::new(0),
            messages_sent: AtomicU64::new(0),
            messages_received: AtomicU64::new(0),
            active: AtomicBool::new(true),
            connected_at: Utc::now(),
        }
    }

    /// Record one outbound frame
    pub fn record_sent(&self, bytes: usize) {
        self.bytes_sent.fetch_add(bytes as u64, Ordering::Relaxed);
        self.messages_sent.fetch_add(1, Ordering::Relaxed);
    }

    /// Record one inbound frame
    pub fn record_received(&self, bytes: usize) {
        self.bytes_received
            .fetch_add(bytes as u64, Ordering::Relaxed);
        self.messages_received.fetch_add(1, Ordering::Relaxed);
    }

    /// Mark the session closed
    pub fn mark_closed(&self) {
        self.active.store(false, Ordering::Relaxed);
    }

    /// Whether the session is still open
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Relaxed)
    }

    /// Capture a point-in-time snapshot
    pub fn snapshot(&self) -> TransportMetricsSnapshot {
        TransportMetricsSnapshot {
            bytes_sent: self.bytes_sent.load(Ordering::Relaxed),
            bytes_received: self.bytes_received.load(Ordering::Relaxed),
            messages_sent: self.messages_sent.load(Ordering::Relaxed),
            messages_received: self.messages_received.load(Ordering::Relaxed),
            active: self.is_active(),
            uptime_seconds: (Utc::now() - self.connected_at).num_seconds().max(0) as u64,
        }
    }
}

impl Default for TransportMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time metrics snapshot, emitted when a session closes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportMetricsSnapshot {
    pub bytes_sent: u64,
    pub bytes_received: u64,
    pub messages_sent: u64,
    pub messages_received: u64,
    pub active: bool,
    pub uptime_seconds: u64,
}
