/// WebSocket hub metrics
///
/// Lifetime counters for the hub, exposed through the status routes.
use serde::Serialize;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

#[derive(Debug, Default)]
pub struct HubMetrics {
    /// Total connections (lifetime)
    total_connections: AtomicU64,

    /// Current open connections
    active_connections: AtomicUsize,

    /// Inbound text/binary frames
    messages_received: AtomicU64,

    /// Inbound frames that were not valid JSON
    parse_failures: AtomicU64,

    /// ECHO replies written
    echoes_sent: AtomicU64,

    /// Waiters resolved by inbound frames
    replies_matched: AtomicU64,
}

impl HubMetrics {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn connection_opened(&self) {
        self.total_connections.fetch_add(1, Ordering::Relaxed);
        self.active_connections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn connection_closed(&self) {
        let _ = self
            .active_connections
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| n.checked_sub(1));
    }

    pub fn message_received(&self) {
        self.messages_received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn parse_failure(&self) {
        self.parse_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn echo_sent(&self) {
        self.echoes_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub fn replies_matched(&self, count: usize) {
        self.replies_matched.fetch_add(count as u64, Ordering::Relaxed);
    }

    /// Zero every counter
    pub fn reset(&self) {
        self.total_connections.store(0, Ordering::Relaxed);
        self.active_connections.store(0, Ordering::Relaxed);
        self.messages_received.store(0, Ordering::Relaxed);
        self.parse_failures.store(0, Ordering::Relaxed);
        self.echoes_sent.store(0, Ordering::Relaxed);
        self.replies_matched.store(0, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> HubMetricsSnapshot {
        HubMetricsSnapshot {
            total_connections: self.total_connections.load(Ordering::Relaxed),
            active_connections: self.active_connections.load(Ordering::Relaxed),
            messages_received: self.messages_received.load(Ordering::Relaxed),
            parse_failures: self.parse_failures.load(Ordering::Relaxed),
            echoes_sent: self.echoes_sent.load(Ordering::Relaxed),
            replies_matched: self.replies_matched.load(Ordering::Relaxed),
        }
    }
}

/// Hub metrics snapshot
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HubMetricsSnapshot {
    pub total_connections: u64,
    pub active_connections: usize,
    pub messages_received: u64,
    pub parse_failures: u64,
    pub echoes_sent: u64,
    pub replies_matched: u64,
}
