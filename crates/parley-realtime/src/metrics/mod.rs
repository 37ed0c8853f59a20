//! Realtime engine metrics.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Engine-level counters and gauges.
///
/// Counters only grow. Gauges are overwritten by the coordinator after each
/// command, so readers see a consistent value without touching engine state.
#[derive(Debug, Default)]
pub struct EngineMetrics {
    /// Connections registered
    pub connections_total: AtomicU64,
    /// Connections replaced by a newer one for the same identity
    pub connections_superseded: AtomicU64,
    /// Reconnections inside the grace period
    pub reconnections: AtomicU64,
    /// Grace periods that ran out
    pub grace_expirations: AtomicU64,
    /// Chat requests accepted for processing
    pub requests_submitted: AtomicU64,
    /// Chat requests that opened a session
    pub requests_accepted: AtomicU64,
    /// Chat requests declined by the target
    pub requests_rejected: AtomicU64,
    /// Chat requests that timed out
    pub requests_expired: AtomicU64,
    /// Chat requests withdrawn by the requester
    pub requests_cancelled: AtomicU64,
    /// Sessions opened
    pub sessions_opened: AtomicU64,
    /// Sessions closed, any mode
    pub sessions_closed: AtomicU64,
    /// Messages relayed
    pub messages_relayed: AtomicU64,
    /// Outbound frames dropped on full queues
    pub notifications_dropped: AtomicU64,
    /// Errors reported back to clients
    pub errors_reported: AtomicU64,
    /// Gauge: registered connections
    pub connections_active: AtomicU64,
    /// Gauge: users not offline
    pub users_online: AtomicU64,
    /// Gauge: active sessions
    pub sessions_active: AtomicU64,
    /// Gauge: pending requests
    pub requests_pending: AtomicU64,
}

impl EngineMetrics {
    /// Create new zeroed metrics
    pub fn new() -> Self {
        Self::default()
    }

    /// Increment a counter.
    pub fn inc(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Add to a counter.
    pub fn add(counter: &AtomicU64, n: u64) {
        counter.fetch_add(n, Ordering::Relaxed);
    }

    /// Overwrite a gauge.
    pub fn set(gauge: &AtomicU64, value: usize) {
        gauge.store(value as u64, Ordering::Relaxed);
    }

    /// Get a snapshot of all metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        let load = |c: &AtomicU64| c.load(Ordering::Relaxed);
        MetricsSnapshot {
            connections_total: load(&self.connections_total),
            connections_superseded: load(&self.connections_superseded),
            reconnections: load(&self.reconnections),
            grace_expirations: load(&self.grace_expirations),
            requests_submitted: load(&self.requests_submitted),
            requests_accepted: load(&self.requests_accepted),
            requests_rejected: load(&self.requests_rejected),
            requests_expired: load(&self.requests_expired),
            requests_cancelled: load(&self.requests_cancelled),
            sessions_opened: load(&self.sessions_opened),
            sessions_closed: load(&self.sessions_closed),
            messages_relayed: load(&self.messages_relayed),
            notifications_dropped: load(&self.notifications_dropped),
            errors_reported: load(&self.errors_reported),
            connections_active: load(&self.connections_active),
            users_online: load(&self.users_online),
            sessions_active: load(&self.sessions_active),
            requests_pending: load(&self.requests_pending),
        }
    }
}

/// Serializable metrics snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    /// Connections registered
    pub connections_total: u64,
    /// Connections superseded
    pub connections_superseded: u64,
    /// Reconnections inside the grace period
    pub reconnections: u64,
    /// Grace periods that ran out
    pub grace_expirations: u64,
    /// Chat requests submitted
    pub requests_submitted: u64,
    /// Chat requests accepted
    pub requests_accepted: u64,
    /// Chat requests rejected
    pub requests_rejected: u64,
    /// Chat requests expired
    pub requests_expired: u64,
    /// Chat requests cancelled
    pub requests_cancelled: u64,
    /// Sessions opened
    pub sessions_opened: u64,
    /// Sessions closed
    pub sessions_closed: u64,
    /// Messages relayed
    pub messages_relayed: u64,
    /// Outbound frames dropped
    pub notifications_dropped: u64,
    /// Errors reported to clients
    pub errors_reported: u64,
    /// Currently registered connections
    pub connections_active: u64,
    /// Users not offline
    pub users_online: u64,
    /// Active sessions
    pub sessions_active: u64,
    /// Pending requests
    pub requests_pending: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_reflects_updates() {
        let metrics = EngineMetrics::new();
        EngineMetrics::inc(&metrics.sessions_opened);
        EngineMetrics::add(&metrics.messages_relayed, 3);
        EngineMetrics::set(&metrics.sessions_active, 1);

        let snap = metrics.snapshot();
        assert_eq!(snap.sessions_opened, 1);
        assert_eq!(snap.messages_relayed, 3);
        assert_eq!(snap.sessions_active, 1);
        assert_eq!(snap.requests_pending, 0);
    }
}
