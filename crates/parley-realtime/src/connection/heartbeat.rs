//! Ping/pong heartbeat for WebSocket keepalive.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{self, Instant, MissedTickBehavior};

use parley_core::config::RealtimeConfig;

use super::handle::ConnectionHandle;

/// Shortest ping period the loop will run at.
const MIN_PING_INTERVAL: Duration = Duration::from_secs(1);

/// Heartbeat configuration
#[derive(Debug, Clone, Copy)]
pub struct HeartbeatConfig {
    /// Interval between pings
    pub ping_interval: Duration,
    /// Silence after which the connection is considered dead
    pub ping_timeout: Duration,
}

impl From<&RealtimeConfig> for HeartbeatConfig {
    fn from(config: &RealtimeConfig) -> Self {
        Self {
            ping_interval: config.ping_interval(),
            ping_timeout: config.ping_timeout(),
        }
    }
}

/// Run heartbeat loop for a connection.
///
/// Sends periodic pings and marks the connection dead once no pong has
/// arrived within the timeout. The connection's reader sees that and runs
/// the normal disconnect path.
pub async fn run_heartbeat(handle: Arc<ConnectionHandle>, config: HeartbeatConfig) {
    let period = config.ping_interval.max(MIN_PING_INTERVAL);
    let mut interval = time::interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = handle.closed() => break,
            _ = interval.tick() => {}
        }

        let elapsed = handle.last_pong.read().await.elapsed();
        if elapsed > config.ping_timeout {
            tracing::warn!(
                conn_id = %handle.id,
                identity = %handle.identity,
                silent_for = ?elapsed,
                "Connection heartbeat timeout"
            );
            handle.mark_dead();
            break;
        }

        if !handle.ping() && !handle.is_alive() {
            break;
        }
    }

    tracing::debug!(conn_id = %handle.id, "Heartbeat loop ended");
}
