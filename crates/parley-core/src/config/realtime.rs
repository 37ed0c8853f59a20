//! Presence and chat engine configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::result::AppResult;

/// Upper bound for any timer setting, in seconds (one week).
pub const MAX_TIMER_SECONDS: u64 = 7 * 24 * 60 * 60;

/// Real-time (WebSocket) engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RealtimeConfig {
    /// Seconds a lost connection may stay away before the user is marked offline.
    #[serde(default = "default_grace_period")]
    pub grace_period_seconds: u64,
    /// Seconds a chat request stays pending before it expires.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
    /// Per-connection outbound queue size; notifications beyond it are dropped.
    #[serde(default = "default_outbound_buffer")]
    pub outbound_buffer_size: usize,
    /// Capacity of the coordinator command queue.
    #[serde(default = "default_command_buffer")]
    pub command_buffer_size: usize,
    /// Maximum chat message length in characters.
    #[serde(default = "default_max_message_length")]
    pub max_message_length: usize,
    /// Messages kept per session for replay; older ones are dropped.
    #[serde(default = "default_max_history_messages")]
    pub max_history_messages: usize,
    /// Maximum raw inbound frame size in bytes.
    #[serde(default = "default_max_frame_bytes")]
    pub max_frame_bytes: usize,
    /// WebSocket ping interval in seconds.
    #[serde(default = "default_ping_interval")]
    pub ping_interval_seconds: u64,
    /// Seconds without a pong before the connection is considered dead.
    #[serde(default = "default_ping_timeout")]
    pub ping_timeout_seconds: u64,
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            grace_period_seconds: default_grace_period(),
            request_timeout_seconds: default_request_timeout(),
            outbound_buffer_size: default_outbound_buffer(),
            command_buffer_size: default_command_buffer(),
            max_message_length: default_max_message_length(),
            max_history_messages: default_max_history_messages(),
            max_frame_bytes: default_max_frame_bytes(),
            ping_interval_seconds: default_ping_interval(),
            ping_timeout_seconds: default_ping_timeout(),
        }
    }
}

impl RealtimeConfig {
    /// Reject settings the engine cannot run with.
    pub fn validate(&self) -> AppResult<()> {
        let bounded = [
            ("grace_period_seconds", self.grace_period_seconds),
            ("request_timeout_seconds", self.request_timeout_seconds),
            ("ping_interval_seconds", self.ping_interval_seconds),
            ("ping_timeout_seconds", self.ping_timeout_seconds),
        ];
        for (name, value) in bounded {
            if value > MAX_TIMER_SECONDS {
                return Err(AppError::configuration(format!(
                    "realtime.{name} = {value} exceeds the maximum of {MAX_TIMER_SECONDS}"
                )));
            }
        }

        if self.request_timeout_seconds == 0 {
            return Err(AppError::configuration(
                "realtime.request_timeout_seconds must be greater than zero",
            ));
        }
        if self.max_history_messages == 0 {
            return Err(AppError::configuration(
                "realtime.max_history_messages must be greater than zero",
            ));
        }
        if self.ping_interval_seconds == 0 {
            return Err(AppError::configuration(
                "realtime.ping_interval_seconds must be greater than zero",
            ));
        }
        if self.ping_timeout_seconds < self.ping_interval_seconds {
            return Err(AppError::configuration(format!(
                "realtime.ping_timeout_seconds ({}) must be at least ping_interval_seconds ({})",
                self.ping_timeout_seconds, self.ping_interval_seconds
            )));
        }
        Ok(())
    }

    /// Reconnection grace period.
    pub fn grace_period(&self) -> Duration {
        Duration::from_secs(self.grace_period_seconds)
    }

    /// Pending chat request window.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }

    /// Interval between keepalive pings.
    pub fn ping_interval(&self) -> Duration {
        Duration::from_secs(self.ping_interval_seconds)
    }

    /// Maximum silence before a connection is treated as lost.
    pub fn ping_timeout(&self) -> Duration {
        Duration::from_secs(self.ping_timeout_seconds)
    }
}

fn default_grace_period() -> u64 {
    12
}

fn default_request_timeout() -> u64 {
    30
}

fn default_outbound_buffer() -> usize {
    256
}

fn default_command_buffer() -> usize {
    1024
}

fn default_max_message_length() -> usize {
    2000
}

fn default_max_history_messages() -> usize {
    200
}

fn default_max_frame_bytes() -> usize {
    65_536
}

fn default_ping_interval() -> u64 {
    25
}

fn default_ping_timeout() -> u64 {
    60
}
