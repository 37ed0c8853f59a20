//! Response DTOs.

use serde::{Deserialize, Serialize};

use parley_realtime::metrics::MetricsSnapshot;
use parley_realtime::presence::UserPresence;

/// Standard success response wrapper.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T: Serialize> {
    /// Whether the request was successful.
    pub success: bool,
    /// Response data.
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    /// Creates a successful response.
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// `ok` while the engine answers.
    pub status: String,
    /// Server version.
    pub version: String,
    /// Seconds since start.
    pub uptime_seconds: u64,
    /// Engine counters and gauges.
    pub engine: MetricsSnapshot,
}

/// Presence listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresenceResponse {
    /// Every known user except the caller.
    pub users: Vec<UserPresence>,
    /// How many of the listed users are online.
    pub online: usize,
}
