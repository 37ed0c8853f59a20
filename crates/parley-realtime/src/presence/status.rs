//! Presence state definitions.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A user's availability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PresenceState {
    /// Connected and not in a chat.
    Idle,
    /// Connected and bound to exactly one chat session.
    Busy,
    /// No live connection, or the reconnection grace period ran out.
    Offline,
}

impl PresenceState {
    /// Converts to the wire string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Busy => "busy",
            Self::Offline => "offline",
        }
    }

    /// Whether a user in this state has a live (or grace-protected) connection.
    pub fn is_online(&self) -> bool {
        !matches!(self, Self::Offline)
    }
}

impl fmt::Display for PresenceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
