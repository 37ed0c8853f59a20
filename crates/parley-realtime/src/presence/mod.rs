//! User presence tracking.

pub mod status;
pub mod tracker;

pub use status::PresenceState;
pub use tracker::{PresenceDelta, PresenceTracker, UserPresence};
