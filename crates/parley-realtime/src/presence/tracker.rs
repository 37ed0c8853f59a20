//! Presence tracker: owns each user's availability state machine.
//!
//! ```text
//!   (unknown) ─┐
//!              ├─ come_online ─> Idle ─ mark_busy ─> Busy
//!   Offline ───┘                  ^  <─ mark_idle ──┘
//!                                 └──── mark_offline (from Idle or Busy) ──> Offline
//! ```
//!
//! Every transition checks its source state. A transition requested from the
//! wrong state is rejected with [`ChatError::InvalidTransition`] and changes
//! nothing, so racing events cannot double-apply.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use parley_core::types::Identity;

use super::status::PresenceState;
use crate::error::ChatError;
use crate::message::types::OutboundMessage;

/// An accepted presence transition, ready to broadcast.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresenceDelta {
    /// Subject of the change.
    pub identity: Identity,
    /// State before the change (`None` for a first connection).
    pub from: Option<PresenceState>,
    /// State after the change.
    pub to: PresenceState,
    /// When the change was applied.
    pub at: DateTime<Utc>,
}

impl From<PresenceDelta> for OutboundMessage {
    fn from(delta: PresenceDelta) -> Self {
        OutboundMessage::PresenceDelta {
            identity: delta.identity,
            state: delta.to,
            timestamp: delta.at,
        }
    }
}

/// One row of a presence snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPresence {
    /// User identity.
    pub identity: Identity,
    /// Current state.
    pub state: PresenceState,
    /// When the user entered this state.
    pub since: DateTime<Utc>,
}

#[derive(Debug, Clone)]
struct PresenceEntry {
    state: PresenceState,
    since: DateTime<Utc>,
}

/// Tracks presence for every identity that has ever connected.
///
/// Offline users stay in the map so that a request to them reports
/// `TargetOffline` rather than `InvalidTarget`.
#[derive(Debug, Default)]
pub struct PresenceTracker {
    entries: BTreeMap<Identity, PresenceEntry>,
}

impl PresenceTracker {
    /// Create an empty tracker
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state, or `None` if the identity has never connected.
    pub fn state(&self, identity: &Identity) -> Option<PresenceState> {
        self.entries.get(identity).map(|e| e.state)
    }

    /// Whether the identity is currently `Idle`.
    pub fn is_idle(&self, identity: &Identity) -> bool {
        self.state(identity) == Some(PresenceState::Idle)
    }

    /// `Offline`/unknown → `Idle` on registration.
    pub fn come_online(&mut self, identity: &Identity) -> Result<PresenceDelta, ChatError> {
        match self.state(identity) {
            None | Some(PresenceState::Offline) => {
                Ok(self.apply(identity, PresenceState::Idle))
            }
            from => Err(Self::rejected(identity, from, PresenceState::Idle)),
        }
    }

    /// `Idle` → `Busy` on session creation.
    pub fn mark_busy(&mut self, identity: &Identity) -> Result<PresenceDelta, ChatError> {
        self.transition(identity, PresenceState::Idle, PresenceState::Busy)
    }

    /// `Busy` → `Idle` on session teardown.
    pub fn mark_idle(&mut self, identity: &Identity) -> Result<PresenceDelta, ChatError> {
        self.transition(identity, PresenceState::Busy, PresenceState::Idle)
    }

    /// `Idle`/`Busy` → `Offline` once the grace period has expired.
    pub fn mark_offline(&mut self, identity: &Identity) -> Result<PresenceDelta, ChatError> {
        match self.state(identity) {
            Some(PresenceState::Idle | PresenceState::Busy) => {
                Ok(self.apply(identity, PresenceState::Offline))
            }
            from => Err(Self::rejected(identity, from, PresenceState::Offline)),
        }
    }

    /// Full snapshot ordered by identity, optionally leaving out one user.
    pub fn snapshot(&self, except: Option<&Identity>) -> Vec<UserPresence> {
        self.entries
            .iter()
            .filter(|(identity, _)| Some(*identity) != except)
            .map(|(identity, entry)| UserPresence {
                identity: identity.clone(),
                state: entry.state,
                since: entry.since,
            })
            .collect()
    }

    /// Identities currently in the given state.
    pub fn with_state(&self, state: PresenceState) -> impl Iterator<Item = &Identity> {
        self.entries
            .iter()
            .filter(move |(_, entry)| entry.state == state)
            .map(|(identity, _)| identity)
    }

    /// Number of users not `Offline`.
    pub fn online_count(&self) -> usize {
        self.entries
            .values()
            .filter(|e| e.state.is_online())
            .count()
    }

    fn transition(
        &mut self,
        identity: &Identity,
        from: PresenceState,
        to: PresenceState,
    ) -> Result<PresenceDelta, ChatError> {
        match self.state(identity) {
            Some(current) if current == from => Ok(self.apply(identity, to)),
            current => Err(Self::rejected(identity, current, to)),
        }
    }

    fn apply(&mut self, identity: &Identity, to: PresenceState) -> PresenceDelta {
        let at = Utc::now();
        let previous = self
            .entries
            .insert(identity.clone(), PresenceEntry { state: to, since: at })
            .map(|e| e.state);

        tracing::debug!(identity = %identity, from = ?previous, to = %to, "Presence changed");

        PresenceDelta {
            identity: identity.clone(),
            from: previous,
            to,
            at,
        }
    }

    fn rejected(identity: &Identity, from: Option<PresenceState>, to: PresenceState) -> ChatError {
        tracing::debug!(identity = %identity, from = ?from, to = %to, "Presence transition rejected");
        ChatError::InvalidTransition {
            identity: identity.clone(),
            from,
            to,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(name: &str) -> Identity {
        Identity::parse(name).expect("valid identity")
    }

    #[test]
    fn test_full_lifecycle() {
        let mut tracker = PresenceTracker::new();
        let alice = id("alice");

        let delta = tracker.come_online(&alice).expect("online");
        assert_eq!(delta.from, None);
        assert_eq!(delta.to, PresenceState::Idle);

        tracker.mark_busy(&alice).expect("busy");
        assert_eq!(tracker.state(&alice), Some(PresenceState::Busy));

        tracker.mark_idle(&alice).expect("idle");
        let delta = tracker.mark_offline(&alice).expect("offline");
        assert_eq!(delta.from, Some(PresenceState::Idle));

        let delta = tracker.come_online(&alice).expect("back online");
        assert_eq!(delta.from, Some(PresenceState::Offline));
    }

    #[test]
    fn test_wrong_source_state_is_rejected_without_change() {
        let mut tracker = PresenceTracker::new();
        let bob = id("bob");

        assert!(matches!(
            tracker.mark_busy(&bob),
            Err(ChatError::InvalidTransition { from: None, .. })
        ));
        assert_eq!(tracker.state(&bob), None);

        tracker.come_online(&bob).expect("online");
        assert!(tracker.mark_idle(&bob).is_err());
        assert!(tracker.come_online(&bob).is_err());
        assert_eq!(tracker.state(&bob), Some(PresenceState::Idle));

        tracker.mark_offline(&bob).expect("offline");
        assert!(tracker.mark_busy(&bob).is_err());
        assert!(tracker.mark_offline(&bob).is_err());
        assert_eq!(tracker.state(&bob), Some(PresenceState::Offline));
    }

    #[test]
    fn test_busy_user_can_go_offline() {
        let mut tracker = PresenceTracker::new();
        let carol = id("carol");
        tracker.come_online(&carol).expect("online");
        tracker.mark_busy(&carol).expect("busy");

        let delta = tracker.mark_offline(&carol).expect("offline");
        assert_eq!(delta.from, Some(PresenceState::Busy));
    }

    #[test]
    fn test_snapshot_is_sorted_and_excludes_caller() {
        let mut tracker = PresenceTracker::new();
        for name in ["zed", "alice", "mia"] {
            tracker.come_online(&id(name)).expect("online");
        }

        let names: Vec<String> = tracker
            .snapshot(Some(&id("mia")))
            .into_iter()
            .map(|p| p.identity.to_string())
            .collect();
        assert_eq!(names, vec!["alice", "zed"]);
        assert_eq!(tracker.online_count(), 3);
    }

    #[test]
    fn test_delta_converts_to_wire_message() {
        let mut tracker = PresenceTracker::new();
        let delta = tracker.come_online(&id("dan")).expect("online");
        match OutboundMessage::from(delta) {
            OutboundMessage::PresenceDelta { identity, state, .. } => {
                assert_eq!(identity.as_str(), "dan");
                assert_eq!(state, PresenceState::Idle);
            }
            other => panic!("unexpected message: {other:?}"),
        }
    }
}
