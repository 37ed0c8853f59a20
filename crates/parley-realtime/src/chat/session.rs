//! Chat session and message models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use parley_core::types::{ChatSessionId, Identity};

/// Lifecycle of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// Accepting messages.
    Active,
    /// Teardown in progress.
    Closing,
    /// Torn down; participants released.
    Closed,
}

/// An immutable chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Owning session.
    pub session_id: ChatSessionId,
    /// Author.
    pub sender: Identity,
    /// Body.
    pub text: String,
    /// When it was accepted.
    pub timestamp: DateTime<Utc>,
}

/// A conversation between exactly two distinct users.
#[derive(Debug, Clone)]
pub struct ChatSession {
    /// Session id.
    pub id: ChatSessionId,
    /// The two participants, in canonical order.
    pub participants: [Identity; 2],
    /// History, oldest first, capped at the manager's limit. Kept in memory
    /// only for replay.
    pub messages: Vec<ChatMessage>,
    /// When the session opened.
    pub created_at: DateTime<Utc>,
    /// Current state.
    pub state: SessionState,
}

impl ChatSession {
    pub(crate) fn new(a: Identity, b: Identity) -> Self {
        let participants = if a <= b { [a, b] } else { [b, a] };
        Self {
            id: ChatSessionId::new(),
            participants,
            messages: Vec::new(),
            created_at: Utc::now(),
            state: SessionState::Active,
        }
    }

    /// Whether `identity` is bound to this session.
    pub fn is_participant(&self, identity: &Identity) -> bool {
        self.participants.contains(identity)
    }

    /// The other participant.
    pub fn peer_of(&self, identity: &Identity) -> Option<&Identity> {
        match &self.participants {
            [a, b] if a == identity => Some(b),
            [a, b] if b == identity => Some(a),
            _ => None,
        }
    }

    /// Whether messages are accepted.
    pub fn is_active(&self) -> bool {
        self.state == SessionState::Active
    }

    /// Record a message, dropping the oldest ones beyond `limit`.
    pub(crate) fn append(&mut self, sender: Identity, text: String, limit: usize) -> ChatMessage {
        let message = ChatMessage {
            session_id: self.id,
            sender,
            text,
            timestamp: Utc::now(),
        };
        self.messages.push(message.clone());
        let excess = self.messages.len().saturating_sub(limit.max(1));
        if excess > 0 {
            self.messages.drain(..excess);
        }
        message
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_peer_lookup() {
        let alice = Identity::parse("alice").expect("valid");
        let bob = Identity::parse("bob").expect("valid");
        let session = ChatSession::new(bob.clone(), alice.clone());

        assert_eq!(session.participants, [alice.clone(), bob.clone()]);
        assert_eq!(session.peer_of(&alice), Some(&bob));
        assert_eq!(session.peer_of(&bob), Some(&alice));
        assert_eq!(session.peer_of(&Identity::parse("eve").expect("valid")), None);
    }

    #[test]
    fn test_history_drops_oldest_beyond_limit() {
        let alice = Identity::parse("alice").expect("valid");
        let bob = Identity::parse("bob").expect("valid");
        let mut session = ChatSession::new(alice.clone(), bob);

        for n in 0..5 {
            session.append(alice.clone(), format!("m{n}"), 3);
        }
        let texts: Vec<&str> = session.messages.iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, ["m2", "m3", "m4"]);
    }
}
