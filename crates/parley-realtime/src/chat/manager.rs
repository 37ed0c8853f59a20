//! Session manager: creates, relays through, and tears down chat sessions.
//!
//! Keeps the one-session-per-user invariant: an identity appears in
//! `by_user` iff it is a participant of exactly one stored session, and the
//! presence tracker shows it `Busy` exactly then.

use std::collections::HashMap;

use parley_core::types::{ChatSessionId, Identity};

use super::session::{ChatMessage, ChatSession, SessionState};
use crate::error::ChatError;
use crate::message::types::CloseMode;
use crate::presence::status::PresenceState;
use crate::presence::tracker::{PresenceDelta, PresenceTracker};

/// A session that has just been torn down.
#[derive(Debug, Clone)]
pub struct ClosedSession {
    /// The session, in state `Closed`.
    pub session: ChatSession,
    /// Who (or whose disconnect) closed it.
    pub initiator: Identity,
    /// Graceful or forced.
    pub mode: CloseMode,
    /// Presence changes applied to the participants.
    pub deltas: Vec<PresenceDelta>,
}

impl ClosedSession {
    /// The participant that did not initiate the close.
    pub fn remaining(&self) -> Option<&Identity> {
        self.session.peer_of(&self.initiator)
    }
}

/// Owns every active session.
#[derive(Debug)]
pub struct SessionManager {
    sessions: HashMap<ChatSessionId, ChatSession>,
    by_user: HashMap<Identity, ChatSessionId>,
    history_limit: usize,
}

impl SessionManager {
    /// Create an empty manager keeping at most `history_limit` messages per session.
    pub fn new(history_limit: usize) -> Self {
        Self {
            sessions: HashMap::new(),
            by_user: HashMap::new(),
            history_limit,
        }
    }

    /// Open a session between two idle users and mark both `Busy`.
    ///
    /// All-or-nothing: if either user is not idle, nothing changes.
    pub fn create(
        &mut self,
        a: &Identity,
        b: &Identity,
        presence: &mut PresenceTracker,
    ) -> Result<(ChatSessionId, Vec<PresenceDelta>), ChatError> {
        if a == b {
            return Err(ChatError::InvalidTarget(a.to_string()));
        }
        for identity in [a, b] {
            if !presence.is_idle(identity) || self.by_user.contains_key(identity) {
                return Err(ChatError::ConflictingSession(identity.clone()));
            }
        }

        let first = presence.mark_busy(a)?;
        let second = match presence.mark_busy(b) {
            Ok(delta) => delta,
            Err(err) => {
                if let Err(rollback) = presence.mark_idle(a) {
                    tracing::error!(identity = %a, error = %rollback, "Session rollback failed");
                }
                return Err(err);
            }
        };

        let session = ChatSession::new(a.clone(), b.clone());
        let id = session.id;
        self.by_user.insert(a.clone(), id);
        self.by_user.insert(b.clone(), id);
        self.sessions.insert(id, session);

        tracing::info!(session_id = %id, a = %a, b = %b, "Chat session opened");
        Ok((id, vec![first, second]))
    }

    /// Append a message and return it with the identity to forward it to.
    pub fn relay(
        &mut self,
        id: ChatSessionId,
        sender: &Identity,
        text: String,
    ) -> Result<(ChatMessage, Identity), ChatError> {
        let session = self
            .sessions
            .get_mut(&id)
            .ok_or(ChatError::SessionNotActive(id))?;
        let peer = session
            .peer_of(sender)
            .cloned()
            .ok_or(ChatError::NotParticipant(id))?;
        if !session.is_active() {
            return Err(ChatError::SessionNotActive(id));
        }

        let message = session.append(sender.clone(), text, self.history_limit);
        Ok((message, peer))
    }

    /// Tear a session down and return both participants to `Idle`.
    ///
    /// A participant that is no longer `Busy` (already offline) is released
    /// without a presence change.
    pub fn close(
        &mut self,
        id: ChatSessionId,
        initiator: &Identity,
        mode: CloseMode,
        presence: &mut PresenceTracker,
    ) -> Result<ClosedSession, ChatError> {
        let session = self
            .sessions
            .get_mut(&id)
            .ok_or(ChatError::SessionNotActive(id))?;
        if !session.is_participant(initiator) {
            return Err(ChatError::NotParticipant(id));
        }
        if !session.is_active() {
            return Err(ChatError::SessionNotActive(id));
        }
        session.state = SessionState::Closing;

        let Some(mut session) = self.sessions.remove(&id) else {
            return Err(ChatError::SessionNotActive(id));
        };
        let mut deltas = Vec::with_capacity(2);
        for participant in &session.participants {
            self.by_user.remove(participant);
            if presence.state(participant) == Some(PresenceState::Busy) {
                deltas.push(presence.mark_idle(participant)?);
            }
        }
        session.state = SessionState::Closed;

        tracing::info!(
            session_id = %id,
            initiator = %initiator,
            mode = ?mode,
            messages = session.messages.len(),
            "Chat session closed"
        );

        Ok(ClosedSession {
            session,
            initiator: initiator.clone(),
            mode,
            deltas,
        })
    }

    /// Force-close whatever session `identity` is bound to.
    pub fn teardown_all(
        &mut self,
        identity: &Identity,
        presence: &mut PresenceTracker,
    ) -> Vec<ClosedSession> {
        let Some(id) = self.by_user.get(identity).copied() else {
            return Vec::new();
        };
        match self.close(id, identity, CloseMode::Forced, presence) {
            Ok(closed) => vec![closed],
            Err(err) => {
                tracing::error!(identity = %identity, session_id = %id, error = %err, "Teardown failed");
                Vec::new()
            }
        }
    }

    /// Find the caller's session by id, by peer, or (with neither) the
    /// caller's current one.
    pub fn locate(
        &self,
        caller: &Identity,
        session_id: Option<ChatSessionId>,
        peer: Option<&Identity>,
    ) -> Result<&ChatSession, ChatError> {
        if let Some(id) = session_id {
            let session = self.sessions.get(&id).ok_or(ChatError::SessionNotActive(id))?;
            if !session.is_participant(caller) {
                return Err(ChatError::NotParticipant(id));
            }
            return Ok(session);
        }

        let session = self
            .session_of(caller)
            .ok_or_else(|| ChatError::NoActiveSession(peer.cloned()))?;
        match peer {
            Some(peer) if session.peer_of(caller) != Some(peer) => {
                Err(ChatError::NoActiveSession(Some(peer.clone())))
            }
            _ => Ok(session),
        }
    }

    /// The session `identity` is bound to.
    pub fn session_of(&self, identity: &Identity) -> Option<&ChatSession> {
        self.by_user
            .get(identity)
            .and_then(|id| self.sessions.get(id))
    }

    /// Look up a session by id.
    pub fn get(&self, id: ChatSessionId) -> Option<&ChatSession> {
        self.sessions.get(&id)
    }

    /// Every stored session.
    pub fn iter(&self) -> impl Iterator<Item = &ChatSession> {
        self.sessions.values()
    }

    /// Identity → session bindings.
    pub fn bindings(&self) -> impl Iterator<Item = (&Identity, &ChatSessionId)> {
        self.by_user.iter()
    }

    /// Number of active sessions.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Whether no sessions exist.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
