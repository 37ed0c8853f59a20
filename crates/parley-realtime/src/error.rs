//! Engine error taxonomy.
//!
//! Every failure the engine reports is a [`ChatError`]. Each variant belongs
//! to exactly one [`ErrorKind`] category and carries a stable machine code so
//! clients can branch on it.

use thiserror::Error;

use parley_core::error::{AppError, ErrorKind};
use parley_core::types::{ChatSessionId, Identity, RequestId};

use crate::presence::status::PresenceState;

/// Failures produced by the presence and chat engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChatError {
    /// Target is unknown or equals the requester.
    #[error("invalid chat target: {0}")]
    InvalidTarget(String),
    /// Target is already in a chat.
    #[error("{0} is already in a chat")]
    TargetBusy(Identity),
    /// Target has no live connection.
    #[error("{0} is offline")]
    TargetOffline(Identity),
    /// Requester is not idle.
    #[error("you are already in a chat")]
    RequesterBusy,
    /// A request for this ordered pair is already pending.
    #[error("a chat request to {0} is already pending")]
    DuplicateRequest(Identity),
    /// Request was already resolved, expired, or cancelled.
    #[error("chat request {0} is no longer pending")]
    StaleRequest(RequestId),
    /// Only the target may resolve a request.
    #[error("only the target of request {0} may respond to it")]
    NotRequestTarget(RequestId),
    /// Only the requester may cancel a request.
    #[error("only the requester may cancel request {0}")]
    NotRequester(RequestId),
    /// Requester left or became busy before the request was accepted.
    #[error("{0} is no longer available")]
    RequesterGone(Identity),
    /// A participant stopped being idle between check and commit.
    #[error("{0} is already bound to a chat")]
    ConflictingSession(Identity),
    /// Sender is not one of the two bound participants.
    #[error("not a participant in chat {0}")]
    NotParticipant(ChatSessionId),
    /// Session is closing, closed, or unknown.
    #[error("chat {0} is not active")]
    SessionNotActive(ChatSessionId),
    /// Caller is not in a chat (with the given peer).
    #[error("no active chat{}", .0.as_ref().map(|p| format!(" with {p}")).unwrap_or_default())]
    NoActiveSession(Option<Identity>),
    /// Presence transition requested from the wrong source state.
    #[error("cannot move {identity} from {} to {to}", .from.map(|s| s.to_string()).unwrap_or_else(|| "unknown".to_string()))]
    InvalidTransition {
        /// Subject of the transition.
        identity: Identity,
        /// Current state, if the user is known.
        from: Option<PresenceState>,
        /// Requested state.
        to: PresenceState,
    },
    /// Malformed or oversized event.
    #[error("invalid message: {0}")]
    InvalidMessage(String),
    /// Event arrived on a connection that has been superseded.
    #[error("this connection has been replaced by a newer one")]
    StaleConnection,
    /// The request window cannot be represented as an expiry timestamp.
    #[error("request timeout of {0:?} is out of range")]
    TimeoutOutOfRange(std::time::Duration),
    /// Coordinator task is gone.
    #[error("chat engine is unavailable")]
    EngineUnavailable,
}

impl ChatError {
    /// Error category per the engine taxonomy.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidTarget(_)
            | Self::NotRequestTarget(_)
            | Self::NotRequester(_)
            | Self::NotParticipant(_)
            | Self::InvalidMessage(_) => ErrorKind::Validation,
            Self::TargetBusy(_)
            | Self::TargetOffline(_)
            | Self::RequesterBusy
            | Self::DuplicateRequest(_)
            | Self::RequesterGone(_)
            | Self::ConflictingSession(_)
            | Self::InvalidTransition { .. } => ErrorKind::Conflict,
            Self::StaleRequest(_)
            | Self::SessionNotActive(_)
            | Self::NoActiveSession(_)
            | Self::StaleConnection => ErrorKind::StaleReference,
            Self::TimeoutOutOfRange(_) => ErrorKind::Configuration,
            Self::EngineUnavailable => ErrorKind::ServiceUnavailable,
        }
    }

    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidTarget(_) => "INVALID_TARGET",
            Self::TargetBusy(_) => "TARGET_BUSY",
            Self::TargetOffline(_) => "TARGET_OFFLINE",
            Self::RequesterBusy => "REQUESTER_BUSY",
            Self::DuplicateRequest(_) => "DUPLICATE_REQUEST",
            Self::StaleRequest(_) => "STALE_REQUEST",
            Self::NotRequestTarget(_) => "NOT_REQUEST_TARGET",
            Self::NotRequester(_) => "NOT_REQUESTER",
            Self::RequesterGone(_) => "REQUESTER_GONE",
            Self::ConflictingSession(_) => "CONFLICTING_SESSION",
            Self::NotParticipant(_) => "NOT_PARTICIPANT",
            Self::SessionNotActive(_) => "SESSION_NOT_ACTIVE",
            Self::NoActiveSession(_) => "NO_ACTIVE_SESSION",
            Self::InvalidTransition { .. } => "INVALID_TRANSITION",
            Self::InvalidMessage(_) => "INVALID_MESSAGE",
            Self::StaleConnection => "STALE_CONNECTION",
            Self::TimeoutOutOfRange(_) => "TIMEOUT_OUT_OF_RANGE",
            Self::EngineUnavailable => "ENGINE_UNAVAILABLE",
        }
    }
}

impl From<ChatError> for AppError {
    fn from(err: ChatError) -> Self {
        AppError::new(err.kind(), err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_categories_follow_taxonomy() {
        let alice = Identity::parse("alice").expect("valid");
        assert_eq!(
            ChatError::InvalidTarget("alice".into()).kind(),
            ErrorKind::Validation
        );
        assert_eq!(ChatError::TargetBusy(alice.clone()).kind(), ErrorKind::Conflict);
        assert_eq!(
            ChatError::StaleRequest(RequestId::new()).kind(),
            ErrorKind::StaleReference
        );
        assert_eq!(
            ChatError::SessionNotActive(ChatSessionId::new()).kind(),
            ErrorKind::StaleReference
        );
    }

    #[test]
    fn test_display_messages() {
        let bob = Identity::parse("bob").expect("valid");
        assert_eq!(
            ChatError::NoActiveSession(Some(bob.clone())).to_string(),
            "no active chat with bob"
        );
        assert_eq!(ChatError::NoActiveSession(None).to_string(), "no active chat");
        let err = ChatError::InvalidTransition {
            identity: bob,
            from: Some(PresenceState::Offline),
            to: PresenceState::Busy,
        };
        assert_eq!(err.to_string(), "cannot move bob from offline to busy");
    }

    #[test]
    fn test_into_app_error_keeps_kind() {
        let app: AppError = ChatError::RequesterBusy.into();
        assert_eq!(app.kind, ErrorKind::Conflict);
        assert_eq!(app.message, "you are already in a chat");
    }
}
