//! Chat request model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use parley_core::types::{Identity, RequestId};

/// Lifecycle state of a chat request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestState {
    /// Awaiting the target's answer.
    Pending,
    /// Target accepted.
    Accepted,
    /// Target declined, or the offer was answered on its behalf.
    Rejected,
    /// Nobody answered in time.
    Expired,
    /// Requester withdrew it.
    Cancelled,
}

/// An invitation from `requester` to `target`.
///
/// Only `Pending` requests live in the negotiator; a request leaves it in
/// the terminal state it was resolved with.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    /// Request id.
    pub id: RequestId,
    /// Inviting user.
    pub requester: Identity,
    /// Invited user.
    pub target: Identity,
    /// When it was created.
    pub created_at: DateTime<Utc>,
    /// When the timeout fires.
    pub expires_at: DateTime<Utc>,
    /// Current state.
    pub state: RequestState,
    timer: Option<CancellationToken>,
}

impl ChatRequest {
    pub(crate) fn new(
        requester: Identity,
        target: Identity,
        created_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: RequestId::new(),
            requester,
            target,
            created_at,
            expires_at,
            state: RequestState::Pending,
            timer: None,
        }
    }

    /// Whether the request is still awaiting an answer.
    pub fn is_pending(&self) -> bool {
        self.state == RequestState::Pending
    }

    pub(crate) fn arm(&mut self, timer: CancellationToken) {
        self.timer = Some(timer);
    }

    /// Moves to a terminal state and stops the timeout timer.
    pub(crate) fn finish(mut self, state: RequestState) -> Self {
        if let Some(timer) = self.timer.take() {
            timer.cancel();
        }
        self.state = state;
        self
    }
}
