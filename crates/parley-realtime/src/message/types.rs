//! Inbound and outbound WebSocket message type definitions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use parley_core::error::ErrorKind;
use parley_core::types::{ChatSessionId, Identity, RequestId};

use crate::chat::session::ChatMessage;
use crate::error::ChatError;
use crate::presence::status::PresenceState;
use crate::presence::tracker::UserPresence;

/// Events sent by the client to the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InboundMessage {
    /// Invite another user to chat.
    ChatRequest {
        /// Target identity.
        target: String,
    },
    /// Accept or reject a received invitation.
    ChatRequestResponse {
        /// Request being answered.
        request_id: RequestId,
        /// `true` to accept.
        accepted: bool,
    },
    /// Withdraw an invitation before it is answered.
    CancelRequest {
        /// Request being withdrawn.
        request_id: RequestId,
    },
    /// Send a chat message.
    SendMessage {
        /// Session to post into.
        session_id: ChatSessionId,
        /// Message body.
        text: String,
    },
    /// Close a session gracefully.
    CloseChat {
        /// Session to close.
        session_id: ChatSessionId,
    },
    /// Leave the current session, addressed by id or by peer.
    EndChat {
        /// Session id.
        #[serde(default)]
        session_id: Option<ChatSessionId>,
        /// Peer identity.
        #[serde(default)]
        peer: Option<String>,
    },
    /// Re-open the current session view, replaying its history.
    JoinChat {
        /// Session id.
        #[serde(default)]
        session_id: Option<ChatSessionId>,
        /// Peer identity.
        #[serde(default)]
        peer: Option<String>,
    },
    /// Ask for a full presence snapshot.
    ListPresence,
}

/// How an answered chat request ended, as seen by the requester.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestOutcome {
    /// Target accepted; a session was opened.
    Accepted,
    /// Target declined.
    Rejected,
    /// Nobody answered within the request window.
    Expired,
    /// Requester withdrew the request.
    Cancelled,
    /// Target entered another chat before the session could open.
    TargetBusy,
    /// Requester became unavailable before acceptance.
    RequesterGone,
    /// Target went offline.
    TargetOffline,
}

/// Why a target's pending offer was invalidated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WithdrawReason {
    /// Requester cancelled it.
    Cancelled,
    /// Requester entered another chat.
    RequesterBusy,
    /// Requester went offline.
    RequesterOffline,
}

/// Session close flavour, used only to pick the notification shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CloseMode {
    /// Explicit close by a participant.
    Graceful,
    /// Disconnect, supersession, or grace expiry.
    Forced,
}

/// Messages sent by the server to the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundMessage {
    /// Full presence list, sent once on connect and on `list_presence`.
    PresenceSnapshot {
        /// Every known user except the recipient.
        users: Vec<UserPresence>,
    },
    /// A single user's presence changed.
    PresenceDelta {
        /// Subject.
        identity: Identity,
        /// New state.
        state: PresenceState,
        /// When it changed.
        timestamp: DateTime<Utc>,
    },
    /// Acknowledges the requester's own invitation.
    RequestSubmitted {
        /// Request id.
        request_id: RequestId,
        /// Invited user.
        target: Identity,
        /// When the request expires.
        expires_at: DateTime<Utc>,
    },
    /// Invitation delivered to its target.
    RequestReceived {
        /// Request id.
        request_id: RequestId,
        /// Inviting user.
        requester: Identity,
        /// When it was created.
        created_at: DateTime<Utc>,
        /// When it expires.
        expires_at: DateTime<Utc>,
    },
    /// Final answer delivered to the requester.
    RequestResponse {
        /// Request id.
        request_id: RequestId,
        /// The invited user.
        peer: Identity,
        /// Outcome.
        outcome: RequestOutcome,
        /// Opened session, when accepted.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        session_id: Option<ChatSessionId>,
    },
    /// An offer the target holds is no longer valid.
    RequestWithdrawn {
        /// Request id.
        request_id: RequestId,
        /// Inviting user.
        requester: Identity,
        /// Why.
        reason: WithdrawReason,
    },
    /// Session is open; render it.
    SessionOpened {
        /// Session id.
        session_id: ChatSessionId,
        /// The other participant.
        peer: Identity,
        /// Messages so far (empty for a fresh session).
        history: Vec<ChatMessage>,
        /// When the session was created.
        opened_at: DateTime<Utc>,
    },
    /// A chat message from the peer.
    NewMessage {
        /// Session id.
        session_id: ChatSessionId,
        /// Author.
        sender: Identity,
        /// Body.
        text: String,
        /// When it was relayed.
        timestamp: DateTime<Utc>,
    },
    /// The peer's connection dropped; it may still come back.
    PeerDisconnected {
        /// Session id.
        session_id: ChatSessionId,
        /// The peer.
        peer: Identity,
    },
    /// The peer reconnected within the grace period.
    PeerReconnected {
        /// Session id.
        session_id: ChatSessionId,
        /// The peer.
        peer: Identity,
    },
    /// Session ended.
    SessionClosed {
        /// Session id.
        session_id: ChatSessionId,
        /// The other participant.
        peer: Identity,
        /// Graceful or forced.
        mode: CloseMode,
    },
    /// Structured failure report.
    Error {
        /// Error category.
        kind: ErrorKind,
        /// Stable machine code.
        code: String,
        /// Human-readable description.
        message: String,
    },
}

impl OutboundMessage {
    /// Builds the wire form of an engine error.
    pub fn error(err: &ChatError) -> Self {
        Self::Error {
            kind: err.kind(),
            code: err.code().to_string(),
            message: err.to_string(),
        }
    }

    /// Builds a `new_message` push from a stored message.
    pub fn new_message(message: &ChatMessage) -> Self {
        Self::NewMessage {
            session_id: message.session_id,
            sender: message.sender.clone(),
            text: message.text.clone(),
            timestamp: message.timestamp,
        }
    }

    /// Wire `type` tag, for logging.
    pub fn kind_str(&self) -> &'static str {
        match self {
            Self::PresenceSnapshot { .. } => "presence_snapshot",
            Self::PresenceDelta { .. } => "presence_delta",
            Self::RequestSubmitted { .. } => "request_submitted",
            Self::RequestReceived { .. } => "request_received",
            Self::RequestResponse { .. } => "request_response",
            Self::RequestWithdrawn { .. } => "request_withdrawn",
            Self::SessionOpened { .. } => "session_opened",
            Self::NewMessage { .. } => "new_message",
            Self::PeerDisconnected { .. } => "peer_disconnected",
            Self::PeerReconnected { .. } => "peer_reconnected",
            Self::SessionClosed { .. } => "session_closed",
            Self::Error { .. } => "error",
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_inbound_tags_are_snake_case() {
        let msg: InboundMessage =
            serde_json::from_value(json!({"type": "chat_request", "target": "bob"}))
                .expect("parse");
        assert_eq!(
            msg,
            InboundMessage::ChatRequest {
                target: "bob".into()
            }
        );

        let msg: InboundMessage =
            serde_json::from_value(json!({"type": "list_presence"})).expect("parse");
        assert_eq!(msg, InboundMessage::ListPresence);
    }

    #[test]
    fn test_end_chat_fields_are_optional() {
        let msg: InboundMessage =
            serde_json::from_value(json!({"type": "end_chat", "peer": "bob"})).expect("parse");
        assert_eq!(
            msg,
            InboundMessage::EndChat {
                session_id: None,
                peer: Some("bob".into())
            }
        );
    }

    #[test]
    fn test_error_message_shape() {
        let value =
            serde_json::to_value(OutboundMessage::error(&ChatError::RequesterBusy)).expect("json");
        assert_eq!(value["type"], "error");
        assert_eq!(value["kind"], "CONFLICT");
        assert_eq!(value["code"], "REQUESTER_BUSY");
        assert_eq!(value["message"], "you are already in a chat");
    }

    #[test]
    fn test_request_response_omits_missing_session() {
        let msg = OutboundMessage::RequestResponse {
            request_id: RequestId::new(),
            peer: Identity::parse("bob").expect("valid"),
            outcome: RequestOutcome::TargetBusy,
            session_id: None,
        };
        let value = serde_json::to_value(&msg).expect("json");
        assert_eq!(value["outcome"], "target_busy");
        assert!(value.get("session_id").is_none());
        assert_eq!(msg.kind_str(), "request_response");
    }
}
