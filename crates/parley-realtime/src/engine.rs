//! The realtime engine: a cloneable front door to the coordinator task.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};

use parley_core::config::RealtimeConfig;
use parley_core::error::ErrorKind;
use parley_core::types::{ChatSessionId, Identity, RequestId};

use crate::chat::ChatMessage;
use crate::connection::{ConnectionFrame, ConnectionHandle};
use crate::coordinator::{self, AuditReport, Caller, Command, ConnectOutcome, SessionRef};
use crate::error::ChatError;
use crate::message::serializer::parse_frame;
use crate::message::types::{InboundMessage, OutboundMessage};
use crate::metrics::{EngineMetrics, MetricsSnapshot};
use crate::presence::status::PresenceState;
use crate::presence::tracker::UserPresence;
use crate::request::ChatRequest;

/// Handle to the running presence and chat engine.
///
/// Cheap to clone. The coordinator stops after [`RealtimeEngine::shutdown`]
/// or once every clone has been dropped.
#[derive(Debug, Clone)]
pub struct RealtimeEngine {
    commands: mpsc::Sender<Command>,
    config: Arc<RealtimeConfig>,
    metrics: Arc<EngineMetrics>,
}

impl RealtimeEngine {
    /// Start the engine. Must be called from within a Tokio runtime.
    pub fn new(config: RealtimeConfig) -> Self {
        let metrics = Arc::new(EngineMetrics::new());
        let commands = coordinator::spawn(&config, metrics.clone());
        Self {
            commands,
            config: Arc::new(config),
            metrics,
        }
    }

    /// Engine configuration.
    pub fn config(&self) -> &RealtimeConfig {
        &self.config
    }

    /// Current metrics.
    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Create a connection handle sized by the configured outbound buffer.
    /// The receiver feeds the connection's writer task.
    pub fn open_connection(
        &self,
        identity: Identity,
    ) -> (Arc<ConnectionHandle>, mpsc::Receiver<ConnectionFrame>) {
        ConnectionHandle::new(identity, self.config.outbound_buffer_size)
    }

    /// Register a connection; supersedes any previous one for its identity.
    pub async fn connect(&self, handle: &Arc<ConnectionHandle>) -> Result<ConnectOutcome, ChatError> {
        let handle = handle.clone();
        self.call(|reply| Command::Connect { handle, reply }).await
    }

    /// Report that a connection's transport closed.
    pub async fn disconnect(&self, handle: &ConnectionHandle) {
        let caller = Caller::of(handle);
        if self.commands.send(Command::Disconnect { caller }).await.is_err() {
            tracing::debug!(conn_id = %handle.id, "Engine stopped before disconnect was processed");
        }
    }

    /// Invite `target` to chat.
    pub async fn submit_request(
        &self,
        handle: &ConnectionHandle,
        target: &str,
    ) -> Result<ChatRequest, ChatError> {
        let caller = Caller::of(handle);
        let target = target.to_string();
        self.call(|reply| Command::SubmitRequest {
            caller,
            target,
            reply,
        })
        .await?
    }

    /// Accept or reject a received invitation. Returns the opened session
    /// when accepted.
    pub async fn respond_request(
        &self,
        handle: &ConnectionHandle,
        request_id: RequestId,
        accepted: bool,
    ) -> Result<Option<ChatSessionId>, ChatError> {
        let caller = Caller::of(handle);
        self.call(|reply| Command::RespondRequest {
            caller,
            request_id,
            accepted,
            reply,
        })
        .await?
    }

    /// Withdraw an invitation.
    pub async fn cancel_request(
        &self,
        handle: &ConnectionHandle,
        request_id: RequestId,
    ) -> Result<(), ChatError> {
        let caller = Caller::of(handle);
        self.call(|reply| Command::CancelRequest {
            caller,
            request_id,
            reply,
        })
        .await?
    }

    /// Post a message into a session.
    pub async fn send_message(
        &self,
        handle: &ConnectionHandle,
        session_id: ChatSessionId,
        text: impl Into<String>,
    ) -> Result<ChatMessage, ChatError> {
        let caller = Caller::of(handle);
        let text = text.into();
        self.call(|reply| Command::SendMessage {
            caller,
            session_id,
            text,
            reply,
        })
        .await?
    }

    /// Close a session gracefully.
    pub async fn close_chat(
        &self,
        handle: &ConnectionHandle,
        session_id: ChatSessionId,
    ) -> Result<(), ChatError> {
        let caller = Caller::of(handle);
        self.call(|reply| Command::CloseChat {
            caller,
            session_id,
            reply,
        })
        .await?
    }

    /// Close the caller's session, found by id or peer.
    pub async fn end_chat(
        &self,
        handle: &ConnectionHandle,
        target: SessionRef,
    ) -> Result<ChatSessionId, ChatError> {
        let caller = Caller::of(handle);
        self.call(|reply| Command::EndChat {
            caller,
            target,
            reply,
        })
        .await?
    }

    /// Replay the caller's session (history included) to its connection.
    pub async fn join_chat(
        &self,
        handle: &ConnectionHandle,
        target: SessionRef,
    ) -> Result<ChatSessionId, ChatError> {
        let caller = Caller::of(handle);
        self.call(|reply| Command::JoinChat {
            caller,
            target,
            reply,
        })
        .await?
    }

    /// Presence of every known user, optionally excluding one.
    pub async fn presence_snapshot(
        &self,
        except: Option<&Identity>,
    ) -> Result<Vec<UserPresence>, ChatError> {
        let except = except.cloned();
        self.call(|reply| Command::PresenceSnapshot { except, reply })
            .await
    }

    /// Presence of one user; `None` if never seen.
    pub async fn presence_of(&self, identity: &Identity) -> Result<Option<PresenceState>, ChatError> {
        let identity = identity.clone();
        self.call(|reply| Command::PresenceOf { identity, reply })
            .await
    }

    /// Session the user is bound to.
    pub async fn session_of(&self, identity: &Identity) -> Result<Option<ChatSessionId>, ChatError> {
        let identity = identity.clone();
        self.call(|reply| Command::SessionOf { identity, reply })
            .await
    }

    /// Check every cross-component invariant.
    pub async fn audit(&self) -> Result<AuditReport, ChatError> {
        self.call(|reply| Command::Audit { reply }).await
    }

    /// Route a parsed client event.
    pub async fn dispatch(
        &self,
        handle: &ConnectionHandle,
        msg: InboundMessage,
    ) -> Result<(), ChatError> {
        match msg {
            InboundMessage::ChatRequest { target } => {
                self.submit_request(handle, &target).await.map(|_| ())
            }
            InboundMessage::ChatRequestResponse {
                request_id,
                accepted,
            } => self
                .respond_request(handle, request_id, accepted)
                .await
                .map(|_| ()),
            InboundMessage::CancelRequest { request_id } => {
                self.cancel_request(handle, request_id).await
            }
            InboundMessage::SendMessage { session_id, text } => self
                .send_message(handle, session_id, text)
                .await
                .map(|_| ()),
            InboundMessage::CloseChat { session_id } => self.close_chat(handle, session_id).await,
            InboundMessage::EndChat { session_id, peer } => self
                .end_chat(handle, SessionRef { session_id, peer })
                .await
                .map(|_| ()),
            InboundMessage::JoinChat { session_id, peer } => self
                .join_chat(handle, SessionRef { session_id, peer })
                .await
                .map(|_| ()),
            InboundMessage::ListPresence => {
                let users = self.presence_snapshot(Some(&handle.identity)).await?;
                handle.send(OutboundMessage::PresenceSnapshot { users });
                Ok(())
            }
        }
    }

    /// Parse, validate, and dispatch a raw text frame. Failures are pushed
    /// back to the client as structured `error` messages.
    pub async fn handle_frame(&self, handle: &ConnectionHandle, raw: &str) {
        let result = match parse_frame(
            raw,
            self.config.max_frame_bytes,
            self.config.max_message_length,
        ) {
            Ok(msg) => self.dispatch(handle, msg).await,
            Err(err) => Err(err),
        };

        if let Err(err) = result {
            self.report(handle, &err);
        }
    }

    /// Push an error to the client.
    pub fn report(&self, handle: &ConnectionHandle, err: &ChatError) {
        match err.kind() {
            ErrorKind::StaleReference => {
                tracing::debug!(identity = %handle.identity, code = err.code(), "Stale event rejected")
            }
            ErrorKind::ServiceUnavailable | ErrorKind::Configuration | ErrorKind::Internal => {
                tracing::warn!(identity = %handle.identity, error = %err, "Event failed")
            }
            _ => tracing::info!(identity = %handle.identity, code = err.code(), error = %err, "Event rejected"),
        }
        EngineMetrics::inc(&self.metrics.errors_reported);
        handle.send(OutboundMessage::error(err));
    }

    /// Close every connection and stop the coordinator.
    pub async fn shutdown(&self) {
        if self.call(|reply| Command::Shutdown { reply }).await.is_err() {
            tracing::debug!("Engine already stopped");
        }
    }

    async fn call<T>(&self, build: impl FnOnce(oneshot::Sender<T>) -> Command) -> Result<T, ChatError> {
        let (tx, rx) = oneshot::channel();
        self.commands
            .send(build(tx))
            .await
            .map_err(|_| ChatError::EngineUnavailable)?;
        rx.await.map_err(|_| ChatError::EngineUnavailable)
    }
}
