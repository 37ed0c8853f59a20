//! The coordinator task: sole owner of every piece of engine state.
//!
//! Connections, timers, and HTTP handlers never touch the registry, presence
//! map, negotiator, or session table directly. They send a [`Command`] and
//! wait for the reply. Commands are applied one at a time, so every
//! per-identity mutation is serialized and every two-identity operation
//! (accepting a request, closing a session) is atomic without any locking.

use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot};

use parley_core::config::RealtimeConfig;
use parley_core::types::{ChatSessionId, ConnectionId, Identity, RequestId};

use crate::chat::{ChatMessage, ClosedSession, SessionManager};
use crate::connection::{ConnectionHandle, ConnectionRegistry, Delivery};
use crate::error::ChatError;
use crate::message::types::{CloseMode, OutboundMessage, RequestOutcome, WithdrawReason};
use crate::message::validator::validate_text;
use crate::metrics::EngineMetrics;
use crate::presence::status::PresenceState;
use crate::presence::tracker::{PresenceDelta, PresenceTracker, UserPresence};
use crate::request::{ChatRequest, DrainedRequests, RequestNegotiator};
use crate::scheduler::Scheduler;
use crate::supervisor::ReconnectSupervisor;

pub(crate) type Reply<T> = oneshot::Sender<Result<T, ChatError>>;

/// The connection an event arrived on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    /// Verified identity.
    pub identity: Identity,
    /// Connection the event came from.
    pub connection_id: ConnectionId,
}

impl Caller {
    /// Caller for events arriving on `handle`.
    pub fn of(handle: &ConnectionHandle) -> Self {
        Self {
            identity: handle.identity.clone(),
            connection_id: handle.id,
        }
    }
}

/// Addresses the caller's session by id, by peer, or implicitly.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionRef {
    /// Session id.
    pub session_id: Option<ChatSessionId>,
    /// Peer identity, unvalidated.
    pub peer: Option<String>,
}

/// What registering a connection did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectOutcome {
    /// Presence after registration.
    pub state: PresenceState,
    /// A grace timer was running and got cancelled.
    pub restored: bool,
    /// A previous connection for the identity was replaced.
    pub superseded: bool,
    /// Session carried over from before the reconnect.
    pub session_id: Option<ChatSessionId>,
    /// Pending offers re-sent to the new connection.
    pub redelivered: usize,
}

/// Result of an invariant check over the whole engine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditReport {
    /// Human-readable invariant violations.
    pub violations: Vec<String>,
}

impl AuditReport {
    /// Whether every invariant holds.
    pub fn is_clean(&self) -> bool {
        self.violations.is_empty()
    }
}

/// Work items processed by the coordinator.
#[derive(Debug)]
pub(crate) enum Command {
    Connect {
        handle: Arc<ConnectionHandle>,
        reply: oneshot::Sender<ConnectOutcome>,
    },
    Disconnect {
        caller: Caller,
    },
    SubmitRequest {
        caller: Caller,
        target: String,
        reply: Reply<ChatRequest>,
    },
    RespondRequest {
        caller: Caller,
        request_id: RequestId,
        accepted: bool,
        reply: Reply<Option<ChatSessionId>>,
    },
    CancelRequest {
        caller: Caller,
        request_id: RequestId,
        reply: Reply<()>,
    },
    SendMessage {
        caller: Caller,
        session_id: ChatSessionId,
        text: String,
        reply: Reply<ChatMessage>,
    },
    CloseChat {
        caller: Caller,
        session_id: ChatSessionId,
        reply: Reply<()>,
    },
    EndChat {
        caller: Caller,
        target: SessionRef,
        reply: Reply<ChatSessionId>,
    },
    JoinChat {
        caller: Caller,
        target: SessionRef,
        reply: Reply<ChatSessionId>,
    },
    PresenceSnapshot {
        except: Option<Identity>,
        reply: oneshot::Sender<Vec<UserPresence>>,
    },
    PresenceOf {
        identity: Identity,
        reply: oneshot::Sender<Option<PresenceState>>,
    },
    SessionOf {
        identity: Identity,
        reply: oneshot::Sender<Option<ChatSessionId>>,
    },
    Audit {
        reply: oneshot::Sender<AuditReport>,
    },
    ExpireRequest {
        request_id: RequestId,
    },
    GraceExpired {
        identity: Identity,
        epoch: u64,
    },
    Shutdown {
        reply: oneshot::Sender<()>,
    },
}

/// Spawn the coordinator and return its inbox.
pub(crate) fn spawn(config: &RealtimeConfig, metrics: Arc<EngineMetrics>) -> mpsc::Sender<Command> {
    let (tx, rx) = mpsc::channel(config.command_buffer_size.max(1));
    let coordinator = Coordinator::new(config, Scheduler::new(tx.downgrade()), metrics);
    tokio::spawn(coordinator.run(rx));
    tx
}

struct Coordinator {
    registry: ConnectionRegistry,
    presence: PresenceTracker,
    negotiator: RequestNegotiator,
    sessions: SessionManager,
    supervisor: ReconnectSupervisor,
    scheduler: Scheduler,
    grace_period: Duration,
    max_message_length: usize,
    metrics: Arc<EngineMetrics>,
}

impl Coordinator {
    fn new(config: &RealtimeConfig, scheduler: Scheduler, metrics: Arc<EngineMetrics>) -> Self {
        Self {
            registry: ConnectionRegistry::new(),
            presence: PresenceTracker::new(),
            negotiator: RequestNegotiator::new(config.request_timeout()),
            sessions: SessionManager::new(config.max_history_messages),
            supervisor: ReconnectSupervisor::new(),
            scheduler,
            grace_period: config.grace_period(),
            max_message_length: config.max_message_length,
            metrics,
        }
    }

    async fn run(mut self, mut commands: mpsc::Receiver<Command>) {
        tracing::info!(
            grace_period = ?self.grace_period,
            request_timeout = ?self.negotiator.timeout(),
            "Chat coordinator started"
        );

        while let Some(command) = commands.recv().await {
            if self.handle(command).is_break() {
                break;
            }
        }

        self.supervisor.clear();
        self.negotiator.clear();
        tracing::info!("Chat coordinator stopped");
    }

    fn handle(&mut self, command: Command) -> ControlFlow<()> {
        match command {
            Command::Connect { handle, reply } => {
                let outcome = self.connect(handle);
                self.finish(reply, outcome);
            }
            Command::Disconnect { caller } => {
                self.disconnect(&caller);
                self.refresh_gauges();
            }
            Command::SubmitRequest {
                caller,
                target,
                reply,
            } => {
                let result = self.submit(&caller, &target);
                self.finish(reply, result);
            }
            Command::RespondRequest {
                caller,
                request_id,
                accepted,
                reply,
            } => {
                let result = self.respond(&caller, request_id, accepted);
                self.finish(reply, result);
            }
            Command::CancelRequest {
                caller,
                request_id,
                reply,
            } => {
                let result = self.cancel(&caller, request_id);
                self.finish(reply, result);
            }
            Command::SendMessage {
                caller,
                session_id,
                text,
                reply,
            } => {
                let result = self.send_message(&caller, session_id, text);
                self.finish(reply, result);
            }
            Command::CloseChat {
                caller,
                session_id,
                reply,
            } => {
                let result = self.close_chat(&caller, session_id).map(|_| ());
                self.finish(reply, result);
            }
            Command::EndChat {
                caller,
                target,
                reply,
            } => {
                let result = self
                    .ensure_current(&caller)
                    .and_then(|()| self.locate(&caller.identity, &target))
                    .and_then(|session_id| self.close_chat(&caller, session_id));
                self.finish(reply, result);
            }
            Command::JoinChat {
                caller,
                target,
                reply,
            } => {
                let result = self.join_chat(&caller, &target);
                self.finish(reply, result);
            }
            Command::PresenceSnapshot { except, reply } => {
                let users = self.presence.snapshot(except.as_ref());
                self.finish(reply, users);
            }
            Command::PresenceOf { identity, reply } => {
                let state = self.presence.state(&identity);
                self.finish(reply, state);
            }
            Command::SessionOf { identity, reply } => {
                let session_id = self.sessions.session_of(&identity).map(|s| s.id);
                self.finish(reply, session_id);
            }
            Command::Audit { reply } => {
                let report = self.audit();
                self.finish(reply, report);
            }
            Command::ExpireRequest { request_id } => {
                self.expire_request(request_id);
                self.refresh_gauges();
            }
            Command::GraceExpired { identity, epoch } => {
                self.grace_expired(&identity, epoch);
                self.refresh_gauges();
            }
            Command::Shutdown { reply } => {
                let closed = self.registry.close_all("server shutting down");
                self.supervisor.clear();
                self.negotiator.clear();
                tracing::info!(connections = closed, "Chat coordinator shutting down");
                self.finish(reply, ());
                return ControlFlow::Break(());
            }
        }
        ControlFlow::Continue(())
    }

    // -- connection lifecycle ------------------------------------------------

    fn connect(&mut self, handle: Arc<ConnectionHandle>) -> ConnectOutcome {
        let identity = handle.identity.clone();
        EngineMetrics::inc(&self.metrics.connections_total);

        let restored = self.supervisor.cancel(&identity);
        if restored {
            EngineMetrics::inc(&self.metrics.reconnections);
        }

        let superseded = self.registry.register(handle.clone());
        let mut live_superseded = false;
        if let Some(old) = &superseded {
            live_superseded = old.is_alive();
            old.close("superseded by a newer connection");
            EngineMetrics::inc(&self.metrics.connections_superseded);
        }

        if !self.presence.state(&identity).is_some_and(|s| s.is_online()) {
            match self.presence.come_online(&identity) {
                Ok(delta) => self.broadcast(delta),
                Err(err) => tracing::error!(identity = %identity, error = %err, "Presence registration failed"),
            }
        }

        handle.send(OutboundMessage::PresenceSnapshot {
            users: self.presence.snapshot(Some(&identity)),
        });

        // A second live connection takes over the identity but not its chat.
        if live_superseded {
            for closed in self.sessions.teardown_all(&identity, &mut self.presence) {
                self.announce_closed(closed);
            }
        }

        let session_id = self.sessions.session_of(&identity).map(|session| {
            let peer = session.peer_of(&identity).cloned();
            let opened = OutboundMessage::SessionOpened {
                session_id: session.id,
                peer: peer.clone().unwrap_or_else(|| identity.clone()),
                history: session.messages.clone(),
                opened_at: session.created_at,
            };
            (session.id, peer, opened)
        });
        let session_id = session_id.map(|(id, peer, opened)| {
            handle.send(opened);
            if let Some(peer) = peer {
                self.notify(
                    &peer,
                    OutboundMessage::PeerReconnected {
                        session_id: id,
                        peer: identity.clone(),
                    },
                );
            }
            id
        });

        let offers: Vec<OutboundMessage> = self
            .negotiator
            .incoming_for(&identity)
            .into_iter()
            .map(|r| OutboundMessage::RequestReceived {
                request_id: r.id,
                requester: r.requester.clone(),
                created_at: r.created_at,
                expires_at: r.expires_at,
            })
            .collect();
        let redelivered = offers.len();
        for offer in offers {
            handle.send(offer);
        }

        let state = self.presence.state(&identity).unwrap_or(PresenceState::Idle);
        tracing::info!(
            identity = %identity,
            conn_id = %handle.id,
            state = %state,
            restored,
            superseded = superseded.is_some(),
            session_id = ?session_id,
            "Connection registered"
        );

        ConnectOutcome {
            state,
            restored,
            superseded: superseded.is_some(),
            session_id,
            redelivered,
        }
    }

    fn disconnect(&mut self, caller: &Caller) {
        let identity = &caller.identity;
        if !self.registry.unregister(identity, caller.connection_id) {
            tracing::debug!(
                identity = %identity,
                conn_id = %caller.connection_id,
                "Ignoring disconnect of superseded connection"
            );
            return;
        }

        let scheduler = &self.scheduler;
        let grace = self.grace_period;
        self.supervisor.start(identity, |epoch| {
            scheduler.schedule(
                grace,
                Command::GraceExpired {
                    identity: identity.clone(),
                    epoch,
                },
            )
        });

        if let Some(session) = self.sessions.session_of(identity) {
            let session_id = session.id;
            if let Some(peer) = session.peer_of(identity).cloned() {
                self.notify(
                    &peer,
                    OutboundMessage::PeerDisconnected {
                        session_id,
                        peer: identity.clone(),
                    },
                );
            }
        }

        tracing::info!(identity = %identity, conn_id = %caller.connection_id, "Connection lost");
    }

    fn grace_expired(&mut self, identity: &Identity, epoch: u64) {
        if !self.supervisor.take_if_current(identity, epoch) {
            tracing::debug!(identity = %identity, epoch, "Ignoring stale grace timer");
            return;
        }
        if self.registry.lookup(identity).is_some() {
            return;
        }

        EngineMetrics::inc(&self.metrics.grace_expirations);
        match self.presence.mark_offline(identity) {
            Ok(delta) => self.broadcast(delta),
            Err(err) => tracing::debug!(identity = %identity, error = %err, "Offline transition skipped"),
        }

        for closed in self.sessions.teardown_all(identity, &mut self.presence) {
            self.announce_closed(closed);
        }

        let drained = self.negotiator.drain_involving(identity);
        self.settle_drained(
            drained,
            WithdrawReason::RequesterOffline,
            RequestOutcome::TargetOffline,
        );

        tracing::info!(identity = %identity, "Grace period expired, user offline");
    }

    // -- requests ------------------------------------------------------------

    fn submit(&mut self, caller: &Caller, target: &str) -> Result<ChatRequest, ChatError> {
        self.ensure_current(caller)?;

        let scheduler = &self.scheduler;
        let timeout = self.negotiator.timeout();
        let request = self.negotiator.submit(&caller.identity, target, &self.presence, |id| {
            scheduler.schedule(timeout, Command::ExpireRequest { request_id: id })
        })?;
        EngineMetrics::inc(&self.metrics.requests_submitted);

        self.notify(
            &request.target,
            OutboundMessage::RequestReceived {
                request_id: request.id,
                requester: request.requester.clone(),
                created_at: request.created_at,
                expires_at: request.expires_at,
            },
        );
        self.notify(
            &request.requester,
            OutboundMessage::RequestSubmitted {
                request_id: request.id,
                target: request.target.clone(),
                expires_at: request.expires_at,
            },
        );
        Ok(request)
    }

    fn respond(
        &mut self,
        caller: &Caller,
        request_id: RequestId,
        accepted: bool,
    ) -> Result<Option<ChatSessionId>, ChatError> {
        self.ensure_current(caller)?;
        let request = self
            .negotiator
            .resolve(&caller.identity, request_id, accepted)?;

        if !accepted {
            EngineMetrics::inc(&self.metrics.requests_rejected);
            self.answer(&request, RequestOutcome::Rejected, None);
            tracing::info!(request_id = %request.id, "Chat request rejected");
            return Ok(None);
        }

        // Availability may have changed since the request was created.
        if !self.presence.is_idle(&request.requester) {
            self.answer(&request, RequestOutcome::RequesterGone, None);
            return Err(ChatError::RequesterGone(request.requester.clone()));
        }
        if !self.presence.is_idle(&request.target) {
            self.answer(&request, RequestOutcome::TargetBusy, None);
            return Err(ChatError::TargetBusy(request.target.clone()));
        }

        let (session_id, deltas) =
            match self
                .sessions
                .create(&request.requester, &request.target, &mut self.presence)
            {
                Ok(created) => created,
                Err(err) => {
                    self.answer(&request, RequestOutcome::TargetBusy, None);
                    return Err(err);
                }
            };
        EngineMetrics::inc(&self.metrics.requests_accepted);
        EngineMetrics::inc(&self.metrics.sessions_opened);

        for delta in deltas {
            self.broadcast(delta);
        }
        self.answer(&request, RequestOutcome::Accepted, Some(session_id));

        let opened_at = self
            .sessions
            .get(session_id)
            .map(|s| s.created_at)
            .unwrap_or_else(chrono::Utc::now);
        for (me, peer) in [
            (&request.requester, &request.target),
            (&request.target, &request.requester),
        ] {
            self.notify(
                me,
                OutboundMessage::SessionOpened {
                    session_id,
                    peer: peer.clone(),
                    history: Vec::new(),
                    opened_at,
                },
            );
        }

        // Offers involving either participant can no longer be honoured.
        for participant in [&request.requester, &request.target] {
            let drained = self.negotiator.drain_involving(participant);
            self.settle_drained(
                drained,
                WithdrawReason::RequesterBusy,
                RequestOutcome::TargetBusy,
            );
        }

        Ok(Some(session_id))
    }

    fn cancel(&mut self, caller: &Caller, request_id: RequestId) -> Result<(), ChatError> {
        self.ensure_current(caller)?;
        let request = self.negotiator.cancel(&caller.identity, request_id)?;
        EngineMetrics::inc(&self.metrics.requests_cancelled);

        self.notify(
            &request.target,
            OutboundMessage::RequestWithdrawn {
                request_id,
                requester: request.requester.clone(),
                reason: WithdrawReason::Cancelled,
            },
        );
        self.answer(&request, RequestOutcome::Cancelled, None);
        tracing::info!(request_id = %request_id, "Chat request cancelled");
        Ok(())
    }

    fn expire_request(&mut self, request_id: RequestId) {
        let Some(request) = self.negotiator.expire(request_id) else {
            tracing::debug!(request_id = %request_id, "Request already resolved before timeout");
            return;
        };
        EngineMetrics::inc(&self.metrics.requests_expired);
        self.answer(&request, RequestOutcome::Expired, None);
        tracing::info!(
            request_id = %request_id,
            requester = %request.requester,
            target = %request.target,
            "Chat request expired"
        );
    }

    /// Tell the requester how its request ended.
    fn answer(
        &self,
        request: &ChatRequest,
        outcome: RequestOutcome,
        session_id: Option<ChatSessionId>,
    ) {
        self.notify(
            &request.requester,
            OutboundMessage::RequestResponse {
                request_id: request.id,
                peer: request.target.clone(),
                outcome,
                session_id,
            },
        );
    }

    fn settle_drained(
        &self,
        drained: DrainedRequests,
        withdraw: WithdrawReason,
        outcome: RequestOutcome,
    ) {
        if drained.is_empty() {
            return;
        }
        for request in &drained.outgoing {
            self.notify(
                &request.target,
                OutboundMessage::RequestWithdrawn {
                    request_id: request.id,
                    requester: request.requester.clone(),
                    reason: withdraw,
                },
            );
        }
        for request in &drained.incoming {
            self.answer(request, outcome, None);
        }
    }

    // -- sessions ------------------------------------------------------------

    fn send_message(
        &mut self,
        caller: &Caller,
        session_id: ChatSessionId,
        text: String,
    ) -> Result<ChatMessage, ChatError> {
        self.ensure_current(caller)?;
        validate_text(&text, self.max_message_length)?;

        let (message, peer) = self.sessions.relay(session_id, &caller.identity, text)?;
        EngineMetrics::inc(&self.metrics.messages_relayed);
        self.notify(&peer, OutboundMessage::new_message(&message));
        Ok(message)
    }

    fn close_chat(
        &mut self,
        caller: &Caller,
        session_id: ChatSessionId,
    ) -> Result<ChatSessionId, ChatError> {
        self.ensure_current(caller)?;
        let closed = self.sessions.close(
            session_id,
            &caller.identity,
            CloseMode::Graceful,
            &mut self.presence,
        )?;
        self.announce_closed(closed);
        Ok(session_id)
    }

    fn join_chat(&mut self, caller: &Caller, target: &SessionRef) -> Result<ChatSessionId, ChatError> {
        self.ensure_current(caller)?;
        let session_id = self.locate(&caller.identity, target)?;
        let session = self
            .sessions
            .get(session_id)
            .ok_or(ChatError::SessionNotActive(session_id))?;
        let peer = session
            .peer_of(&caller.identity)
            .cloned()
            .ok_or(ChatError::NotParticipant(session_id))?;

        self.notify(
            &caller.identity,
            OutboundMessage::SessionOpened {
                session_id,
                peer,
                history: session.messages.clone(),
                opened_at: session.created_at,
            },
        );
        Ok(session_id)
    }

    fn locate(&self, caller: &Identity, target: &SessionRef) -> Result<ChatSessionId, ChatError> {
        let peer = target
            .peer
            .as_deref()
            .map(|raw| Identity::parse(raw).map_err(|_| ChatError::InvalidTarget(raw.to_string())))
            .transpose()?;
        self.sessions
            .locate(caller, target.session_id, peer.as_ref())
            .map(|session| session.id)
    }

    fn announce_closed(&self, closed: ClosedSession) {
        EngineMetrics::inc(&self.metrics.sessions_closed);
        if let Some(remaining) = closed.remaining() {
            self.notify(
                remaining,
                OutboundMessage::SessionClosed {
                    session_id: closed.session.id,
                    peer: closed.initiator.clone(),
                    mode: closed.mode,
                },
            );
        }
        for delta in closed.deltas {
            self.broadcast(delta);
        }
    }

    // -- plumbing ------------------------------------------------------------

    fn ensure_current(&self, caller: &Caller) -> Result<(), ChatError> {
        if self.registry.is_current(&caller.identity, caller.connection_id) {
            Ok(())
        } else {
            Err(ChatError::StaleConnection)
        }
    }

    fn notify(&self, identity: &Identity, msg: OutboundMessage) {
        let kind = msg.kind_str();
        if self.registry.send_to(identity, msg) == Delivery::Dropped {
            EngineMetrics::inc(&self.metrics.notifications_dropped);
            tracing::debug!(identity = %identity, kind, "Notification dropped");
        }
    }

    fn broadcast(&self, delta: PresenceDelta) {
        let subject = delta.identity.clone();
        let dropped = self.registry.broadcast_except(&subject, &delta.into());
        EngineMetrics::add(&self.metrics.notifications_dropped, dropped as u64);
    }

    fn finish<T>(&self, reply: oneshot::Sender<T>, value: T) {
        self.refresh_gauges();
        if reply.send(value).is_err() {
            tracing::debug!("Caller went away before the reply");
        }
    }

    fn refresh_gauges(&self) {
        EngineMetrics::set(&self.metrics.connections_active, self.registry.len());
        EngineMetrics::set(&self.metrics.users_online, self.presence.online_count());
        EngineMetrics::set(&self.metrics.sessions_active, self.sessions.len());
        EngineMetrics::set(&self.metrics.requests_pending, self.negotiator.len());
    }

    fn audit(&self) -> AuditReport {
        let mut violations = Vec::new();

        for identity in self.presence.with_state(PresenceState::Busy) {
            match self.sessions.session_of(identity) {
                None => violations.push(format!("{identity} is busy without a session")),
                Some(session) if !session.is_participant(identity) => violations.push(format!(
                    "{identity} is bound to session {} that does not list it",
                    session.id
                )),
                Some(_) => {}
            }
        }

        for session in self.sessions.iter() {
            let [a, b] = &session.participants;
            if a == b {
                violations.push(format!("session {} binds {a} to itself", session.id));
            }
            if !session.is_active() {
                violations.push(format!("session {} stored in state {:?}", session.id, session.state));
            }
            for participant in &session.participants {
                if self.presence.state(participant) != Some(PresenceState::Busy) {
                    violations.push(format!(
                        "{participant} is in session {} but not busy",
                        session.id
                    ));
                }
                if self.sessions.session_of(participant).map(|s| s.id) != Some(session.id) {
                    violations.push(format!(
                        "{participant} is in session {} but bound elsewhere",
                        session.id
                    ));
                }
            }
        }

        for (identity, session_id) in self.sessions.bindings() {
            if self.sessions.get(*session_id).is_none() {
                violations.push(format!("{identity} bound to missing session {session_id}"));
            }
        }

        violations.extend(self.negotiator.check_index());
        for request in self.negotiator.iter() {
            if request.requester == request.target {
                violations.push(format!("request {} targets its own requester", request.id));
            }
        }

        for identity in self.registry.connected_identities() {
            if !self.presence.state(identity).is_some_and(|s| s.is_online()) {
                violations.push(format!("{identity} is connected but not online"));
            }
        }
        for identity in self.presence.with_state(PresenceState::Offline) {
            if self.registry.lookup(identity).is_some() || self.supervisor.is_pending(identity) {
                violations.push(format!("{identity} is offline but still tracked as connected"));
            }
        }

        if !violations.is_empty() {
            tracing::error!(count = violations.len(), "Engine invariant violations detected");
        }
        AuditReport { violations }
    }
}
