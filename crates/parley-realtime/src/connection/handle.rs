//! Individual WebSocket connection handle.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use tokio::sync::{RwLock, mpsc};
use tokio::time::Instant;
use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};

use parley_core::types::{ConnectionId, Identity};

use crate::message::types::OutboundMessage;

/// A unit of work for a connection's writer task.
#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionFrame {
    /// Serialize and push a message.
    Message(OutboundMessage),
    /// Transport-level keepalive ping.
    Ping,
    /// Send a close frame and stop. Queued behind earlier frames, so
    /// everything already enqueued is flushed first.
    Close {
        /// Close reason.
        reason: String,
    },
}

/// A handle to a single authenticated connection.
///
/// Sends never block: the outbound queue is bounded and a full queue drops
/// the frame, so a slow client cannot stall the coordinator.
#[derive(Debug)]
pub struct ConnectionHandle {
    /// Unique connection ID
    pub id: ConnectionId,
    /// Verified identity
    pub identity: Identity,
    /// When the connection was established
    pub connected_at: DateTime<Utc>,
    /// Last pong received
    pub last_pong: RwLock<Instant>,
    sender: mpsc::Sender<ConnectionFrame>,
    alive: AtomicBool,
    closed: CancellationToken,
}

impl ConnectionHandle {
    /// Create a handle and the receiving end its writer task drains.
    pub fn new(
        identity: Identity,
        buffer: usize,
    ) -> (Arc<Self>, mpsc::Receiver<ConnectionFrame>) {
        let (sender, receiver) = mpsc::channel(buffer.max(1));
        let handle = Arc::new(Self {
            id: ConnectionId::new(),
            identity,
            connected_at: Utc::now(),
            last_pong: RwLock::new(Instant::now()),
            sender,
            alive: AtomicBool::new(true),
            closed: CancellationToken::new(),
        });
        (handle, receiver)
    }

    /// Push a message. Returns `false` if it was dropped.
    pub fn send(&self, msg: OutboundMessage) -> bool {
        self.enqueue(ConnectionFrame::Message(msg))
    }

    /// Queue a keepalive ping.
    pub fn ping(&self) -> bool {
        self.enqueue(ConnectionFrame::Ping)
    }

    /// Ask the writer to close after draining queued frames.
    ///
    /// If the close frame cannot be queued the connection is torn down
    /// immediately instead.
    pub fn close(&self, reason: impl Into<String>) {
        if !self.is_alive() {
            return;
        }
        let frame = ConnectionFrame::Close {
            reason: reason.into(),
        };
        if self.sender.try_send(frame).is_err() {
            self.mark_dead();
        }
    }

    /// Check if connection is alive
    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    /// Mark connection as dead and wake everything waiting on [`Self::closed`].
    pub fn mark_dead(&self) {
        if self.alive.swap(false, Ordering::SeqCst) {
            tracing::debug!(conn_id = %self.id, identity = %self.identity, "Connection marked dead");
        }
        self.closed.cancel();
    }

    /// Resolves once the connection is dead.
    pub fn closed(&self) -> WaitForCancellationFuture<'_> {
        self.closed.cancelled()
    }

    /// Record a pong response
    pub async fn record_pong(&self) {
        let mut lp = self.last_pong.write().await;
        *lp = Instant::now();
    }

    fn enqueue(&self, frame: ConnectionFrame) -> bool {
        if !self.is_alive() {
            return false;
        }
        match self.sender.try_send(frame) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!(
                    conn_id = %self.id,
                    identity = %self.identity,
                    "Connection send buffer full, dropping frame"
                );
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                self.mark_dead();
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alice() -> Identity {
        Identity::parse("alice").expect("valid")
    }

    fn snapshot() -> OutboundMessage {
        OutboundMessage::PresenceSnapshot { users: Vec::new() }
    }

    #[tokio::test]
    async fn test_full_queue_drops_without_blocking() {
        let (handle, mut rx) = ConnectionHandle::new(alice(), 1);
        assert!(handle.send(snapshot()));
        assert!(!handle.send(snapshot()));
        assert!(handle.is_alive());

        assert_eq!(rx.recv().await, Some(ConnectionFrame::Message(snapshot())));
    }

    #[tokio::test]
    async fn test_dropped_receiver_marks_dead() {
        let (handle, rx) = ConnectionHandle::new(alice(), 4);
        drop(rx);

        assert!(!handle.send(snapshot()));
        assert!(!handle.is_alive());
        handle.closed().await;
    }

    #[tokio::test]
    async fn test_close_is_queued_behind_pending_frames() {
        let (handle, mut rx) = ConnectionHandle::new(alice(), 4);
        handle.send(snapshot());
        handle.close("superseded");

        assert!(matches!(rx.recv().await, Some(ConnectionFrame::Message(_))));
        assert_eq!(
            rx.recv().await,
            Some(ConnectionFrame::Close {
                reason: "superseded".into()
            })
        );
    }
}
