//! Connection registry: identity → the one authoritative connection.

use std::collections::HashMap;
use std::sync::Arc;

use parley_core::types::{ConnectionId, Identity};

use super::handle::ConnectionHandle;
use crate::message::types::OutboundMessage;

/// Result of pushing to an identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Queued on the connection.
    Queued,
    /// Connection exists but the frame was dropped.
    Dropped,
    /// No live connection for the identity.
    Absent,
}

/// Maps each identity to at most one live connection.
///
/// A second connection for the same identity replaces the first; the caller
/// decides what to do with the returned old handle.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    connections: HashMap<Identity, Arc<ConnectionHandle>>,
}

impl ConnectionRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind the handle's identity to it, returning the superseded handle.
    pub fn register(&mut self, handle: Arc<ConnectionHandle>) -> Option<Arc<ConnectionHandle>> {
        let identity = handle.identity.clone();
        let conn_id = handle.id;
        let previous = self
            .connections
            .insert(identity.clone(), handle)
            .filter(|old| old.id != conn_id);

        match &previous {
            Some(old) => tracing::info!(
                identity = %identity,
                conn_id = %conn_id,
                old_conn_id = %old.id,
                "Connection superseded"
            ),
            None => tracing::debug!(identity = %identity, conn_id = %conn_id, "Connection registered"),
        }
        previous
    }

    /// Current connection for an identity.
    pub fn lookup(&self, identity: &Identity) -> Option<&Arc<ConnectionHandle>> {
        self.connections.get(identity)
    }

    /// Whether `conn_id` is the identity's current connection.
    pub fn is_current(&self, identity: &Identity, conn_id: ConnectionId) -> bool {
        self.connections
            .get(identity)
            .is_some_and(|handle| handle.id == conn_id)
    }

    /// Remove the binding, but only if `conn_id` is still the current one.
    pub fn unregister(&mut self, identity: &Identity, conn_id: ConnectionId) -> bool {
        if !self.is_current(identity, conn_id) {
            return false;
        }
        self.connections.remove(identity);
        tracing::debug!(identity = %identity, conn_id = %conn_id, "Connection unregistered");
        true
    }

    /// Push a message to one identity.
    pub fn send_to(&self, identity: &Identity, msg: OutboundMessage) -> Delivery {
        match self.connections.get(identity) {
            Some(handle) if handle.send(msg) => Delivery::Queued,
            Some(_) => Delivery::Dropped,
            None => Delivery::Absent,
        }
    }

    /// Push a message to everyone except `except`. Returns the number of
    /// connections that dropped it.
    pub fn broadcast_except(&self, except: &Identity, msg: &OutboundMessage) -> usize {
        self.connections
            .iter()
            .filter(|(identity, _)| *identity != except)
            .filter(|(_, handle)| !handle.send(msg.clone()))
            .count()
    }

    /// Close every connection and empty the registry.
    pub fn close_all(&mut self, reason: &str) -> usize {
        let count = self.connections.len();
        for (_, handle) in self.connections.drain() {
            handle.close(reason);
        }
        count
    }

    /// Identities with a registered connection.
    pub fn connected_identities(&self) -> impl Iterator<Item = &Identity> {
        self.connections.keys()
    }

    /// Number of registered connections.
    pub fn len(&self) -> usize {
        self.connections.len()
    }

    /// Whether no connections are registered.
    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}
