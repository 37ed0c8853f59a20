//! # parley-realtime
//!
//! Presence and chat-session coordination engine for Parley. Provides:
//!
//! - A connection registry with single-connection-per-identity supersession
//! - Presence tracking (idle/busy/offline) with delta broadcasts
//! - Chat request negotiation with timeouts and withdrawal
//! - One-to-one chat sessions with in-memory history replay
//! - Reconnection grace periods that keep sessions alive across short drops
//!
//! All state lives in a single coordinator task; see [`coordinator`].

pub mod chat;
pub mod connection;
pub mod coordinator;
pub mod engine;
pub mod error;
pub mod message;
pub mod metrics;
pub mod presence;
pub mod request;
pub mod supervisor;

mod scheduler;

pub use connection::{ConnectionFrame, ConnectionHandle, WsAuthenticator};
pub use coordinator::{AuditReport, Caller, ConnectOutcome, SessionRef};
pub use engine::RealtimeEngine;
pub use error::ChatError;
pub use message::{InboundMessage, OutboundMessage};
pub use presence::{PresenceState, PresenceTracker};
