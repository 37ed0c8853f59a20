//! Shared helpers for engine integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use parley_core::config::RealtimeConfig;
use parley_core::types::Identity;
use parley_realtime::{ConnectOutcome, ConnectionFrame, ConnectionHandle, OutboundMessage, RealtimeEngine};

/// Engine with default timings: 12s grace, 30s request window.
pub fn engine() -> RealtimeEngine {
    RealtimeEngine::new(RealtimeConfig::default())
}

/// Parse an identity.
pub fn id(name: &str) -> Identity {
    Identity::parse(name).expect("valid identity")
}

/// Wait until the coordinator has processed everything queued so far,
/// then assert every invariant.
pub async fn settle(engine: &RealtimeEngine) {
    let report = engine.audit().await.expect("engine running");
    assert!(report.is_clean(), "invariants violated: {:?}", report.violations);
}

/// Advance virtual time, then settle.
pub async fn advance(engine: &RealtimeEngine, secs: u64) {
    tokio::time::sleep(Duration::from_secs(secs)).await;
    settle(engine).await;
}

/// A connected test client.
pub struct TestClient {
    /// Identity the client connected as.
    pub identity: Identity,
    /// Engine-side handle.
    pub handle: Arc<ConnectionHandle>,
    /// What the connect call reported.
    pub outcome: ConnectOutcome,
    frames: mpsc::Receiver<ConnectionFrame>,
}

impl TestClient {
    /// Open and register a connection.
    pub async fn connect(engine: &RealtimeEngine, name: &str) -> Self {
        let identity = id(name);
        let (handle, frames) = engine.open_connection(identity.clone());
        let outcome = engine.connect(&handle).await.expect("connect");
        Self {
            identity,
            handle,
            outcome,
            frames,
        }
    }

    /// Every frame queued so far.
    pub fn frames(&mut self) -> Vec<ConnectionFrame> {
        let mut out = Vec::new();
        while let Ok(frame) = self.frames.try_recv() {
            out.push(frame);
        }
        out
    }

    /// Every message queued so far, skipping pings and close frames.
    pub fn messages(&mut self) -> Vec<OutboundMessage> {
        self.frames()
            .into_iter()
            .filter_map(|frame| match frame {
                ConnectionFrame::Message(msg) => Some(msg),
                _ => None,
            })
            .collect()
    }

    /// Discard everything queued so far.
    pub fn clear(&mut self) {
        self.frames();
    }
}

/// Count messages with the given wire type.
pub fn count(messages: &[OutboundMessage], kind: &str) -> usize {
    messages.iter().filter(|m| m.kind_str() == kind).count()
}
