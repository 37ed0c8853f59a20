//! Live WebSocket sessions against a served router: relay, heartbeat,
//! supersession, and the close frame sent on shutdown.

mod helpers;

use std::net::SocketAddr;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::net::TcpStream;
use tokio::time::Instant;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

use parley_core::config::AppConfig;
use parley_realtime::PresenceState;

use helpers::{TestApp, identity};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

const WAIT: Duration = Duration::from_secs(10);

/// One-second pings, two seconds of allowed silence, one second of grace.
fn fast_heartbeat() -> AppConfig {
    let mut config = AppConfig::default();
    config.realtime.ping_interval_seconds = 1;
    config.realtime.ping_timeout_seconds = 2;
    config.realtime.grace_period_seconds = 1;
    config
}

/// Connect as `name` and wait for the initial presence snapshot.
async fn open(app: &TestApp, addr: SocketAddr, name: &str) -> Socket {
    let url = format!("ws://{addr}/ws?token={}", app.token(name));
    let (mut socket, _) = connect_async(url).await.expect("handshake");
    next_of_type(&mut socket, "presence_snapshot").await;
    socket
}

/// Read until a JSON message of the given type arrives.
async fn next_of_type(socket: &mut Socket, kind: &str) -> Value {
    loop {
        let msg = tokio::time::timeout(WAIT, socket.next())
            .await
            .unwrap_or_else(|_| panic!("no {kind} in time"))
            .expect("stream open")
            .expect("frame");
        if let Message::Text(text) = msg {
            let value: Value = serde_json::from_str(text.as_str()).expect("json");
            if value["type"] == kind {
                return value;
            }
        }
    }
}

/// Read until the server's close frame.
async fn expect_close(socket: &mut Socket) {
    loop {
        match tokio::time::timeout(WAIT, socket.next()).await.expect("close in time") {
            Some(Ok(Message::Close(_))) => return,
            Some(Ok(_)) => continue,
            Some(Err(e)) => panic!("socket failed before the close frame: {e}"),
            None => panic!("stream ended without a close frame"),
        }
    }
}

async fn wait_for_presence(app: &TestApp, name: &str, expected: PresenceState) {
    let deadline = Instant::now() + WAIT;
    loop {
        let state = app.engine.presence_of(&identity(name)).await.expect("engine");
        if state == Some(expected) {
            return;
        }
        assert!(Instant::now() < deadline, "{name} stuck at {state:?}");
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
}

#[tokio::test]
async fn test_chat_request_travels_between_sockets() {
    let app = TestApp::new();
    let addr = app.serve().await;
    let mut alice = open(&app, addr, "alice").await;
    let mut bob = open(&app, addr, "bob").await;

    alice
        .send(Message::text(
            r#"{"type":"chat_request","target":"bob"}"#.to_string(),
        ))
        .await
        .expect("send");

    let submitted = next_of_type(&mut alice, "request_submitted").await;
    let received = next_of_type(&mut bob, "request_received").await;
    assert_eq!(received["requester"], "alice");
    assert_eq!(received["request_id"], submitted["request_id"]);
}

#[tokio::test]
async fn test_newer_socket_closes_older_one() {
    let app = TestApp::new();
    let addr = app.serve().await;
    let mut first = open(&app, addr, "alice").await;
    let _second = open(&app, addr, "alice").await;

    expect_close(&mut first).await;
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(
        app.engine.presence_of(&identity("alice")).await.expect("engine"),
        Some(PresenceState::Idle)
    );
}

#[tokio::test]
async fn test_silent_socket_goes_offline_while_ponging_socket_stays() {
    let app = TestApp::with_config(fast_heartbeat());
    let addr = app.serve().await;
    let mut alice = open(&app, addr, "alice").await;
    // Bob never reads again, so his pings go unanswered.
    let _bob = open(&app, addr, "bob").await;

    // Reading keeps alice answering pings until bob's offline delta lands.
    let mut pings = 0;
    loop {
        let msg = tokio::time::timeout(WAIT, alice.next())
            .await
            .expect("bob should go offline in time")
            .expect("stream open")
            .expect("frame");
        match msg {
            Message::Ping(_) => pings += 1,
            Message::Text(text) => {
                let value: Value = serde_json::from_str(text.as_str()).expect("json");
                if value["type"] == "presence_delta"
                    && value["identity"] == "bob"
                    && value["state"] == "offline"
                {
                    break;
                }
            }
            _ => {}
        }
    }

    assert!(pings >= 2, "alice saw {pings} pings");
    assert_eq!(
        app.engine.presence_of(&identity("alice")).await.expect("engine"),
        Some(PresenceState::Idle)
    );
    wait_for_presence(&app, "bob", PresenceState::Offline).await;
}

#[tokio::test]
async fn test_shutdown_sends_close_frame() {
    let app = TestApp::new();
    let addr = app.serve().await;
    let mut alice = open(&app, addr, "alice").await;

    app.engine.shutdown().await;
    expect_close(&mut alice).await;
}
