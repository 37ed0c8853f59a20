//! WebSocket upgrade handler.

use std::sync::Arc;

use axum::extract::ws::rejection::WebSocketUpgradeRejection;
use axum::extract::ws::{CloseFrame, Message, WebSocket, close_code};
use axum::extract::{Query, State, WebSocketUpgrade};
use axum::response::{IntoResponse, Response};
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use parley_core::types::Identity;
use parley_realtime::connection::{HeartbeatConfig, run_heartbeat};
use parley_realtime::message::serializer::serialize_outbound;
use parley_realtime::{ConnectionFrame, ConnectionHandle, RealtimeEngine};

use crate::error::ApiError;
use crate::state::AppState;

/// Query parameter for WebSocket authentication.
#[derive(Debug, serde::Deserialize)]
pub struct WsQuery {
    /// JWT access token.
    pub token: Option<String>,
}

/// GET /ws?token={jwt}
///
/// The token is checked before the upgrade headers so an unauthenticated
/// client always sees 401.
pub async fn ws_upgrade(
    State(state): State<AppState>,
    Query(query): Query<WsQuery>,
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Response {
    let identity = match state.authenticator.authenticate(query.token.as_deref()) {
        Ok(identity) => identity,
        Err(err) => return ApiError::from(err).into_response(),
    };
    let ws = match ws {
        Ok(ws) => ws,
        Err(rejection) => return rejection.into_response(),
    };

    let max_frame = state.engine.config().max_frame_bytes;
    ws.max_message_size(max_frame)
        .on_upgrade(move |socket| handle_socket(state.engine, identity, socket))
}

/// Drives one established WebSocket until either side closes it.
async fn handle_socket(engine: RealtimeEngine, identity: Identity, socket: WebSocket) {
    let (ws_tx, mut ws_rx) = socket.split();
    let (handle, frames) = engine.open_connection(identity);

    let writer = tokio::spawn(write_frames(handle.clone(), frames, ws_tx));

    let outcome = match engine.connect(&handle).await {
        Ok(outcome) => outcome,
        Err(err) => {
            warn!(identity = %handle.identity, error = %err, "Connection rejected");
            handle.mark_dead();
            writer.abort();
            return;
        }
    };
    info!(
        conn_id = %handle.id,
        identity = %handle.identity,
        state = %outcome.state,
        restored = outcome.restored,
        superseded = outcome.superseded,
        "WebSocket connection established"
    );

    let heartbeat = tokio::spawn(run_heartbeat(
        handle.clone(),
        HeartbeatConfig::from(engine.config()),
    ));

    loop {
        tokio::select! {
            _ = handle.closed() => break,
            next = ws_rx.next() => match next {
                Some(Ok(Message::Text(text))) => engine.handle_frame(&handle, text.as_str()).await,
                Some(Ok(Message::Pong(_))) => handle.record_pong().await,
                Some(Ok(Message::Binary(_))) => {
                    debug!(conn_id = %handle.id, "Ignoring binary frame");
                }
                Some(Ok(Message::Ping(_))) => {}
                Some(Ok(Message::Close(_))) | None => break,
                Some(Err(e)) => {
                    warn!(conn_id = %handle.id, error = %e, "WebSocket error");
                    break;
                }
            }
        }
    }

    // Cleanup
    engine.disconnect(&handle).await;
    handle.mark_dead();
    heartbeat.abort();
    writer.abort();

    info!(
        conn_id = %handle.id,
        identity = %handle.identity,
        "WebSocket connection closed"
    );
}

/// Forwards queued frames to the socket. Stops after a close frame or once
/// the connection is marked dead.
async fn write_frames(
    handle: Arc<ConnectionHandle>,
    mut frames: mpsc::Receiver<ConnectionFrame>,
    mut ws_tx: SplitSink<WebSocket, Message>,
) {
    loop {
        let frame = tokio::select! {
            biased;
            frame = frames.recv() => frame,
            _ = handle.closed() => None,
        };

        let message = match frame {
            Some(ConnectionFrame::Message(msg)) => match serialize_outbound(&msg) {
                Ok(text) => Message::Text(text.into()),
                Err(e) => {
                    warn!(conn_id = %handle.id, error = %e, "Dropping unserializable message");
                    continue;
                }
            },
            Some(ConnectionFrame::Ping) => Message::Ping(Vec::new().into()),
            Some(ConnectionFrame::Close { reason }) => {
                let close = Message::Close(Some(CloseFrame {
                    code: close_code::NORMAL,
                    reason: reason.into(),
                }));
                let _ = ws_tx.send(close).await;
                handle.mark_dead();
                break;
            }
            None => break,
        };

        if ws_tx.send(message).await.is_err() {
            handle.mark_dead();
            break;
        }
    }
}
