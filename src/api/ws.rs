// =============================================================================
// WebSocket Handler — Push-based chart updates
// =============================================================================
//
// Clients connect to `/api/v1/ws` and receive:
//   1. An immediate ChartSnapshot on connect.
//   2. A fresh snapshot, checked every 500 ms, whenever the state_version has
//      changed since the last push.
//
// Incoming text frames are ignored apart from logging; Ping frames are
// answered with Pong.
// =============================================================================

use std::sync::atomic::Ordering;
use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::IntoResponse,
};
use futures_util::{Sink, SinkExt, StreamExt};
use tokio::time::{interval, Duration};
use tracing::{debug, info, warn};

use crate::app_state::AppState;

const PUSH_INTERVAL: Duration = Duration::from_millis(500);

/// Axum handler for the WebSocket upgrade request.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    info!("WebSocket connection accepted, upgrading");
    ws.on_upgrade(move |socket| handle_ws_connection(socket, state))
}

/// Runs the push loop and the receive loop for one connection until either
/// side goes away.
async fn handle_ws_connection(socket: WebSocket, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();
    let mut sequence: u64 = 0;

    let mut last_sent_version = state.current_state_version();
    if let Err(e) = send_snapshot(&mut sender, &state, &mut sequence).await {
        warn!(error = %e, "failed to send initial WebSocket snapshot");
        return;
    }

    let mut push_interval = interval(PUSH_INTERVAL);

    loop {
        tokio::select! {
            // ── Push loop ───────────────────────────────────────────────
            _ = push_interval.tick() => {
                let current_version = state.current_state_version();
                if current_version != last_sent_version {
                    match send_snapshot(&mut sender, &state, &mut sequence).await {
                        Ok(()) => last_sent_version = current_version,
                        Err(e) => {
                            debug!(error = %e, "WebSocket send failed, disconnecting");
                            break;
                        }
                    }
                }
            }

            // ── Recv loop ───────────────────────────────────────────────
            msg = receiver.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        debug!(msg = %text, "WebSocket text message ignored");
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if let Err(e) = sender.send(Message::Pong(data)).await {
                            debug!(error = %e, "failed to send Pong, disconnecting");
                            break;
                        }
                    }
                    Some(Ok(Message::Pong(_))) | Some(Ok(Message::Binary(_))) => {}
                    Some(Ok(Message::Close(_))) => {
                        info!("WebSocket Close frame received");
                        break;
                    }
                    Some(Err(e)) => {
                        warn!(error = %e, "WebSocket receive error, disconnecting");
                        break;
                    }
                    None => break,
                }
            }
        }
    }

    info!(messages = sequence, "WebSocket connection closed");
}

/// Serialize and send the current snapshot.
async fn send_snapshot<S>(
    sender: &mut S,
    state: &Arc<AppState>,
    sequence: &mut u64,
) -> Result<(), axum::Error>
where
    S: Sink<Message, Error = axum::Error> + Unpin,
{
    state.ws_sequence_number.fetch_add(1, Ordering::Relaxed);
    *sequence += 1;

    let snapshot = state.build_snapshot();

    match serde_json::to_string(&snapshot) {
        Ok(json) => {
            sender.send(Message::Text(json)).await?;
            debug!(
                version = snapshot.state_version,
                seq = *sequence,
                "WebSocket snapshot sent"
            );
            Ok(())
        }
        Err(e) => {
            // Serialisation errors are not network errors; keep the socket.
            warn!(error = %e, "failed to serialize snapshot");
            Ok(())
        }
    }
}
