//! WebSocket transport for the scenario-room pub/sub (§6): clients emit
//! `join:scenario <id>` / `leave:scenario <id>` text frames, the server
//! forwards every `BroadcastAdapter` event for the joined room as a JSON
//! text frame. Grounded in the teacher's socket handler shape (split
//! sender/receiver, a background forwarding task, a keepalive ping) but
//! built on a `broadcast::Receiver` per room rather than one global event
//! bus, since rooms here are scenario-scoped (§5, §6).

use std::time::Duration;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::types::ScenarioId;

use super::AppState;

const KEEPALIVE_INTERVAL_SECS: u64 = 25;

pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
enum ClientFrame {
    #[serde(rename = "join:scenario")]
    JoinScenario { id: uuid::Uuid },
    #[serde(rename = "leave:scenario")]
    LeaveScenario { id: uuid::Uuid },
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let (mut sender, mut receiver) = socket.split();

    // No room is joined until the client asks — the connection starts idle.
    let mut current_room: Option<(ScenarioId, broadcast::Receiver<crate::broadcast::Event>)> = None;

    loop {
        tokio::select! {
            event = recv_from_room(&mut current_room) => {
                match event {
                    Ok(event) => {
                        let Ok(text) = serde_json::to_string(&event) else { continue };
                        if sender.send(Message::Text(text)).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "websocket client lagged behind scenario room, events dropped");
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        current_room = None;
                    }
                }
            }
            incoming = receiver.next() => {
                match incoming {
                    Some(Ok(Message::Text(text))) => {
                        match serde_json::from_str::<ClientFrame>(&text) {
                            Ok(ClientFrame::JoinScenario { id }) => {
                                let scenario_id = ScenarioId::from(id);
                                current_room = Some((scenario_id, state.broadcast.join(scenario_id)));
                                debug!(%scenario_id, "websocket client joined scenario room");
                            }
                            Ok(ClientFrame::LeaveScenario { id }) => {
                                if current_room.as_ref().map(|(room, _)| *room) == Some(ScenarioId::from(id)) {
                                    current_room = None;
                                }
                            }
                            Err(err) => {
                                debug!(error = %err, "ignoring malformed websocket frame");
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(err)) => {
                        warn!(error = %err, "websocket receive error");
                        break;
                    }
                }
            }
            _ = tokio::time::sleep(Duration::from_secs(KEEPALIVE_INTERVAL_SECS)) => {
                if sender.send(Message::Ping(Vec::new())).await.is_err() {
                    break;
                }
            }
        }
    }

    if let Some((scenario_id, _)) = current_room {
        state.broadcast.remove_if_empty(scenario_id);
    }
}

/// Awaits the next event on the joined room, or never resolves if no room
/// is joined — lets the surrounding `select!` fall through to the other
/// arms instead of busy-looping.
async fn recv_from_room(
    room: &mut Option<(ScenarioId, broadcast::Receiver<crate::broadcast::Event>)>,
) -> Result<crate::broadcast::Event, broadcast::error::RecvError> {
    match room {
        Some((_, rx)) => rx.recv().await,
        None => std::future::pending().await,
    }
}
