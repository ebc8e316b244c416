//! WebSocket upgrade handler

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::Response,
};
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::app::AppState;
use crate::game::{GameCommand, MatchHandle};
use crate::matchmaking::Seat;
use crate::util::rate_limit::ConnectionRateLimiter;
use crate::util::time::{unix_millis, SIMULATION_TPS};
use crate::ws::protocol::{ClientMsg, ProtocolError, ServerMsg};

/// Longest display name kept, in characters
pub const MAX_NAME_LEN: usize = 24;

/// Query parameters for WebSocket connection
#[derive(Debug, Deserialize)]
pub struct WsQuery {
    #[serde(default)]
    pub name: Option<String>,
}

/// WebSocket upgrade handler
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(query): Query<WsQuery>,
    State(state): State<AppState>,
) -> Response {
    let player_id = Uuid::new_v4();
    let display_name = display_name(query.name.as_deref(), player_id);
    info!(player_id = %player_id, name = %display_name, "WebSocket upgrade");
    ws.on_upgrade(move |socket| handle_socket(socket, player_id, display_name, state))
}

/// Trimmed, length-capped name, or a generated one
pub fn display_name(requested: Option<&str>, player_id: Uuid) -> String {
    let trimmed: String = requested
        .unwrap_or_default()
        .trim()
        .chars()
        .filter(|c| !c.is_control())
        .take(MAX_NAME_LEN)
        .collect();
    if trimmed.is_empty() {
        format!("Player_{}", &player_id.simple().to_string()[..8])
    } else {
        trimmed
    }
}

/// Handle the upgraded WebSocket connection
async fn handle_socket(socket: WebSocket, player_id: Uuid, display_name: String, state: AppState) {
    let connection_id = Uuid::new_v4();
    let (mut ws_sink, ws_stream) = socket.split();

    let welcome = ServerMsg::Welcome {
        player_id,
        server_time: unix_millis(),
    };
    if let Err(e) = send_msg(&mut ws_sink, &welcome).await {
        error!(player_id = %player_id, error = %e, "Failed to send welcome");
        return;
    }

    let Seat {
        handle,
        slot,
        deltas,
    } = match state.matches.join(player_id, &display_name, connection_id) {
        Ok(seat) => seat,
        Err(e) => {
            warn!(player_id = %player_id, error = %e, "Join failed");
            let _ = send_msg(
                &mut ws_sink,
                &ServerMsg::JoinFailed {
                    reason: e.to_string(),
                },
            )
            .await;
            return;
        }
    };

    let joined = ServerMsg::MatchJoined {
        match_id: handle.id().to_string(),
        player_id,
        slot,
        tick_rate: SIMULATION_TPS,
        arena_width: state.config.game.arena_width,
        arena_height: state.config.game.arena_height,
    };
    if let Err(e) = send_msg(&mut ws_sink, &joined).await {
        debug!(player_id = %player_id, error = %e, "Failed to send join confirmation");
        handle.remove_player(&player_id);
        return;
    }
    info!(player_id = %player_id, match_id = %handle.id(), slot, "Player seated");

    run_session(player_id, &handle, ws_sink, ws_stream, deltas).await;

    handle.remove_player(&player_id);
    info!(player_id = %player_id, match_id = %handle.id(), "WebSocket connection closed");
}

/// Run the WebSocket session with read/write split
async fn run_session(
    player_id: Uuid,
    handle: &MatchHandle,
    mut ws_sink: SplitSink<WebSocket, Message>,
    mut ws_stream: SplitStream<WebSocket>,
    mut deltas: broadcast::Receiver<ServerMsg>,
) {
    let rate_limiter = ConnectionRateLimiter::new();
    let (direct_tx, mut direct_rx) = mpsc::unbounded_channel::<ServerMsg>();

    // Writer task: deltas and direct replies -> WebSocket
    let writer_handle = tokio::spawn(async move {
        loop {
            let msg = tokio::select! {
                direct = direct_rx.recv() => match direct {
                    Some(msg) => msg,
                    None => break,
                },
                delta = deltas.recv() => match delta {
                    Ok(msg) => msg,
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!(player_id = %player_id, lagged_count = n, "Client lagged, skipping deltas");
                        continue;
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        debug!(player_id = %player_id, "Delta channel closed");
                        break;
                    }
                },
            };
            if let Err(e) = send_msg(&mut ws_sink, &msg).await {
                debug!(player_id = %player_id, error = %e, "WebSocket send failed");
                break;
            }
        }
    });

    // Reader loop: WebSocket -> match queue
    while let Some(result) = ws_stream.next().await {
        let parsed = match result {
            Ok(Message::Text(text)) => ClientMsg::from_text(&text),
            Ok(Message::Binary(bytes)) => ClientMsg::from_binary(&bytes),
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => continue,
            Ok(Message::Close(_)) => {
                info!(player_id = %player_id, "Client initiated close");
                break;
            }
            Err(e) => {
                debug!(player_id = %player_id, error = %e, "WebSocket error");
                break;
            }
        };

        if !rate_limiter.check_input() {
            debug!(player_id = %player_id, "Rate limited input message");
            continue;
        }

        match parsed {
            Ok(ClientMsg::Ping { t }) => {
                let _ = direct_tx.send(ServerMsg::Pong { t });
            }
            Ok(ClientMsg::Leave) => {
                info!(player_id = %player_id, "Player asked to leave");
                break;
            }
            Ok(msg) => {
                let Some(command) = GameCommand::from_client(msg) else {
                    continue;
                };
                if !handle.enqueue(player_id, command) {
                    debug!(player_id = %player_id, "Match queue closed");
                    break;
                }
            }
            Err(e) => {
                warn!(player_id = %player_id, error = %e, "Failed to parse client message");
                let _ = direct_tx.send(ServerMsg::Error {
                    code: "bad_message".to_string(),
                    message: e.to_string(),
                });
            }
        }
    }

    writer_handle.abort();
}

/// Send a message over WebSocket as a MessagePack binary frame
async fn send_msg(
    sink: &mut SplitSink<WebSocket, Message>,
    msg: &ServerMsg,
) -> Result<(), SendError> {
    let bytes = msg.encode()?;
    sink.send(Message::Binary(bytes)).await?;
    Ok(())
}

#[derive(Debug, thiserror::Error)]
enum SendError {
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error("socket closed: {0}")]
    Socket(#[from] axum::Error),
}
