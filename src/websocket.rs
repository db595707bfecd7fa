// src/websocket.rs

use crate::{
    error::{RelayError, Result},
    models::{ClientEvent, ConnectionId, RoomKey, SenderRole, ServerEvent},
    state::RelayState,
};
use axum::{
    extract::{
        State, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    response::IntoResponse,
};
use futures_util::{
    sink::SinkExt,
    stream::{SplitSink, SplitStream, StreamExt},
};
use tokio::sync::mpsc::Receiver;
use tracing::{debug, info, warn};

/// The main handler for WebSocket connections.
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<RelayState>,
) -> impl IntoResponse {
    debug!("new client connecting");
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Liveness probe for whatever fronts the relay.
pub async fn health() -> &'static str {
    "ok"
}

/// Manages the lifecycle of a client. A client receives nothing until it joins a room.
async fn handle_socket(socket: WebSocket, state: RelayState) {
    let (sender, receiver) = socket.split();
    let (client_id, outbound) = state.registry.lock().await.connect();
    info!(connection = %client_id, "client connected");

    let mut send_task = tokio::spawn(write_to_client(sender, outbound, client_id));
    let mut receive_task = tokio::spawn(read_from_client(receiver, client_id, state.clone()));

    // Whichever half finishes first takes the other down with it.
    tokio::select! {
        _ = &mut receive_task => send_task.abort(),
        _ = &mut send_task => receive_task.abort(),
    }

    cleanup_client(&state, client_id).await;
}

/// Drains the connection's outbound queue into the socket.
async fn write_to_client(
    mut sender: SplitSink<WebSocket, Message>,
    mut outbound: Receiver<ServerEvent>,
    client_id: ConnectionId,
) {
    while let Some(event) = outbound.recv().await {
        let text = match serde_json::to_string(&event) {
            Ok(text) => text,
            Err(e) => {
                warn!(connection = %client_id, "failed to serialize event: {}", e);
                continue;
            }
        };
        if sender.send(Message::Text(text.into())).await.is_err() {
            debug!(connection = %client_id, "socket closed while sending");
            return;
        }
    }

    // The registry let go of this connection (relay shutdown).
    let _ = sender.send(Message::Close(None)).await;
}

/// Reads frames from a client and dispatches the events they carry.
async fn read_from_client(
    mut receiver: SplitStream<WebSocket>,
    client_id: ConnectionId,
    state: RelayState,
) {
    while let Some(frame) = receiver.next().await {
        let msg = match frame {
            Ok(msg) => msg,
            Err(e) => {
                debug!(connection = %client_id, "transport error: {}", e);
                break;
            }
        };

        match msg {
            Message::Text(text) => {
                if let Err(e) = handle_event(&text, client_id, &state).await {
                    warn!(connection = %client_id, kind = ?e.kind(), "rejected event: {}", e);
                    report_error(&state, client_id, &e).await;
                }
            }
            Message::Close(_) => break,
            _ => {}
        }
    }
}

async fn handle_event(text: &str, client_id: ConnectionId, state: &RelayState) -> Result<()> {
    match serde_json::from_str::<ClientEvent>(text)? {
        ClientEvent::Join {
            user_id,
            trainer_id,
        } => handle_join(&user_id, &trainer_id, client_id, state).await,
        ClientEvent::Message {
            content,
            sender_role,
            user_id,
            trainer_id,
        } => {
            let addressed = user_id.zip(trainer_id);
            handle_chat_message(&content, sender_role, addressed, client_id, state).await
        }
    }
}

/// Moves the client into the room for the given pair and acknowledges it.
async fn handle_join(
    user_id: &str,
    trainer_id: &str,
    client_id: ConnectionId,
    state: &RelayState,
) -> Result<()> {
    let mut registry = state.registry.lock().await;
    let room = registry.join(client_id, user_id, trainer_id)?;
    registry.notify(
        client_id,
        ServerEvent::Joined {
            room: room.to_string(),
        },
    );
    Ok(())
}

/// Relays a chat message to the client's room.
async fn handle_chat_message(
    content: &str,
    sender_role: SenderRole,
    addressed: Option<(String, String)>,
    client_id: ConnectionId,
    state: &RelayState,
) -> Result<()> {
    let mut registry = state.registry.lock().await;

    let joined = registry.room_of(client_id)?.ok_or(RelayError::NotJoined)?;
    if let Some((user_id, trainer_id)) = addressed {
        let requested = RoomKey::new(registry.keying(), &user_id, &trainer_id);
        if *joined != requested {
            return Err(RelayError::RoomMismatch {
                joined: joined.clone(),
                requested,
            });
        }
    }

    if content.trim().is_empty() {
        debug!(connection = %client_id, room = %joined, "ignoring blank message");
        return Ok(());
    }

    registry.send(client_id, content, sender_role)?;
    Ok(())
}

async fn report_error(state: &RelayState, client_id: ConnectionId, error: &RelayError) {
    state.registry.lock().await.notify(
        client_id,
        ServerEvent::Error {
            kind: error.kind(),
            message: error.to_string(),
        },
    );
}

/// Removes a client from the registry once its socket is gone.
async fn cleanup_client(state: &RelayState, client_id: ConnectionId) {
    let removed = state.registry.lock().await.disconnect(client_id);
    if removed {
        info!(connection = %client_id, "client disconnected");
    }
}
