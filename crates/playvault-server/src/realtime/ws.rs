//! WebSocket endpoint.
//!
//! The first frame a client sends must be `authenticate`; everything else
//! is dropped until the socket is bound to a user. After that the socket
//! can join/leave game rooms, relay game events, and request profile syncs.

use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::Response;
use serde::Deserialize;
use serde_json::json;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::routes::AppState;

use super::registry::Event;

const OUTBOX_CAPACITY: usize = 64;

#[derive(Debug, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
enum ClientFrame {
    Authenticate { token: String, user_id: String },
    JoinGame { game_code: String },
    LeaveGame { game_code: String },
    SyncRequest { user_id: String },
    GameEvent {
        game_code: String,
        payload: serde_json::Value,
    },
}

pub async fn ws_handler(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(mut socket: WebSocket, state: AppState) {
    let (tx, mut rx) = mpsc::channel::<String>(OUTBOX_CAPACITY);
    let mut session: Option<(String, String)> = None; // (conn_id, user_id)

    loop {
        tokio::select! {
            incoming = socket.recv() => {
                let Some(Ok(message)) = incoming else { break };
                let Message::Text(text) = message else { continue };
                handle_frame(&state, &tx, &mut session, text.as_str()).await;
            }
            outgoing = rx.recv() => {
                // The sender side never closes while this loop runs.
                let Some(outgoing) = outgoing else { break };
                if socket.send(Message::Text(outgoing.into())).await.is_err() {
                    break;
                }
            }
        }
    }

    if let Some((conn_id, user_id)) = session {
        state.registry.unregister(&conn_id).await;
        state
            .registry
            .emit_to_user(
                &user_id,
                &Event::new("device_disconnected", json!({ "userId": user_id })),
            )
            .await;
    }
}

async fn handle_frame(
    state: &AppState,
    tx: &mpsc::Sender<String>,
    session: &mut Option<(String, String)>,
    text: &str,
) {
    let frame: ClientFrame = match serde_json::from_str(text) {
        Ok(frame) => frame,
        Err(e) => {
            debug!(error = %e, "Dropping malformed frame");
            return;
        }
    };

    match (frame, &*session) {
        (ClientFrame::Authenticate { token, user_id }, None) => {
            match authenticate(state, &token, &user_id).await {
                Ok(()) => {
                    let conn_id = state.registry.register(&user_id, tx.clone()).await;
                    let _ = tx
                        .send(Event::new("authenticated", json!({ "userId": user_id })).to_message())
                        .await;
                    state
                        .registry
                        .emit_to_user(
                            &user_id,
                            &Event::new("device_connected", json!({ "userId": user_id })),
                        )
                        .await;
                    *session = Some((conn_id, user_id));
                }
                Err(reason) => {
                    warn!(user_id, reason, "Socket authentication failed");
                    let _ = tx
                        .send(
                            Event::new("authentication_failed", json!({ "reason": reason }))
                                .to_message(),
                        )
                        .await;
                }
            }
        }
        (ClientFrame::Authenticate { .. }, Some(_)) => {
            debug!("Duplicate authenticate frame ignored");
        }
        (ClientFrame::JoinGame { game_code }, Some((conn_id, _))) => {
            state.registry.join_room(conn_id, &game_code).await;
        }
        (ClientFrame::LeaveGame { game_code }, Some((conn_id, _))) => {
            state.registry.leave_room(conn_id, &game_code).await;
        }
        (ClientFrame::SyncRequest { user_id }, Some(_)) => {
            state
                .registry
                .emit_to_user(&user_id, &Event::new("sync_requested", json!({})))
                .await;
        }
        (ClientFrame::GameEvent { game_code, payload }, Some((conn_id, _))) => {
            state
                .registry
                .emit_to_room(
                    &game_code,
                    &Event::new(format!("game-{game_code}"), payload),
                    Some(conn_id.as_str()),
                )
                .await;
        }
        (_, None) => {
            debug!("Frame before authentication dropped");
        }
    }
}

async fn authenticate(state: &AppState, token: &str, user_id: &str) -> Result<(), &'static str> {
    let claims = state
        .jwt
        .validate(token)
        .map_err(|_| "Invalid or expired token")?;
    if claims.sub != user_id {
        return Err("Token does not belong to this user");
    }
    let gamer = state
        .db
        .get_gamer(user_id)
        .await
        .map_err(|_| "Account not found")?;
    if gamer.is_blocked {
        return Err("Account is blocked");
    }
    Ok(())
}
