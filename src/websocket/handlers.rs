use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::auth::Identity;
use crate::services::MessageService;
use crate::state::AppState;
use crate::websocket::{ClientEvent, ServerEvent, SessionId};

#[derive(Debug, Deserialize)]
pub struct WsParams {
    pub token: Option<String>,
}

/// GET /api/v1/ws — authenticates once at handshake, then upgrades. A bad
/// credential refuses the connection before any subscription is possible.
pub async fn ws_handler(
    State(state): State<AppState>,
    Query(params): Query<WsParams>,
    headers: HeaderMap,
    ws: WebSocketUpgrade,
) -> Response {
    let token = params.token.or_else(|| {
        headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .and_then(|h| h.strip_prefix("Bearer "))
            .map(str::to_string)
    });

    let Some(token) = token else {
        return StatusCode::UNAUTHORIZED.into_response();
    };
    match state.auth.verify(&token).await {
        Ok(identity) => ws.on_upgrade(move |socket| handle_socket(state, identity, socket)),
        Err(e) => {
            warn!(error = %e, "websocket handshake rejected");
            StatusCode::UNAUTHORIZED.into_response()
        }
    }
}

async fn handle_socket(state: AppState, identity: Identity, socket: WebSocket) {
    let (session_id, mut rx) = state
        .registry
        .connect(identity.user_id, identity.handle.clone())
        .await;
    debug!(session_id = %session_id, user_id = %identity.user_id, "session connected");

    let (mut sender, mut receiver) = socket.split();

    loop {
        tokio::select! {
            // outbound: events fanned out to this session
            maybe = rx.recv() => {
                match maybe {
                    Some(msg) => {
                        if sender.send(msg).await.is_err() {
                            break;
                        }
                    }
                    None => break,
                }
            }

            // inbound: client events
            incoming = receiver.next() => {
                match incoming {
                    Some(Ok(Message::Text(text))) => {
                        match serde_json::from_str::<ClientEvent>(&text) {
                            Ok(event) => handle_client_event(&state, session_id, &identity, event).await,
                            Err(e) => debug!(session_id = %session_id, error = %e, "ignoring malformed client event"),
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(_)) => break,
                }
            }
        }
    }

    // remove the session before the socket halves drop, so a dispatch
    // racing this disconnect is a no-op instead of an error
    state.registry.disconnect(session_id).await;
    debug!(session_id = %session_id, "session disconnected");
}

async fn handle_client_event(
    state: &AppState,
    session_id: SessionId,
    identity: &Identity,
    event: ClientEvent,
) {
    match event {
        ClientEvent::JoinRoom { room_id } => {
            // subscription only; membership must already exist
            match state.repo.get_membership(room_id, identity.user_id).await {
                Ok(Some(_)) => {
                    state.registry.join(session_id, room_id).await;
                }
                Ok(None) => {
                    warn!(room_id = %room_id, user_id = %identity.user_id, "join_room from non-member ignored");
                }
                Err(e) => {
                    warn!(room_id = %room_id, error = %e, "join_room membership check failed");
                }
            }
        }
        ClientEvent::LeaveRoom { room_id } => {
            // drops the live feed only; persistent leave goes through the
            // request surface
            state.registry.leave(session_id, room_id).await;
        }
        ClientEvent::SendMessage {
            room_id,
            content,
            message_type,
        } => {
            if let Err(e) = MessageService::send(
                state.repo.as_ref(),
                &state.registry,
                &state.room_locks,
                room_id,
                identity.user_id,
                message_type,
                &content,
            )
            .await
            {
                warn!(room_id = %room_id, user_id = %identity.user_id, error = %e, "live send failed");
            }
        }
        ClientEvent::TypingStart { room_id } => {
            state
                .registry
                .dispatch_except(
                    room_id,
                    session_id,
                    &ServerEvent::UserTyping {
                        room_id,
                        handle: identity.handle.clone(),
                        is_typing: true,
                    },
                )
                .await;
        }
        ClientEvent::TypingStop { room_id } => {
            state
                .registry
                .dispatch_except(
                    room_id,
                    session_id,
                    &ServerEvent::UserTyping {
                        room_id,
                        handle: identity.handle.clone(),
                        is_typing: false,
                    },
                )
                .await;
        }
        ClientEvent::MessageRead {
            message_id,
            room_id,
        } => {
            // read state is not persisted; subscribers just get the counter
            // reset signal
            state
                .registry
                .dispatch(
                    room_id,
                    &ServerEvent::MessageReadUpdate {
                        message_id,
                        room_id,
                        unread_count: 0,
                    },
                )
                .await;
        }
    }
}
