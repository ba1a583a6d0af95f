use crate::state::AppState;
use axum::{
    middleware,
    routing::{get, post},
    Router,
};

pub mod messages;
pub mod rooms;

use messages::{get_message, get_room_messages, send_message};
use rooms::{
    add_member, create_group, create_or_find_direct, get_room, leave_room, list_members,
    list_rooms,
};

pub fn build_router(state: AppState) -> Router {
    // all request/response routes sit behind bearer auth; the WebSocket
    // endpoint verifies the same credential in its own handshake (browsers
    // cannot set headers on an upgrade), and /health stays open for probes
    let secured = Router::new()
        .route("/rooms/direct", post(create_or_find_direct))
        .route("/rooms", post(create_group).get(list_rooms))
        .route("/rooms/:id", get(get_room))
        .route("/rooms/:id/members", get(list_members).post(add_member))
        .route("/rooms/:id/leave", post(leave_room))
        .route("/rooms/:id/messages", get(get_room_messages))
        .route("/messages", post(send_message))
        .route("/messages/:id", get(get_message))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            crate::middleware::auth::auth_middleware,
        ));

    let live = Router::new().route("/ws", get(crate::websocket::handlers::ws_handler));

    Router::new()
        .route("/health", get(|| async { "OK" }))
        .nest("/api/v1", secured.merge(live))
        .with_state(state)
}
