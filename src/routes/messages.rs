use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;
use crate::middleware::auth::User;
use crate::models::{MessageDto, MessageType};
use crate::services::MessageService;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct SendMessageRequest {
    pub room_id: Uuid,
    pub content: String,
    #[serde(default)]
    pub message_type: MessageType,
}

#[derive(Serialize)]
pub struct SendMessageResponse {
    pub message: MessageDto,
    /// False when the message was stored but the reveal step kept failing;
    /// the room will reappear for hidden members on the next append.
    pub revealed: bool,
}

/// POST /api/v1/messages — non-live send fallback. Shares the exact
/// append + reveal + fan-out path with the WebSocket surface.
pub async fn send_message(
    State(state): State<AppState>,
    user: User,
    Json(body): Json<SendMessageRequest>,
) -> Result<(StatusCode, Json<SendMessageResponse>), AppError> {
    let outcome = MessageService::send(
        state.repo.as_ref(),
        &state.registry,
        &state.room_locks,
        body.room_id,
        user.id,
        body.message_type,
        &body.content,
    )
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(SendMessageResponse {
            message: outcome.message.into(),
            revealed: outcome.revealed,
        }),
    ))
}

#[derive(Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Serialize)]
pub struct MessageHistoryResponse {
    pub messages: Vec<MessageDto>,
}

/// GET /api/v1/rooms/{id}/messages — history page for the caller, oldest
/// first for display. A member who soft-left sees the room frozen at their
/// leave time.
pub async fn get_room_messages(
    State(state): State<AppState>,
    user: User,
    Path(room_id): Path<Uuid>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<MessageHistoryResponse>, AppError> {
    let page = MessageService::history(
        state.repo.as_ref(),
        room_id,
        user.id,
        query.limit.unwrap_or(50),
        query.offset.unwrap_or(0),
    )
    .await?;

    // the page comes newest-first; flip it for chronological display
    let messages = page.into_iter().rev().map(Into::into).collect();
    Ok(Json(MessageHistoryResponse { messages }))
}

#[derive(Serialize)]
pub struct MessageResponse {
    pub message: MessageDto,
}

/// GET /api/v1/messages/{id} — single message, room members only.
pub async fn get_message(
    State(state): State<AppState>,
    user: User,
    Path(message_id): Path<Uuid>,
) -> Result<Json<MessageResponse>, AppError> {
    let message = MessageService::get(state.repo.as_ref(), message_id, user.id).await?;
    Ok(Json(MessageResponse {
        message: message.into(),
    }))
}
