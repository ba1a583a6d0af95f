use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;
use crate::middleware::auth::User;
use crate::models::{Membership, MessageDto, Room};
use crate::services::{MembershipService, RoomService};
use crate::state::AppState;
use crate::websocket::{RoomAction, ServerEvent};

#[derive(Debug, Serialize)]
pub struct RoomDto {
    pub id: Uuid,
    pub name: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<Room> for RoomDto {
    fn from(room: Room) -> Self {
        RoomDto {
            id: room.id,
            name: room.name,
            created_at: room.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MemberDto {
    pub user_id: Uuid,
    pub joined_at: DateTime<Utc>,
    pub visible: bool,
    pub left_at: Option<DateTime<Utc>>,
}

impl From<Membership> for MemberDto {
    fn from(m: Membership) -> Self {
        MemberDto {
            user_id: m.user_id,
            joined_at: m.joined_at,
            visible: m.visible,
            left_at: m.left_at,
        }
    }
}

#[derive(Deserialize)]
pub struct DirectRoomRequest {
    pub participant_ids: Vec<Uuid>,
}

#[derive(Serialize)]
pub struct DirectRoomResponse {
    pub room: RoomDto,
    pub created: bool,
}

/// POST /api/v1/rooms/direct — create-or-find the 1:1 room for a pair.
pub async fn create_or_find_direct(
    State(state): State<AppState>,
    user: User,
    Json(body): Json<DirectRoomRequest>,
) -> Result<(StatusCode, Json<DirectRoomResponse>), AppError> {
    let outcome = RoomService::find_or_create_direct(
        state.repo.as_ref(),
        &state.pair_locks,
        user.id,
        &body.participant_ids,
    )
    .await?;

    if outcome.created {
        state
            .registry
            .broadcast_global(&ServerEvent::ChatRoomUpdated {
                room_id: outcome.room.id,
                action: RoomAction::Created,
                user_id: Some(user.id),
                last_message: None,
                last_message_at: None,
            })
            .await;
    }

    let status = if outcome.created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((
        status,
        Json(DirectRoomResponse {
            room: outcome.room.into(),
            created: outcome.created,
        }),
    ))
}

#[derive(Deserialize)]
pub struct CreateGroupRequest {
    pub name: Option<String>,
    #[serde(default)]
    pub member_ids: Vec<Uuid>,
}

/// POST /api/v1/rooms — create a group room; creator plus members land as
/// one atomic set-insertion.
pub async fn create_group(
    State(state): State<AppState>,
    user: User,
    Json(body): Json<CreateGroupRequest>,
) -> Result<(StatusCode, Json<RoomDto>), AppError> {
    let room =
        RoomService::create_group(state.repo.as_ref(), user.id, body.name, &body.member_ids)
            .await?;

    state
        .registry
        .broadcast_global(&ServerEvent::ChatRoomUpdated {
            room_id: room.id,
            action: RoomAction::Created,
            user_id: Some(user.id),
            last_message: None,
            last_message_at: None,
        })
        .await;

    Ok((StatusCode::CREATED, Json(room.into())))
}

#[derive(Serialize)]
pub struct RoomOverviewDto {
    pub id: Uuid,
    pub name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub visible: bool,
    pub last_message: Option<MessageDto>,
    pub participants: Vec<MemberDto>,
}

#[derive(Serialize)]
pub struct RoomListResponse {
    pub rooms: Vec<RoomOverviewDto>,
}

/// GET /api/v1/rooms — the caller's visible rooms with last message and
/// participants.
pub async fn list_rooms(
    State(state): State<AppState>,
    user: User,
) -> Result<Json<RoomListResponse>, AppError> {
    let overviews = RoomService::list_overviews(state.repo.as_ref(), user.id).await?;
    let rooms = overviews
        .into_iter()
        .map(|o| RoomOverviewDto {
            id: o.room.id,
            name: o.room.name,
            created_at: o.room.created_at,
            visible: o.membership.visible,
            last_message: o.last_message.map(Into::into),
            participants: o.participants.into_iter().map(Into::into).collect(),
        })
        .collect();
    Ok(Json(RoomListResponse { rooms }))
}

#[derive(Serialize)]
pub struct RoomDetailResponse {
    pub room: RoomDto,
    pub members: Vec<MemberDto>,
}

/// GET /api/v1/rooms/{id} — room detail with members, members only.
pub async fn get_room(
    State(state): State<AppState>,
    user: User,
    Path(room_id): Path<Uuid>,
) -> Result<Json<RoomDetailResponse>, AppError> {
    let (room, members) = RoomService::detail(state.repo.as_ref(), room_id, user.id).await?;
    Ok(Json(RoomDetailResponse {
        room: room.into(),
        members: members.into_iter().map(Into::into).collect(),
    }))
}

#[derive(Serialize)]
pub struct MemberListResponse {
    pub members: Vec<MemberDto>,
}

/// GET /api/v1/rooms/{id}/members — member list, members only.
pub async fn list_members(
    State(state): State<AppState>,
    user: User,
    Path(room_id): Path<Uuid>,
) -> Result<Json<MemberListResponse>, AppError> {
    let (_room, members) = RoomService::detail(state.repo.as_ref(), room_id, user.id).await?;
    Ok(Json(MemberListResponse {
        members: members.into_iter().map(Into::into).collect(),
    }))
}

#[derive(Deserialize)]
pub struct AddMemberRequest {
    pub user_id: Uuid,
}

/// POST /api/v1/rooms/{id}/members — add a user as an ACTIVE member.
pub async fn add_member(
    State(state): State<AppState>,
    user: User,
    Path(room_id): Path<Uuid>,
    Json(body): Json<AddMemberRequest>,
) -> Result<StatusCode, AppError> {
    RoomService::add_member(state.repo.as_ref(), room_id, user.id, body.user_id).await?;

    state
        .registry
        .broadcast_global(&ServerEvent::ChatRoomUpdated {
            room_id,
            action: RoomAction::Joined,
            user_id: Some(body.user_id),
            last_message: None,
            last_message_at: None,
        })
        .await;

    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/rooms/{id}/leave — soft leave; the room stays for everyone
/// else, reappears for the leaver on new activity, and is reclaimed once
/// nobody visible remains.
pub async fn leave_room(
    State(state): State<AppState>,
    user: User,
    Path(room_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    MembershipService::leave(state.repo.as_ref(), &state.room_locks, room_id, user.id).await?;

    state
        .registry
        .broadcast_global(&ServerEvent::ChatRoomUpdated {
            room_id,
            action: RoomAction::Left,
            user_id: Some(user.id),
            last_message: None,
            last_message_at: None,
        })
        .await;

    Ok(StatusCode::NO_CONTENT)
}
