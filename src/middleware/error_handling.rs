use crate::error::AppError;
use axum::{http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: &'static str,
    pub message: String,
    pub status: u16,
}

/// Maps domain errors to HTTP responses. Client-facing errors stay specific
/// so callers never have to guess; store failures collapse to a generic 500.
pub fn map_error(err: &AppError) -> (StatusCode, ErrorResponse) {
    let status =
        StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let code = match err {
        AppError::BadRequest(_) => "INVALID_REQUEST",
        AppError::InvalidParticipants(_) => "INVALID_PARTICIPANTS",
        AppError::Auth(_) => "AUTH_ERROR",
        AppError::NotMember => "NOT_MEMBER",
        AppError::RoomNotFound => "ROOM_NOT_FOUND",
        AppError::MessageNotFound => "MESSAGE_NOT_FOUND",
        AppError::Config(_) | AppError::StartServer(_) => "SERVER_ERROR",
        AppError::Store(_) => "STORE_ERROR",
    };

    let response = ErrorResponse {
        error: ErrorDetail {
            code,
            message: err.to_string(),
            status: status.as_u16(),
        },
    };
    (status, response)
}

pub fn into_response(err: AppError) -> impl IntoResponse {
    let (status, response) = map_error(&err);
    (status, Json(response))
}
