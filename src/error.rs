use crate::auth::AuthError;
use crate::middleware::error_handling;
use crate::repository::StoreError;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        error_handling::into_response(self).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("server start failure: {0}")]
    StartServer(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("invalid participants: {0}")]
    InvalidParticipants(String),

    #[error("not a member of this room")]
    NotMember,

    #[error("room not found")]
    RoomNotFound,

    #[error("message not found")]
    MessageNotFound,

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("storage error: {0}")]
    Store(#[from] StoreError),
}

impl AppError {
    /// Returns HTTP status code
    pub fn status_code(&self) -> u16 {
        match self {
            AppError::BadRequest(_) | AppError::InvalidParticipants(_) => 400,
            AppError::Auth(_) => 401,
            AppError::NotMember => 403,
            AppError::RoomNotFound | AppError::MessageNotFound => 404,
            AppError::Config(_) | AppError::StartServer(_) | AppError::Store(_) => 500,
        }
    }
}
