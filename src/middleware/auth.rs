use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::auth::{AuthError, Identity};
use crate::error::AppError;
use crate::state::AppState;

/// Verifies the bearer credential on every API request and stashes the
/// resulting identity in request extensions. The WebSocket handshake runs
/// the same verification through its own handler, since browsers cannot
/// attach headers to an upgrade.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = req
        .headers()
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .ok_or(AuthError::MissingCredential)?;

    let identity = state.auth.verify(token).await?;
    req.extensions_mut().insert(identity);
    Ok(next.run(req).await)
}

/// The authenticated caller, extracted from what the middleware verified.
#[derive(Debug, Clone)]
pub struct User {
    pub id: Uuid,
    pub handle: String,
}

#[async_trait]
impl<S> FromRequestParts<S> for User
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let identity = parts
            .extensions
            .get::<Identity>()
            .cloned()
            .ok_or(AuthError::MissingCredential)?;

        Ok(User {
            id: identity.user_id,
            handle: identity.handle,
        })
    }
}
