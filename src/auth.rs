use async_trait::async_trait;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// The verified identity behind a request or a live connection.
#[derive(Debug, Clone)]
pub struct Identity {
    pub user_id: Uuid,
    pub handle: String,
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("missing credential")]
    MissingCredential,

    #[error("invalid credential")]
    InvalidCredential,

    #[error("expired credential")]
    Expired,
}

/// Credential verification collaborator. Issuance lives elsewhere; this
/// service only ever validates. The same implementation serves request-time
/// and WebSocket-handshake-time authorization.
#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn verify(&self, credential: &str) -> Result<Identity, AuthError>;
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub handle: String,
    pub exp: i64,
}

pub struct JwtAuthenticator {
    decoding: DecodingKey,
    validation: Validation,
}

impl JwtAuthenticator {
    pub fn new(secret: &str) -> Self {
        let validation = Validation::new(Algorithm::HS256);
        Self {
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }
}

#[async_trait]
impl Authenticator for JwtAuthenticator {
    async fn verify(&self, credential: &str) -> Result<Identity, AuthError> {
        let data = decode::<Claims>(credential, &self.decoding, &self.validation).map_err(|e| {
            match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::Expired,
                _ => AuthError::InvalidCredential,
            }
        })?;

        let user_id =
            Uuid::parse_str(&data.claims.sub).map_err(|_| AuthError::InvalidCredential)?;

        Ok(Identity {
            user_id,
            handle: data.claims.handle,
        })
    }
}
