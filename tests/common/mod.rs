use chat_service::auth::{Authenticator, Claims, JwtAuthenticator};
use chat_service::config::Config;
use chat_service::repository::{MemRepository, Repository};
use chat_service::routes;
use chat_service::state::AppState;
use jsonwebtoken::{encode, EncodingKey, Header};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

pub const TEST_SECRET: &str = "test-secret";

#[allow(dead_code)]
pub fn test_state() -> (AppState, Arc<MemRepository>) {
    let repo = Arc::new(MemRepository::new());
    let dyn_repo: Arc<dyn Repository> = repo.clone();
    let auth: Arc<dyn Authenticator> = Arc::new(JwtAuthenticator::new(TEST_SECRET));
    let config = Arc::new(Config {
        database_url: "unused-in-tests".into(),
        port: 0,
        jwt_secret: TEST_SECRET.into(),
        db_max_connections: 1,
    });
    (AppState::new(dyn_repo, auth, config), repo)
}

#[allow(dead_code)]
pub fn token_for(user_id: Uuid, handle: &str) -> String {
    let claims = Claims {
        sub: user_id.to_string(),
        handle: handle.to_string(),
        exp: chrono::Utc::now().timestamp() + 3600,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(TEST_SECRET.as_bytes()),
    )
    .expect("encode test token")
}

/// Binds the app on an ephemeral port and serves it in the background.
#[allow(dead_code)]
pub async fn spawn_app(state: AppState) -> SocketAddr {
    let app = routes::build_router(state);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind test listener");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve test app");
    });
    addr
}

/// Polls until the condition holds or the deadline passes.
#[allow(dead_code)]
pub async fn wait_until<F, Fut>(mut condition: F)
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        if condition().await {
            return;
        }
        if tokio::time::Instant::now() > deadline {
            panic!("condition not met within deadline");
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
