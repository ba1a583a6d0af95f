use chat_service::auth::{Authenticator, JwtAuthenticator};
use chat_service::repository::{PgRepository, Repository};
use chat_service::{config, db, error, logging, migrations, routes, state::AppState};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), error::AppError> {
    logging::init_tracing();
    let cfg = Arc::new(config::Config::from_env()?);

    let pool = db::init_pool(&cfg)
        .await
        .map_err(|e| error::AppError::StartServer(format!("db: {e}")))?;

    // schema must be in sync before serving traffic
    migrations::run_all(&pool)
        .await
        .map_err(|e| error::AppError::StartServer(format!("migrations: {e}")))?;

    let repo: Arc<dyn Repository> = Arc::new(PgRepository::new(pool));
    let auth: Arc<dyn Authenticator> = Arc::new(JwtAuthenticator::new(&cfg.jwt_secret));
    let state = AppState::new(repo, auth, cfg.clone());

    let app = routes::build_router(state);
    let bind_addr = format!("0.0.0.0:{}", cfg.port);
    tracing::info!(%bind_addr, "starting chat-service");

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .map_err(|e| error::AppError::StartServer(e.to_string()))?;
    axum::serve(listener, app)
        .await
        .map_err(|e| error::AppError::StartServer(e.to_string()))?;

    Ok(())
}
