pub mod api;
pub mod auth;
pub mod cleanup;
pub mod cli;
pub mod clock;
pub mod db;
pub mod jwt;
pub mod rate_limit;
pub mod token_service;

use api::create_api_router;
use axum::Router;
use db::Database;
use jwt::JwtCodec;
use std::future::Future;
use std::net::SocketAddr;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use token_service::{StaticCredentials, TokenService};
use tracing::info;

pub struct ServerConfig {
    /// Database connection (cloneable, uses connection pool internally)
    pub db: Database,
    /// Secret for signing access tokens (HS256)
    pub jwt_secret: Vec<u8>,
    /// How long issued access tokens stay valid
    pub access_token_lifetime: Duration,
    /// Whether each refresh consumes the presented refresh token and issues a new one
    pub rotate_refresh_tokens: bool,
    /// The account allowed to log in
    pub credentials: StaticCredentials,
    /// Per-IP request limit for the /auth routes (None disables limiting)
    pub max_requests_per_second: Option<NonZeroU32>,
    /// Interval between expired refresh token sweeps
    pub cleanup_interval: Duration,
}

/// Create the application router with the given configuration.
pub fn create_app(config: &ServerConfig) -> Router {
    let codec = Arc::new(JwtCodec::with_access_lifetime(
        &config.jwt_secret,
        config.access_token_lifetime,
    ));

    let service = Arc::new(
        TokenService::new(
            codec,
            config.db.refresh_tokens(),
            config.credentials.clone(),
        )
        .with_rotation(config.rotate_refresh_tokens),
    );

    let rate_limiter = config
        .max_requests_per_second
        .map(rate_limit::ip_limiter);

    create_api_router(config.db.clone(), service, rate_limiter)
}

/// Run cleanup once and spawn the background scheduler.
/// Call this before starting the server.
pub async fn init_cleanup(db: &Database, interval: Duration) -> tokio::task::JoinHandle<()> {
    let store = db.refresh_tokens();
    cleanup::run_cleanup(&store).await;
    cleanup::spawn_cleanup_scheduler(store, interval)
}

/// Run the server on the given listener until `shutdown` resolves and
/// in-flight requests have completed.
/// Call `init_cleanup` before this to run cleanup on startup.
pub async fn run_server(
    config: ServerConfig,
    listener: TcpListener,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<(), std::io::Error> {
    let app = create_app(&config);
    let make_service = app.into_make_service_with_connect_info::<SocketAddr>();
    axum::serve(listener, make_service)
        .with_graceful_shutdown(shutdown)
        .await?;
    info!("Server stopped accepting connections");
    Ok(())
}
