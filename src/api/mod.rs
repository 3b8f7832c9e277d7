mod error;
mod health;
mod tokens;

use axum::{Router, middleware};
use std::sync::Arc;

use crate::db::{Database, SqliteRefreshTokenStore};
use crate::jwt::JwtCodec;
use crate::rate_limit::{IpLimiter, rate_limit_by_ip};
use crate::token_service::{StaticCredentials, TokenService};

pub use error::ApiError;

/// Token service as wired by the HTTP layer.
pub type AppTokenService = TokenService<JwtCodec, SqliteRefreshTokenStore, StaticCredentials>;

/// Create the API router.
///
/// `rate_limiter` guards the `/auth` routes only; health probes are never
/// throttled.
pub fn create_api_router(
    db: Database,
    service: Arc<AppTokenService>,
    rate_limiter: Option<Arc<IpLimiter>>,
) -> Router {
    let mut auth_router = tokens::router(tokens::TokensState { service });
    if let Some(limiter) = rate_limiter {
        auth_router = auth_router.layer(middleware::from_fn_with_state(limiter, rate_limit_by_ip));
    }

    Router::new()
        .nest("/auth", auth_router)
        .nest("/health", health::router(health::HealthState { db }))
}
