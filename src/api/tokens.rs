//! Token lifecycle API endpoints.
//!
//! - POST `/login` - Exchange credentials for an access/refresh token pair
//! - POST `/refresh` - Exchange a refresh token for a new access token
//! - POST `/logout` - Revoke a refresh token
//! - GET `/verify` - Check the bearer token and return its subject
//! - POST `/logout-all` - Revoke every refresh token of the bearer's subject

use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    middleware,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::AppTokenService;
use super::error::{ApiError, require_field};
use crate::auth::{Authenticated, require_bearer};
use crate::jwt::JwtCodec;

#[derive(Clone)]
pub struct TokensState {
    pub service: Arc<AppTokenService>,
}

pub fn router(state: TokensState) -> Router {
    let protected = Router::new()
        .route("/verify", get(verify_token))
        .route("/logout-all", post(logout_all))
        .route_layer(middleware::from_fn_with_state(
            state.service.codec().clone(),
            require_bearer::<JwtCodec>,
        ));

    Router::new()
        .route("/login", post(login))
        .route("/refresh", post(refresh_token))
        .route("/logout", post(logout))
        .merge(protected)
        .with_state(state)
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct LoginRequest {
    username: String,
    password: String,
}

#[derive(Serialize)]
struct LoginResponse {
    access_token: String,
    refresh_token: String,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct RefreshRequest {
    refresh_token: String,
}

#[derive(Serialize)]
struct RefreshResponse {
    access_token: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    refresh_token: Option<String>,
}

#[derive(Serialize)]
struct LogoutResponse {
    success: bool,
}

#[derive(Serialize)]
struct VerifyResponse {
    subject: String,
}

#[derive(Serialize)]
struct LogoutAllResponse {
    revoked: u64,
}

async fn login(
    State(state): State<TokensState>,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<LoginResponse>, ApiError> {
    let Json(req) = body?;
    require_field(&req.username, "username")?;
    require_field(&req.password, "password")?;

    let pair = state
        .service
        .authenticate(&req.username, &req.password)
        .await?;

    Ok(Json(LoginResponse {
        access_token: pair.access_token,
        refresh_token: pair.refresh_token,
    }))
}

/// Unknown, revoked and expired refresh tokens all answer with the same 401.
async fn refresh_token(
    State(state): State<TokensState>,
    body: Result<Json<RefreshRequest>, JsonRejection>,
) -> Result<Json<RefreshResponse>, ApiError> {
    let Json(req) = body?;
    require_field(&req.refresh_token, "refresh_token")?;

    let refreshed = state.service.refresh(&req.refresh_token).await?;

    Ok(Json(RefreshResponse {
        access_token: refreshed.access_token,
        refresh_token: refreshed.refresh_token,
    }))
}

/// Revoke the presented refresh token. Succeeds whether or not it was live.
async fn logout(
    State(state): State<TokensState>,
    body: Result<Json<RefreshRequest>, JsonRejection>,
) -> Result<Json<LogoutResponse>, ApiError> {
    let Json(req) = body?;
    require_field(&req.refresh_token, "refresh_token")?;

    state.service.logout(&req.refresh_token).await;

    Ok(Json(LogoutResponse { success: true }))
}

async fn verify_token(Authenticated(subject): Authenticated) -> Json<VerifyResponse> {
    Json(VerifyResponse { subject: subject.0 })
}

async fn logout_all(
    State(state): State<TokensState>,
    Authenticated(subject): Authenticated,
) -> Result<Json<LogoutAllResponse>, ApiError> {
    let revoked = state.service.logout_everywhere(subject.as_str()).await?;
    Ok(Json(LogoutAllResponse { revoked }))
}
