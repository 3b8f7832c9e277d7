//! Login, refresh and logout over the access token codec and the refresh
//! token store.
//!
//! This is the only place that mints or revokes refresh tokens. A refresh
//! token moves from issued to consumed exactly once (logout, rotation, or
//! being presented after expiry) and is never brought back.

use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::RngCore;
use tracing::{error, info, warn};

use crate::clock::unix_now;
use crate::db::{RefreshTokenRecord, RefreshTokenStore};
use crate::jwt::AccessTokenCodec;

/// Refresh token lifetime: 7 days.
pub const REFRESH_TOKEN_LIFETIME: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Random bytes per refresh token (256 bits).
const REFRESH_TOKEN_BYTES: usize = 32;

/// Errors surfaced by the token service.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("invalid token")]
    InvalidToken,
    #[error("token expired")]
    TokenExpired,
    /// Persistence or signing failure. Never an authentication outcome.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AuthError {
    fn internal(context: &str, e: impl Display) -> Self {
        error!(error = %e, "{}", context);
        Self::Internal(format!("{}: {}", context, e))
    }
}

/// Verifies a username/password pair and resolves it to a subject.
pub trait CredentialVerifier: Send + Sync {
    fn verify(
        &self,
        username: &str,
        password: &str,
    ) -> impl Future<Output = Result<String, AuthError>> + Send;
}

/// A single configured account.
#[derive(Clone)]
pub struct StaticCredentials {
    username: String,
    password: String,
    subject: String,
}

impl StaticCredentials {
    pub fn new(
        username: impl Into<String>,
        password: impl Into<String>,
        subject: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            subject: subject.into(),
        }
    }
}

impl CredentialVerifier for StaticCredentials {
    async fn verify(&self, username: &str, password: &str) -> Result<String, AuthError> {
        // Compare both fields before deciding so timing does not reveal which one matched.
        let username_ok = constant_time_eq::constant_time_eq(
            username.as_bytes(),
            self.username.as_bytes(),
        );
        let password_ok = constant_time_eq::constant_time_eq(
            password.as_bytes(),
            self.password.as_bytes(),
        );

        if username_ok & password_ok {
            Ok(self.subject.clone())
        } else {
            Err(AuthError::InvalidCredentials)
        }
    }
}

/// Tokens returned by a successful login.
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Result of a refresh. `refresh_token` is only set when rotation is enabled.
#[derive(Debug, Clone)]
pub struct Refreshed {
    pub access_token: String,
    pub refresh_token: Option<String>,
}

/// Generate an opaque refresh token from the thread-local CSPRNG.
pub fn generate_refresh_token() -> String {
    let mut bytes = [0u8; REFRESH_TOKEN_BYTES];
    rand::rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

pub struct TokenService<C, S, V> {
    codec: Arc<C>,
    store: S,
    verifier: V,
    rotate_refresh_tokens: bool,
}

impl<C, S, V> TokenService<C, S, V>
where
    C: AccessTokenCodec + Send + Sync,
    S: RefreshTokenStore,
    V: CredentialVerifier,
{
    pub fn new(codec: Arc<C>, store: S, verifier: V) -> Self {
        Self {
            codec,
            store,
            verifier,
            rotate_refresh_tokens: false,
        }
    }

    /// Consume the presented refresh token on every refresh and issue a new one.
    pub fn with_rotation(mut self, rotate: bool) -> Self {
        self.rotate_refresh_tokens = rotate;
        self
    }

    pub fn codec(&self) -> &Arc<C> {
        &self.codec
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Verify credentials with the configured verifier, then log the subject in.
    pub async fn authenticate(&self, username: &str, password: &str) -> Result<TokenPair, AuthError> {
        let subject = self.verifier.verify(username, password).await?;
        self.login(&subject).await
    }

    /// Issue an access token and a freshly persisted refresh token for `subject`.
    pub async fn login(&self, subject: &str) -> Result<TokenPair, AuthError> {
        let access_token = self
            .codec
            .issue(subject)
            .map_err(|e| AuthError::internal("Failed to issue access token", e))?;
        let refresh_token = self.persist_refresh_token(subject).await?;

        info!(subject = %subject, "Login succeeded");

        Ok(TokenPair {
            access_token,
            refresh_token,
        })
    }

    /// Exchange a refresh token for a new access token.
    pub async fn refresh(&self, refresh_token: &str) -> Result<Refreshed, AuthError> {
        let record = self
            .store
            .get_by_token(refresh_token)
            .await
            .map_err(|e| AuthError::internal("Failed to look up refresh token", e))?
            .ok_or(AuthError::InvalidToken)?;

        if record.is_expired(unix_now()) {
            if let Err(e) = self.store.delete_by_token(refresh_token).await {
                warn!(error = %e, "Failed to delete expired refresh token");
            }
            return Err(AuthError::TokenExpired);
        }

        let access_token = self
            .codec
            .issue(&record.subject)
            .map_err(|e| AuthError::internal("Failed to issue access token", e))?;

        if !self.rotate_refresh_tokens {
            return Ok(Refreshed {
                access_token,
                refresh_token: None,
            });
        }

        // Revocation and replacement commit together: a concurrent use that
        // lost the race finds nothing live to consume, and a failed write
        // leaves the presented token usable.
        let (rotated, replacement) = new_refresh_record(&record.subject);
        let consumed = self
            .store
            .rotate(refresh_token, &replacement)
            .await
            .map_err(|e| AuthError::internal("Failed to rotate refresh token", e))?;
        if !consumed {
            return Err(AuthError::InvalidToken);
        }
        info!(subject = %record.subject, "Refresh token rotated");

        Ok(Refreshed {
            access_token,
            refresh_token: Some(rotated),
        })
    }

    /// Revoke a refresh token. Always appears to succeed.
    pub async fn logout(&self, refresh_token: &str) {
        match self.store.delete_by_token(refresh_token).await {
            Ok(true) => info!("Refresh token revoked"),
            Ok(false) => {}
            Err(e) => error!(error = %e, "Failed to revoke refresh token"),
        }
    }

    /// Revoke every refresh token of `subject`. Returns how many were live.
    pub async fn logout_everywhere(&self, subject: &str) -> Result<u64, AuthError> {
        let count = self
            .store
            .delete_by_user(subject)
            .await
            .map_err(|e| AuthError::internal("Failed to revoke refresh tokens", e))?;
        info!(subject = %subject, count, "Revoked all refresh tokens");
        Ok(count)
    }

    async fn persist_refresh_token(&self, subject: &str) -> Result<String, AuthError> {
        let (token, record) = new_refresh_record(subject);
        self.store
            .create(&record)
            .await
            .map_err(|e| AuthError::internal("Failed to store refresh token", e))?;
        Ok(token)
    }
}

/// Fresh opaque token and the record that tracks it.
fn new_refresh_record(subject: &str) -> (String, RefreshTokenRecord) {
    let token = generate_refresh_token();
    let record = RefreshTokenRecord::new(
        subject,
        &token,
        unix_now(),
        REFRESH_TOKEN_LIFETIME.as_secs() as i64,
    );
    (token, record)
}
