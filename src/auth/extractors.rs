//! Axum extractors for authentication.

use axum::{extract::FromRequestParts, http::request::Parts};

use super::errors::{ApiAuthError, AuthErrorKind};
use super::types::AuthenticatedSubject;

/// Extractor for handlers behind [`require_bearer`](super::require_bearer).
/// Rejects with 401 if the middleware did not authenticate the request.
pub struct Authenticated(pub AuthenticatedSubject);

impl<S> FromRequestParts<S> for Authenticated
where
    S: Send + Sync,
{
    type Rejection = ApiAuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedSubject>()
            .cloned()
            .map(Authenticated)
            .ok_or(ApiAuthError::new(AuthErrorKind::NotAuthenticated))
    }
}
