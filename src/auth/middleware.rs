//! Bearer token authorization middleware.
//!
//! Only the signed access token is trusted here; there is no store lookup.
//! A revoked refresh token therefore stops working for protected routes once
//! the access tokens minted from it expire.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{HeaderValue, header::AUTHORIZATION},
    middleware::Next,
    response::Response,
};
use tracing::debug;

use super::errors::{ApiAuthError, AuthErrorKind};
use super::types::AuthenticatedSubject;
use crate::jwt::AccessTokenCodec;

/// Authorization scheme accepted by [`require_bearer`].
pub const BEARER_SCHEME: &str = "Bearer";

/// Extract the token from an `Authorization: Bearer <token>` header value.
///
/// The value must split on single spaces into exactly two parts, the first
/// being `Bearer`.
pub fn bearer_token(value: &HeaderValue) -> Result<&str, ApiAuthError> {
    let value = value
        .to_str()
        .map_err(|_| ApiAuthError::new(AuthErrorKind::InvalidFormat))?;

    let mut parts = value.split(' ');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(BEARER_SCHEME), Some(token), None) => Ok(token),
        _ => Err(ApiAuthError::new(AuthErrorKind::InvalidFormat)),
    }
}

/// Middleware for routes that require a valid access token.
///
/// On success the token's subject is available to handlers as an
/// [`AuthenticatedSubject`] extension.
pub async fn require_bearer<C>(
    State(codec): State<Arc<C>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiAuthError>
where
    C: AccessTokenCodec + Send + Sync + 'static,
{
    let header = request
        .headers()
        .get(AUTHORIZATION)
        .filter(|value| !value.is_empty())
        .ok_or(ApiAuthError::new(AuthErrorKind::MissingHeader))?;

    let claims = codec.verify(bearer_token(header)?).map_err(|e| {
        debug!(error = %e, "Rejected access token");
        ApiAuthError::new(AuthErrorKind::InvalidToken)
    })?;

    request
        .extensions_mut()
        .insert(AuthenticatedSubject(claims.sub));

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Authenticated;
    use crate::jwt::{AccessClaims, JwtCodec, TokenError};
    use axum::{
        Router,
        body::Body,
        http::{Request, StatusCode},
        middleware,
        routing::get,
    };
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tower::ServiceExt;

    /// Codec that accepts exactly one token and counts verifications.
    #[derive(Default)]
    struct CountingCodec {
        verified: AtomicUsize,
    }

    impl AccessTokenCodec for CountingCodec {
        fn issue(&self, subject: &str) -> Result<String, TokenError> {
            Ok(format!("token-for-{}", subject))
        }

        fn verify(&self, token: &str) -> Result<AccessClaims, TokenError> {
            self.verified.fetch_add(1, Ordering::SeqCst);
            match token.strip_prefix("token-for-") {
                Some(subject) => Ok(AccessClaims {
                    sub: subject.to_string(),
                    iat: 0,
                    exp: i64::MAX,
                }),
                None => Err(TokenError::InvalidToken),
            }
        }
    }

    async fn whoami(Authenticated(subject): Authenticated) -> String {
        subject.0
    }

    fn app<C: AccessTokenCodec + Send + Sync + 'static>(codec: Arc<C>) -> Router {
        Router::new()
            .route("/whoami", get(whoami))
            .route_layer(middleware::from_fn_with_state(codec, require_bearer::<C>))
    }

    async fn call(app: Router, authorization: Option<&str>) -> (StatusCode, String) {
        let mut builder = Request::builder().uri("/whoami");
        if let Some(value) = authorization {
            builder = builder.header(AUTHORIZATION, value);
        }
        let response = app
            .oneshot(builder.body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    #[test]
    fn test_bearer_token_parsing() {
        let ok = HeaderValue::from_static("Bearer abc.def.ghi");
        assert_eq!(bearer_token(&ok).unwrap(), "abc.def.ghi");

        let empty_token = HeaderValue::from_static("Bearer ");
        assert_eq!(bearer_token(&empty_token).unwrap(), "");

        for bad in [
            "Token abc",
            "bearer abc",
            "Bearer",
            "Bearer  abc",
            "Bearer abc def",
            "abc",
        ] {
            let value = HeaderValue::from_static(bad);
            assert_eq!(
                bearer_token(&value).unwrap_err().kind(),
                AuthErrorKind::InvalidFormat,
                "{bad:?} should be rejected"
            );
        }
    }

    #[tokio::test]
    async fn test_valid_token_reaches_handler() {
        let codec = Arc::new(CountingCodec::default());

        let (status, body) = call(app(codec.clone()), Some("Bearer token-for-alice")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "alice");
        assert_eq!(codec.verified.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_wrong_scheme_skips_codec() {
        let codec = Arc::new(CountingCodec::default());

        let (status, body) = call(app(codec.clone()), Some("Token abc")).await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(body.contains("invalid token format"));
        assert_eq!(codec.verified.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_missing_header() {
        let codec = Arc::new(CountingCodec::default());

        let (status, body) = call(app(codec.clone()), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(body.contains("missing authorization header"));

        let (status, body) = call(app(codec.clone()), Some("")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(body.contains("missing authorization header"));

        assert_eq!(codec.verified.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_rejected_token() {
        let codec = Arc::new(CountingCodec::default());

        let (status, body) = call(app(codec.clone()), Some("Bearer forged")).await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(body.contains("invalid or expired token"));
        assert_eq!(codec.verified.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_with_jwt_codec() {
        let codec = Arc::new(JwtCodec::new(b"test-secret"));
        let token = codec.issue("alice").unwrap();

        let (status, body) = call(app(codec.clone()), Some(&format!("Bearer {}", token))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "alice");

        let other = JwtCodec::new(b"other-secret").issue("alice").unwrap();
        let (status, _) = call(app(codec), Some(&format!("Bearer {}", other))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
}
