//! Access token signing and verification.
//!
//! Access tokens are short-lived HS256 JWTs carrying only the subject and
//! timestamps. They are never stored; verification is a pure function of the
//! secret and the token.

use std::time::Duration;

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::clock::unix_now;

/// Default access token lifetime: 1 hour.
pub const DEFAULT_ACCESS_TOKEN_LIFETIME: Duration = Duration::from_secs(60 * 60);

/// JWT claims for access tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessClaims {
    /// Subject (principal identifier)
    pub sub: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

/// Errors that can occur while issuing or verifying access tokens.
#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    /// Bad signature, unexpected algorithm, or malformed token.
    #[error("invalid token")]
    InvalidToken,
    /// Well-formed and correctly signed, but past its expiry.
    #[error("token expired")]
    TokenExpired,
    #[error("failed to encode token: {0}")]
    Encoding(jsonwebtoken::errors::Error),
}

/// Signs and verifies access tokens.
pub trait AccessTokenCodec {
    /// Issue a signed access token for `subject`.
    fn issue(&self, subject: &str) -> Result<String, TokenError>;

    /// Verify a token and return its claims.
    fn verify(&self, token: &str) -> Result<AccessClaims, TokenError>;
}

/// HS256 implementation of [`AccessTokenCodec`].
#[derive(Clone)]
pub struct JwtCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_lifetime: Duration,
}

impl JwtCodec {
    /// Create a codec with the given secret and the default access lifetime.
    pub fn new(secret: &[u8]) -> Self {
        Self::with_access_lifetime(secret, DEFAULT_ACCESS_TOKEN_LIFETIME)
    }

    pub fn with_access_lifetime(secret: &[u8], access_lifetime: Duration) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            access_lifetime,
        }
    }

    fn validation() -> Validation {
        // Only HS256 is accepted; any other header algorithm fails decoding.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation
    }
}

impl AccessTokenCodec for JwtCodec {
    fn issue(&self, subject: &str) -> Result<String, TokenError> {
        let now = unix_now();
        let claims = AccessClaims {
            sub: subject.to_string(),
            iat: now,
            exp: now.saturating_add(
                i64::try_from(self.access_lifetime.as_secs()).unwrap_or(i64::MAX),
            ),
        };

        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(TokenError::Encoding)
    }

    fn verify(&self, token: &str) -> Result<AccessClaims, TokenError> {
        jsonwebtoken::decode::<AccessClaims>(token, &self.decoding_key, &Self::validation())
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::TokenExpired,
                _ => TokenError::InvalidToken,
            })
    }
}
