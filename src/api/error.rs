//! Shared error handling for API endpoints.

use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tracing::debug;

use crate::token_service::AuthError;

/// API error type with automatic response conversion.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Unauthorized(String),
    Internal(String),
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::Unauthorized(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}

impl From<AuthError> for ApiError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::InvalidCredentials => Self::unauthorized("invalid credentials"),
            AuthError::InvalidToken | AuthError::TokenExpired => {
                Self::unauthorized("invalid or expired token")
            }
            // Already logged where it happened; the client gets no details.
            AuthError::Internal(_) => Self::internal("internal error"),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        debug!(error = %rejection, "Rejected request body");
        Self::bad_request("invalid request body")
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };
        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

/// Reject empty required fields.
pub fn require_field(value: &str, name: &str) -> Result<(), ApiError> {
    if value.is_empty() {
        return Err(ApiError::bad_request(format!("{} is required", name)));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_error_mapping() {
        let cases = [
            (AuthError::InvalidCredentials, StatusCode::UNAUTHORIZED),
            (AuthError::InvalidToken, StatusCode::UNAUTHORIZED),
            (AuthError::TokenExpired, StatusCode::UNAUTHORIZED),
            (
                AuthError::Internal("db down".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, status) in cases {
            let response = ApiError::from(err).into_response();
            assert_eq!(response.status(), status);
        }
    }

    #[test]
    fn test_expired_and_invalid_are_indistinguishable() {
        let ApiError::Unauthorized(expired) = ApiError::from(AuthError::TokenExpired) else {
            panic!("expected unauthorized");
        };
        let ApiError::Unauthorized(invalid) = ApiError::from(AuthError::InvalidToken) else {
            panic!("expected unauthorized");
        };
        assert_eq!(expired, invalid);
    }

    #[test]
    fn test_internal_hides_details() {
        let ApiError::Internal(msg) = ApiError::from(AuthError::Internal("secret detail".into()))
        else {
            panic!("expected internal");
        };
        assert_eq!(msg, "internal error");
    }

    #[test]
    fn test_require_field() {
        assert!(require_field("value", "username").is_ok());
        assert!(matches!(
            require_field("", "username"),
            Err(ApiError::BadRequest(msg)) if msg == "username is required"
        ));
        assert!(require_field("", "password").is_err());
    }
}
