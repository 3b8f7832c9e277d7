#![allow(dead_code)]

use axum::{
    Router,
    body::Body,
    extract::ConnectInfo,
    http::{Request, Response, StatusCode, header::AUTHORIZATION},
};
use folio::{ServerConfig, create_app, db::Database, token_service::StaticCredentials};
use serde_json::Value;
use std::net::SocketAddr;
use std::num::NonZeroU32;
use std::time::Duration;
use tower::ServiceExt;

pub const JWT_SECRET: &[u8] = b"test-jwt-secret-that-is-long-enough";
pub const ADMIN_USERNAME: &str = "admin";
pub const ADMIN_PASSWORD: &str = "admin-password";
pub const ADMIN_SUBJECT: &str = "7ea078fa-aac0-4364-8f5f-ba69b136b8f7";
pub const TEST_IP: [u8; 4] = [127, 0, 0, 1];

pub struct TestApp {
    pub app: Router,
    pub db: Database,
}

/// Builder for test apps with various options
pub struct TestSetup {
    rotate_refresh_tokens: bool,
    max_requests_per_second: Option<NonZeroU32>,
    access_token_lifetime: Duration,
}

impl TestSetup {
    pub fn new() -> Self {
        Self {
            rotate_refresh_tokens: false,
            max_requests_per_second: None,
            access_token_lifetime: Duration::from_secs(60 * 60),
        }
    }

    pub fn with_rotation(mut self) -> Self {
        self.rotate_refresh_tokens = true;
        self
    }

    pub fn with_rate_limit(mut self, per_second: u32) -> Self {
        self.max_requests_per_second = NonZeroU32::new(per_second);
        self
    }

    pub async fn build(self) -> TestApp {
        let db = Database::open(":memory:")
            .await
            .expect("Failed to open test database");
        let config = ServerConfig {
            db: db.clone(),
            jwt_secret: JWT_SECRET.to_vec(),
            access_token_lifetime: self.access_token_lifetime,
            rotate_refresh_tokens: self.rotate_refresh_tokens,
            credentials: StaticCredentials::new(ADMIN_USERNAME, ADMIN_PASSWORD, ADMIN_SUBJECT),
            max_requests_per_second: self.max_requests_per_second,
            cleanup_interval: Duration::from_secs(60 * 60),
        };
        TestApp {
            app: create_app(&config),
            db,
        }
    }
}

pub async fn create_test_app() -> TestApp {
    TestSetup::new().build().await
}

/// POST a JSON body from [`TEST_IP`].
pub fn post_json(uri: &str, body: Value) -> Request<Body> {
    with_client_ip(
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        TEST_IP,
    )
}

/// Request carrying an `Authorization` header, from [`TEST_IP`].
pub fn with_authorization(method: &str, uri: &str, authorization: &str) -> Request<Body> {
    with_client_ip(
        Request::builder()
            .method(method)
            .uri(uri)
            .header(AUTHORIZATION, authorization)
            .body(Body::empty())
            .unwrap(),
        TEST_IP,
    )
}

/// Attach a client address the way `into_make_service_with_connect_info` does.
pub fn with_client_ip(mut request: Request<Body>, ip: [u8; 4]) -> Request<Body> {
    request
        .extensions_mut()
        .insert(ConnectInfo(SocketAddr::from((ip, 40000))));
    request
}

pub async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    read_json(response).await
}

pub async fn read_json(response: Response<Body>) -> (StatusCode, Value) {
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, json)
}

/// Log in as the configured admin and return (access_token, refresh_token).
pub async fn login(app: &Router) -> (String, String) {
    let (status, json) = send(
        app,
        post_json(
            "/auth/login",
            serde_json::json!({ "username": ADMIN_USERNAME, "password": ADMIN_PASSWORD }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "login failed: {}", json);
    (
        json["access_token"].as_str().unwrap().to_string(),
        json["refresh_token"].as_str().unwrap().to_string(),
    )
}
