//! Liveness and readiness probes.
//!
//! - GET `/live` - 200 while the process is serving requests
//! - GET `/ready` - 200 only if the database answers a ping

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use serde::Serialize;
use tracing::warn;

use crate::db::Database;

#[derive(Clone)]
pub struct HealthState {
    pub db: Database,
}

pub fn router(state: HealthState) -> Router {
    Router::new()
        .route("/live", get(liveness))
        .route("/ready", get(readiness))
        .with_state(state)
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<&'static str>,
}

async fn liveness() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "alive",
        error: None,
    })
}

async fn readiness(State(state): State<HealthState>) -> Response {
    match state.db.ping().await {
        Ok(()) => Json(HealthResponse {
            status: "ready",
            error: None,
        })
        .into_response(),
        Err(e) => {
            warn!(error = %e, "Readiness check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthResponse {
                    status: "unready",
                    error: Some("database ping failed"),
                }),
            )
                .into_response()
        }
    }
}
