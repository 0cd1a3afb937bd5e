use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use std::time::Instant;

use super::bins::BinHandlerState;
use crate::queries::ListQuery;

/// Component health status
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentStatus {
    Up,
    Down,
}

/// Individual component health details
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub status: ComponentStatus,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
}

/// Readiness response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessResponse {
    pub status: ComponentStatus,
    pub version: String,
    pub timestamp: String,
    pub source: ComponentHealth,
}

/// Liveness probe - the process is up and serving
async fn liveness_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "up",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// Readiness probe - the backing source answers a one-row query
async fn readiness_check<S>(State(state): State<S>) -> (StatusCode, Json<ReadinessResponse>)
where
    S: BinHandlerState,
{
    let start = Instant::now();
    let probe = ListQuery::new().paginate(0, 1);
    let source = match state.bins().list(&probe).await {
        Ok(_) => ComponentHealth {
            status: ComponentStatus::Up,
            message: "backing source reachable".to_string(),
            latency_ms: Some(start.elapsed().as_millis() as u64),
        },
        Err(err) => ComponentHealth {
            status: ComponentStatus::Down,
            message: err.response_message(),
            latency_ms: None,
        },
    };

    let status_code = if source.status == ComponentStatus::Up {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status_code,
        Json(ReadinessResponse {
            status: source.status.clone(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            source,
        }),
    )
}

/// Health routes
pub fn health_routes<S>() -> Router<S>
where
    S: BinHandlerState,
{
    Router::new()
        .route("/health", get(liveness_check))
        .route("/health/ready", get(readiness_check::<S>))
}
