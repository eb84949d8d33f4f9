//! Health check endpoints

use std::sync::Arc;

use axum::{Json, Router, extract::State, routing::get};
use serde::Serialize;

use super::ApiState;

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

/// Readiness response with cache occupancy
#[derive(Serialize)]
pub struct ReadinessResponse {
    pub status: &'static str,
    pub cache: CacheStatus,
}

#[derive(Serialize)]
pub struct CacheStatus {
    pub entries: usize,
    pub ttl_secs: u64,
}

/// Liveness probe - is the service running?
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Readiness probe
async fn ready(State(state): State<Arc<ApiState>>) -> Json<ReadinessResponse> {
    let cache = state.service.cache();
    Json(ReadinessResponse {
        status: "ok",
        cache: CacheStatus {
            entries: cache.len(),
            ttl_secs: cache.ttl().as_secs(),
        },
    })
}

/// Build health router (liveness only, no state needed)
pub fn router() -> Router {
    Router::new().route("/health", get(health))
}

/// Build readiness router
pub fn ready_router(state: Arc<ApiState>) -> Router {
    Router::new().route("/ready", get(ready)).with_state(state)
}
