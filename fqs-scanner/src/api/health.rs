//! Health check endpoint

use axum::extract::State;
use axum::{routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;

use crate::AppState;

/// Liveness report
///
/// `status` is "ok" whenever the process can answer; component readiness
/// is shown on the settings page.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub module: &'static str,
    pub version: &'static str,
    pub inference_backend: &'static str,
    pub uptime_seconds: i64,
}

/// GET /health
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        module: "fqs-scanner",
        version: env!("CARGO_PKG_VERSION"),
        inference_backend: env!("INFERENCE_BACKEND"),
        uptime_seconds: (Utc::now() - state.startup_time).num_seconds().max(0),
    })
}

pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
