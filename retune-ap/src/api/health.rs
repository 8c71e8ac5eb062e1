//! Health check endpoint

use axum::{extract::State, routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;

use crate::{AppState, PipelineBackend};

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// "ok", or "degraded" when jobs cannot run
    pub status: String,
    /// Module name ("retune-ap")
    pub module: String,
    /// Crate version from Cargo.toml
    pub version: String,
    /// Seconds since service started
    pub uptime_seconds: u64,
    /// Whether collaborators were configured successfully
    pub configured: bool,
    /// Whether key/tempo analysis will be attempted
    pub analysis_enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub configuration_error: Option<String>,
    /// Last fatal job error if any (for diagnostics)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

/// GET /health
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let uptime = Utc::now().signed_duration_since(state.startup_time);
    let uptime_seconds = uptime.num_seconds().max(0) as u64;

    let last_error = state.last_error.read().await.clone();

    let (status, analysis_enabled, configuration_error) = match &state.backend {
        PipelineBackend::Ready(pipeline) => ("ok", pipeline.analysis_configured(), None),
        PipelineBackend::Misconfigured(message) => ("degraded", false, Some(message.clone())),
    };

    Json(HealthResponse {
        status: status.to_string(),
        module: "retune-ap".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds,
        configured: state.backend.is_ready(),
        analysis_enabled,
        configuration_error,
        last_error,
    })
}

/// Build health check routes
pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
