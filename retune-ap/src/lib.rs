//! retune-ap library interface for testing
//!
//! Exposes public APIs for integration testing

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod services;
pub mod types;
pub mod utils;

pub use crate::error::{ApiError, ApiResult, JobError};

use axum::Router;
use chrono::{DateTime, Utc};
use pipeline::Pipeline;
use retune_common::events::EventBus;
use std::sync::Arc;
use tokio::sync::RwLock;
use types::MetadataStore;

/// Job runner, or the reason it could not be built
#[derive(Clone)]
pub enum PipelineBackend {
    Ready(Arc<Pipeline>),
    /// Startup configuration error; every job fails fast with this message
    Misconfigured(String),
}

impl PipelineBackend {
    pub fn from_result(result: Result<Pipeline, JobError>) -> Self {
        match result {
            Ok(pipeline) => PipelineBackend::Ready(Arc::new(pipeline)),
            Err(e) => PipelineBackend::Misconfigured(e.to_string()),
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, PipelineBackend::Ready(_))
    }
}

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Event bus for SSE broadcasting
    pub event_bus: EventBus,
    pub backend: PipelineBackend,
    /// Job records, readable even when the pipeline is misconfigured
    pub metadata: Arc<dyn MetadataStore>,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
    /// Last fatal job error for diagnostics
    pub last_error: Arc<RwLock<Option<String>>>,
}

impl AppState {
    pub fn new(
        event_bus: EventBus,
        backend: PipelineBackend,
        metadata: Arc<dyn MetadataStore>,
    ) -> Self {
        Self {
            event_bus,
            backend,
            metadata,
            startup_time: Utc::now(),
            last_error: Arc::new(RwLock::new(None)),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::get;

    Router::new()
        .merge(api::process_routes())
        .merge(api::job_routes())
        .merge(api::health_routes())
        .route("/events", get(api::job_event_stream))
        .with_state(state)
}
