//! Job record lookup

use crate::error::{ApiError, ApiResult};
use crate::models::JobRecord;
use crate::AppState;
use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};

/// GET /jobs/{job_id}
///
/// Last recorded state of a job.
pub async fn get_job(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> ApiResult<Json<JobRecord>> {
    let record = state
        .metadata
        .get_record(&job_id)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?
        .ok_or_else(|| ApiError::NotFound(format!("Job not found: {}", job_id)))?;

    tracing::debug!(job_id = %job_id, status = record.status.as_str(), "Job record query");

    Ok(Json(record))
}

/// Build job lookup routes
pub fn job_routes() -> Router<AppState> {
    Router::new().route("/jobs/:job_id", get(get_job))
}
