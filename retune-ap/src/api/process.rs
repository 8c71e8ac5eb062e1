//! Job submission
//!
//! POST /process-audio runs one job to completion and returns its outcome.

use crate::error::{ApiError, JobError};
use crate::models::{AudioJobRequest, JobOutcome, JobStatus};
use crate::{AppState, PipelineBackend};
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};

/// POST /process-audio
///
/// Status codes:
/// - 200: `success` or `partial`
/// - 400: request failed validation
/// - 502: source download failed
/// - 503: service configuration is incomplete
/// - 500: any other fatal failure
///
/// The body is always the job outcome, except for unparseable JSON.
pub async fn process_audio(
    State(state): State<AppState>,
    payload: Result<Json<AudioJobRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match payload {
        Ok(payload) => payload,
        Err(rejection) => {
            return ApiError::BadRequest(rejection.body_text()).into_response();
        }
    };

    tracing::info!(
        job_id = %request.job_id,
        owner_id = %request.owner_id,
        desired_key = ?request.desired_key,
        desired_tempo = ?request.desired_tempo,
        want_transcription = request.want_transcription,
        "Job received"
    );

    let outcome = match &state.backend {
        PipelineBackend::Ready(pipeline) => pipeline.run(&request).await,
        PipelineBackend::Misconfigured(message) => {
            JobOutcome::failed(&request.job_id, &JobError::Configuration(message.clone()))
        }
    };

    if outcome.status == JobStatus::Failed {
        *state.last_error.write().await = outcome.error_message.clone();
    }

    (outcome_status(&outcome), Json(outcome)).into_response()
}

/// HTTP status for a finished job
pub fn outcome_status(outcome: &JobOutcome) -> StatusCode {
    match outcome.status {
        JobStatus::Success | JobStatus::Partial => StatusCode::OK,
        JobStatus::Failed => outcome
            .fatal_error
            .as_ref()
            .map(JobError::status_code)
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
    }
}

/// Build job submission routes
pub fn process_routes() -> Router<AppState> {
    Router::new().route("/process-audio", post(process_audio))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AnalysisResult;

    #[test]
    fn test_partial_is_ok() {
        let outcome = JobOutcome::completed(
            "j",
            &AnalysisResult::unknown(),
            None,
            None,
            &[JobError::Transform("x".into())],
            Vec::new(),
        );
        assert_eq!(outcome_status(&outcome), StatusCode::OK);
    }

    #[test]
    fn test_failed_maps_fatal_error() {
        let outcome = JobOutcome::failed("j", &JobError::Download("HTTP 404".into()));
        assert_eq!(outcome_status(&outcome), StatusCode::BAD_GATEWAY);

        let outcome = JobOutcome::failed("j", &JobError::Io("disk full".into()));
        assert_eq!(outcome_status(&outcome), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
