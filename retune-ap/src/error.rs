//! Error types for retune-ap
//!
//! Two layers:
//! - [`JobError`]: per-stage pipeline failures, classified fatal or non-fatal
//! - [`ApiError`]: HTTP handler failures mapped to JSON error bodies

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use retune_common::events::JobStage;
use serde_json::json;
use thiserror::Error;

/// Pipeline stage failure
///
/// Every message carries a stage prefix because collaborator error text is not
/// stable across providers.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum JobError {
    /// Missing or malformed request fields (fatal, no external calls made)
    #[error("validation: {0}")]
    Validation(String),

    /// Source unreachable or non-success status (fatal)
    #[error("download: {0}")]
    Download(String),

    /// Local filesystem failure while staging the job (fatal)
    #[error("io: {0}")]
    Io(String),

    /// Key/tempo analysis unavailable (non-fatal, recorded as a warning)
    #[error("analysis: {0}")]
    Analysis(String),

    /// Pitch shift or time stretch failed (non-fatal)
    #[error("transform: {0}")]
    Transform(String),

    /// Note extractor reported success but left no artifact (non-fatal)
    #[error("transcription: no output artifact named {0}")]
    TranscriptionNotFound(String),

    /// Note extractor failed or timed out (non-fatal)
    #[error("transcription: {0}")]
    Transcription(String),

    /// Artifact upload failed (non-fatal, per artifact)
    #[error("publish {artifact}: {message}")]
    Publish { artifact: String, message: String },

    /// Metadata record write failed (non-fatal)
    #[error("metadata: {0}")]
    Metadata(String),

    /// Required collaborator settings missing (fatal)
    #[error("configuration: {0}")]
    Configuration(String),
}

impl JobError {
    /// Fatal errors abort the job with `failed` status
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            JobError::Validation(_)
                | JobError::Download(_)
                | JobError::Io(_)
                | JobError::Configuration(_)
        )
    }

    /// Stage the error is attributed to
    pub fn stage(&self) -> JobStage {
        match self {
            JobError::Validation(_) | JobError::Configuration(_) => JobStage::Created,
            JobError::Download(_) | JobError::Io(_) => JobStage::Downloading,
            JobError::Analysis(_) => JobStage::Analyzing,
            JobError::Transform(_) => JobStage::Transforming,
            JobError::TranscriptionNotFound(_) | JobError::Transcription(_) => {
                JobStage::Transcribing
            }
            JobError::Publish { .. } | JobError::Metadata(_) => JobStage::Publishing,
        }
    }

    /// HTTP status reported for a job that failed with this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            JobError::Validation(_) => StatusCode::BAD_REQUEST,
            JobError::Download(_) => StatusCode::BAD_GATEWAY,
            JobError::Configuration(_) => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Resource not found (404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),

    /// retune-common error
    #[error("Common error: {0}")]
    Common(#[from] retune_common::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", msg),
            ApiError::Common(ref err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "COMMON_ERROR",
                err.to_string(),
            ),
        };

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_classification() {
        assert!(JobError::Validation("x".into()).is_fatal());
        assert!(JobError::Download("x".into()).is_fatal());
        assert!(JobError::Io("x".into()).is_fatal());
        assert!(JobError::Configuration("x".into()).is_fatal());

        assert!(!JobError::Analysis("x".into()).is_fatal());
        assert!(!JobError::Transform("x".into()).is_fatal());
        assert!(!JobError::TranscriptionNotFound("x".into()).is_fatal());
        assert!(!JobError::Transcription("x".into()).is_fatal());
        assert!(!JobError::Metadata("x".into()).is_fatal());
        assert!(!JobError::Publish {
            artifact: "processed_audio".into(),
            message: "x".into()
        }
        .is_fatal());
    }

    #[test]
    fn test_messages_carry_stage_prefix() {
        assert_eq!(
            JobError::Download("HTTP 404".into()).to_string(),
            "download: HTTP 404"
        );
        assert_eq!(
            JobError::Publish {
                artifact: "transcription".into(),
                message: "HTTP 500".into()
            }
            .to_string(),
            "publish transcription: HTTP 500"
        );
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(
            JobError::Validation("x".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            JobError::Download("x".into()).status_code(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            JobError::Configuration("x".into()).status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }
}
