//! Job outcome and persisted job record

use crate::error::JobError;
use crate::models::AnalysisResult;
use chrono::{DateTime, Utc};
use retune_common::events::JobStage;
use serde::{Deserialize, Serialize};

/// Terminal job status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    /// All requested work that could be computed succeeded
    Success,
    /// Some requested work failed; other results are still valid
    Partial,
    /// Fatal failure: invalid request or source download failed
    Failed,
}

impl JobStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Success => "success",
            JobStatus::Partial => "partial",
            JobStatus::Failed => "failed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "success" => Some(JobStatus::Success),
            "partial" => Some(JobStatus::Partial),
            "failed" => Some(JobStatus::Failed),
            _ => None,
        }
    }

    /// Terminal pipeline stage for this status
    pub fn stage(self) -> JobStage {
        match self {
            JobStatus::Success => JobStage::Success,
            JobStatus::Partial => JobStage::Partial,
            JobStatus::Failed => JobStage::Failed,
        }
    }
}

/// Result returned to the caller, serialized as a flat record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobOutcome {
    pub job_id: String,
    pub status: JobStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detected_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detected_tempo: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processed_audio_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transcription_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// Non-fatal notices (analysis degradation, skipped transforms)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    /// Fatal error behind a `Failed` status; not part of the wire record
    #[serde(skip)]
    pub fatal_error: Option<JobError>,
}

impl JobOutcome {
    /// Outcome for a fatal failure
    pub fn failed(job_id: &str, error: &JobError) -> Self {
        Self {
            job_id: job_id.to_string(),
            status: JobStatus::Failed,
            detected_key: None,
            detected_tempo: None,
            processed_audio_url: None,
            transcription_url: None,
            error_message: Some(error.to_string()),
            warnings: Vec::new(),
            fatal_error: Some(error.clone()),
        }
    }

    /// Outcome after publishing
    ///
    /// Status is `Success` when `errors` is empty and `Partial` otherwise;
    /// non-fatal errors never produce `Failed`.
    pub fn completed(
        job_id: &str,
        analysis: &AnalysisResult,
        processed_audio_url: Option<String>,
        transcription_url: Option<String>,
        errors: &[JobError],
        warnings: Vec<String>,
    ) -> Self {
        let mut outcome = Self {
            job_id: job_id.to_string(),
            status: JobStatus::Success,
            detected_key: analysis.detected_key.clone(),
            detected_tempo: analysis.detected_tempo,
            processed_audio_url,
            transcription_url,
            error_message: None,
            warnings,
            fatal_error: None,
        };
        for error in errors {
            outcome.degrade(error);
        }
        outcome
    }

    /// Record a non-fatal error and downgrade `Success` to `Partial`
    pub fn degrade(&mut self, error: &JobError) {
        if self.status == JobStatus::Success {
            self.status = JobStatus::Partial;
        }
        let message = error.to_string();
        self.error_message = Some(match self.error_message.take() {
            Some(existing) => format!("{}; {}", existing, message),
            None => message,
        });
    }
}

/// Metadata record written for downstream consumers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRecord {
    pub job_id: String,
    pub owner_id: String,
    pub status: JobStatus,
    pub detected_key: Option<String>,
    pub detected_tempo: Option<f64>,
    pub processed_audio_url: Option<String>,
    pub transcription_url: Option<String>,
    pub error_message: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl JobRecord {
    pub fn from_outcome(owner_id: &str, outcome: &JobOutcome) -> Self {
        Self {
            job_id: outcome.job_id.clone(),
            owner_id: owner_id.to_string(),
            status: outcome.status,
            detected_key: outcome.detected_key.clone(),
            detected_tempo: outcome.detected_tempo,
            processed_audio_url: outcome.processed_audio_url.clone(),
            transcription_url: outcome.transcription_url.clone(),
            error_message: outcome.error_message.clone(),
            updated_at: Utc::now(),
        }
    }
}
