//! Audio job request

use crate::error::JobError;
use serde::{Deserialize, Deserializer, Serialize};

/// Immutable job input
///
/// Accepts the legacy upload-form field names (`audio_file_url`, `user_id`,
/// `audio_file_id`) as aliases. Missing required fields deserialize to empty
/// strings so that [`AudioJobRequest::validate`] reports them as a failed
/// outcome instead of a transport-level rejection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioJobRequest {
    #[serde(default, alias = "audio_file_url")]
    pub source_url: String,

    #[serde(default, alias = "user_id")]
    pub owner_id: String,

    #[serde(default, alias = "audio_file_id")]
    pub job_id: String,

    /// e.g. "D Major"
    #[serde(default)]
    pub desired_key: Option<String>,

    /// Beats per minute; numeric strings accepted
    #[serde(default, deserialize_with = "deserialize_tempo")]
    pub desired_tempo: Option<f64>,

    #[serde(default = "default_want_transcription")]
    pub want_transcription: bool,
}

fn default_want_transcription() -> bool {
    true
}

fn deserialize_tempo<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    match value {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(serde_json::Value::Number(n)) => Ok(n.as_f64()),
        Some(serde_json::Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(serde_json::Value::String(s)) => s
            .trim()
            .parse::<f64>()
            .map(Some)
            .map_err(|_| D::Error::custom(format!("desired_tempo is not a number: {}", s))),
        Some(other) => Err(D::Error::custom(format!(
            "desired_tempo must be a number, got {}",
            other
        ))),
    }
}

impl AudioJobRequest {
    pub fn new(source_url: &str, owner_id: &str, job_id: &str) -> Self {
        Self {
            source_url: source_url.to_string(),
            owner_id: owner_id.to_string(),
            job_id: job_id.to_string(),
            desired_key: None,
            desired_tempo: None,
            want_transcription: true,
        }
    }

    pub fn with_desired_key(mut self, key: &str) -> Self {
        self.desired_key = Some(key.to_string());
        self
    }

    pub fn with_desired_tempo(mut self, bpm: f64) -> Self {
        self.desired_tempo = Some(bpm);
        self
    }

    pub fn with_transcription(mut self, want: bool) -> Self {
        self.want_transcription = want;
        self
    }

    /// Check required fields before any external call is made
    pub fn validate(&self) -> Result<(), JobError> {
        let mut missing = Vec::new();
        if self.source_url.trim().is_empty() {
            missing.push("source_url");
        }
        if self.owner_id.trim().is_empty() {
            missing.push("owner_id");
        }
        if self.job_id.trim().is_empty() {
            missing.push("job_id");
        }
        if !missing.is_empty() {
            return Err(JobError::Validation(format!(
                "missing required field(s): {}",
                missing.join(", ")
            )));
        }

        match reqwest::Url::parse(&self.source_url) {
            Ok(url) if url.scheme() == "http" || url.scheme() == "https" => {}
            Ok(url) => {
                return Err(JobError::Validation(format!(
                    "unsupported source_url scheme: {}",
                    url.scheme()
                )))
            }
            Err(e) => {
                return Err(JobError::Validation(format!("invalid source_url: {}", e)));
            }
        }

        // Both ids become storage path segments and object URL segments
        for (field, value) in [("owner_id", &self.owner_id), ("job_id", &self.job_id)] {
            if !is_path_segment(value) {
                return Err(JobError::Validation(format!(
                    "{} may only contain ASCII letters, digits, '.', '-' and '_': {}",
                    field, value
                )));
            }
        }

        if let Some(tempo) = self.desired_tempo {
            if !tempo.is_finite() || tempo <= 0.0 {
                return Err(JobError::Validation(format!(
                    "desired_tempo must be a positive number, got {}",
                    tempo
                )));
            }
        }

        Ok(())
    }
}

/// One object-path segment that needs no URL escaping
fn is_path_segment(value: &str) -> bool {
    value != "."
        && value != ".."
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'))
}
