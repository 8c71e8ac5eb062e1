//! Key/tempo analysis result

use serde::{Deserialize, Serialize};

/// Detected key and tempo
///
/// Either field may be absent when analysis failed or was skipped; absence is
/// a valid state, not an error.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub detected_key: Option<String>,
    pub detected_tempo: Option<f64>,
}

impl AnalysisResult {
    /// Build a normalized result
    ///
    /// Blank keys and non-positive or non-finite tempos are dropped.
    pub fn new(detected_key: Option<String>, detected_tempo: Option<f64>) -> Self {
        Self {
            detected_key: detected_key
                .map(|k| k.trim().to_string())
                .filter(|k| !k.is_empty()),
            detected_tempo: detected_tempo.filter(|t| t.is_finite() && *t > 0.0),
        }
    }

    /// Nothing known about the recording
    pub fn unknown() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.detected_key.is_none() && self.detected_tempo.is_none()
    }
}
