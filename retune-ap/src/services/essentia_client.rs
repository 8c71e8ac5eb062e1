//! Essentia local analysis client
//!
//! Runs `essentia_streaming_extractor_music` on the downloaded file and reads
//! key and tempo from the JSON it writes. Used when no HTTP analysis service
//! is configured.

use crate::models::AnalysisResult;
use crate::types::{AnalysisError, AnalysisProvider};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::process::Command;

pub const DEFAULT_ESSENTIA_BINARY: &str = "essentia_streaming_extractor_music";

/// Essentia output structure (only the fields used here)
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EssentiaOutput {
    /// Rhythm features (BPM)
    pub rhythm: Option<EssentiaRhythm>,
    /// Tonal features (key, scale)
    pub tonal: Option<EssentiaTonal>,
}

/// Essentia rhythm features
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EssentiaRhythm {
    /// Beats per minute
    pub bpm: Option<f64>,
}

/// Essentia tonal features
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EssentiaTonal {
    /// Musical key root (e.g., "C", "A#")
    pub key_key: Option<String>,
    /// Musical scale (e.g., "major", "minor")
    pub key_scale: Option<String>,
    /// Key detection confidence (0.0-1.0)
    pub key_strength: Option<f64>,
}

impl EssentiaOutput {
    /// Convert to an analysis result; key is rendered as `"<root> <Scale>"`
    pub fn to_analysis(&self) -> AnalysisResult {
        let key = self.tonal.as_ref().and_then(|t| {
            t.key_key.as_ref().map(|root| match t.key_scale.as_deref() {
                Some(scale) if !scale.is_empty() => format!("{} {}", root, capitalize(scale)),
                _ => root.clone(),
            })
        });
        let bpm = self.rhythm.as_ref().and_then(|r| r.bpm);
        AnalysisResult::new(key, bpm)
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Essentia analyzer
pub struct EssentiaAnalyzer {
    binary_path: String,
}

impl EssentiaAnalyzer {
    pub fn new(binary_path: impl Into<String>) -> Self {
        Self {
            binary_path: binary_path.into(),
        }
    }

    /// Check if the Essentia binary can be launched
    pub async fn is_available(&self) -> bool {
        Command::new(&self.binary_path)
            .arg("--version")
            .kill_on_drop(true)
            .output()
            .await
            .is_ok()
    }
}

#[async_trait]
impl AnalysisProvider for EssentiaAnalyzer {
    fn name(&self) -> &'static str {
        "essentia"
    }

    async fn analyze(
        &self,
        audio_path: &Path,
        _source_url: &str,
    ) -> Result<AnalysisResult, AnalysisError> {
        if !audio_path.exists() {
            return Err(AnalysisError::Execution(format!(
                "audio file not found: {}",
                audio_path.display()
            )));
        }

        // Written next to the input so workspace cleanup removes it
        let json_output = audio_path.with_extension("essentia.json");

        tracing::debug!(
            audio_file = %audio_path.display(),
            output_file = %json_output.display(),
            "Running Essentia analysis"
        );

        // Usage: essentia_streaming_extractor_music input.wav output.json
        let output = Command::new(&self.binary_path)
            .arg(audio_path)
            .arg(&json_output)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => {
                    AnalysisError::Execution(format!("{} not found in PATH", self.binary_path))
                }
                _ => AnalysisError::Execution(e.to_string()),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(AnalysisError::Execution(format!(
                "Exit code: {:?}, stderr: {}",
                output.status.code(),
                stderr.trim()
            )));
        }

        let json_content = tokio::fs::read_to_string(&json_output).await?;
        let essentia_output: EssentiaOutput = serde_json::from_str(&json_content)
            .map_err(|e| AnalysisError::Parse(e.to_string()))?;

        tracing::info!(
            audio_file = %audio_path.display(),
            has_tonal = essentia_output.tonal.is_some(),
            has_rhythm = essentia_output.rhythm.is_some(),
            "Essentia analysis completed"
        );

        Ok(essentia_output.to_analysis())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_essentia_output_parsing() {
        let json_str = r#"{
            "lowlevel": {
                "average_loudness": 0.75
            },
            "rhythm": {
                "bpm": 120.0,
                "danceability": 0.7
            },
            "tonal": {
                "key_key": "C",
                "key_scale": "major",
                "key_strength": 0.85
            }
        }"#;

        let output: EssentiaOutput = serde_json::from_str(json_str).unwrap();
        let analysis = output.to_analysis();

        assert_eq!(analysis.detected_key.as_deref(), Some("C Major"));
        assert_eq!(analysis.detected_tempo, Some(120.0));
    }

    #[test]
    fn test_missing_sections_are_absent() {
        let output: EssentiaOutput = serde_json::from_str(r#"{"tonal": {"key_key": "F#"}}"#).unwrap();
        let analysis = output.to_analysis();
        assert_eq!(analysis.detected_key.as_deref(), Some("F#"));
        assert_eq!(analysis.detected_tempo, None);
    }

    #[tokio::test]
    async fn test_missing_binary_is_execution_error() {
        let dir = tempfile::tempdir().unwrap();
        let audio = dir.path().join("source.wav");
        std::fs::write(&audio, b"RIFF").unwrap();

        let analyzer = EssentiaAnalyzer::new("retune-no-such-binary-xyz");
        assert!(!analyzer.is_available().await);
        let err = analyzer.analyze(&audio, "http://x").await.unwrap_err();
        assert!(matches!(err, AnalysisError::Execution(_)));
    }
}
