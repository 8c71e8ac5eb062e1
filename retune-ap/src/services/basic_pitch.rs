//! basic-pitch note extractor
//!
//! Invokes `basic-pitch <output_dir> <audio>`. The tool names its MIDI output
//! `<input stem>_basic_pitch.mid` inside the output directory.

use crate::types::{NoteExtractor, TranscriptionError};
use async_trait::async_trait;
use std::path::Path;
use tokio::process::Command;

pub const DEFAULT_BASIC_PITCH_BINARY: &str = "basic-pitch";
pub const DEFAULT_OUTPUT_SUFFIX: &str = "_basic_pitch.mid";

/// basic-pitch command-line client
pub struct BasicPitchCli {
    binary_path: String,
    output_suffix: String,
}

impl Default for BasicPitchCli {
    fn default() -> Self {
        Self::new(DEFAULT_BASIC_PITCH_BINARY, DEFAULT_OUTPUT_SUFFIX)
    }
}

impl BasicPitchCli {
    pub fn new(binary_path: impl Into<String>, output_suffix: impl Into<String>) -> Self {
        Self {
            binary_path: binary_path.into(),
            output_suffix: output_suffix.into(),
        }
    }
}

#[async_trait]
impl NoteExtractor for BasicPitchCli {
    fn name(&self) -> &'static str {
        "basic-pitch"
    }

    fn output_name(&self, audio_path: &Path) -> String {
        let stem = audio_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "audio".to_string());
        format!("{}{}", stem, self.output_suffix)
    }

    async fn extract(
        &self,
        audio_path: &Path,
        output_dir: &Path,
    ) -> Result<(), TranscriptionError> {
        tracing::debug!(
            audio_file = %audio_path.display(),
            output_dir = %output_dir.display(),
            "Running basic-pitch"
        );

        // Dropping the future (timeout) kills the child
        let output = Command::new(&self.binary_path)
            .arg(output_dir)
            .arg(audio_path)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => {
                    TranscriptionError::BinaryNotFound(self.binary_path.clone())
                }
                _ => TranscriptionError::Execution(e.to_string()),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(TranscriptionError::Failed(format!(
                "Exit code: {:?}, stderr: {}",
                output.status.code(),
                stderr.trim()
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_naming_convention() {
        let cli = BasicPitchCli::default();
        assert_eq!(
            cli.output_name(Path::new("/work/job-1/source.mp3")),
            "source_basic_pitch.mid"
        );
        assert_eq!(cli.output_name(Path::new("take.2.wav")), "take.2_basic_pitch.mid");
    }

    #[tokio::test]
    async fn test_missing_binary() {
        let dir = tempfile::tempdir().unwrap();
        let cli = BasicPitchCli::new("retune-no-such-basic-pitch", DEFAULT_OUTPUT_SUFFIX);
        let err = cli
            .extract(&dir.path().join("source.wav"), dir.path())
            .await
            .unwrap_err();
        assert!(matches!(err, TranscriptionError::BinaryNotFound(_)));
    }
}
