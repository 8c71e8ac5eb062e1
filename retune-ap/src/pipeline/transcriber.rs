//! Note-event transcription stage
//!
//! Always transcribes the original audio, never the transformed output.

use super::workspace::Workspace;
use crate::error::JobError;
use crate::types::NoteExtractor;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Workspace subdirectory the extractor writes into
pub const TRANSCRIPTION_DIR: &str = "transcription";

pub struct Transcriber {
    extractor: Arc<dyn NoteExtractor>,
    timeout: Duration,
}

impl Transcriber {
    pub fn new(extractor: Arc<dyn NoteExtractor>, timeout: Duration) -> Self {
        Self { extractor, timeout }
    }

    /// Run the extractor and locate its artifact
    pub async fn transcribe(
        &self,
        local_path: &Path,
        workspace: &Workspace,
    ) -> Result<PathBuf, JobError> {
        let output_dir = workspace
            .create_subdir(TRANSCRIPTION_DIR)
            .map_err(|e| JobError::Transcription(e.to_string()))?;

        debug!(
            job_id = %workspace.job_id(),
            extractor = self.extractor.name(),
            "Starting note extraction"
        );

        match tokio::time::timeout(self.timeout, self.extractor.extract(local_path, &output_dir))
            .await
        {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                warn!(job_id = %workspace.job_id(), error = %e, "Note extraction failed");
                return Err(JobError::Transcription(e.to_string()));
            }
            Err(_) => {
                warn!(
                    job_id = %workspace.job_id(),
                    timeout_secs = self.timeout.as_secs(),
                    "Note extraction timed out"
                );
                return Err(JobError::Transcription(format!(
                    "{} timed out after {}s",
                    self.extractor.name(),
                    self.timeout.as_secs()
                )));
            }
        }

        // Only the file name reaches the caller; the workspace path stays in the log
        let expected = self.extractor.output_name(local_path);
        let artifact = output_dir.join(&expected);
        if !artifact.is_file() {
            warn!(
                job_id = %workspace.job_id(),
                artifact = %artifact.display(),
                "Extractor reported success without output"
            );
            return Err(JobError::TranscriptionNotFound(expected));
        }

        info!(
            job_id = %workspace.job_id(),
            artifact = %artifact.display(),
            "Transcription complete"
        );
        Ok(artifact)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TranscriptionError;
    use async_trait::async_trait;

    /// Writes `<stem>_notes.mid` unless told to lie about success
    struct Fake {
        write_output: bool,
        fail: bool,
    }

    #[async_trait]
    impl NoteExtractor for Fake {
        fn name(&self) -> &'static str {
            "fake"
        }

        fn output_name(&self, audio_path: &Path) -> String {
            let stem = audio_path.file_stem().and_then(|s| s.to_str()).unwrap_or("audio");
            format!("{}_notes.mid", stem)
        }

        async fn extract(&self, audio_path: &Path, output_dir: &Path) -> Result<(), TranscriptionError> {
            if self.fail {
                return Err(TranscriptionError::Failed("model crashed".to_string()));
            }
            if self.write_output {
                std::fs::write(output_dir.join(self.output_name(audio_path)), b"MThd")
                    .map_err(|e| TranscriptionError::Execution(e.to_string()))?;
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_artifact_located_by_naming_convention() {
        let root = tempfile::tempdir().unwrap();
        let workspace = Workspace::open(root.path(), "t1").unwrap();
        let source = workspace.file_path("source.mp3");
        let transcriber = Transcriber::new(
            Arc::new(Fake { write_output: true, fail: false }),
            Duration::from_secs(5),
        );

        let artifact = transcriber.transcribe(&source, &workspace).await.unwrap();
        assert_eq!(
            artifact,
            workspace.path().join(TRANSCRIPTION_DIR).join("source_notes.mid")
        );
        workspace.close().unwrap();
    }

    #[tokio::test]
    async fn test_success_without_artifact_is_not_found() {
        let root = tempfile::tempdir().unwrap();
        let workspace = Workspace::open(root.path(), "t2").unwrap();
        let transcriber = Transcriber::new(
            Arc::new(Fake { write_output: false, fail: false }),
            Duration::from_secs(5),
        );

        let err = transcriber
            .transcribe(&workspace.file_path("source.wav"), &workspace)
            .await
            .unwrap_err();
        assert_eq!(
            err,
            JobError::TranscriptionNotFound("source_notes.mid".to_string())
        );
        let message = err.to_string();
        assert!(!message.contains(&workspace.path().display().to_string()));
        workspace.close().unwrap();
    }

    #[tokio::test]
    async fn test_extractor_failure_is_transcription_error() {
        let root = tempfile::tempdir().unwrap();
        let workspace = Workspace::open(root.path(), "t3").unwrap();
        let transcriber = Transcriber::new(
            Arc::new(Fake { write_output: true, fail: true }),
            Duration::from_secs(5),
        );

        let err = transcriber
            .transcribe(&workspace.file_path("source.wav"), &workspace)
            .await
            .unwrap_err();
        assert!(matches!(err, JobError::Transcription(_)));
        assert!(err.to_string().contains("model crashed"));
        workspace.close().unwrap();
    }
}
