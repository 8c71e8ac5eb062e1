//! Artifact publishing and job record persistence
//!
//! Uploads are independent: one failed artifact never blocks another.

use super::BucketNames;
use crate::error::JobError;
use crate::models::{JobOutcome, JobRecord};
use crate::types::{MetadataStore, ObjectStore};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Kind of file produced by a job
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    ProcessedAudio,
    Transcription,
}

impl ArtifactKind {
    /// Path segment between owner and job id
    pub fn category(self) -> &'static str {
        match self {
            ArtifactKind::ProcessedAudio => "processed_audio",
            ArtifactKind::Transcription => "processed_midi",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            ArtifactKind::ProcessedAudio => "wav",
            ArtifactKind::Transcription => "mid",
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            ArtifactKind::ProcessedAudio => "audio/wav",
            ArtifactKind::Transcription => "audio/midi",
        }
    }

    /// Name used in error messages
    pub fn label(self) -> &'static str {
        match self {
            ArtifactKind::ProcessedAudio => "processed_audio",
            ArtifactKind::Transcription => "transcription",
        }
    }
}

/// Local artifact waiting to be published
#[derive(Debug, Clone)]
pub struct PipelineArtifact {
    pub kind: ArtifactKind,
    pub local_path: PathBuf,
}

impl PipelineArtifact {
    pub fn new(kind: ArtifactKind, local_path: PathBuf) -> Self {
        Self { kind, local_path }
    }
}

/// Public URLs for uploaded artifacts plus per-artifact failures
#[derive(Debug, Default)]
pub struct PublishReport {
    pub processed_audio_url: Option<String>,
    pub transcription_url: Option<String>,
    pub errors: Vec<JobError>,
}

pub struct Publisher {
    store: Arc<dyn ObjectStore>,
    metadata: Arc<dyn MetadataStore>,
    buckets: BucketNames,
    upload_timeout: Duration,
    metadata_timeout: Duration,
}

impl Publisher {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        metadata: Arc<dyn MetadataStore>,
        buckets: BucketNames,
        upload_timeout: Duration,
        metadata_timeout: Duration,
    ) -> Self {
        Self {
            store,
            metadata,
            buckets,
            upload_timeout,
            metadata_timeout,
        }
    }

    /// Object path for an artifact: `<owner>/<category>/<job>.<ext>`
    pub fn object_path(kind: ArtifactKind, owner_id: &str, job_id: &str) -> String {
        format!(
            "{}/{}/{}.{}",
            owner_id,
            kind.category(),
            job_id,
            kind.extension()
        )
    }

    fn bucket(&self, kind: ArtifactKind) -> &str {
        match kind {
            ArtifactKind::ProcessedAudio => &self.buckets.audio,
            ArtifactKind::Transcription => &self.buckets.transcription,
        }
    }

    /// Upload every artifact, collecting URLs and failures
    pub async fn publish(
        &self,
        artifacts: &[PipelineArtifact],
        owner_id: &str,
        job_id: &str,
    ) -> PublishReport {
        let mut report = PublishReport::default();

        for artifact in artifacts {
            match self.upload(artifact, owner_id, job_id).await {
                Ok(url) => match artifact.kind {
                    ArtifactKind::ProcessedAudio => report.processed_audio_url = Some(url),
                    ArtifactKind::Transcription => report.transcription_url = Some(url),
                },
                Err(e) => {
                    warn!(job_id = %job_id, error = %e, "Artifact upload failed");
                    report.errors.push(e);
                }
            }
        }

        report
    }

    async fn upload(
        &self,
        artifact: &PipelineArtifact,
        owner_id: &str,
        job_id: &str,
    ) -> Result<String, JobError> {
        let kind = artifact.kind;
        let publish_error = |message: String| JobError::Publish {
            artifact: kind.label().to_string(),
            message,
        };

        let bytes = tokio::fs::read(&artifact.local_path).await.map_err(|e| {
            publish_error(format!("cannot read {}: {}", artifact.local_path.display(), e))
        })?;

        let bucket = self.bucket(kind);
        let path = Self::object_path(kind, owner_id, job_id);
        let size = bytes.len();

        tokio::time::timeout(
            self.upload_timeout,
            self.store
                .upload(bucket, &path, bytes, kind.content_type(), true),
        )
        .await
        .map_err(|_| {
            publish_error(format!(
                "upload timed out after {}s",
                self.upload_timeout.as_secs()
            ))
        })?
        .map_err(|e| publish_error(e.to_string()))?;

        let url = self.store.public_url(bucket, &path);
        info!(
            job_id = %job_id,
            artifact = kind.label(),
            bucket = %bucket,
            bytes = size,
            url = %url,
            "Artifact published"
        );
        Ok(url)
    }

    /// Write the job record for `outcome`
    pub async fn record(&self, owner_id: &str, outcome: &JobOutcome) -> Result<(), JobError> {
        let record = JobRecord::from_outcome(owner_id, outcome);
        tokio::time::timeout(self.metadata_timeout, self.metadata.update_record(&record))
            .await
            .map_err(|_| {
                JobError::Metadata(format!(
                    "record write timed out after {}s",
                    self.metadata_timeout.as_secs()
                ))
            })?
            .map_err(|e| JobError::Metadata(e.to_string()))?;

        info!(
            job_id = %outcome.job_id,
            status = outcome.status.as_str(),
            "Job record written"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_path_layout() {
        assert_eq!(
            Publisher::object_path(ArtifactKind::ProcessedAudio, "user-7", "job-42"),
            "user-7/processed_audio/job-42.wav"
        );
        assert_eq!(
            Publisher::object_path(ArtifactKind::Transcription, "user-7", "job-42"),
            "user-7/processed_midi/job-42.mid"
        );
    }

    #[test]
    fn test_content_types() {
        assert_eq!(ArtifactKind::ProcessedAudio.content_type(), "audio/wav");
        assert_eq!(ArtifactKind::Transcription.content_type(), "audio/midi");
    }
}
