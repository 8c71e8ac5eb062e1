//! Per-job audio pipeline
//!
//! Runs one request through the stage sequence:
//! - **Downloading**: stream the source into a private workspace (fatal on failure)
//! - **Analyzing → Planning → Transforming**: detect key/tempo, decide and apply transforms
//! - **Transcribing**: extract note events from the original audio (runs alongside the above)
//! - **Publishing**: upload artifacts and write the job record
//!
//! Fatal errors end the job as `failed`. Every other stage failure is recorded
//! into the outcome and the job continues, ending as `partial`.
//!
//! # Architecture
//!
//! All external systems are reached through the traits in [`crate::types`],
//! injected once via [`Collaborators`]. The workspace is opened and closed in
//! [`Pipeline::run`] only; stages borrow it.

pub mod acquisition;
pub mod analyzer;
pub mod executor;
pub mod planner;
pub mod publisher;
pub mod transcriber;
pub mod workspace;

pub use acquisition::Acquisition;
pub use analyzer::Analyzer;
pub use executor::TransformExecutor;
pub use planner::{plan, TransformPlan};
pub use publisher::{ArtifactKind, PipelineArtifact, PublishReport, Publisher};
pub use transcriber::Transcriber;
pub use workspace::Workspace;

use crate::error::JobError;
use crate::models::{AnalysisResult, AudioJobRequest, JobOutcome, JobStatus};
use crate::types::{AnalysisProvider, DspProcessor, MetadataStore, NoteExtractor, ObjectStore};
use chrono::Utc;
use retune_common::events::{EventBus, JobEvent, JobStage};
use retune_common::keys::KeyDistance;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Destination buckets for published artifacts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketNames {
    pub audio: String,
    pub transcription: String,
}

impl Default for BucketNames {
    fn default() -> Self {
        Self {
            audio: "processed-audio".to_string(),
            transcription: "processed-midi".to_string(),
        }
    }
}

/// Upper bounds for every external call a job makes
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Timeouts {
    pub connect: Duration,
    /// No response headers or no body bytes for this long aborts the download
    pub download_stall: Duration,
    pub analysis: Duration,
    pub transcription: Duration,
    /// Per artifact
    pub upload: Duration,
    pub metadata: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            connect: Duration::from_secs(10),
            download_stall: Duration::from_secs(30),
            analysis: Duration::from_secs(120),
            transcription: Duration::from_secs(600),
            upload: Duration::from_secs(120),
            metadata: Duration::from_secs(10),
        }
    }
}

/// Process-wide pipeline settings
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    /// Parent directory for per-job workspaces
    pub workspace_root: PathBuf,
    pub buckets: BucketNames,
    pub timeouts: Timeouts,
}

impl PipelineSettings {
    pub fn new(workspace_root: PathBuf) -> Self {
        Self {
            workspace_root,
            buckets: BucketNames::default(),
            timeouts: Timeouts::default(),
        }
    }
}

/// External systems used by the pipeline, shared across jobs
#[derive(Clone)]
pub struct Collaborators {
    /// `None` disables analysis; jobs still run with an empty detection
    pub analysis: Option<Arc<dyn AnalysisProvider>>,
    pub dsp: Arc<dyn DspProcessor>,
    pub notes: Arc<dyn NoteExtractor>,
    pub store: Arc<dyn ObjectStore>,
    pub metadata: Arc<dyn MetadataStore>,
}

/// Job orchestrator
pub struct Pipeline {
    workspace_root: PathBuf,
    acquisition: Acquisition,
    analyzer: Analyzer,
    executor: TransformExecutor,
    transcriber: Transcriber,
    publisher: Publisher,
    events: EventBus,
}

impl Pipeline {
    pub fn new(
        settings: PipelineSettings,
        collaborators: Collaborators,
        events: EventBus,
    ) -> Result<Self, JobError> {
        let timeouts = settings.timeouts;
        Ok(Self {
            workspace_root: settings.workspace_root,
            acquisition: Acquisition::new(timeouts.connect, timeouts.download_stall)?,
            analyzer: Analyzer::new(collaborators.analysis, timeouts.analysis),
            executor: TransformExecutor::new(collaborators.dsp),
            transcriber: Transcriber::new(collaborators.notes, timeouts.transcription),
            publisher: Publisher::new(
                collaborators.store,
                collaborators.metadata,
                settings.buckets,
                timeouts.upload,
                timeouts.metadata,
            ),
            events,
        })
    }

    pub fn workspace_root(&self) -> &Path {
        &self.workspace_root
    }

    pub fn analysis_configured(&self) -> bool {
        self.analyzer.is_configured()
    }

    /// Run one job to completion
    ///
    /// Never returns an error: every failure is reported through the outcome.
    pub async fn run(&self, request: &AudioJobRequest) -> JobOutcome {
        let job_id = request.job_id.as_str();
        self.enter(job_id, JobStage::Created);

        if let Err(e) = request.validate() {
            error!(job_id = %job_id, error = %e, "Request rejected");
            let outcome = JobOutcome::failed(job_id, &e);
            self.finish(&outcome);
            return outcome;
        }

        let workspace = match Workspace::open(&self.workspace_root, job_id) {
            Ok(workspace) => workspace,
            Err(e) => {
                error!(job_id = %job_id, error = %e, "Cannot open workspace");
                let outcome = JobOutcome::failed(job_id, &e);
                self.finish(&outcome);
                return outcome;
            }
        };

        let outcome = self.run_stages(request, &workspace).await;

        // Single release point for every path that opened a workspace
        match workspace.close() {
            Ok(()) => {
                self.events.emit(JobEvent::WorkspaceReleased {
                    job_id: job_id.to_string(),
                    timestamp: Utc::now(),
                });
            }
            Err(e) => warn!(job_id = %job_id, error = %e, "Workspace cleanup failed"),
        }

        self.finish(&outcome);
        outcome
    }

    async fn run_stages(&self, request: &AudioJobRequest, workspace: &Workspace) -> JobOutcome {
        let job_id = request.job_id.as_str();
        let owner_id = request.owner_id.as_str();

        self.enter(job_id, JobStage::Downloading);
        let source = match self.acquisition.fetch(&request.source_url, workspace).await {
            Ok(path) => path,
            Err(e) => {
                error!(job_id = %job_id, error = %e, "Source download failed");
                let outcome = JobOutcome::failed(job_id, &e);
                if let Err(record_err) = self.publisher.record(owner_id, &outcome).await {
                    warn!(job_id = %job_id, error = %record_err, "Failed job record not written");
                }
                return outcome;
            }
        };

        // Analysis feeds planning and transforms; transcription only needs the source
        let transform_branch = async {
            self.enter(job_id, JobStage::Analyzing);
            let (analysis, analysis_error) =
                self.analyzer.analyze(&source, &request.source_url).await;

            self.enter(job_id, JobStage::Planning);
            let plan = plan(request.desired_key.as_deref(), request.desired_tempo, &analysis);
            debug!(
                job_id = %job_id,
                semitones = plan.semitone_shift(),
                tempo_ratio = plan.tempo_ratio(),
                should_apply = plan.should_apply(),
                "Transform plan"
            );

            if plan.should_apply() {
                self.enter(job_id, JobStage::Transforming);
            }
            let processed = self.executor.apply(&source, &plan, workspace).await;
            (analysis, analysis_error, plan, processed)
        };

        let transcription_branch = async {
            if request.want_transcription {
                self.enter(job_id, JobStage::Transcribing);
                Some(self.transcriber.transcribe(&source, workspace).await)
            } else {
                None
            }
        };

        let ((analysis, analysis_error, plan, processed), transcription) =
            tokio::join!(transform_branch, transcription_branch);

        let mut warnings = Vec::new();
        let mut errors = Vec::new();
        let mut artifacts = Vec::new();

        if let Some(e) = analysis_error {
            self.degraded(job_id, &e);
            warnings.push(e.to_string());
        }
        warnings.extend(skipped_transform_notes(request, &analysis, &plan));

        match processed {
            Ok(Some(path)) => artifacts.push(PipelineArtifact::new(ArtifactKind::ProcessedAudio, path)),
            Ok(None) => {}
            Err(e) => {
                self.degraded(job_id, &e);
                errors.push(e);
            }
        }

        match transcription {
            Some(Ok(path)) => artifacts.push(PipelineArtifact::new(ArtifactKind::Transcription, path)),
            Some(Err(e)) => {
                self.degraded(job_id, &e);
                errors.push(e);
            }
            None => {}
        }

        self.enter(job_id, JobStage::Publishing);
        let report = self.publisher.publish(&artifacts, owner_id, job_id).await;
        for e in &report.errors {
            self.degraded(job_id, e);
        }
        errors.extend(report.errors);

        let mut outcome = JobOutcome::completed(
            job_id,
            &analysis,
            report.processed_audio_url,
            report.transcription_url,
            &errors,
            warnings,
        );

        if let Err(e) = self.publisher.record(owner_id, &outcome).await {
            self.degraded(job_id, &e);
            outcome.degrade(&e);
        }

        outcome
    }

    fn enter(&self, job_id: &str, stage: JobStage) {
        info!(job_id = %job_id, stage = stage.as_str(), "Stage entered");
        self.events.emit(JobEvent::StageChanged {
            job_id: job_id.to_string(),
            stage,
            timestamp: Utc::now(),
        });
    }

    fn degraded(&self, job_id: &str, error: &JobError) {
        let stage = error.stage();
        warn!(job_id = %job_id, stage = stage.as_str(), error = %error, "Stage degraded");
        self.events.emit(JobEvent::StageDegraded {
            job_id: job_id.to_string(),
            stage,
            message: error.to_string(),
            timestamp: Utc::now(),
        });
    }

    fn finish(&self, outcome: &JobOutcome) {
        match outcome.status {
            JobStatus::Success => info!(job_id = %outcome.job_id, "Job succeeded"),
            JobStatus::Partial => warn!(
                job_id = %outcome.job_id,
                error = ?outcome.error_message,
                "Job completed with errors"
            ),
            JobStatus::Failed => error!(
                job_id = %outcome.job_id,
                error = ?outcome.error_message,
                "Job failed"
            ),
        }
        self.events.emit(JobEvent::JobCompleted {
            job_id: outcome.job_id.clone(),
            status: outcome.status.stage(),
            timestamp: Utc::now(),
        });
    }
}

/// Notes for requested transforms that could not be computed
fn skipped_transform_notes(
    request: &AudioJobRequest,
    analysis: &AnalysisResult,
    plan: &TransformPlan,
) -> Vec<String> {
    let mut notes = Vec::new();

    if let Some(desired) = request.desired_key.as_deref() {
        match (analysis.detected_key.as_deref(), plan.key_distance()) {
            (None, _) => notes.push("pitch shift skipped: key not detected".to_string()),
            (Some(detected), Some(KeyDistance::Unrecognized)) => notes.push(format!(
                "pitch shift skipped: unrecognized key (detected '{}', desired '{}')",
                detected, desired
            )),
            _ => {}
        }
    }

    if request.desired_tempo.is_some() && analysis.detected_tempo.is_none() {
        notes.push("tempo change skipped: tempo not detected".to_string());
    }

    notes
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> AudioJobRequest {
        AudioJobRequest::new("https://cdn.example.com/a.wav", "owner", "job")
    }

    #[test]
    fn test_default_settings() {
        let settings = PipelineSettings::new(PathBuf::from("/tmp/retune"));
        assert_eq!(settings.buckets.audio, "processed-audio");
        assert_eq!(settings.buckets.transcription, "processed-midi");
        assert_eq!(settings.timeouts.download_stall, Duration::from_secs(30));
    }

    #[test]
    fn test_skip_notes_for_missing_detection() {
        let req = request().with_desired_key("D Major").with_desired_tempo(120.0);
        let analysis = AnalysisResult::unknown();
        let p = plan(req.desired_key.as_deref(), req.desired_tempo, &analysis);
        let notes = skipped_transform_notes(&req, &analysis, &p);
        assert_eq!(notes.len(), 2);
        assert!(notes[0].contains("key not detected"));
        assert!(notes[1].contains("tempo not detected"));
    }

    #[test]
    fn test_skip_note_for_unrecognized_key() {
        let req = request().with_desired_key("Q Major");
        let analysis = AnalysisResult::new(Some("C Major".into()), None);
        let p = plan(req.desired_key.as_deref(), req.desired_tempo, &analysis);
        let notes = skipped_transform_notes(&req, &analysis, &p);
        assert_eq!(notes.len(), 1);
        assert!(notes[0].contains("unrecognized key"));
    }

    #[test]
    fn test_no_notes_when_nothing_requested() {
        let req = request();
        let analysis = AnalysisResult::unknown();
        let p = plan(None, None, &analysis);
        assert!(skipped_transform_notes(&req, &analysis, &p).is_empty());
    }
}
