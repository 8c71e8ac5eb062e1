//! Test Helper Utilities
//!
//! Shared utilities for testing retune-ap

#![allow(dead_code)]

pub mod audio_generator;
pub mod fakes;
pub mod source_server;

pub use audio_generator::{generate_tone_wav, tone_wav_bytes, ToneConfig};
pub use fakes::{
    drain_events, FailingAnalysis, FakeNotes, FixedAnalysis, HangingAnalysis,
    MemoryMetadataStore, MemoryObjectStore, RecordingDsp, WorkspaceWipingNotes,
};
pub use source_server::SourceServer;

use retune_ap::pipeline::{Collaborators, Pipeline, PipelineSettings, Timeouts};
use retune_ap::types::AnalysisProvider;
use retune_common::events::{EventBus, JobEvent};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

/// Fakes wired into one collaborator bundle, kept for inspection after a run
pub struct TestCollaborators {
    pub analysis: Option<Arc<dyn AnalysisProvider>>,
    pub dsp: Arc<RecordingDsp>,
    pub notes: Arc<FakeNotes>,
    pub store: Arc<MemoryObjectStore>,
    pub metadata: Arc<MemoryMetadataStore>,
}

impl TestCollaborators {
    /// Analysis reports C Major at 120 BPM; every other collaborator succeeds
    pub fn healthy() -> Self {
        Self {
            analysis: Some(Arc::new(FixedAnalysis::new(Some("C Major"), Some(120.0)))),
            dsp: Arc::new(RecordingDsp::new()),
            notes: Arc::new(FakeNotes::writing()),
            store: Arc::new(MemoryObjectStore::new()),
            metadata: Arc::new(MemoryMetadataStore::new()),
        }
    }

    pub fn bundle(&self) -> Collaborators {
        Collaborators {
            analysis: self.analysis.clone(),
            dsp: self.dsp.clone(),
            notes: self.notes.clone(),
            store: self.store.clone(),
            metadata: self.metadata.clone(),
        }
    }
}

/// Short timeouts so a broken fake never stalls the suite
pub fn test_timeouts() -> Timeouts {
    Timeouts {
        connect: Duration::from_secs(2),
        download_stall: Duration::from_secs(5),
        analysis: Duration::from_secs(5),
        transcription: Duration::from_secs(5),
        upload: Duration::from_secs(5),
        metadata: Duration::from_secs(5),
    }
}

/// Build a pipeline whose workspaces live under `workspace_root`
///
/// Returns a receiver subscribed before any job runs.
pub fn build_pipeline(
    workspace_root: &Path,
    collaborators: Collaborators,
) -> (Pipeline, broadcast::Receiver<JobEvent>) {
    build_pipeline_with_timeouts(workspace_root, collaborators, test_timeouts())
}

pub fn build_pipeline_with_timeouts(
    workspace_root: &Path,
    collaborators: Collaborators,
    timeouts: Timeouts,
) -> (Pipeline, broadcast::Receiver<JobEvent>) {
    let mut settings = PipelineSettings::new(workspace_root.to_path_buf());
    settings.timeouts = timeouts;

    let event_bus = EventBus::new(256);
    let rx = event_bus.subscribe();
    let pipeline = Pipeline::new(settings, collaborators, event_bus).unwrap();
    (pipeline, rx)
}

/// Entries currently present in `dir` (0 when it does not exist)
pub fn count_entries(dir: &Path) -> usize {
    std::fs::read_dir(dir).map(|d| d.count()).unwrap_or(0)
}
