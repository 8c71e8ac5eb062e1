//! Collaborator traits
//!
//! The pipeline consumes every external system through one of these traits.
//! Instances are created once per process, shared across jobs behind `Arc`,
//! and never mutated per job, so implementations must be `Send + Sync`.
//!
//! | Trait | Shipped implementation |
//! |-------|------------------------|
//! | [`AnalysisProvider`] | `HttpAnalysisClient`, `EssentiaAnalyzer` |
//! | [`DspProcessor`] | `OlaProcessor` |
//! | [`NoteExtractor`] | `BasicPitchCli` |
//! | [`ObjectStore`] | `SupabaseStorage`, `LocalObjectStore` |
//! | [`MetadataStore`] | `SqliteMetadataStore` |

use crate::models::{AnalysisResult, JobRecord};
use async_trait::async_trait;
use std::path::Path;
use thiserror::Error;

// ============================================================================
// Analysis
// ============================================================================

/// Key/tempo estimation errors
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// Network communication error
    #[error("Network error: {0}")]
    Network(String),

    /// Provider returned an error response
    #[error("API error {0}: {1}")]
    Api(u16, String),

    /// Response could not be normalized
    #[error("Parse error: {0}")]
    Parse(String),

    /// Local analyzer could not run
    #[error("Execution error: {0}")]
    Execution(String),

    /// I/O error reading the audio or the analyzer output
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// External key/tempo estimation
#[async_trait]
pub trait AnalysisProvider: Send + Sync {
    /// Provider name for logging
    fn name(&self) -> &'static str;

    /// Estimate key and tempo
    ///
    /// Providers may use either the local file or the source URL.
    async fn analyze(
        &self,
        audio_path: &Path,
        source_url: &str,
    ) -> Result<AnalysisResult, AnalysisError>;
}

// ============================================================================
// DSP
// ============================================================================

/// Pitch/tempo kernel errors
#[derive(Debug, Error)]
pub enum DspError {
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Processing failed: {0}")]
    Processing(String),
}

/// Pitch-shift and time-stretch kernels
///
/// Operates on one channel of f32 samples. Assumed deterministic for identical
/// inputs. Called from blocking worker threads.
pub trait DspProcessor: Send + Sync {
    /// Shift pitch by `semitones` without changing duration
    fn pitch_shift(
        &self,
        samples: &[f32],
        sample_rate: u32,
        semitones: i32,
    ) -> Result<Vec<f32>, DspError>;

    /// Change playback rate without changing pitch (`rate` > 1.0 is faster)
    fn time_stretch(&self, samples: &[f32], rate: f64) -> Result<Vec<f32>, DspError>;
}

// ============================================================================
// Transcription
// ============================================================================

/// Note extraction errors
#[derive(Debug, Error)]
pub enum TranscriptionError {
    /// Extractor binary not found in PATH
    #[error("Note extractor binary not found: {0}")]
    BinaryNotFound(String),

    /// Failed to launch the extractor
    #[error("Failed to execute note extractor: {0}")]
    Execution(String),

    /// Extractor ran and reported failure
    #[error("Note extraction failed: {0}")]
    Failed(String),
}

/// External note-event (MIDI) extraction
#[async_trait]
pub trait NoteExtractor: Send + Sync {
    fn name(&self) -> &'static str;

    /// File name the extractor writes for `audio_path` inside its output directory
    fn output_name(&self, audio_path: &Path) -> String;

    /// Write one transcription artifact for `audio_path` into `output_dir`
    async fn extract(&self, audio_path: &Path, output_dir: &Path)
        -> Result<(), TranscriptionError>;
}

// ============================================================================
// Storage
// ============================================================================

/// Object storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error {0}: {1}")]
    Api(u16, String),

    #[error("Object already exists: {0}")]
    AlreadyExists(String),

    #[error("Invalid object path: {0}")]
    InvalidPath(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Durable artifact storage
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Upload `bytes` to `bucket/path`, replacing any existing object when `overwrite`
    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
        overwrite: bool,
    ) -> Result<(), StorageError>;

    /// Public address of `bucket/path`
    fn public_url(&self, bucket: &str, path: &str) -> String;
}

// ============================================================================
// Metadata
// ============================================================================

/// Metadata store errors
#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Corrupt record for job {0}: {1}")]
    Corrupt(String, String),
}

impl From<retune_common::Error> for MetadataError {
    fn from(err: retune_common::Error) -> Self {
        MetadataError::Database(err.to_string())
    }
}

/// Job status records for downstream consumers
#[async_trait]
pub trait MetadataStore: Send + Sync {
    /// Insert or replace the record for `record.job_id`
    async fn update_record(&self, record: &JobRecord) -> Result<(), MetadataError>;

    async fn get_record(&self, job_id: &str) -> Result<Option<JobRecord>, MetadataError>;
}
