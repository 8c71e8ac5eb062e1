//! In-memory collaborator fakes

use async_trait::async_trait;
use retune_ap::models::{AnalysisResult, JobRecord};
use retune_ap::types::{
    AnalysisError, AnalysisProvider, DspError, DspProcessor, MetadataError, MetadataStore,
    NoteExtractor, ObjectStore, StorageError, TranscriptionError,
};
use retune_common::events::JobEvent;
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use tokio::sync::{broadcast, Notify};

/// Analysis provider returning a fixed detection
pub struct FixedAnalysis {
    result: AnalysisResult,
    calls: AtomicUsize,
}

impl FixedAnalysis {
    pub fn new(key: Option<&str>, tempo: Option<f64>) -> Self {
        Self {
            result: AnalysisResult::new(key.map(str::to_string), tempo),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AnalysisProvider for FixedAnalysis {
    fn name(&self) -> &'static str {
        "fixed"
    }

    async fn analyze(&self, _: &Path, _: &str) -> Result<AnalysisResult, AnalysisError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.result.clone())
    }
}

/// Analysis provider that always reports an outage
pub struct FailingAnalysis;

#[async_trait]
impl AnalysisProvider for FailingAnalysis {
    fn name(&self) -> &'static str {
        "failing"
    }

    async fn analyze(&self, _: &Path, _: &str) -> Result<AnalysisResult, AnalysisError> {
        Err(AnalysisError::Api(503, "service unavailable".to_string()))
    }
}

/// Analysis provider that never answers; signals once it has been called
pub struct HangingAnalysis {
    entered: Notify,
}

impl HangingAnalysis {
    pub fn new() -> Self {
        Self {
            entered: Notify::new(),
        }
    }

    /// Resolves once `analyze` has started
    pub async fn entered(&self) {
        self.entered.notified().await;
    }
}

#[async_trait]
impl AnalysisProvider for HangingAnalysis {
    fn name(&self) -> &'static str {
        "hanging"
    }

    async fn analyze(&self, _: &Path, _: &str) -> Result<AnalysisResult, AnalysisError> {
        self.entered.notify_one();
        std::future::pending().await
    }
}

/// DSP that logs every call and returns length-correct copies
pub struct RecordingDsp {
    calls: Mutex<Vec<String>>,
    fail: bool,
}

impl RecordingDsp {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl DspProcessor for RecordingDsp {
    fn pitch_shift(&self, samples: &[f32], _: u32, semitones: i32) -> Result<Vec<f32>, DspError> {
        self.calls.lock().unwrap().push(format!("pitch:{}", semitones));
        if self.fail {
            return Err(DspError::Processing("kernel crashed".to_string()));
        }
        Ok(samples.to_vec())
    }

    fn time_stretch(&self, samples: &[f32], rate: f64) -> Result<Vec<f32>, DspError> {
        self.calls.lock().unwrap().push(format!("tempo:{}", rate));
        if self.fail {
            return Err(DspError::Processing("kernel crashed".to_string()));
        }
        let len = (samples.len() as f64 / rate).round() as usize;
        Ok(samples.iter().copied().cycle().take(len).collect())
    }
}

/// Note extractor writing `<stem>_notes.mid`, or reporting success without output
pub struct FakeNotes {
    write_output: bool,
    calls: AtomicUsize,
}

impl FakeNotes {
    pub fn writing() -> Self {
        Self {
            write_output: true,
            calls: AtomicUsize::new(0),
        }
    }

    /// Exits cleanly but leaves no artifact
    pub fn silent() -> Self {
        Self {
            write_output: false,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl NoteExtractor for FakeNotes {
    fn name(&self) -> &'static str {
        "fake-notes"
    }

    fn output_name(&self, audio_path: &Path) -> String {
        let stem = audio_path.file_stem().unwrap().to_string_lossy();
        format!("{}_notes.mid", stem)
    }

    async fn extract(&self, audio_path: &Path, output_dir: &Path) -> Result<(), TranscriptionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.write_output {
            let dest = output_dir.join(self.output_name(audio_path));
            tokio::fs::write(dest, b"MThd\0\0\0\x06\0\0\0\x01\0\x60")
                .await
                .map_err(|e| TranscriptionError::Execution(e.to_string()))?;
        }
        Ok(())
    }
}

/// Note extractor that deletes the whole job workspace instead of writing output
pub struct WorkspaceWipingNotes;

#[async_trait]
impl NoteExtractor for WorkspaceWipingNotes {
    fn name(&self) -> &'static str {
        "workspace-wiping-notes"
    }

    fn output_name(&self, _: &Path) -> String {
        "never.mid".to_string()
    }

    async fn extract(&self, _: &Path, output_dir: &Path) -> Result<(), TranscriptionError> {
        let workspace = output_dir.parent().unwrap();
        tokio::fs::remove_dir_all(workspace)
            .await
            .map_err(|e| TranscriptionError::Execution(e.to_string()))
    }
}

/// Object store keeping uploads in a map keyed by `bucket/path`
pub struct MemoryObjectStore {
    objects: Mutex<HashMap<String, Vec<u8>>>,
    failing_bucket: Option<String>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self {
            objects: Mutex::new(HashMap::new()),
            failing_bucket: None,
        }
    }

    /// Rejects every upload into `bucket`
    pub fn failing_for(bucket: &str) -> Self {
        Self {
            objects: Mutex::new(HashMap::new()),
            failing_bucket: Some(bucket.to_string()),
        }
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.objects.lock().unwrap().keys().cloned().collect();
        keys.sort();
        keys
    }

    pub fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.objects.lock().unwrap().get(key).cloned()
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        bytes: Vec<u8>,
        _content_type: &str,
        overwrite: bool,
    ) -> Result<(), StorageError> {
        if self.failing_bucket.as_deref() == Some(bucket) {
            return Err(StorageError::Api(500, "bucket offline".to_string()));
        }
        let key = format!("{}/{}", bucket, path);
        let mut objects = self.objects.lock().unwrap();
        if !overwrite && objects.contains_key(&key) {
            return Err(StorageError::AlreadyExists(key));
        }
        objects.insert(key, bytes);
        Ok(())
    }

    fn public_url(&self, bucket: &str, path: &str) -> String {
        format!("memory://{}/{}", bucket, path)
    }
}

/// Metadata store keeping the last record per job
pub struct MemoryMetadataStore {
    records: Mutex<HashMap<String, JobRecord>>,
    writes: AtomicUsize,
    fail: bool,
}

impl MemoryMetadataStore {
    pub fn new() -> Self {
        Self {
            records: Mutex::new(HashMap::new()),
            writes: AtomicUsize::new(0),
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            records: Mutex::new(HashMap::new()),
            writes: AtomicUsize::new(0),
            fail: true,
        }
    }

    pub fn record(&self, job_id: &str) -> Option<JobRecord> {
        self.records.lock().unwrap().get(job_id).cloned()
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MetadataStore for MemoryMetadataStore {
    async fn update_record(&self, record: &JobRecord) -> Result<(), MetadataError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(MetadataError::Database("connection refused".to_string()));
        }
        self.records
            .lock()
            .unwrap()
            .insert(record.job_id.clone(), record.clone());
        Ok(())
    }

    async fn get_record(&self, job_id: &str) -> Result<Option<JobRecord>, MetadataError> {
        Ok(self.record(job_id))
    }
}

/// Every event already delivered to `rx`
pub fn drain_events(rx: &mut broadcast::Receiver<JobEvent>) -> Vec<JobEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}
