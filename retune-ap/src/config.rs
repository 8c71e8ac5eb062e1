//! Configuration for retune-ap
//!
//! `retune-ap.toml` sections: `[logging]`, `[storage]`, `[analysis]`,
//! `[transcription]`, `[timeouts]`. Every key has a compiled default.
//!
//! Credentials and endpoints are resolved ENV → TOML. When a value is found in
//! more than one source the environment wins and a warning is logged.

use crate::pipeline::{BucketNames, PipelineSettings, Timeouts};
use crate::services::basic_pitch::{DEFAULT_BASIC_PITCH_BINARY, DEFAULT_OUTPUT_SUFFIX};
use crate::services::essentia_client::DEFAULT_ESSENTIA_BINARY;
use crate::services::http_analysis_client::RequestMode;
use retune_common::config::{env_non_empty, LoggingConfig};
use retune_common::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

pub const DEFAULT_PORT: u16 = 5780;

/// Workspace directory inside the root folder
pub const WORKSPACE_DIR: &str = "workspaces";

/// Top-level TOML configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub root_folder: Option<PathBuf>,
    pub port: Option<u16>,
    pub bind_address: Option<String>,
    /// Overrides `<root>/workspaces`
    pub workspace_dir: Option<PathBuf>,
    /// Overrides `<root>/retune.db`
    pub database_path: Option<PathBuf>,
    pub logging: LoggingConfig,
    pub storage: StorageConfig,
    pub analysis: AnalysisConfig,
    pub transcription: TranscriptionConfig,
    pub timeouts: TimeoutConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageProvider {
    #[default]
    Supabase,
    Local,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub provider: StorageProvider,
    /// Supabase project URL
    pub url: Option<String>,
    /// Supabase service key
    pub key: Option<String>,
    /// Local provider: directory holding the buckets
    pub local_root: Option<PathBuf>,
    /// Local provider: URL prefix the directory is served under
    pub public_base_url: Option<String>,
    pub audio_bucket: String,
    pub transcription_bucket: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        let buckets = BucketNames::default();
        Self {
            provider: StorageProvider::default(),
            url: None,
            key: None,
            local_root: None,
            public_base_url: None,
            audio_bucket: buckets.audio,
            transcription_bucket: buckets.transcription,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisProviderKind {
    /// Analysis disabled
    None,
    Http,
    #[default]
    Essentia,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub provider: AnalysisProviderKind,
    pub endpoint: Option<String>,
    pub request_mode: RequestMode,
    pub api_key: Option<String>,
    /// JSON pointer to the key (or key root when `scale_pointer` is set)
    pub key_pointer: String,
    pub scale_pointer: Option<String>,
    pub tempo_pointer: String,
    pub essentia_binary: String,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            provider: AnalysisProviderKind::default(),
            endpoint: None,
            request_mode: RequestMode::default(),
            api_key: None,
            key_pointer: "/key".to_string(),
            scale_pointer: None,
            tempo_pointer: "/tempo".to_string(),
            essentia_binary: DEFAULT_ESSENTIA_BINARY.to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TranscriptionConfig {
    pub binary: String,
    pub output_suffix: String,
}

impl Default for TranscriptionConfig {
    fn default() -> Self {
        Self {
            binary: DEFAULT_BASIC_PITCH_BINARY.to_string(),
            output_suffix: DEFAULT_OUTPUT_SUFFIX.to_string(),
        }
    }
}

/// Timeouts in seconds
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    pub connect_secs: u64,
    pub download_stall_secs: u64,
    pub analysis_secs: u64,
    pub transcription_secs: u64,
    pub upload_secs: u64,
    pub metadata_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        let defaults = Timeouts::default();
        Self {
            connect_secs: defaults.connect.as_secs(),
            download_stall_secs: defaults.download_stall.as_secs(),
            analysis_secs: defaults.analysis.as_secs(),
            transcription_secs: defaults.transcription.as_secs(),
            upload_secs: defaults.upload.as_secs(),
            metadata_secs: defaults.metadata.as_secs(),
        }
    }
}

impl TimeoutConfig {
    /// Zero values fall back to one second so no call is unbounded
    pub fn to_timeouts(&self) -> Timeouts {
        let secs = |v: u64| Duration::from_secs(v.max(1));
        Timeouts {
            connect: secs(self.connect_secs),
            download_stall: secs(self.download_stall_secs),
            analysis: secs(self.analysis_secs),
            transcription: secs(self.transcription_secs),
            upload: secs(self.upload_secs),
            metadata: secs(self.metadata_secs),
        }
    }
}

impl ServiceConfig {
    pub fn workspace_root(&self, root_folder: &Path) -> PathBuf {
        self.workspace_dir
            .clone()
            .unwrap_or_else(|| root_folder.join(WORKSPACE_DIR))
    }

    pub fn database_path(&self, root_folder: &Path) -> PathBuf {
        self.database_path
            .clone()
            .unwrap_or_else(|| root_folder.join(crate::db::DATABASE_FILE))
    }

    pub fn pipeline_settings(&self, root_folder: &Path) -> PipelineSettings {
        PipelineSettings {
            workspace_root: self.workspace_root(root_folder),
            buckets: BucketNames {
                audio: self.storage.audio_bucket.clone(),
                transcription: self.storage.transcription_bucket.clone(),
            },
            timeouts: self.timeouts.to_timeouts(),
        }
    }
}

/// Resolve a value from ENV (first non-empty of `env_names`) → TOML
///
/// Returns the value and the source it came from.
pub fn resolve_setting(
    label: &str,
    env_names: &[&str],
    toml_value: Option<&str>,
) -> Option<(String, &'static str)> {
    let env_value = env_names.iter().find_map(|name| env_non_empty(name));
    let toml_value = toml_value.filter(|v| is_valid_key(v));

    if env_value.is_some() && toml_value.is_some() {
        warn!(
            "{} found in multiple sources: environment, TOML. Using environment (highest priority).",
            label
        );
    }

    if let Some(value) = env_value {
        info!("{} loaded from environment variable", label);
        return Some((value, "environment"));
    }
    if let Some(value) = toml_value {
        info!("{} loaded from TOML config", label);
        return Some((value.to_string(), "TOML"));
    }
    None
}

/// Supabase URL and key
///
/// **Priority:** ENV (`SUPABASE_URL`, `SUPABASE_KEY` / `RETUNE_STORAGE_KEY`) → TOML
pub fn resolve_storage_credentials(storage: &StorageConfig) -> Result<(String, String)> {
    let url = resolve_setting("Storage URL", &["SUPABASE_URL"], storage.url.as_deref());
    let key = resolve_setting(
        "Storage key",
        &["SUPABASE_KEY", "RETUNE_STORAGE_KEY"],
        storage.key.as_deref(),
    );

    match (url, key) {
        (Some((url, _)), Some((key, _))) => Ok((url, key)),
        (url, _) => {
            let missing = if url.is_none() { "URL" } else { "key" };
            Err(Error::Config(format!(
                "Storage {} not configured. Please configure using one of:\n\
                 1. Environment: SUPABASE_URL / SUPABASE_KEY (or RETUNE_STORAGE_KEY)\n\
                 2. TOML config: [storage] url = \"...\", key = \"...\"\n\
                 3. TOML config: [storage] provider = \"local\" for a local directory",
                missing
            )))
        }
    }
}

/// Analysis service endpoint
///
/// **Priority:** ENV (`RETUNE_ANALYSIS_URL`) → TOML
pub fn resolve_analysis_endpoint(analysis: &AnalysisConfig) -> Result<String> {
    resolve_setting(
        "Analysis endpoint",
        &["RETUNE_ANALYSIS_URL"],
        analysis.endpoint.as_deref(),
    )
    .map(|(value, _)| value)
    .ok_or_else(|| {
        Error::Config(
            "Analysis endpoint not configured. Set RETUNE_ANALYSIS_URL or [analysis] endpoint, \
             or choose provider = \"essentia\" / \"none\""
                .to_string(),
        )
    })
}

/// Analysis API key (optional)
///
/// **Priority:** ENV (`RETUNE_ANALYSIS_API_KEY`) → TOML
pub fn resolve_analysis_api_key(analysis: &AnalysisConfig) -> Option<String> {
    resolve_setting(
        "Analysis API key",
        &["RETUNE_ANALYSIS_API_KEY"],
        analysis.api_key.as_deref(),
    )
    .map(|(value, _)| value)
}

/// Validate key (non-empty, non-whitespace)
pub fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}
