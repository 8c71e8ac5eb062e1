//! External service adapters
//!
//! Concrete implementations of the collaborator traits in [`crate::types`],
//! plus [`build_collaborators`] which wires them from configuration.

pub mod audio_io;
pub mod basic_pitch;
pub mod dsp;
pub mod essentia_client;
pub mod http_analysis_client;
pub mod object_store;

pub use basic_pitch::BasicPitchCli;
pub use dsp::OlaProcessor;
pub use essentia_client::EssentiaAnalyzer;
pub use http_analysis_client::{HttpAnalysisClient, RequestMode, ResponsePointers};
pub use object_store::{LocalObjectStore, SupabaseStorage};

use crate::config::{
    resolve_analysis_api_key, resolve_analysis_endpoint, resolve_storage_credentials,
    AnalysisProviderKind, ServiceConfig, StorageProvider,
};
use crate::db::SqliteMetadataStore;
use crate::error::JobError;
use crate::pipeline::Collaborators;
use crate::types::{AnalysisProvider, ObjectStore};
use sqlx::SqlitePool;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Default directory for the local object store inside the root folder
pub const LOCAL_OBJECTS_DIR: &str = "objects";

/// Build the collaborator bundle described by `config`
///
/// Missing credentials or endpoints are `Configuration` errors.
pub fn build_collaborators(
    config: &ServiceConfig,
    root_folder: &Path,
    pool: SqlitePool,
) -> Result<Collaborators, JobError> {
    let timeouts = config.timeouts.to_timeouts();

    let store: Arc<dyn ObjectStore> = match config.storage.provider {
        StorageProvider::Supabase => {
            let (url, key) = resolve_storage_credentials(&config.storage)
                .map_err(|e| JobError::Configuration(e.to_string()))?;
            info!(url = %url, "Using Supabase storage");
            Arc::new(
                SupabaseStorage::new(&url, &key, timeouts.upload)
                    .map_err(|e| JobError::Configuration(e.to_string()))?,
            )
        }
        StorageProvider::Local => {
            let root = config
                .storage
                .local_root
                .clone()
                .unwrap_or_else(|| root_folder.join(LOCAL_OBJECTS_DIR));
            let base_url = config.storage.public_base_url.clone().ok_or_else(|| {
                JobError::Configuration(
                    "[storage] public_base_url is required for the local provider".to_string(),
                )
            })?;
            info!(root = %root.display(), base_url = %base_url, "Using local object storage");
            Arc::new(LocalObjectStore::new(root, &base_url))
        }
    };

    let analysis: Option<Arc<dyn AnalysisProvider>> = match config.analysis.provider {
        AnalysisProviderKind::None => {
            info!("Analysis disabled");
            None
        }
        AnalysisProviderKind::Http => {
            let endpoint = resolve_analysis_endpoint(&config.analysis)
                .map_err(|e| JobError::Configuration(e.to_string()))?;
            let pointers = ResponsePointers {
                key: config.analysis.key_pointer.clone(),
                scale: config.analysis.scale_pointer.clone(),
                tempo: config.analysis.tempo_pointer.clone(),
            };
            info!(endpoint = %endpoint, mode = ?config.analysis.request_mode, "Using HTTP analysis");
            Some(Arc::new(
                HttpAnalysisClient::new(
                    &endpoint,
                    resolve_analysis_api_key(&config.analysis),
                    config.analysis.request_mode,
                    pointers,
                    timeouts.analysis,
                )
                .map_err(|e| JobError::Configuration(e.to_string()))?,
            ))
        }
        AnalysisProviderKind::Essentia => {
            info!(binary = %config.analysis.essentia_binary, "Using Essentia analysis");
            Some(Arc::new(EssentiaAnalyzer::new(
                config.analysis.essentia_binary.clone(),
            )))
        }
    };

    Ok(Collaborators {
        analysis,
        dsp: Arc::new(OlaProcessor::new()),
        notes: Arc::new(BasicPitchCli::new(
            config.transcription.binary.clone(),
            config.transcription.output_suffix.clone(),
        )),
        store,
        metadata: Arc::new(SqliteMetadataStore::new(pool)),
    })
}
