//! Artifact object storage
//!
//! - [`SupabaseStorage`]: Supabase Storage REST API
//! - [`LocalObjectStore`]: plain directory tree served under a base URL

use crate::types::{ObjectStore, StorageError};
use async_trait::async_trait;
use reqwest::Client;
use std::path::{Component, Path, PathBuf};
use std::time::Duration;

/// Supabase Storage client
pub struct SupabaseStorage {
    http_client: Client,
    base_url: String,
    api_key: String,
}

impl SupabaseStorage {
    pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> Result<Self, StorageError> {
        let http_client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| StorageError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }

    fn object_url(&self, bucket: &str, path: &str) -> String {
        format!("{}/storage/v1/object/{}/{}", self.base_url, bucket, path)
    }
}

#[async_trait]
impl ObjectStore for SupabaseStorage {
    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
        overwrite: bool,
    ) -> Result<(), StorageError> {
        validate_object_path(path)?;
        let url = self.object_url(bucket, path);

        tracing::debug!(bucket = %bucket, path = %path, bytes = bytes.len(), "Uploading object");

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&self.api_key)
            .header("apikey", &self.api_key)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .header("x-upsert", if overwrite { "true" } else { "false" })
            .body(bytes)
            .send()
            .await
            .map_err(|e| StorageError::Network(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::CONFLICT {
            return Err(StorageError::AlreadyExists(format!("{}/{}", bucket, path)));
        }
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(StorageError::Api(status.as_u16(), error_text));
        }

        Ok(())
    }

    fn public_url(&self, bucket: &str, path: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{}/{}",
            self.base_url, bucket, path
        )
    }
}

/// Filesystem-backed object store
pub struct LocalObjectStore {
    root: PathBuf,
    public_base_url: String,
}

impl LocalObjectStore {
    pub fn new(root: impl Into<PathBuf>, public_base_url: &str) -> Self {
        Self {
            root: root.into(),
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Location of `bucket/path` on disk
    pub fn object_path(&self, bucket: &str, path: &str) -> PathBuf {
        self.root.join(bucket).join(path)
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        bytes: Vec<u8>,
        _content_type: &str,
        overwrite: bool,
    ) -> Result<(), StorageError> {
        validate_object_path(bucket)?;
        validate_object_path(path)?;

        let dest = self.object_path(bucket, path);
        if !overwrite && tokio::fs::try_exists(&dest).await? {
            return Err(StorageError::AlreadyExists(format!("{}/{}", bucket, path)));
        }
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&dest, bytes).await?;
        Ok(())
    }

    fn public_url(&self, bucket: &str, path: &str) -> String {
        format!("{}/{}/{}", self.public_base_url, bucket, path)
    }
}

/// Reject empty, absolute and parent-relative object paths
fn validate_object_path(path: &str) -> Result<(), StorageError> {
    let invalid = path.is_empty()
        || Path::new(path)
            .components()
            .any(|c| !matches!(c, Component::Normal(_)));
    if invalid {
        return Err(StorageError::InvalidPath(path.to_string()));
    }
    Ok(())
}
