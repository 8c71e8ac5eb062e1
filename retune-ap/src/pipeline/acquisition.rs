//! Source audio acquisition
//!
//! Streams the source recording into the job workspace chunk by chunk so large
//! uploads are never held in memory. Any failure here is fatal to the job.

use super::workspace::Workspace;
use crate::error::JobError;
use futures::StreamExt;
use reqwest::Client;
use std::path::PathBuf;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

/// Extension used when the URL path carries none
const DEFAULT_EXTENSION: &str = "wav";

/// Longest extension taken from a URL path
const MAX_EXTENSION_LEN: usize = 5;

pub struct Acquisition {
    client: Client,
    /// Longest wait for response headers or for the next body chunk
    stall_timeout: Duration,
}

impl Acquisition {
    pub fn new(connect_timeout: Duration, stall_timeout: Duration) -> Result<Self, JobError> {
        let client = Client::builder()
            .connect_timeout(connect_timeout)
            .build()
            .map_err(|e| JobError::Configuration(format!("cannot build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            stall_timeout,
        })
    }

    /// Download `source_url` into the workspace, returning the local path
    pub async fn fetch(&self, source_url: &str, workspace: &Workspace) -> Result<PathBuf, JobError> {
        debug!(job_id = %workspace.job_id(), source_url = %source_url, "Fetching source audio");

        let response = tokio::time::timeout(self.stall_timeout, self.client.get(source_url).send())
            .await
            .map_err(|_| {
                JobError::Download(format!(
                    "no response from {} within {}s",
                    source_url,
                    self.stall_timeout.as_secs()
                ))
            })?
            .map_err(|e| JobError::Download(format!("request to {} failed: {}", source_url, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(JobError::Download(format!(
                "{} returned HTTP {}",
                source_url,
                status.as_u16()
            )));
        }

        let dest = workspace.file_path(&format!("source.{}", source_extension(source_url)));
        let mut file = tokio::fs::File::create(&dest)
            .await
            .map_err(|e| JobError::Io(format!("cannot create {}: {}", dest.display(), e)))?;

        let mut stream = response.bytes_stream();
        let mut written: u64 = 0;
        loop {
            let next = tokio::time::timeout(self.stall_timeout, stream.next())
                .await
                .map_err(|_| {
                    JobError::Download(format!(
                        "download stalled (no data for {}s)",
                        self.stall_timeout.as_secs()
                    ))
                })?;

            let Some(chunk) = next else { break };
            let chunk =
                chunk.map_err(|e| JobError::Download(format!("stream error: {}", e)))?;

            file.write_all(&chunk)
                .await
                .map_err(|e| JobError::Io(format!("write to {} failed: {}", dest.display(), e)))?;
            written += chunk.len() as u64;
        }

        file.flush()
            .await
            .map_err(|e| JobError::Io(format!("flush of {} failed: {}", dest.display(), e)))?;

        if written == 0 {
            return Err(JobError::Download(format!(
                "{} returned an empty body",
                source_url
            )));
        }

        info!(
            job_id = %workspace.job_id(),
            bytes = written,
            path = %dest.display(),
            "Source audio downloaded"
        );
        Ok(dest)
    }
}

/// Lowercase extension of the URL's last path segment, or `wav`
fn source_extension(source_url: &str) -> String {
    reqwest::Url::parse(source_url)
        .ok()
        .and_then(|url| {
            url.path_segments()
                .and_then(|mut segments| segments.next_back().map(str::to_string))
        })
        .and_then(|name| {
            name.rsplit_once('.')
                .map(|(_, ext)| ext.to_ascii_lowercase())
        })
        .filter(|ext| {
            !ext.is_empty()
                && ext.len() <= MAX_EXTENSION_LEN
                && ext.chars().all(|c| c.is_ascii_alphanumeric())
        })
        .unwrap_or_else(|| DEFAULT_EXTENSION.to_string())
}
