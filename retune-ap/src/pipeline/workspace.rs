//! Job-scoped staging directory
//!
//! Each job gets one directory under the configured workspace root, named
//! `job-<sanitized id>-<random>` so concurrent jobs never alias, even when
//! they share a job id. The workspace is the only owner of staging paths.
//!
//! Release discipline:
//! - [`Workspace::close`] consumes the handle, so it runs at most once
//! - if the handle is dropped without `close` (cancelled job future), the
//!   directory is still removed when the inner `TempDir` drops

use crate::error::JobError;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, warn};

const MAX_PREFIX_ID_LEN: usize = 32;

pub struct Workspace {
    job_id: String,
    path: PathBuf,
    dir: Option<TempDir>,
}

impl Workspace {
    /// Allocate an isolated directory for `job_id` under `root`
    pub fn open(root: &Path, job_id: &str) -> Result<Self, JobError> {
        std::fs::create_dir_all(root).map_err(|e| {
            JobError::Io(format!(
                "cannot create workspace root {}: {}",
                root.display(),
                e
            ))
        })?;

        let prefix = format!("job-{}-", sanitize_job_id(job_id));
        let dir = tempfile::Builder::new()
            .prefix(&prefix)
            .tempdir_in(root)
            .map_err(|e| JobError::Io(format!("cannot create workspace: {}", e)))?;

        let path = dir.path().to_path_buf();
        debug!(job_id = %job_id, workspace = %path.display(), "Workspace opened");

        Ok(Self {
            job_id: job_id.to_string(),
            path,
            dir: Some(dir),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    /// Path for a staging file directly inside the workspace
    pub fn file_path(&self, name: &str) -> PathBuf {
        self.path.join(name)
    }

    /// Create (if needed) and return a subdirectory of the workspace
    pub fn create_subdir(&self, name: &str) -> Result<PathBuf, JobError> {
        let dir = self.path.join(name);
        std::fs::create_dir_all(&dir).map_err(|e| {
            JobError::Io(format!("cannot create {}: {}", dir.display(), e))
        })?;
        Ok(dir)
    }

    /// Recursively remove everything under the workspace
    pub fn close(mut self) -> std::io::Result<()> {
        match self.dir.take() {
            Some(dir) => {
                let result = dir.close();
                debug!(job_id = %self.job_id, workspace = %self.path.display(), "Workspace closed");
                result
            }
            None => Ok(()),
        }
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        if self.dir.is_some() {
            warn!(
                job_id = %self.job_id,
                workspace = %self.path.display(),
                "Workspace dropped without close (job cancelled?), removing"
            );
        }
    }
}

/// Keep ASCII alphanumerics, '-' and '_' so the id is safe in a directory name
fn sanitize_job_id(job_id: &str) -> String {
    let cleaned: String = job_id
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .take(MAX_PREFIX_ID_LEN)
        .collect();
    if cleaned.is_empty() {
        "anon".to_string()
    } else {
        cleaned
    }
}
