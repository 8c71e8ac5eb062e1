//! Key/tempo analysis stage
//!
//! Wraps the configured [`AnalysisProvider`] with a timeout and folds every
//! failure into an empty result plus a warning. This stage never fails a job.

use crate::error::JobError;
use crate::models::AnalysisResult;
use crate::types::AnalysisProvider;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

pub struct Analyzer {
    provider: Option<Arc<dyn AnalysisProvider>>,
    timeout: Duration,
}

impl Analyzer {
    /// `provider` is `None` when no analysis service is configured
    pub fn new(provider: Option<Arc<dyn AnalysisProvider>>, timeout: Duration) -> Self {
        Self { provider, timeout }
    }

    pub fn is_configured(&self) -> bool {
        self.provider.is_some()
    }

    /// Estimate key and tempo for the downloaded source
    ///
    /// Returns the (possibly empty) result and, when the provider could not
    /// deliver one, the reason as a non-fatal `Analysis` error.
    pub async fn analyze(
        &self,
        local_path: &Path,
        source_url: &str,
    ) -> (AnalysisResult, Option<JobError>) {
        let Some(provider) = self.provider.as_ref() else {
            debug!("No analysis provider configured, skipping");
            return (
                AnalysisResult::unknown(),
                Some(JobError::Analysis("no analysis provider configured".to_string())),
            );
        };

        match tokio::time::timeout(self.timeout, provider.analyze(local_path, source_url)).await {
            Ok(Ok(result)) => {
                let result = AnalysisResult::new(result.detected_key, result.detected_tempo);
                info!(
                    provider = provider.name(),
                    detected_key = ?result.detected_key,
                    detected_tempo = ?result.detected_tempo,
                    "Analysis complete"
                );
                (result, None)
            }
            Ok(Err(e)) => {
                warn!(provider = provider.name(), error = %e, "Analysis failed");
                (
                    AnalysisResult::unknown(),
                    Some(JobError::Analysis(format!("{}: {}", provider.name(), e))),
                )
            }
            Err(_) => {
                warn!(
                    provider = provider.name(),
                    timeout_secs = self.timeout.as_secs(),
                    "Analysis timed out"
                );
                (
                    AnalysisResult::unknown(),
                    Some(JobError::Analysis(format!(
                        "{} timed out after {}s",
                        provider.name(),
                        self.timeout.as_secs()
                    ))),
                )
            }
        }
    }
}
