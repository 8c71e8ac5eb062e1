//! Transform execution stage
//!
//! Applies a [`TransformPlan`] to the downloaded source: pitch shift first, then
//! time stretch, per channel, on one evolving buffer. Both parameters come from
//! the original detection. Output is always `processed.wav`; the source file is
//! never modified.

use super::planner::TransformPlan;
use super::workspace::Workspace;
use crate::error::JobError;
use crate::services::audio_io::{decode_audio, write_wav};
use crate::types::DspProcessor;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Output file name inside the workspace
pub const PROCESSED_FILE_NAME: &str = "processed.wav";

pub struct TransformExecutor {
    dsp: Arc<dyn DspProcessor>,
}

impl TransformExecutor {
    pub fn new(dsp: Arc<dyn DspProcessor>) -> Self {
        Self { dsp }
    }

    /// Produce the transformed audio, or `None` when the plan changes nothing
    pub async fn apply(
        &self,
        local_path: &Path,
        plan: &TransformPlan,
        workspace: &Workspace,
    ) -> Result<Option<PathBuf>, JobError> {
        if !plan.should_apply() {
            debug!(job_id = %workspace.job_id(), "Nothing to transform");
            return Ok(None);
        }

        let input = local_path.to_path_buf();
        let output = workspace.file_path(PROCESSED_FILE_NAME);
        let dsp = Arc::clone(&self.dsp);
        let plan = *plan;
        let dest = output.clone();

        // Decode, DSP and encode are CPU-bound
        let frames = tokio::task::spawn_blocking(move || render(dsp.as_ref(), &input, &dest, &plan))
            .await
            .map_err(|e| JobError::Transform(format!("worker panicked: {}", e)))??;

        info!(
            job_id = %workspace.job_id(),
            semitones = plan.semitone_shift(),
            tempo_ratio = plan.tempo_ratio(),
            frames = frames,
            "Transform complete"
        );
        Ok(Some(output))
    }
}

/// Run the plan over every channel and write the result; returns output frame count
fn render(
    dsp: &dyn DspProcessor,
    input: &Path,
    output: &Path,
    plan: &TransformPlan,
) -> Result<usize, JobError> {
    let audio = decode_audio(input).map_err(|e| JobError::Transform(format!("{:#}", e)))?;

    let mut channels = Vec::with_capacity(audio.channels.len());
    for samples in &audio.channels {
        let mut buffer = samples.clone();
        if plan.applies_pitch() {
            buffer = dsp
                .pitch_shift(&buffer, audio.sample_rate, plan.semitone_shift())
                .map_err(|e| JobError::Transform(format!("pitch shift: {}", e)))?;
        }
        if plan.applies_tempo() {
            buffer = dsp
                .time_stretch(&buffer, plan.tempo_ratio())
                .map_err(|e| JobError::Transform(format!("time stretch: {}", e)))?;
        }
        channels.push(buffer);
    }

    // Channels may differ by a frame or two after independent stretching
    let frames = channels.iter().map(Vec::len).min().unwrap_or(0);
    for channel in &mut channels {
        channel.truncate(frames);
    }

    write_wav(output, &channels, audio.sample_rate)
        .map_err(|e| JobError::Transform(format!("{:#}", e)))?;
    Ok(frames)
}
