//! Pitch-shift and time-stretch kernels
//!
//! Time stretch is windowed overlap-add (OLA): Hann frames are read from the
//! input every `hop * rate` samples and laid down every `hop` samples, then
//! normalized by the summed window. Pitch shift stretches by the pitch factor
//! and resamples back to the original length with rubato, so duration is kept.

use crate::types::{DspError, DspProcessor};
use rubato::{FastFixedIn, PolynomialDegree, Resampler as RubatoResampler};
use std::f32::consts::PI;
use tracing::debug;

/// Samples per analysis/synthesis frame
const FRAME_SIZE: usize = 2048;

/// Synthesis hop (75% overlap)
const HOP_SIZE: usize = 512;

/// Window sums below this are treated as silence
const NORM_THRESHOLD: f32 = 1e-3;

/// Accepted playback-rate range
pub const MIN_RATE: f64 = 0.1;
pub const MAX_RATE: f64 = 10.0;

/// Overlap-add DSP processor
pub struct OlaProcessor {
    window: Vec<f32>,
}

impl Default for OlaProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl OlaProcessor {
    pub fn new() -> Self {
        // Periodic Hann window
        let window = (0..FRAME_SIZE)
            .map(|n| 0.5 - 0.5 * (2.0 * PI * n as f32 / FRAME_SIZE as f32).cos())
            .collect();
        Self { window }
    }

    fn check_rate(rate: f64) -> Result<(), DspError> {
        if !rate.is_finite() || !(MIN_RATE..=MAX_RATE).contains(&rate) {
            return Err(DspError::InvalidParameter(format!(
                "rate {} outside [{}, {}]",
                rate, MIN_RATE, MAX_RATE
            )));
        }
        Ok(())
    }

    fn stretch(&self, samples: &[f32], rate: f64) -> Vec<f32> {
        let output_len = (samples.len() as f64 / rate).round() as usize;
        if output_len == 0 {
            return Vec::new();
        }

        let mut output = vec![0.0f32; output_len + FRAME_SIZE];
        let mut norm = vec![0.0f32; output_len + FRAME_SIZE];
        let analysis_hop = HOP_SIZE as f64 * rate;

        let mut frame = 0usize;
        loop {
            let out_pos = frame * HOP_SIZE;
            if out_pos >= output_len {
                break;
            }
            let in_pos = (frame as f64 * analysis_hop).round() as usize;

            for (n, w) in self.window.iter().enumerate() {
                let sample = samples.get(in_pos + n).copied().unwrap_or(0.0);
                output[out_pos + n] += w * sample;
                norm[out_pos + n] += w;
            }
            frame += 1;
        }

        output.truncate(output_len);
        for (sample, weight) in output.iter_mut().zip(&norm) {
            if *weight > NORM_THRESHOLD {
                *sample /= weight;
            } else {
                *sample = 0.0;
            }
        }
        output
    }

    fn resample(samples: &[f32], ratio: f64) -> Result<Vec<f32>, DspError> {
        let mut resampler = FastFixedIn::<f32>::new(
            ratio,
            1.0, // max_relative_ratio (no runtime changes)
            PolynomialDegree::Septic,
            samples.len(),
            1,
        )
        .map_err(|e| DspError::Processing(format!("Failed to create resampler: {}", e)))?;

        let mut output = resampler
            .process(&[samples], None)
            .map_err(|e| DspError::Processing(format!("Resampling failed: {}", e)))?;

        Ok(output.pop().unwrap_or_default())
    }
}

impl DspProcessor for OlaProcessor {
    fn pitch_shift(
        &self,
        samples: &[f32],
        sample_rate: u32,
        semitones: i32,
    ) -> Result<Vec<f32>, DspError> {
        if semitones == 0 || samples.is_empty() {
            return Ok(samples.to_vec());
        }
        if !(-24..=24).contains(&semitones) {
            return Err(DspError::InvalidParameter(format!(
                "semitone shift {} outside [-24, 24]",
                semitones
            )));
        }

        let factor = 2f64.powf(semitones as f64 / 12.0);
        debug!(semitones, factor, sample_rate, frames = samples.len(), "Pitch shift");

        // Lengthen by `factor`, then squeeze back: duration kept, pitch scaled
        let stretched = self.stretch(samples, 1.0 / factor);
        let mut shifted = Self::resample(&stretched, 1.0 / factor)?;
        shifted.resize(samples.len(), 0.0);
        Ok(shifted)
    }

    fn time_stretch(&self, samples: &[f32], rate: f64) -> Result<Vec<f32>, DspError> {
        Self::check_rate(rate)?;
        if rate == 1.0 || samples.is_empty() {
            return Ok(samples.to_vec());
        }
        debug!(rate, frames = samples.len(), "Time stretch");
        Ok(self.stretch(samples, rate))
    }
}
