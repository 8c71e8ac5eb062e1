//! Audio Test Fixture Generator
//!
//! Sine-tone WAV files for feeding the pipeline real, decodable audio

use std::path::Path;

/// Configuration for generated audio
#[derive(Debug, Clone)]
pub struct ToneConfig {
    pub duration_seconds: f64,
    pub sample_rate: u32,
    pub channels: u16,
    pub frequency: f64,
}

impl Default for ToneConfig {
    fn default() -> Self {
        Self {
            duration_seconds: 0.5,
            sample_rate: 22050,
            channels: 2,
            frequency: 440.0,
        }
    }
}

/// Write a 16-bit PCM sine tone to `path`
pub fn generate_tone_wav(path: &Path, config: &ToneConfig) -> anyhow::Result<()> {
    let spec = hound::WavSpec {
        channels: config.channels,
        sample_rate: config.sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut writer = hound::WavWriter::create(path, spec)?;
    let frames = (config.duration_seconds * config.sample_rate as f64) as usize;

    for i in 0..frames {
        let t = i as f64 / config.sample_rate as f64;
        let value = (t * config.frequency * 2.0 * std::f64::consts::PI).sin() * 0.5;
        let sample = (value * i16::MAX as f64) as i16;
        for _ in 0..config.channels {
            writer.write_sample(sample)?;
        }
    }

    writer.finalize()?;
    Ok(())
}

/// In-memory WAV bytes for the source server
pub fn tone_wav_bytes(config: &ToneConfig) -> Vec<u8> {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tone.wav");
    generate_tone_wav(&path, config).unwrap();
    std::fs::read(&path).unwrap()
}
