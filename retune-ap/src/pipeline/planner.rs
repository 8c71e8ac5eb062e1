//! Transform planning
//!
//! All conditional-skip logic for pitch and tempo lives here, in one pure
//! function of (desired key, desired tempo, analysis). No I/O, no collaborator
//! calls: the plan can be tested without any DSP.

use crate::models::AnalysisResult;
use retune_common::keys::{semitone_distance, KeyDistance};

/// Transform parameters for one job
///
/// Built once by [`plan`] and read through accessors only.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransformPlan {
    semitone_shift: i32,
    tempo_ratio: f64,
    should_apply: bool,
    key_distance: Option<KeyDistance>,
}

impl TransformPlan {
    /// Plan that changes nothing
    pub fn identity() -> Self {
        Self {
            semitone_shift: 0,
            tempo_ratio: 1.0,
            should_apply: false,
            key_distance: None,
        }
    }

    /// Chromatic steps to transpose, in -11..=11
    pub fn semitone_shift(&self) -> i32 {
        self.semitone_shift
    }

    /// Playback-rate factor; 1.0 means unchanged
    pub fn tempo_ratio(&self) -> f64 {
        self.tempo_ratio
    }

    /// True when at least one transform differs from identity
    pub fn should_apply(&self) -> bool {
        self.should_apply
    }

    pub fn applies_pitch(&self) -> bool {
        self.semitone_shift != 0
    }

    pub fn applies_tempo(&self) -> bool {
        self.tempo_ratio != 1.0
    }

    /// Key comparison result; `None` when pitch was not computable
    pub fn key_distance(&self) -> Option<KeyDistance> {
        self.key_distance
    }
}

/// Decide which transforms apply and compute their parameters
///
/// - Pitch: only when both desired and detected keys are present.
/// - Tempo: only when both tempos are present and positive; a zero or
///   missing detected tempo leaves the ratio at 1.0.
pub fn plan(
    desired_key: Option<&str>,
    desired_tempo: Option<f64>,
    analysis: &AnalysisResult,
) -> TransformPlan {
    let key_distance = match (desired_key, analysis.detected_key.as_deref()) {
        (Some(desired), Some(detected)) => Some(semitone_distance(detected, desired)),
        _ => None,
    };
    let semitone_shift = key_distance.map(KeyDistance::semitones).unwrap_or(0);

    let tempo_ratio = match (desired_tempo, analysis.detected_tempo) {
        (Some(desired), Some(detected)) if is_positive(desired) && is_positive(detected) => {
            desired / detected
        }
        _ => 1.0,
    };

    TransformPlan {
        semitone_shift,
        tempo_ratio,
        should_apply: semitone_shift != 0 || tempo_ratio != 1.0,
        key_distance,
    }
}

fn is_positive(value: f64) -> bool {
    value.is_finite() && value > 0.0
}
