//! Per-session human-pacing parameters.
//!
//! Generated once per session and treated as immutable; every delay the
//! evasion timing model computes is derived from these numbers.

use rand::Rng;

/// Reader archetype. The multiplier spreads sessions across believable
/// reading-speed bands instead of clustering them at the mean.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReaderKind {
    /// Skims; reads at 1.4x the base speed.
    Fast,
    /// Reads at the base speed.
    Average,
    /// Lingers; reads at 0.7x the base speed.
    Careful,
}

impl ReaderKind {
    /// Speed multiplier applied to the base reading speed.
    #[must_use]
    pub fn speed_multiplier(self) -> f64 {
        match self {
            Self::Fast => 1.4,
            Self::Average => 1.0,
            Self::Careful => 0.7,
        }
    }
}

/// Immutable per-session pacing parameters.
#[derive(Debug, Clone)]
pub struct ReadingProfile {
    /// Base reading speed in characters per minute (380-620).
    pub base_speed_cpm: f64,
    /// Per-chunk speed variation amplitude, in [0.1, 0.3).
    pub attention_variability: f64,
    /// Reader archetype.
    pub kind: ReaderKind,
    /// Probability of a long distraction pause per chapter, in [0.2, 0.4).
    pub distraction_probability: f64,
    /// Characters consumed per simulated eye fixation (20-40).
    pub saccade_len: usize,
}

impl ReadingProfile {
    /// Samples a fresh profile for a new session.
    pub fn generate(rng: &mut impl Rng) -> Self {
        let kind = match rng.gen_range(0..3) {
            0 => ReaderKind::Fast,
            1 => ReaderKind::Average,
            _ => ReaderKind::Careful,
        };
        Self {
            base_speed_cpm: rng.gen_range(380..=620) as f64,
            attention_variability: 0.1 + rng.r#gen::<f64>() * 0.2,
            kind,
            distraction_probability: 0.2 + rng.r#gen::<f64>() * 0.2,
            saccade_len: rng.gen_range(20..=40),
        }
    }
}
