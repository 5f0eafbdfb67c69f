//! Evasion timing model.
//!
//! Computes, for one chapter, the full sequence of delays a human reader
//! would plausibly produce: a settling-in pause, per-saccade reading
//! delays with attention drift, occasional regressions and distractions,
//! post-reading reflection, and fatigue-driven rests. The model is a pure
//! function of its inputs (content, profile, fatigue, wall-clock hour,
//! RNG); the session controller owns the actual sleeping so it can
//! re-check pause and cancellation between steps.

use std::time::Duration;

use rand::Rng;

use super::complexity::complexity_score;
use crate::profile::ReadingProfile;

/// Shortest believable chapter reading time.
const MIN_READ_SECS: f64 = 8.0;

/// Longest reading time simulated for a single chapter.
const MAX_READ_SECS: f64 = 120.0;

/// Probability of a short regression (re-reading) pause per saccade chunk.
const REGRESSION_PROBABILITY: f64 = 0.1;

/// Probability scale of the post-reading reflection pause.
const REFLECTION_PROBABILITY: f64 = 0.35;

/// Probability of flipping back at the end of a chapter.
const FLIP_BACK_PROBABILITY: f64 = 0.3;

/// Fatigue level above which a long rest becomes possible.
const FATIGUE_REST_THRESHOLD: f64 = 0.4;

/// Probability of actually taking the long rest once over the threshold.
const FATIGUE_REST_PROBABILITY: f64 = 0.4;

/// Title markers for front/back-matter chapters that get an extra pause.
const SPECIAL_TITLE_MARKERS: &[&str] = &[
    "序", "前言", "后记", "结语", "preface", "foreword", "afterword", "epilogue",
];

/// What a single delay step simulates. Used for tracing and tests; the
/// controller sleeps the same way regardless of kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DelayKind {
    /// Settling in at the top of a chapter.
    ChapterEntry,
    /// One eye-fixation chunk of reading.
    Saccade,
    /// Re-reading a passage.
    Regression,
    /// Attention wandered off.
    Distraction,
    /// Thinking the chapter over after finishing it.
    Reflection,
    /// Flipping back to check something.
    FlipBack,
    /// Lingering on front/back matter.
    SpecialTitle,
}

/// One interruptible delay instruction.
#[derive(Debug, Clone)]
pub struct DelayStep {
    /// What the delay simulates.
    pub kind: DelayKind,
    /// How long to suspend.
    pub duration: Duration,
}

/// The full pacing outcome for one chapter.
#[derive(Debug, Clone)]
pub struct PacingPlan {
    /// Ordered delay steps to run before emitting the chapter.
    pub steps: Vec<DelayStep>,
    /// Session fatigue after this chapter (already halved when
    /// `long_rest` is set).
    pub fatigue_after: f64,
    /// Fatigue-driven rest to take after the chapter, when triggered.
    pub long_rest: Option<Duration>,
}

/// Reading-speed factor for the current wall-clock hour.
#[must_use]
pub fn time_of_day_factor(hour: u32) -> f64 {
    match hour {
        8..=11 => 1.1,
        13..=15 => 0.9,
        h if h >= 22 || h <= 5 => 0.85,
        _ => 1.0,
    }
}

/// Whether a chapter title marks front or back matter.
#[must_use]
pub fn is_special_title(title: &str) -> bool {
    let lowered = title.to_lowercase();
    SPECIAL_TITLE_MARKERS
        .iter()
        .any(|marker| lowered.contains(marker))
}

/// Computes the delay sequence for one chapter.
///
/// `fatigue` is the session's accumulated fatigue before this chapter;
/// the returned plan carries the updated value.
pub fn plan_chapter(
    html: &str,
    title: &str,
    profile: &ReadingProfile,
    fatigue: f64,
    hour: u32,
    rng: &mut impl Rng,
) -> PacingPlan {
    let complexity = complexity_score(html);
    let chars = html.chars().count().max(1);
    let tod = time_of_day_factor(hour);

    // Effective speed in chars/minute: archetype, density, fatigue and
    // hour all push it around the sampled base.
    let effective_speed = (profile.base_speed_cpm * profile.kind.speed_multiplier() / complexity)
        * (1.0 - fatigue * 0.02)
        * tod;
    let base_secs = ((chars as f64 / effective_speed) * 60.0).clamp(MIN_READ_SECS, MAX_READ_SECS);

    let chunks = chars.div_ceil(profile.saccade_len).max(1);

    let mut steps = Vec::with_capacity(chunks + 4);
    steps.push(DelayStep {
        kind: DelayKind::ChapterEntry,
        duration: sample_secs(rng, 1.5, 3.0),
    });

    let distraction_per_chunk = (profile.distraction_probability / chunks as f64).min(1.0);
    for _ in 0..chunks {
        let variation = 1.0 + (rng.r#gen::<f64>() * 2.0 - 1.0) * profile.attention_variability;
        let chunk_secs = (base_secs / chunks as f64) * variation * tod;
        steps.push(DelayStep {
            kind: DelayKind::Saccade,
            duration: sample_secs(rng, chunk_secs * 0.9, chunk_secs * 1.1),
        });

        if rng.gen_bool(REGRESSION_PROBABILITY) {
            steps.push(DelayStep {
                kind: DelayKind::Regression,
                duration: sample_secs(rng, 0.3, 0.8),
            });
        }
        if rng.gen_bool(distraction_per_chunk) {
            steps.push(DelayStep {
                kind: DelayKind::Distraction,
                duration: sample_secs(rng, 3.0, 15.0),
            });
        }
    }

    // Complex chapters are "important": more likely to be mulled over.
    let importance = 0.5 + 0.5 * complexity;
    if rng.gen_bool((REFLECTION_PROBABILITY * importance).min(1.0)) {
        steps.push(DelayStep {
            kind: DelayKind::Reflection,
            duration: sample_secs(rng, 10.0, 30.0),
        });
    }
    if rng.gen_bool(FLIP_BACK_PROBABILITY) {
        steps.push(DelayStep {
            kind: DelayKind::FlipBack,
            duration: sample_secs(rng, 5.0, 15.0),
        });
    }
    if is_special_title(title) {
        steps.push(DelayStep {
            kind: DelayKind::SpecialTitle,
            duration: sample_secs(rng, 5.0, 20.0),
        });
    }

    let mut fatigue_after = fatigue + 0.05 + complexity * 0.05;
    let long_rest = if fatigue_after > FATIGUE_REST_THRESHOLD
        && rng.gen_bool(FATIGUE_REST_PROBABILITY)
    {
        fatigue_after *= 0.5;
        Some(sample_secs(rng, 40.0, 120.0))
    } else {
        None
    };

    PacingPlan {
        steps,
        fatigue_after,
        long_rest,
    }
}

fn sample_secs(rng: &mut impl Rng, low: f64, high: f64) -> Duration {
    let low = low.max(0.0);
    let high = high.max(low);
    if high <= low {
        return Duration::from_secs_f64(low);
    }
    Duration::from_secs_f64(rng.gen_range(low..=high))
}
