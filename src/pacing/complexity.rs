//! Content complexity scoring.
//!
//! Dense chapters (tables, code, CJK punctuation, figures) slow a real
//! reader down, so the complexity multiplier feeds straight into the
//! effective reading speed.

use std::sync::LazyLock;

use regex::Regex;

/// Structural markers that make a chapter slower to read.
#[allow(clippy::expect_used)]
static COMPLEX_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"<table",
        r"<code",
        r#"[，。！？；：“”‘’（）【】『』「」]"#,
        r"\d{4,}",
        r"<img",
        r"<h[1-6]",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).expect("complexity marker regex is valid"))
    .collect()
});

/// Lower clamp of the complexity multiplier (plain prose).
const MIN_COMPLEXITY: f64 = 0.8;

/// Upper clamp of the complexity multiplier (marker-saturated content).
const MAX_COMPLEXITY: f64 = 1.3;

/// Markers needed to raise the multiplier by one full point.
const MARKERS_PER_POINT: f64 = 500.0;

/// Scores chapter HTML into a multiplier in `[0.8, 1.3]`.
#[must_use]
pub fn complexity_score(html: &str) -> f64 {
    let markers: usize = COMPLEX_PATTERNS
        .iter()
        .map(|pattern| pattern.find_iter(html).count())
        .sum();
    (MIN_COMPLEXITY + markers as f64 / MARKERS_PER_POINT).clamp(MIN_COMPLEXITY, MAX_COMPLEXITY)
}
