//! Request delivery: retry/backoff engine and the chapter fetch guard.

mod guard;
mod retry;

pub use guard::{ChapterError, GuardConfig, fetch_chapter};
pub use retry::{AttemptHeaders, DEFAULT_MAX_ATTEMPTS, RetryPolicy, fetch_with_retry};

use std::time::Duration;

use rand::Rng;

/// Samples a duration uniformly from `[low, high]`.
///
/// Collapses to `low` when the bounds are inverted or equal, so callers
/// can pass zeroed ranges in tests without tripping the sampler.
pub(crate) fn random_duration_between(low: Duration, high: Duration) -> Duration {
    if high <= low {
        return low;
    }
    let mut rng = rand::thread_rng();
    Duration::from_secs_f64(rng.gen_range(low.as_secs_f64()..=high.as_secs_f64()))
}
