//! Retry logic with widening randomized backoff for API requests.
//!
//! This module provides the [`RetryPolicy`] used by every metadata request
//! and, with different constants, by the chapter fetch guard. Two things
//! distinguish it from a plain exponential-backoff loop:
//!
//! - the wait before retry *n* is drawn uniformly from
//!   `[base * 1.5^n, base * 1.8^n]`, so consecutive retries land in a
//!   widening jitter window instead of on a fixed schedule, and
//! - every attempt carries a freshly sampled [`AttemptHeaders`] set, so
//!   retries are not textually identical requests.
//!
//! The engine holds no state across invocations.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use rand::seq::SliceRandom;
use tracing::{debug, warn};

use crate::api::{ApiError, FailureKind, classify_error};

/// Default maximum attempts (including the initial one).
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Default base delay for the backoff window (5 seconds).
const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(5);

/// Lower and upper growth factors of the backoff window.
const BACKOFF_LOW_FACTOR: f64 = 1.5;
const BACKOFF_HIGH_FACTOR: f64 = 1.8;

/// Accept-Language variants rotated across attempts.
const ACCEPT_LANGUAGES: &[&str] = &[
    "en-US,en;q=0.9",
    "en-US,en;q=0.8",
    "zh-CN,zh;q=0.9,en;q=0.8",
];

/// Cache-Control variants rotated across attempts.
const CACHE_CONTROLS: &[&str] = &["no-cache", "max-age=0"];

/// Probability that an attempt carries the Sec-Fetch-* triplet.
const SEC_FETCH_PROBABILITY: f64 = 0.7;

/// Transport headers randomized per attempt.
///
/// The values are all drawn from pools a real browser would produce, so
/// any single attempt looks ordinary; the point is that two attempts in
/// the same retry loop differ.
#[derive(Debug, Clone)]
pub struct AttemptHeaders {
    /// Accept-Language header value.
    pub accept_language: &'static str,
    /// Cache-Control header value.
    pub cache_control: &'static str,
    /// Connection header value.
    pub connection: &'static str,
    /// Whether to include the Sec-Fetch-Dest/Mode/Site triplet.
    pub sec_fetch: bool,
}

impl AttemptHeaders {
    /// Samples a fresh header set.
    pub fn sample(rng: &mut impl Rng) -> Self {
        Self {
            accept_language: ACCEPT_LANGUAGES
                .choose(rng)
                .copied()
                .unwrap_or(ACCEPT_LANGUAGES[0]),
            cache_control: CACHE_CONTROLS
                .choose(rng)
                .copied()
                .unwrap_or(CACHE_CONTROLS[0]),
            connection: if rng.gen_bool(0.5) {
                "keep-alive"
            } else {
                "close"
            },
            sec_fetch: rng.gen_bool(SEC_FETCH_PROBABILITY),
        }
    }

    /// Header name/value pairs for this attempt.
    #[must_use]
    pub fn pairs(&self) -> Vec<(&'static str, &'static str)> {
        let mut pairs = vec![
            ("Accept-Language", self.accept_language),
            ("Cache-Control", self.cache_control),
            ("Connection", self.connection),
        ];
        if self.sec_fetch {
            pairs.push(("Sec-Fetch-Dest", "empty"));
            pairs.push(("Sec-Fetch-Mode", "cors"));
            pairs.push(("Sec-Fetch-Site", "same-origin"));
        }
        pairs
    }
}

/// Configuration for the retry/backoff engine.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum attempts, including the initial one (>= 1).
    max_attempts: u32,
    /// Base delay scaling the backoff window.
    base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: DEFAULT_BASE_DELAY,
        }
    }
}

impl RetryPolicy {
    /// Creates a policy with explicit settings.
    #[must_use]
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    /// Returns the configured attempt ceiling.
    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Bounds of the backoff window before retry `n` (1-indexed).
    #[must_use]
    pub fn backoff_window(&self, retry: u32) -> (Duration, Duration) {
        let base = self.base_delay.as_secs_f64();
        let low = base * BACKOFF_LOW_FACTOR.powi(retry as i32);
        let high = base * BACKOFF_HIGH_FACTOR.powi(retry as i32);
        (Duration::from_secs_f64(low), Duration::from_secs_f64(high))
    }

    /// Samples a delay from the backoff window before retry `n`.
    #[must_use]
    pub fn sample_backoff(&self, retry: u32) -> Duration {
        let (low, high) = self.backoff_window(retry);
        if high <= low {
            return low;
        }
        let mut rng = rand::thread_rng();
        Duration::from_secs_f64(rng.gen_range(low.as_secs_f64()..=high.as_secs_f64()))
    }
}

/// Runs `op` up to the policy's attempt ceiling.
///
/// Each attempt receives a freshly sampled [`AttemptHeaders`]. Fatal
/// failures short-circuit; transient and rate-limited failures back off
/// and retry. Exhausting all attempts surfaces the last failure.
pub async fn fetch_with_retry<T, F, Fut>(policy: &RetryPolicy, mut op: F) -> Result<T, ApiError>
where
    F: FnMut(AttemptHeaders) -> Fut,
    Fut: Future<Output = Result<T, ApiError>>,
{
    let mut attempt = 0;
    loop {
        attempt += 1;
        let headers = AttemptHeaders::sample(&mut rand::thread_rng());
        match op(headers).await {
            Ok(value) => {
                if attempt > 1 {
                    debug!(attempt, "request succeeded after retry");
                }
                return Ok(value);
            }
            Err(error) => {
                if attempt >= policy.max_attempts()
                    || classify_error(&error) == FailureKind::Fatal
                {
                    return Err(error);
                }
                let delay = policy.sample_backoff(attempt);
                warn!(
                    error = %error,
                    attempt,
                    max_attempts = policy.max_attempts(),
                    delay_ms = delay.as_millis(),
                    "request failed, backing off before retry"
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    #[test]
    fn test_backoff_window_grows_per_retry() {
        let policy = RetryPolicy::new(3, Duration::from_secs(5));
        let (low1, high1) = policy.backoff_window(1);
        let (low2, high2) = policy.backoff_window(2);

        assert_eq!(low1, Duration::from_secs_f64(5.0 * 1.5));
        assert_eq!(high1, Duration::from_secs_f64(5.0 * 1.8));
        assert!(low2 > low1);
        assert!(high2 > high1);
        // Window widens: the spread at n=2 exceeds the spread at n=1.
        assert!(high2 - low2 > high1 - low1);
    }

    #[test]
    fn test_sampled_backoff_within_window() {
        let policy = RetryPolicy::new(5, Duration::from_secs(2));
        for retry in 1..=4 {
            let (low, high) = policy.backoff_window(retry);
            for _ in 0..50 {
                let delay = policy.sample_backoff(retry);
                assert!(
                    delay >= low && delay <= high,
                    "retry {retry}: {delay:?} outside [{low:?}, {high:?}]"
                );
            }
        }
    }

    #[test]
    fn test_max_attempts_minimum_is_one() {
        let policy = RetryPolicy::new(0, Duration::ZERO);
        assert_eq!(policy.max_attempts(), 1);
    }

    #[test]
    fn test_attempt_headers_from_known_pools() {
        let mut rng = rand::thread_rng();
        for _ in 0..50 {
            let headers = AttemptHeaders::sample(&mut rng);
            assert!(ACCEPT_LANGUAGES.contains(&headers.accept_language));
            assert!(CACHE_CONTROLS.contains(&headers.cache_control));
            assert!(["keep-alive", "close"].contains(&headers.connection));

            let pairs = headers.pairs();
            if headers.sec_fetch {
                assert_eq!(pairs.len(), 6);
            } else {
                assert_eq!(pairs.len(), 3);
            }
        }
    }

    #[tokio::test]
    async fn test_retry_succeeds_after_transient_failures() {
        let policy = RetryPolicy::new(3, Duration::ZERO);
        let calls = AtomicU32::new(0);

        let result = fetch_with_retry(&policy, |_headers| {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(ApiError::Timeout {
                        url: "https://example.com".into(),
                    })
                } else {
                    Ok("content")
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), "content");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_exhaustion_surfaces_last_error() {
        let policy = RetryPolicy::new(3, Duration::ZERO);
        let calls = AtomicU32::new(0);

        let result: Result<(), ApiError> = fetch_with_retry(&policy, |_headers| {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move { Err(ApiError::api(-(n as i64), format!("failure {n}"))) }
        })
        .await;

        // Last error wins: the third call produced code -2.
        match result.unwrap_err() {
            ApiError::Api { code, .. } => assert_eq!(code, -2),
            other => panic!("expected Api error, got {other:?}"),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_fatal_failure_short_circuits() {
        let policy = RetryPolicy::new(5, Duration::ZERO);
        let calls = AtomicU32::new(0);

        let result: Result<(), ApiError> = fetch_with_retry(&policy, |_headers| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(ApiError::http_status("https://example.com", 404, None)) }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
