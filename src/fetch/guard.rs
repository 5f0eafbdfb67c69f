//! Chapter fetch guard: retry wrapper tuned for the content endpoint.
//!
//! Chapter content is the request the anti-bot layer watches hardest, so
//! the guard is deliberately slower than the generic retry engine: an
//! unconditional randomized rest before the first attempt, a doubling
//! backoff an order of magnitude longer, and a dedicated cooldown when
//! the upstream signals a rate limit. After the budget is spent the
//! failure names the chapter and the caller skips it; one bad chapter
//! never aborts the session.

use std::time::{Duration, SystemTime};

use thiserror::Error;
use tracing::{debug, info, warn};

use super::random_duration_between;
use crate::api::{ApiError, BookApi, BookInfo, Chapter, ChapterContent};

/// Maximum Retry-After value honored (1 hour); anything larger is capped.
const MAX_RETRY_AFTER: Duration = Duration::from_secs(3600);

/// Tunable constants for the guard. `Default` holds the production
/// values; tests shrink them so the paused clock stays readable.
#[derive(Debug, Clone)]
pub struct GuardConfig {
    /// Attempt ceiling, including the initial attempt.
    pub max_attempts: u32,
    /// Unconditional load-shedding rest before the first attempt.
    pub initial_rest: (Duration, Duration),
    /// Backoff window before retry `a` is `[low * 2^(a-1), high * 2^(a-1)]`.
    pub backoff_base: (Duration, Duration),
    /// Extra cooldown applied after a rate-limit signal.
    pub rate_limit_cooldown: (Duration, Duration),
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_rest: (Duration::from_secs(3), Duration::from_secs(8)),
            backoff_base: (Duration::from_secs(10), Duration::from_secs(15)),
            rate_limit_cooldown: (Duration::from_secs(30), Duration::from_secs(60)),
        }
    }
}

impl GuardConfig {
    /// Backoff bounds before retry `a` (1-indexed).
    #[must_use]
    pub fn backoff_window(&self, retry: u32) -> (Duration, Duration) {
        let factor = 2u32.saturating_pow(retry.saturating_sub(1));
        (self.backoff_base.0 * factor, self.backoff_base.1 * factor)
    }
}

/// A single chapter exhausted its retry budget.
#[derive(Debug, Error)]
#[error("chapter \"{title}\" (uid {chapter_uid}) failed after {attempts} attempts: {source}")]
pub struct ChapterError {
    /// Title of the chapter that failed.
    pub title: String,
    /// Uid of the chapter that failed.
    pub chapter_uid: u64,
    /// How many attempts were made.
    pub attempts: u32,
    /// The last underlying API failure.
    #[source]
    pub source: ApiError,
}

/// Fetches one chapter through the guard's retry/cooldown schedule.
///
/// # Errors
///
/// Returns [`ChapterError`] once the attempt budget is spent; the caller
/// is expected to skip the chapter and continue the session.
pub async fn fetch_chapter(
    config: &GuardConfig,
    api: &dyn BookApi,
    book: &BookInfo,
    chapter: &Chapter,
    cookie: &str,
) -> Result<ChapterContent, ChapterError> {
    // Load shedding: every chapter request starts with a rest, even the
    // ones that will succeed first try.
    let rest = random_duration_between(config.initial_rest.0, config.initial_rest.1);
    debug!(
        chapter = %chapter.title,
        rest_ms = rest.as_millis(),
        "resting before chapter fetch"
    );
    tokio::time::sleep(rest).await;

    let mut attempt = 0;
    loop {
        attempt += 1;
        match api.chapter_content(book, chapter, cookie).await {
            Ok(content) => return Ok(content),
            Err(error) => {
                warn!(
                    chapter = %chapter.title,
                    attempt,
                    max_attempts = config.max_attempts,
                    error = %error,
                    "chapter fetch failed"
                );
                let rate_limited = error.is_rate_limited();
                let server_cooldown = error.retry_after().and_then(parse_retry_after);

                if attempt >= config.max_attempts {
                    return Err(ChapterError {
                        title: chapter.title.clone(),
                        chapter_uid: chapter.chapter_uid,
                        attempts: attempt,
                        source: error,
                    });
                }

                let (low, high) = config.backoff_window(attempt);
                tokio::time::sleep(random_duration_between(low, high)).await;

                if rate_limited {
                    let mut cooldown = random_duration_between(
                        config.rate_limit_cooldown.0,
                        config.rate_limit_cooldown.1,
                    );
                    if let Some(server) = server_cooldown {
                        cooldown = cooldown.max(server.min(MAX_RETRY_AFTER));
                    }
                    info!(
                        chapter = %chapter.title,
                        cooldown_ms = cooldown.as_millis(),
                        "rate limit signalled, cooling down"
                    );
                    tokio::time::sleep(cooldown).await;
                }
            }
        }
    }
}

/// Parses a Retry-After header value: either delta-seconds or an HTTP-date.
fn parse_retry_after(value: &str) -> Option<Duration> {
    let value = value.trim();
    if let Ok(secs) = value.parse::<u64>() {
        return Some(Duration::from_secs(secs));
    }
    let when = httpdate::parse_http_date(value).ok()?;
    when.duration_since(SystemTime::now()).ok()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_window_doubles_per_retry() {
        let config = GuardConfig::default();
        assert_eq!(
            config.backoff_window(1),
            (Duration::from_secs(10), Duration::from_secs(15))
        );
        assert_eq!(
            config.backoff_window(2),
            (Duration::from_secs(20), Duration::from_secs(30))
        );
        assert_eq!(
            config.backoff_window(3),
            (Duration::from_secs(40), Duration::from_secs(60))
        );
    }

    #[test]
    fn test_default_cooldown_at_least_thirty_seconds() {
        let config = GuardConfig::default();
        assert!(config.rate_limit_cooldown.0 >= Duration::from_secs(30));
    }

    #[test]
    fn test_parse_retry_after_seconds() {
        assert_eq!(parse_retry_after("120"), Some(Duration::from_secs(120)));
        assert_eq!(parse_retry_after(" 5 "), Some(Duration::from_secs(5)));
    }

    #[test]
    fn test_parse_retry_after_http_date_in_past_is_none() {
        assert_eq!(parse_retry_after("Wed, 21 Oct 2015 07:28:00 GMT"), None);
    }

    #[test]
    fn test_parse_retry_after_garbage_is_none() {
        assert_eq!(parse_retry_after("soon"), None);
    }
}
