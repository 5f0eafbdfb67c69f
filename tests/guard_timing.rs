//! Timing properties of the chapter fetch guard, verified under tokio's
//! paused clock: the virtual elapsed time is exactly the sum of the
//! guard's sleeps, so the backoff and cooldown windows can be asserted
//! as hard bounds.

use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use bookstream::api::{
    ApiError, BookApi, BookInfo, Chapter, ChapterContent, HIGH_FREQUENCY_CODE,
};
use bookstream::fetch::{GuardConfig, fetch_chapter};

/// What the flaky API returns while it is still failing.
enum FailureMode {
    Transient,
    RateLimited,
    RateLimitedWithRetryAfter(&'static str),
}

struct FlakyApi {
    failures_before_success: u32,
    mode: FailureMode,
    calls: AtomicU32,
}

impl FlakyApi {
    fn new(failures_before_success: u32, mode: FailureMode) -> Self {
        Self {
            failures_before_success,
            mode,
            calls: AtomicU32::new(0),
        }
    }

    fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BookApi for FlakyApi {
    async fn book_info(&self, _book_id: &str, _cookie: &str) -> Result<BookInfo, ApiError> {
        unimplemented!("guard tests only exercise chapter_content")
    }

    async fn chapter_list(
        &self,
        _book_ids: &[&str],
        _cookie: &str,
    ) -> Result<Vec<Chapter>, ApiError> {
        unimplemented!("guard tests only exercise chapter_content")
    }

    async fn chapter_content(
        &self,
        _book: &BookInfo,
        chapter: &Chapter,
        _cookie: &str,
    ) -> Result<ChapterContent, ApiError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call < self.failures_before_success {
            return Err(match self.mode {
                FailureMode::Transient => {
                    ApiError::http_status("http://test/chapter", 500, None)
                }
                FailureMode::RateLimited => {
                    ApiError::api(HIGH_FREQUENCY_CODE, "requests too frequent")
                }
                FailureMode::RateLimitedWithRetryAfter(after) => {
                    ApiError::http_status("http://test/chapter", 429, Some(after.to_string()))
                }
            });
        }
        Ok(ChapterContent {
            title: chapter.title.clone(),
            html: "<p>body</p>".into(),
            style: String::new(),
        })
    }
}

fn book() -> BookInfo {
    BookInfo {
        book_id: "book-1".into(),
        title: "A Test Book".into(),
        author: String::new(),
    }
}

fn chapter() -> Chapter {
    Chapter {
        chapter_uid: 100,
        chapter_idx: 1,
        title: "Chapter 1".into(),
    }
}

#[tokio::test(start_paused = true)]
async fn test_clean_fetch_still_pays_initial_rest() {
    let api = FlakyApi::new(0, FailureMode::Transient);
    let config = GuardConfig::default();

    let start = Instant::now();
    let result = fetch_chapter(&config, &api, &book(), &chapter(), "cookie").await;
    let elapsed = start.elapsed();

    assert!(result.is_ok());
    assert_eq!(api.calls(), 1);
    // Unconditional load-shedding rest: 3-8 s.
    assert!(elapsed >= Duration::from_secs(3), "elapsed {elapsed:?}");
    assert!(elapsed <= Duration::from_secs(8), "elapsed {elapsed:?}");
}

#[tokio::test(start_paused = true)]
async fn test_transient_failure_backs_off_within_window() {
    let api = FlakyApi::new(1, FailureMode::Transient);
    let config = GuardConfig::default();

    let start = Instant::now();
    let result = fetch_chapter(&config, &api, &book(), &chapter(), "cookie").await;
    let elapsed = start.elapsed();

    assert!(result.is_ok());
    assert_eq!(api.calls(), 2);
    // Initial rest (3-8 s) plus first-retry backoff (10-15 s).
    assert!(elapsed >= Duration::from_secs(13), "elapsed {elapsed:?}");
    assert!(elapsed <= Duration::from_secs(23), "elapsed {elapsed:?}");
}

#[tokio::test(start_paused = true)]
async fn test_rate_limit_adds_cooldown_of_at_least_thirty_seconds() {
    let api = FlakyApi::new(1, FailureMode::RateLimited);
    let config = GuardConfig::default();

    let start = Instant::now();
    let result = fetch_chapter(&config, &api, &book(), &chapter(), "cookie").await;
    let elapsed = start.elapsed();

    assert!(result.is_ok());
    // Initial rest + backoff + the dedicated 30-60 s cooldown.
    assert!(elapsed >= Duration::from_secs(43), "elapsed {elapsed:?}");
    assert!(elapsed <= Duration::from_secs(83), "elapsed {elapsed:?}");
}

#[tokio::test(start_paused = true)]
async fn test_retry_after_header_extends_cooldown() {
    let api = FlakyApi::new(1, FailureMode::RateLimitedWithRetryAfter("120"));
    let config = GuardConfig::default();

    let start = Instant::now();
    let result = fetch_chapter(&config, &api, &book(), &chapter(), "cookie").await;
    let elapsed = start.elapsed();

    assert!(result.is_ok());
    // The server asked for 120 s, which dominates the sampled cooldown.
    assert!(elapsed >= Duration::from_secs(133), "elapsed {elapsed:?}");
}

#[tokio::test(start_paused = true)]
async fn test_exhausted_budget_names_the_chapter() {
    let api = FlakyApi::new(u32::MAX, FailureMode::Transient);
    let config = GuardConfig::default();

    let start = Instant::now();
    let error = fetch_chapter(&config, &api, &book(), &chapter(), "cookie")
        .await
        .expect_err("must exhaust the retry budget");
    let elapsed = start.elapsed();

    assert_eq!(api.calls(), 3);
    assert_eq!(error.attempts, 3);
    assert_eq!(error.chapter_uid, 100);
    let message = error.to_string();
    assert!(message.contains("Chapter 1"), "got: {message}");

    // Initial rest + backoff before retries 1 and 2 (doubling window);
    // no sleep after the final failure.
    assert!(elapsed >= Duration::from_secs(3 + 10 + 20), "elapsed {elapsed:?}");
    assert!(elapsed <= Duration::from_secs(8 + 15 + 30), "elapsed {elapsed:?}");
}
