//! Session controller: drives one book download end to end.
//!
//! A session is a single cooperative task: fetch metadata, walk the
//! chapter list in order, run the pacing plan between fetch and emit,
//! and finalize. It suspends at every network call and every simulated
//! delay, re-checking cancellation and pause around each suspension
//! point. Whatever path the session takes out (success, metadata
//! failure, cancellation), the terminal `close` event fires exactly
//! once.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::Timelike;
use rand::Rng;
use thiserror::Error;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::emitter::EventSink;
use super::events::DownloadEvent;
use super::pause::PauseListener;
use crate::api::{ApiError, BookApiProvider, Credential};
use crate::assets::AssetCatalog;
use crate::counter::DownloadCounter;
use crate::fetch::{GuardConfig, fetch_chapter, random_duration_between};
use crate::notify::Notifier;
use crate::pacing::plan_chapter;
use crate::profile::{BrowserProfile, ReadingProfile};

/// Session lifecycle phase, for tracing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Initializing,
    FetchingMetadata,
    IteratingChapters,
    Finalizing,
    Closed,
}

/// Unrecoverable session failures, surfaced to the client as a single
/// `error` event.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Book info or chapter list could not be fetched.
    #[error("failed to fetch book metadata: {0}")]
    Metadata(#[from] ApiError),
}

/// Collaborators a session needs.
#[derive(Clone)]
pub struct SessionDeps {
    /// Builds the session-scoped API client.
    pub api: Arc<dyn BookApiProvider>,
    /// Preloaded preface assets.
    pub assets: Arc<AssetCatalog>,
    /// Download counter; `None` disables persistence.
    pub counter: Option<Arc<dyn DownloadCounter>>,
    /// Completion notifier; `None` disables notifications.
    pub notifier: Option<Arc<dyn Notifier>>,
}

/// Tunable session constants. `Default` holds the production values.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Chapter fetch guard settings.
    pub guard: GuardConfig,
    /// Pause between the metadata and chapter-list requests.
    pub metadata_pause: (Duration, Duration),
    /// Session duration cap, sampled per session (minutes).
    pub session_duration_minutes: (u64, u64),
    /// Continuous-chapter cap, sampled per session.
    pub continuous_chapters: (u32, u32),
    /// Rest taken when the session exceeds its duration cap.
    pub overrun_rest: (Duration, Duration),
    /// Rest taken when the continuous-chapter cap is reached.
    pub continuous_rest: (Duration, Duration),
    /// Extended rest after a chapter exhausts its retry budget.
    pub failure_rest: (Duration, Duration),
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            guard: GuardConfig::default(),
            metadata_pause: (Duration::from_secs(1), Duration::from_secs(3)),
            session_duration_minutes: (90, 180),
            continuous_chapters: (3, 8),
            overrun_rest: (Duration::from_secs(120), Duration::from_secs(180)),
            continuous_rest: (Duration::from_secs(30), Duration::from_secs(120)),
            failure_rest: (Duration::from_secs(60), Duration::from_secs(120)),
        }
    }
}

/// Mutable state of one download session.
///
/// Owned exclusively by one controller invocation and destroyed when the
/// stream closes. Fatigue only decreases on rest events.
#[derive(Debug)]
struct DownloadSession {
    started: Instant,
    fatigue: f64,
    continuous_chapters: u32,
    max_duration: Duration,
    max_continuous: u32,
}

impl DownloadSession {
    fn begin(config: &SessionConfig, rng: &mut impl Rng) -> Self {
        let minutes =
            rng.gen_range(config.session_duration_minutes.0..=config.session_duration_minutes.1);
        let max_continuous =
            rng.gen_range(config.continuous_chapters.0..=config.continuous_chapters.1);
        Self {
            started: Instant::now(),
            fatigue: 0.0,
            continuous_chapters: 0,
            max_duration: Duration::from_secs(minutes * 60),
            max_continuous,
        }
    }
}

/// How a session left its chapter loop.
enum Outcome {
    Completed,
    Cancelled,
}

/// Runs one download session to completion.
///
/// This function never returns an error: every failure path ends in the
/// appropriate events on the sink, terminated by `close`.
pub async fn run_session(
    deps: SessionDeps,
    config: SessionConfig,
    book_id: String,
    credential: Credential,
    mut pause: PauseListener,
    cancelled: Arc<AtomicBool>,
    mut sink: EventSink,
) {
    info!(%book_id, "download session starting");

    let outcome = drive(
        &deps,
        &config,
        &book_id,
        &credential,
        &mut pause,
        &cancelled,
        &mut sink,
    )
    .await;

    match outcome {
        Ok(Outcome::Completed) => {
            finalize(&deps, &book_id, &credential).await;
        }
        Ok(Outcome::Cancelled) => {
            debug!(%book_id, "session cancelled, suppressing further events");
        }
        Err(error) => {
            warn!(%book_id, error = %error, "session failed");
            sink.emit(DownloadEvent::Error {
                message: error.to_string(),
            })
            .await;
        }
    }

    // Guaranteed cleanup: the terminal event fires on every exit path.
    sink.emit(DownloadEvent::Close).await;
    debug!(%book_id, phase = ?Phase::Closed, "download session closed");
}

async fn drive(
    deps: &SessionDeps,
    config: &SessionConfig,
    book_id: &str,
    credential: &Credential,
    pause: &mut PauseListener,
    cancelled: &AtomicBool,
    sink: &mut EventSink,
) -> Result<Outcome, SessionError> {
    debug!(phase = ?Phase::Initializing, "session phase");
    let browser = BrowserProfile::generate(&mut rand::thread_rng());
    info!(
        user_agent = %browser.user_agent,
        platform = browser.platform,
        viewport_w = browser.viewport.0,
        viewport_h = browser.viewport.1,
        "session browser identity"
    );
    let api = deps.api.for_session(&browser);
    sink.emit(DownloadEvent::Preface {
        styles: deps.assets.styles.clone(),
        scripts: deps.assets.scripts.clone(),
    })
    .await;

    debug!(phase = ?Phase::FetchingMetadata, "session phase");
    let cookie = credential.cookie.as_str();
    let book = api.book_info(book_id, cookie).await?;

    // A human pauses between opening the book page and the chapter list.
    let pause_dur = random_duration_between(config.metadata_pause.0, config.metadata_pause.1);
    if !suspend(cancelled, sink, pause_dur).await {
        return Ok(Outcome::Cancelled);
    }

    let chapters = api.chapter_list(&[book_id], cookie).await?;
    info!(
        book = %book.title,
        chapters = chapters.len(),
        "metadata fetched, starting chapter loop"
    );

    debug!(phase = ?Phase::IteratingChapters, "session phase");
    let reading = ReadingProfile::generate(&mut rand::thread_rng());
    let mut session = DownloadSession::begin(config, &mut rand::thread_rng());
    debug!(
        ?reading,
        max_duration_mins = session.max_duration.as_secs() / 60,
        max_continuous = session.max_continuous,
        "session pacing parameters"
    );

    let total = chapters.len();
    for chapter in &chapters {
        if halted(cancelled, sink) {
            return Ok(Outcome::Cancelled);
        }
        if !pause.wait_while_paused(cancelled).await {
            return Ok(Outcome::Cancelled);
        }

        // A reader this deep into a sitting walks away from the screen.
        if session.started.elapsed() > session.max_duration {
            let rest = random_duration_between(config.overrun_rest.0, config.overrun_rest.1);
            info!(
                rest_secs = rest.as_secs(),
                "session duration cap exceeded, taking a long rest"
            );
            if !suspend(cancelled, sink, rest).await {
                return Ok(Outcome::Cancelled);
            }
            session.continuous_chapters = 0;
        }

        if session.continuous_chapters >= session.max_continuous {
            let rest = random_duration_between(config.continuous_rest.0, config.continuous_rest.1);
            info!(
                read = session.continuous_chapters,
                rest_secs = rest.as_secs(),
                "continuous-chapter cap reached, resting"
            );
            if !suspend(cancelled, sink, rest).await {
                return Ok(Outcome::Cancelled);
            }
            session.continuous_chapters = 0;
        }

        let content =
            match fetch_chapter(&config.guard, api.as_ref(), &book, chapter, cookie).await {
                Ok(content) => content,
                Err(error) => {
                    // Skip, never abort: one bad chapter costs itself and
                    // an extended rest, not the session.
                    warn!(error = %error, "chapter retry budget exhausted, skipping");
                    let rest =
                        random_duration_between(config.failure_rest.0, config.failure_rest.1);
                    if !suspend(cancelled, sink, rest).await {
                        return Ok(Outcome::Cancelled);
                    }
                    continue;
                }
            };

        let hour = chrono::Local::now().hour();
        let plan = plan_chapter(
            &content.html,
            &chapter.title,
            &reading,
            session.fatigue,
            hour,
            &mut rand::thread_rng(),
        );
        debug!(
            chapter = %chapter.title,
            steps = plan.steps.len(),
            fatigue = plan.fatigue_after,
            "running pacing plan"
        );
        for step in &plan.steps {
            if !pause.wait_while_paused(cancelled).await {
                return Ok(Outcome::Cancelled);
            }
            if !suspend(cancelled, sink, step.duration).await {
                return Ok(Outcome::Cancelled);
            }
        }
        session.fatigue = plan.fatigue_after;
        if let Some(rest) = plan.long_rest {
            debug!(rest_secs = rest.as_secs(), "fatigue rest");
            if !suspend(cancelled, sink, rest).await {
                return Ok(Outcome::Cancelled);
            }
        }

        sink.emit(DownloadEvent::Progress {
            total,
            current: chapter.chapter_idx,
            chapter_uid: chapter.chapter_uid,
            title: content.title,
            html: content.html,
            style: content.style,
        })
        .await;
        session.continuous_chapters += 1;
    }

    debug!(phase = ?Phase::Finalizing, "session phase");
    sink.emit(DownloadEvent::Complete).await;
    Ok(Outcome::Completed)
}

/// Best-effort post-completion bookkeeping; failures are logged, never
/// propagated to the stream.
async fn finalize(deps: &SessionDeps, book_id: &str, credential: &Credential) {
    if let Some(counter) = &deps.counter {
        if let Err(error) = counter.increment(credential, book_id).await {
            warn!(book_id, error = %error, "download counter increment failed");
        }
    }
    if let Some(notifier) = &deps.notifier {
        let text = format!("book {book_id} downloaded");
        if let Err(error) = notifier.notify(&text).await {
            warn!(book_id, error = %error, "completion notification failed");
        }
    }
}

/// Whether the session must stop emitting and wind down.
fn halted(cancelled: &AtomicBool, sink: &EventSink) -> bool {
    cancelled.load(Ordering::SeqCst) || sink.is_disconnected()
}

/// Sleeps `duration`, re-checking the stop conditions before and after
/// the suspension. Returns `false` when the session must stop.
async fn suspend(cancelled: &AtomicBool, sink: &EventSink, duration: Duration) -> bool {
    if halted(cancelled, sink) {
        return false;
    }
    tokio::time::sleep(duration).await;
    !halted(cancelled, sink)
}
