//! Pause/resume control.
//!
//! Each session carries its own pause handle backed by a watch channel:
//! resuming wakes the waiting session immediately instead of being
//! noticed on the next polling tick. The registry maps live sessions to
//! their handles so the control surface can target one session or, when
//! called without a target, flip every in-flight session at once (the
//! historical process-wide behavior).

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use dashmap::DashMap;
use serde::Serialize;
use tokio::sync::watch;
use tracing::debug;

/// How often a paused session re-checks its cancellation flag while
/// waiting for resume.
const CANCEL_RECHECK: Duration = Duration::from_millis(250);

/// Fixed acknowledgment envelope for the control surface.
#[derive(Debug, Clone, Serialize)]
pub struct ControlAck {
    /// 0 on success.
    pub code: i32,
    /// Always empty; kept for wire compatibility.
    pub data: String,
    /// Human-readable status.
    pub msg: String,
}

impl ControlAck {
    /// The success acknowledgment.
    #[must_use]
    pub fn success() -> Self {
        Self {
            code: 0,
            data: String::new(),
            msg: "success".to_string(),
        }
    }
}

/// Write side of one session's pause flag.
#[derive(Debug)]
pub struct PauseControl {
    tx: watch::Sender<bool>,
}

impl Default for PauseControl {
    fn default() -> Self {
        Self::new()
    }
}

impl PauseControl {
    /// Creates an unpaused control.
    #[must_use]
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx }
    }

    /// Pauses the session; takes effect at its next suspension point.
    pub fn pause(&self) {
        self.tx.send_replace(true);
    }

    /// Resumes the session, waking any waiter immediately.
    pub fn resume(&self) {
        self.tx.send_replace(false);
    }

    /// Current flag value.
    #[must_use]
    pub fn is_paused(&self) -> bool {
        *self.tx.borrow()
    }

    /// Creates the session-side listener.
    #[must_use]
    pub fn listener(&self) -> PauseListener {
        PauseListener {
            rx: self.tx.subscribe(),
        }
    }
}

/// Read side consulted by the session at every suspension point.
#[derive(Debug)]
pub struct PauseListener {
    rx: watch::Receiver<bool>,
}

impl PauseListener {
    /// Current flag value.
    #[must_use]
    pub fn is_paused(&self) -> bool {
        *self.rx.borrow()
    }

    /// Blocks while the session is paused.
    ///
    /// Returns `false` if the session was cancelled while waiting. A
    /// dropped control (session deregistered underneath us) counts as
    /// resumed.
    pub async fn wait_while_paused(&mut self, cancelled: &AtomicBool) -> bool {
        while *self.rx.borrow() {
            if cancelled.load(Ordering::SeqCst) {
                return false;
            }
            tokio::select! {
                changed = self.rx.changed() => {
                    if changed.is_err() {
                        return !cancelled.load(Ordering::SeqCst);
                    }
                }
                () = tokio::time::sleep(CANCEL_RECHECK) => {}
            }
        }
        !cancelled.load(Ordering::SeqCst)
    }
}

/// Live-session registry keyed by session id.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: DashMap<u64, PauseControl>,
    next_id: AtomicU64,
}

impl SessionRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new session; returns its id and pause listener.
    pub fn register(&self) -> (u64, PauseListener) {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let control = PauseControl::new();
        let listener = control.listener();
        self.sessions.insert(id, control);
        debug!(session = id, "session registered");
        (id, listener)
    }

    /// Removes a finished session.
    pub fn deregister(&self, id: u64) {
        self.sessions.remove(&id);
        debug!(session = id, "session deregistered");
    }

    /// Pauses one session, or every session when `target` is `None`.
    /// Returns how many sessions were affected.
    pub fn pause(&self, target: Option<u64>) -> usize {
        self.apply(target, |control| control.pause())
    }

    /// Resumes one session, or every session when `target` is `None`.
    /// Returns how many sessions were affected.
    pub fn resume(&self, target: Option<u64>) -> usize {
        self.apply(target, |control| control.resume())
    }

    /// Number of live sessions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Whether no sessions are live.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    fn apply(&self, target: Option<u64>, op: impl Fn(&PauseControl)) -> usize {
        match target {
            Some(id) => match self.sessions.get(&id) {
                Some(control) => {
                    op(&control);
                    1
                }
                None => 0,
            },
            None => {
                let mut affected = 0;
                for entry in self.sessions.iter() {
                    op(entry.value());
                    affected += 1;
                }
                affected
            }
        }
    }
}
