//! Download event type and its SSE wire form.
//!
//! Every state transition the session controller makes visible to the
//! client is one of these variants; the serializer handles the union
//! exhaustively so a new variant cannot silently go unserialized.

use serde::Serialize;

/// One event on the download stream.
#[derive(Debug, Clone)]
pub enum DownloadEvent {
    /// Static style/script assets, emitted once at session start.
    Preface {
        /// Style sheets injected ahead of chapter content.
        styles: Vec<String>,
        /// Scripts injected ahead of chapter content.
        scripts: Vec<String>,
    },

    /// One successfully fetched chapter.
    Progress {
        /// Total chapters in the book.
        total: usize,
        /// Ordinal of this chapter (1-based).
        current: u32,
        /// Unique chapter identifier.
        chapter_uid: u64,
        /// Resolved chapter title.
        title: String,
        /// Chapter body HTML.
        html: String,
        /// Chapter-scoped style sheet.
        style: String,
    },

    /// Unrecoverable failure; carries a human-readable message.
    Error {
        /// What went wrong.
        message: String,
    },

    /// The chapter loop finished normally.
    Complete,

    /// Terminal event, always emitted last, exactly once.
    Close,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PrefacePayload<'a> {
    styles: &'a [String],
    scripts: &'a [String],
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ProgressPayload<'a> {
    total: usize,
    current: u32,
    chapter_uid: u64,
    title: &'a str,
    html: &'a str,
    style: &'a str,
}

impl DownloadEvent {
    /// The SSE event name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Preface { .. } => "preface",
            Self::Progress { .. } => "progress",
            Self::Error { .. } => "error",
            Self::Complete => "complete",
            Self::Close => "close",
        }
    }

    /// Serializes the event into one SSE frame.
    ///
    /// `complete` carries a JSON `null`; `close` carries an empty data
    /// line (a frame with no data field would never be dispatched by an
    /// EventSource client).
    #[must_use]
    pub fn to_sse(&self) -> String {
        let data = match self {
            Self::Preface { styles, scripts } => to_json(&PrefacePayload { styles, scripts }),
            Self::Progress {
                total,
                current,
                chapter_uid,
                title,
                html,
                style,
            } => to_json(&ProgressPayload {
                total: *total,
                current: *current,
                chapter_uid: *chapter_uid,
                title,
                html,
                style,
            }),
            Self::Error { message } => to_json(message),
            Self::Complete => "null".to_string(),
            Self::Close => String::new(),
        };
        format!("event: {}\ndata: {}\n\n", self.name(), data)
    }
}

/// JSON-encodes a payload. The payload types here cannot fail to
/// serialize, so the fallback only guards against future variants.
fn to_json<T: Serialize>(payload: &T) -> String {
    serde_json::to_string(payload).unwrap_or_else(|_| "null".to_string())
}
