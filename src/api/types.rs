//! Data carriers for the remote book API.
//!
//! These types cross the collaborator boundary: the metadata and
//! chapter-list endpoints produce them, the session controller consumes
//! them read-only. Field names follow the upstream camelCase wire format.

use serde::{Deserialize, Serialize};

/// Credential reference for one download session.
///
/// The cookie string is opaque to this crate; it is forwarded verbatim on
/// every API request. Acquisition and refresh belong to the upstream
/// credential service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credential {
    /// Raw Cookie header value for authenticated requests.
    pub cookie: String,
}

impl Credential {
    /// Wraps a raw cookie string.
    pub fn new(cookie: impl Into<String>) -> Self {
        Self {
            cookie: cookie.into(),
        }
    }
}

/// Book metadata returned by the info endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookInfo {
    /// Upstream book identifier.
    pub book_id: String,
    /// Display title.
    pub title: String,
    /// Author line as supplied upstream.
    #[serde(default)]
    pub author: String,
}

/// One chapter descriptor from the chapter-list endpoint.
///
/// Read-only to the download core; the chapter list collaborator is the
/// source of truth for ordering and identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chapter {
    /// Unique chapter identifier within the book.
    pub chapter_uid: u64,
    /// Ordinal position in reading order (1-based).
    pub chapter_idx: u32,
    /// Chapter title.
    pub title: String,
}

/// Rendered chapter payload from the content endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChapterContent {
    /// Resolved chapter title (may differ from the list entry).
    pub title: String,
    /// Chapter body HTML.
    pub html: String,
    /// Chapter-scoped style sheet.
    pub style: String,
}
