//! Remote book API boundary.
//!
//! The session controller only sees the [`BookApi`] trait; the bundled
//! [`WebBookClient`] is the production implementation. Implementations
//! are expected to absorb transport-level retry themselves (the bundled
//! client routes metadata requests through the retry/backoff engine);
//! the chapter-content call is a single attempt because the chapter
//! fetch guard owns that retry schedule.

mod client;
mod error;
mod types;

use std::sync::Arc;

use async_trait::async_trait;

pub use client::{DEFAULT_API_BASE, WebBookClient, WebBookProvider};
pub use error::{ApiError, FailureKind, HIGH_FREQUENCY_CODE, classify_error};
pub use types::{BookInfo, Chapter, ChapterContent, Credential};

use crate::profile::BrowserProfile;

/// The authenticated book API consumed by the download core.
#[async_trait]
pub trait BookApi: Send + Sync {
    /// Fetches book metadata.
    async fn book_info(&self, book_id: &str, cookie: &str) -> Result<BookInfo, ApiError>;

    /// Fetches the chapter list for one or more books.
    async fn chapter_list(&self, book_ids: &[&str], cookie: &str) -> Result<Vec<Chapter>, ApiError>;

    /// Fetches one chapter's rendered content. Single attempt; retry
    /// belongs to the chapter fetch guard.
    async fn chapter_content(
        &self,
        book: &BookInfo,
        chapter: &Chapter,
        cookie: &str,
    ) -> Result<ChapterContent, ApiError>;
}

/// Builds a session-scoped API client bound to one browser identity.
///
/// The controller generates a [`BrowserProfile`] when a session starts
/// and asks the provider for a client that presents that identity on
/// every request until the stream closes.
pub trait BookApiProvider: Send + Sync {
    /// Returns the API client for a session using `browser`.
    fn for_session(&self, browser: &BrowserProfile) -> Arc<dyn BookApi>;
}

/// A fixed API implementation can stand in as its own provider; the
/// browser identity is ignored. Used by tests and stubs.
impl BookApiProvider for Arc<dyn BookApi> {
    fn for_session(&self, _browser: &BrowserProfile) -> Arc<dyn BookApi> {
        Arc::clone(self)
    }
}
