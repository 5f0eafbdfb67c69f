//! Reqwest-backed implementation of the book API.
//!
//! Every request carries the session's browser identity plus the
//! per-attempt jitter headers; metadata requests additionally go through
//! the retry/backoff engine. Parsing stops at the JSON envelope; the
//! upstream's proprietary payload encodings are out of scope here.

use async_trait::async_trait;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use url::Url;

use std::sync::Arc;

use super::error::ApiError;
use super::types::{BookInfo, Chapter, ChapterContent};
use super::{BookApi, BookApiProvider};
use crate::fetch::{AttemptHeaders, RetryPolicy, fetch_with_retry};
use crate::profile::BrowserProfile;

/// Default upstream host.
pub const DEFAULT_API_BASE: &str = "https://weread.qq.com";

/// HTTP connect timeout (30 seconds).
const CONNECT_TIMEOUT_SECS: u64 = 30;

/// HTTP read timeout (60 seconds; responses are JSON documents, not
/// large files).
const READ_TIMEOUT_SECS: u64 = 60;

/// Production book API client.
#[derive(Debug, Clone)]
pub struct WebBookClient {
    client: reqwest::Client,
    base: Url,
    retry: RetryPolicy,
    browser: BrowserProfile,
}

#[derive(Deserialize)]
struct ChapterListEnvelope {
    data: Vec<ChapterListEntry>,
}

#[derive(Deserialize)]
struct ChapterListEntry {
    updated: Vec<Chapter>,
}

impl WebBookClient {
    /// Creates a client for `base` using `browser` as the session
    /// identity for every request.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client builder fails with the static
    /// configuration. This should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn new(base: Url, retry: RetryPolicy, browser: BrowserProfile) -> Self {
        let client = reqwest::Client::builder()
            .connect_timeout(std::time::Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .timeout(std::time::Duration::from_secs(READ_TIMEOUT_SECS))
            .build()
            .expect("failed to build HTTP client with static configuration");
        Self {
            client,
            base,
            retry,
            browser,
        }
    }

    fn endpoint(&self, path: &str, query: &[(&str, &str)]) -> Url {
        let mut url = self.base.clone();
        url.set_path(path);
        if !query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (name, value) in query {
                pairs.append_pair(name, value);
            }
        }
        url
    }

    /// One GET request with the session identity and attempt jitter.
    async fn get_json(
        &self,
        url: Url,
        cookie: &str,
        jitter: &AttemptHeaders,
    ) -> Result<serde_json::Value, ApiError> {
        let referer = self.endpoint("/web/reader", &[]);
        let origin = self.base.origin().ascii_serialization();

        let mut request = self
            .client
            .get(url.clone())
            .header("User-Agent", &self.browser.user_agent)
            .header("Referer", referer.as_str())
            .header("Origin", origin)
            .header("Cookie", cookie)
            .header("Accept", "application/json, text/plain, */*")
            .header("DNT", "1");
        for (name, value) in jitter.pairs() {
            request = request.header(name, value);
        }

        let response = request
            .send()
            .await
            .map_err(|source| ApiError::from_reqwest(url.as_str(), source))?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|value| value.to_str().ok())
                .map(String::from);
            return Err(ApiError::http_status(
                url.as_str(),
                status.as_u16(),
                retry_after,
            ));
        }

        let text = response
            .text()
            .await
            .map_err(|source| ApiError::from_reqwest(url.as_str(), source))?;
        let value: serde_json::Value =
            serde_json::from_str(&text).map_err(|source| ApiError::Decode {
                url: url.to_string(),
                source,
            })?;

        // Application errors ride inside an HTTP 200 envelope.
        if let Some(code) = value.get("errCode").and_then(serde_json::Value::as_i64) {
            let message = value
                .get("errMsg")
                .and_then(serde_json::Value::as_str)
                .unwrap_or_default();
            return Err(ApiError::api(code, message));
        }

        Ok(value)
    }

    fn decode<T: DeserializeOwned>(url: &Url, value: serde_json::Value) -> Result<T, ApiError> {
        serde_json::from_value(value).map_err(|source| ApiError::Decode {
            url: url.to_string(),
            source,
        })
    }
}

/// Provider that builds a [`WebBookClient`] per session.
#[derive(Debug, Clone)]
pub struct WebBookProvider {
    base: Url,
    retry: RetryPolicy,
}

impl WebBookProvider {
    /// Creates a provider for `base` with the given retry policy.
    #[must_use]
    pub fn new(base: Url, retry: RetryPolicy) -> Self {
        Self { base, retry }
    }
}

impl BookApiProvider for WebBookProvider {
    fn for_session(&self, browser: &BrowserProfile) -> Arc<dyn BookApi> {
        Arc::new(WebBookClient::new(
            self.base.clone(),
            self.retry.clone(),
            browser.clone(),
        ))
    }
}

#[async_trait]
impl BookApi for WebBookClient {
    async fn book_info(&self, book_id: &str, cookie: &str) -> Result<BookInfo, ApiError> {
        let url = self.endpoint("/web/book/info", &[("bookId", book_id)]);
        fetch_with_retry(&self.retry, |jitter| {
            let url = url.clone();
            async move {
                let value = self.get_json(url.clone(), cookie, &jitter).await?;
                Self::decode(&url, value)
            }
        })
        .await
    }

    async fn chapter_list(
        &self,
        book_ids: &[&str],
        cookie: &str,
    ) -> Result<Vec<Chapter>, ApiError> {
        let joined = book_ids.join("|");
        let url = self.endpoint("/web/book/chapterInfos", &[("bookIds", &joined)]);
        let envelope: ChapterListEnvelope = fetch_with_retry(&self.retry, |jitter| {
            let url = url.clone();
            async move {
                let value = self.get_json(url.clone(), cookie, &jitter).await?;
                Self::decode(&url, value)
            }
        })
        .await?;
        Ok(envelope
            .data
            .into_iter()
            .next()
            .map(|entry| entry.updated)
            .unwrap_or_default())
    }

    async fn chapter_content(
        &self,
        book: &BookInfo,
        chapter: &Chapter,
        cookie: &str,
    ) -> Result<ChapterContent, ApiError> {
        let uid = chapter.chapter_uid.to_string();
        let url = self.endpoint(
            "/web/book/chapter/e",
            &[("bookId", book.book_id.as_str()), ("chapterUid", &uid)],
        );
        let jitter = AttemptHeaders::sample(&mut rand::thread_rng());
        let value = self.get_json(url.clone(), cookie, &jitter).await?;
        Self::decode(&url, value)
    }
}
