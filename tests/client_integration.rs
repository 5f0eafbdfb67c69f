//! Integration tests for the bundled book API client.
//!
//! These verify the wire behavior against a mock HTTP server: envelope
//! decoding, error classification, retry on transient failures, and the
//! identity/jitter headers every request must carry.

use std::time::Duration;

use url::Url;
use wiremock::matchers::{header, header_exists, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use bookstream::api::{ApiError, BookApi, WebBookClient};
use bookstream::fetch::RetryPolicy;
use bookstream::profile::BrowserProfile;

fn client_for(server: &MockServer, retry: RetryPolicy) -> WebBookClient {
    let base = Url::parse(&server.uri()).expect("mock server URI is valid");
    let browser = BrowserProfile::generate(&mut rand::thread_rng());
    WebBookClient::new(base, retry, browser)
}

/// Zero-delay policy so retries don't slow the suite down.
fn no_wait(max_attempts: u32) -> RetryPolicy {
    RetryPolicy::new(max_attempts, Duration::ZERO)
}

#[tokio::test]
async fn test_book_info_decodes_payload() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/web/book/info"))
        .and(query_param("bookId", "b1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "bookId": "b1",
            "title": "A Book",
            "author": "Someone"
        })))
        .mount(&server)
        .await;

    let client = client_for(&server, no_wait(1));
    let info = client.book_info("b1", "wr_vid=1").await.expect("book info");
    assert_eq!(info.book_id, "b1");
    assert_eq!(info.title, "A Book");
    assert_eq!(info.author, "Someone");
}

#[tokio::test]
async fn test_requests_carry_identity_and_jitter_headers() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/web/book/info"))
        .and(header("Cookie", "wr_vid=42"))
        .and(header("DNT", "1"))
        .and(header_exists("User-Agent"))
        .and(header_exists("Referer"))
        .and(header_exists("Accept-Language"))
        .and(header_exists("Cache-Control"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "bookId": "b1",
            "title": "A Book"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server, no_wait(1));
    client
        .book_info("b1", "wr_vid=42")
        .await
        .expect("matched request implies all headers present");
}

#[tokio::test]
async fn test_envelope_error_surfaces_code_and_message() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/web/book/info"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "errCode": -2012,
            "errMsg": "requests too frequent"
        })))
        .mount(&server)
        .await;

    // Rate-limited responses are retried, so cap attempts at 1 to
    // observe the raw error.
    let client = client_for(&server, no_wait(1));
    let error = client.book_info("b1", "wr_vid=1").await.expect_err("error");
    match &error {
        ApiError::Api { code, message } => {
            assert_eq!(*code, -2012);
            assert!(message.contains("frequent"));
        }
        other => panic!("expected Api error, got {other:?}"),
    }
    assert!(error.is_rate_limited());
}

#[tokio::test]
async fn test_http_429_carries_retry_after() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/web/book/info"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "120"))
        .mount(&server)
        .await;

    let client = client_for(&server, no_wait(1));
    let error = client.book_info("b1", "wr_vid=1").await.expect_err("error");
    assert!(error.is_rate_limited());
    assert_eq!(error.retry_after(), Some("120"));
}

#[tokio::test]
async fn test_metadata_retries_transient_failures() {
    let server = MockServer::start().await;
    // Two 503s, then success.
    Mock::given(method("GET"))
        .and(path("/web/book/info"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/web/book/info"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "bookId": "b1",
            "title": "A Book"
        })))
        .mount(&server)
        .await;

    let client = client_for(&server, no_wait(3));
    let info = client
        .book_info("b1", "wr_vid=1")
        .await
        .expect("third attempt succeeds");
    assert_eq!(info.title, "A Book");
}

#[tokio::test]
async fn test_metadata_does_not_retry_permanent_failures() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/web/book/info"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server, no_wait(3));
    let error = client.book_info("b1", "wr_vid=1").await.expect_err("404");
    match error {
        ApiError::HttpStatus { status, .. } => assert_eq!(status, 404),
        other => panic!("expected HttpStatus, got {other:?}"),
    }
}

#[tokio::test]
async fn test_chapter_list_unwraps_nested_envelope() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/web/book/chapterInfos"))
        .and(query_param("bookIds", "b1|b2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": [{
                "updated": [
                    { "chapterUid": 100, "chapterIdx": 1, "title": "Ch 1" },
                    { "chapterUid": 200, "chapterIdx": 2, "title": "Ch 2" }
                ]
            }]
        })))
        .mount(&server)
        .await;

    let client = client_for(&server, no_wait(1));
    let chapters = client
        .chapter_list(&["b1", "b2"], "wr_vid=1")
        .await
        .expect("chapter list");
    assert_eq!(chapters.len(), 2);
    assert_eq!(chapters[0].chapter_uid, 100);
    assert_eq!(chapters[1].title, "Ch 2");
}

#[tokio::test]
async fn test_chapter_content_is_single_attempt() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/web/book/chapter/e"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    // Retry budget exists but chapter content must not use it: the
    // chapter fetch guard owns that schedule.
    let client = client_for(&server, no_wait(5));
    let book = bookstream::BookInfo {
        book_id: "b1".into(),
        title: "A Book".into(),
        author: String::new(),
    };
    let chapter = bookstream::Chapter {
        chapter_uid: 100,
        chapter_idx: 1,
        title: "Ch 1".into(),
    };
    let error = client
        .chapter_content(&book, &chapter, "wr_vid=1")
        .await
        .expect_err("500");
    match error {
        ApiError::HttpStatus { status, .. } => assert_eq!(status, 500),
        other => panic!("expected HttpStatus, got {other:?}"),
    }
}

#[tokio::test]
async fn test_chapter_content_decodes_payload() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/web/book/chapter/e"))
        .and(query_param("bookId", "b1"))
        .and(query_param("chapterUid", "100"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "title": "Ch 1",
            "html": "<p>body</p>",
            "style": ".chapter { }"
        })))
        .mount(&server)
        .await;

    let client = client_for(&server, no_wait(1));
    let book = bookstream::BookInfo {
        book_id: "b1".into(),
        title: "A Book".into(),
        author: String::new(),
    };
    let chapter = bookstream::Chapter {
        chapter_uid: 100,
        chapter_idx: 1,
        title: "Ch 1".into(),
    };
    let content = client
        .chapter_content(&book, &chapter, "wr_vid=1")
        .await
        .expect("chapter content");
    assert_eq!(content.title, "Ch 1");
    assert_eq!(content.html, "<p>body</p>");
    assert_eq!(content.style, ".chapter { }");
}
