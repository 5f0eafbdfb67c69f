//! Error types for the remote book API.
//!
//! This module defines structured errors for all API operations and the
//! classification used by the retry layers to pick a backoff strategy.

use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

/// API error code the upstream returns when it decides the session is
/// requesting too fast.
pub const HIGH_FREQUENCY_CODE: i64 = -2012;

/// Message fragments the upstream uses for the same condition. The CJK
/// fragment matches the production error text; the ASCII one covers the
/// localized variant.
#[allow(clippy::expect_used)]
static HIGH_FREQUENCY_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"频率|too\s+frequent|high\s+frequency").expect("high-frequency regex is valid")
});

/// Errors that can occur talking to the remote book API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Network-level error (DNS, connection refused, TLS, etc.)
    #[error("network error requesting {url}: {source}")]
    Network {
        /// The URL that failed.
        url: String,
        /// The underlying network error.
        #[source]
        source: reqwest::Error,
    },

    /// Request timed out before completion.
    #[error("timeout requesting {url}")]
    Timeout {
        /// The URL that timed out.
        url: String,
    },

    /// HTTP error response (4xx/5xx).
    #[error("HTTP {status} requesting {url}")]
    HttpStatus {
        /// The URL that returned an error status.
        url: String,
        /// The HTTP status code.
        status: u16,
        /// The Retry-After header value, if present (for 429 responses).
        retry_after: Option<String>,
    },

    /// Application-level error carried in an HTTP 200 envelope.
    #[error("API error {code}: {message}")]
    Api {
        /// Upstream error code.
        code: i64,
        /// Upstream error message.
        message: String,
    },

    /// Response body did not match the expected envelope.
    #[error("failed to decode response from {url}: {source}")]
    Decode {
        /// The URL whose response failed to decode.
        url: String,
        /// The underlying decode error.
        #[source]
        source: serde_json::Error,
    },
}

impl ApiError {
    /// Creates a network error from a reqwest error, folding timeouts into
    /// their own variant.
    pub fn from_reqwest(url: impl Into<String>, source: reqwest::Error) -> Self {
        let url = url.into();
        if source.is_timeout() {
            Self::Timeout { url }
        } else {
            Self::Network { url, source }
        }
    }

    /// Creates an HTTP status error.
    pub fn http_status(url: impl Into<String>, status: u16, retry_after: Option<String>) -> Self {
        Self::HttpStatus {
            url: url.into(),
            status,
            retry_after,
        }
    }

    /// Creates an application-level error.
    pub fn api(code: i64, message: impl Into<String>) -> Self {
        Self::Api {
            code,
            message: message.into(),
        }
    }

    /// Returns the Retry-After header value when the error carried one.
    #[must_use]
    pub fn retry_after(&self) -> Option<&str> {
        match self {
            Self::HttpStatus { retry_after, .. } => retry_after.as_deref(),
            _ => None,
        }
    }

    /// Whether the upstream signalled a rate-limit condition.
    ///
    /// Deliberately loose: HTTP 429, the high-frequency error code, or a
    /// message matching the frequency pattern all count.
    #[must_use]
    pub fn is_rate_limited(&self) -> bool {
        match self {
            Self::HttpStatus { status, .. } => *status == 429,
            Self::Api { code, message } => {
                *code == HIGH_FREQUENCY_CODE || HIGH_FREQUENCY_PATTERN.is_match(message)
            }
            _ => false,
        }
    }
}

/// Classification of API failures for retry decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Temporary failure that may succeed on retry (timeouts, 5xx,
    /// connection resets).
    Transient,

    /// Rate limiting; retryable after an extended cooldown.
    RateLimited,

    /// Failure that retrying with the same request cannot fix (4xx other
    /// than 408/429, malformed responses).
    Fatal,
}

/// Classifies an API error into a failure kind.
#[must_use]
pub fn classify_error(error: &ApiError) -> FailureKind {
    if error.is_rate_limited() {
        return FailureKind::RateLimited;
    }
    match error {
        ApiError::Timeout { .. } | ApiError::Network { .. } => FailureKind::Transient,
        ApiError::HttpStatus { status, .. } => match status {
            408 => FailureKind::Transient,
            s if (500..600).contains(s) => FailureKind::Transient,
            _ => FailureKind::Fatal,
        },
        // Unknown application codes come from a well-formed response; the
        // request itself went through, so retrying may still help.
        ApiError::Api { .. } => FailureKind::Transient,
        ApiError::Decode { .. } => FailureKind::Fatal,
    }
}
