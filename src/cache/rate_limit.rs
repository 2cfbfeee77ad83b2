// Rate limit tracking.
// Parses GitHub rate limit headers and holds the process-wide "blocked until" latch.

use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use reqwest::header::HeaderMap;
use tokio::time::Instant;

use crate::error::ApiError;

/// Backoff applied when a limit is signalled without a usable reset time.
pub const DEFAULT_BACKOFF: Duration = Duration::from_secs(60);

/// Textual marker GitHub puts in error bodies when the quota is spent.
pub const RATE_LIMIT_MARKER: &str = "rate limit exceeded";

/// Rate limit information from response headers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RateLimit {
    pub limit: Option<u64>,
    pub remaining: Option<u64>,
    pub reset: Option<u64>,
    pub used: Option<u64>,
}

impl RateLimit {
    /// Read the `x-ratelimit-*` headers. Missing or unparsable values stay `None`.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let read = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse().ok())
        };

        Self {
            limit: read("x-ratelimit-limit"),
            remaining: read("x-ratelimit-remaining"),
            reset: read("x-ratelimit-reset"),
            used: read("x-ratelimit-used"),
        }
    }

    /// True when the server reported zero remaining requests.
    pub fn is_exhausted(&self) -> bool {
        self.remaining == Some(0)
    }

    /// Reset instant as wall-clock time.
    pub fn reset_at(&self) -> Option<DateTime<Utc>> {
        self.reset
            .and_then(|secs| i64::try_from(secs).ok())
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
    }
}

/// Whether a response body carries the "rate limit exceeded" marker.
pub fn body_signals_limit(body: &str) -> bool {
    body.to_ascii_lowercase().contains(RATE_LIMIT_MARKER)
}

#[derive(Debug, Clone, Copy)]
struct Blocked {
    until: Instant,
    reset_at: DateTime<Utc>,
}

/// Single countdown shared by every request made through one cache.
#[derive(Debug, Default)]
pub struct RateLimitLatch {
    blocked: Mutex<Option<Blocked>>,
}

impl RateLimitLatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail with `RateLimited` while the countdown is running.
    pub fn check(&self) -> Result<(), ApiError> {
        let mut blocked = self.blocked.lock();
        match *blocked {
            Some(state) if Instant::now() < state.until => Err(ApiError::RateLimited {
                reset_at: format_reset(state.reset_at),
            }),
            Some(_) => {
                *blocked = None;
                Ok(())
            }
            None => Ok(()),
        }
    }

    /// Start the countdown, running until `reset` (or the default backoff), and
    /// return the error to surface for the request that tripped it.
    pub fn arm(&self, reset: Option<DateTime<Utc>>) -> ApiError {
        let now = Utc::now();
        let wait = reset
            .and_then(|reset| (reset - now).to_std().ok())
            .filter(|wait| !wait.is_zero())
            .unwrap_or(DEFAULT_BACKOFF);
        let reset_at = now + chrono::Duration::from_std(wait).unwrap_or(chrono::Duration::zero());

        *self.blocked.lock() = Some(Blocked {
            until: Instant::now() + wait,
            reset_at,
        });

        log::warn!(
            "GitHub rate limit reached, pausing requests until {}",
            format_reset(reset_at)
        );

        ApiError::RateLimited {
            reset_at: format_reset(reset_at),
        }
    }

    pub fn is_blocked(&self) -> bool {
        self.blocked
            .lock()
            .is_some_and(|state| Instant::now() < state.until)
    }
}

fn format_reset(reset_at: DateTime<Utc>) -> String {
    reset_at.format("%H:%M:%S").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    #[test]
    fn test_parse_headers() {
        let mut headers = HeaderMap::new();
        headers.insert("x-ratelimit-limit", HeaderValue::from_static("60"));
        headers.insert("x-ratelimit-remaining", HeaderValue::from_static("0"));
        headers.insert("x-ratelimit-reset", HeaderValue::from_static("1700000000"));
        headers.insert("x-ratelimit-used", HeaderValue::from_static("60"));

        let limit = RateLimit::from_headers(&headers);
        assert_eq!(limit.limit, Some(60));
        assert_eq!(limit.used, Some(60));
        assert!(limit.is_exhausted());
        assert_eq!(limit.reset_at().unwrap().timestamp(), 1_700_000_000);
    }

    #[test]
    fn test_missing_headers_not_exhausted() {
        let limit = RateLimit::from_headers(&HeaderMap::new());
        assert_eq!(limit, RateLimit::default());
        assert!(!limit.is_exhausted());
    }

    #[test]
    fn test_body_marker_case_insensitive() {
        assert!(body_signals_limit(
            r#"{"message":"API rate limit exceeded for 1.2.3.4."}"#
        ));
        assert!(!body_signals_limit(r#"{"message":"Not Found"}"#));
    }

    #[tokio::test(start_paused = true)]
    async fn test_latch_blocks_until_reset() {
        let latch = RateLimitLatch::new();
        assert!(latch.check().is_ok());

        let err = latch.arm(None);
        assert!(err.is_rate_limited());
        assert!(latch.check().is_err());

        tokio::time::advance(DEFAULT_BACKOFF + Duration::from_secs(1)).await;
        assert!(latch.check().is_ok());
        assert!(!latch.is_blocked());
    }

    #[tokio::test(start_paused = true)]
    async fn test_past_reset_uses_default_backoff() {
        let latch = RateLimitLatch::new();
        latch.arm(Some(Utc::now() - chrono::Duration::seconds(30)));

        tokio::time::advance(Duration::from_secs(30)).await;
        assert!(latch.is_blocked());
    }
}
