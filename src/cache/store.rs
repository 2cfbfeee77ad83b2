// In-memory response cache for the GitHub API.
// Serves recent bodies without touching the network and enforces the rate limit latch.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use parking_lot::Mutex;
use tokio::time::Instant;

use crate::error::{ApiError, ApiResult};
use crate::github::transport::{RawResponse, Transport};

use super::rate_limit::{RateLimit, RateLimitLatch, body_signals_limit};

/// Lifetime of a cached response body.
pub const CACHE_TTL: Duration = Duration::from_secs(30);

/// A cached response body and the instant it stops being valid.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub body: String,
    pub expires_at: Instant,
}

impl CacheEntry {
    pub fn new(body: String, ttl: Duration) -> Self {
        Self {
            body,
            expires_at: Instant::now() + ttl,
        }
    }

    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}

/// TTL cache in front of a [`Transport`], bound to a single API host.
///
/// One instance is meant to live for the whole process so that the rate limit
/// countdown is shared by every caller.
pub struct RateLimitedCache {
    base_url: String,
    transport: Arc<dyn Transport>,
    entries: DashMap<String, CacheEntry>,
    latch: RateLimitLatch,
    last_limit: Mutex<RateLimit>,
    ttl: Duration,
}

impl RateLimitedCache {
    pub fn new(base_url: &str, transport: Arc<dyn Transport>) -> Self {
        Self::with_ttl(base_url, transport, CACHE_TTL)
    }

    pub fn with_ttl(base_url: &str, transport: Arc<dyn Transport>, ttl: Duration) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            transport,
            entries: DashMap::new(),
            latch: RateLimitLatch::new(),
            last_limit: Mutex::new(RateLimit::default()),
            ttl,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Most recent rate limit headers seen from the host.
    pub fn rate_limit(&self) -> RateLimit {
        self.last_limit.lock().clone()
    }

    pub fn is_rate_limited(&self) -> bool {
        self.latch.is_blocked()
    }

    /// Fetch `url`, serving a cached body while it is still fresh.
    ///
    /// # Panics
    ///
    /// Panics if `url` does not belong to the configured API host.
    pub async fn fetch(&self, url: &str) -> ApiResult<String> {
        assert!(
            self.owns(url),
            "{url} is not served by the configured API host {}",
            self.base_url
        );

        if let Some(body) = self.cached(url) {
            log::debug!("cache hit for {}", url);
            return Ok(body);
        }

        self.latch.check()?;

        let response = self.transport.get(url).await?;
        let limit = RateLimit::from_headers(&response.headers);
        if limit != RateLimit::default() {
            *self.last_limit.lock() = limit.clone();
        }

        if limit.is_exhausted() || (!response.is_success() && body_signals_limit(&response.body))
        {
            return Err(self.latch.arm(limit.reset_at()));
        }

        let body = check_status(url, response)?;
        self.entries
            .insert(url.to_string(), CacheEntry::new(body.clone(), self.ttl));

        Ok(body)
    }

    fn cached(&self, url: &str) -> Option<String> {
        self.entries
            .get(url)
            .and_then(|entry| (!entry.is_expired()).then(|| entry.body.clone()))
    }

    fn owns(&self, url: &str) -> bool {
        url.strip_prefix(self.base_url.as_str())
            .is_some_and(|rest| rest.is_empty() || rest.starts_with('/') || rest.starts_with('?'))
    }
}

fn check_status(url: &str, response: RawResponse) -> ApiResult<String> {
    match response.status {
        200..=299 => Ok(response.body),
        401 => Err(ApiError::Unauthorized),
        404 => Err(ApiError::NotFound(url.to_string())),
        status => Err(ApiError::Status {
            status,
            url: url.to_string(),
        }),
    }
}
