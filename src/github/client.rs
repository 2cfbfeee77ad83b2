// GitHub API client.
// Builds endpoint URLs and decodes JSON bodies fetched through the rate limited cache.

use std::sync::Arc;

use serde::de::DeserializeOwned;

use crate::cache::RateLimitedCache;
use crate::error::{ApiError, ApiResult};

use super::transport::{HttpTransport, Transport};

pub const GITHUB_API_BASE: &str = "https://api.github.com";

/// Typed, read-only access to the GitHub REST API.
///
/// Cloning is cheap and every clone shares the same cache and rate limit state.
#[derive(Clone)]
pub struct ApiClient {
    cache: Arc<RateLimitedCache>,
}

impl ApiClient {
    pub fn new(cache: Arc<RateLimitedCache>) -> Self {
        Self { cache }
    }

    /// Client for `base_url` using the real HTTP transport.
    pub fn connect(base_url: &str) -> ApiResult<Self> {
        let transport: Arc<dyn Transport> = Arc::new(HttpTransport::new()?);
        Ok(Self::new(Arc::new(RateLimitedCache::new(base_url, transport))))
    }

    /// Absolute URL for an endpoint path such as `/repositories/1`.
    pub(crate) fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.cache.base_url(), endpoint)
    }

    /// Fetch an endpoint and decode its JSON body.
    pub(crate) async fn get_json<T: DeserializeOwned>(&self, endpoint: &str) -> ApiResult<T> {
        let url = self.url(endpoint);
        let body = self.cache.fetch(&url).await?;

        serde_json::from_str(&body).map_err(|source| {
            log::error!("GitHub returned an unexpected body for {}: {}", url, source);
            ApiError::Malformed { url, source }
        })
    }
}
