// HTTP transport for the GitHub API.
// Performs raw GET requests; caching and rate limiting live one layer up.

use async_trait::async_trait;
use reqwest::{
    Client,
    header::{ACCEPT, HeaderMap, HeaderValue, USER_AGENT},
};

use crate::error::ApiResult;

const GITHUB_API_VERSION: &str = "2022-11-28";

/// Raw response as seen by the cache layer.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: String,
}

impl RawResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Something that can issue a GET and hand back status, headers, and body.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, url: &str) -> ApiResult<RawResponse>;
}

/// Transport backed by `reqwest`.
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new() -> ApiResult<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(
            "X-GitHub-Api-Version",
            HeaderValue::from_static(GITHUB_API_VERSION),
        );
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static(concat!("tplsync/", env!("CARGO_PKG_VERSION"))),
        );

        let client = Client::builder().default_headers(headers).build()?;

        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, url: &str) -> ApiResult<RawResponse> {
        log::debug!("GET {}", url);
        let response = self.client.get(url).send().await?;

        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let body = response.text().await?;

        Ok(RawResponse {
            status,
            headers,
            body,
        })
    }
}

/// In-memory transport for tests. Unknown URLs answer 404.
#[cfg(test)]
#[derive(Default)]
pub struct MockTransport {
    responses: parking_lot::Mutex<std::collections::HashMap<String, RawResponse>>,
    calls: parking_lot::Mutex<Vec<String>>,
}

#[cfg(test)]
impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_body(self, url: &str, status: u16, body: &str) -> Self {
        self.respond(url, status, HeaderMap::new(), body);
        self
    }

    pub fn with_json(self, url: &str, body: serde_json::Value) -> Self {
        self.with_body(url, 200, &body.to_string())
    }

    /// Register (or replace) the response for `url`.
    pub fn respond(&self, url: &str, status: u16, headers: HeaderMap, body: &str) {
        self.responses.lock().insert(
            url.to_string(),
            RawResponse {
                status,
                headers,
                body: body.to_string(),
            },
        );
    }

    pub fn calls(&self) -> usize {
        self.calls.lock().len()
    }

    pub fn calls_to(&self, url: &str) -> usize {
        self.calls.lock().iter().filter(|u| *u == url).count()
    }
}

#[cfg(test)]
#[async_trait]
impl Transport for MockTransport {
    async fn get(&self, url: &str) -> ApiResult<RawResponse> {
        self.calls.lock().push(url.to_string());
        Ok(self
            .responses
            .lock()
            .get(url)
            .cloned()
            .unwrap_or_else(|| RawResponse {
                status: 404,
                headers: HeaderMap::new(),
                body: r#"{"message":"Not Found"}"#.to_string(),
            }))
    }
}
