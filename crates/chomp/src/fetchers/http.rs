//! HTTP fetcher
//!
//! Downloads a page over HTTP/HTTPS with a first-byte timeout and a total
//! body deadline. A body cut short by the deadline is returned as partial
//! content with `truncated` set.

use crate::error::FetchError;
use crate::fetchers::Fetcher;
use crate::types::FetchedPage;
use crate::DEFAULT_USER_AGENT;
use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE, USER_AGENT};
use std::time::Duration;
use tracing::{debug, error, warn};
use url::Url;

/// Binary content type prefixes
const BINARY_PREFIXES: &[&str] = &[
    "image/",
    "audio/",
    "video/",
    "application/octet-stream",
    "application/pdf",
    "application/zip",
    "application/gzip",
    "application/x-tar",
    "application/x-rar",
    "application/x-7z",
    "application/vnd.ms-",
    "application/vnd.openxmlformats",
    "font/",
];

/// Accept header preferring HTML
const ACCEPT_HTML: &str = "text/html, application/xhtml+xml, text/plain;q=0.9, */*;q=0.8";

/// First-byte timeout (connect + response headers)
pub const FIRST_BYTE_TIMEOUT: Duration = Duration::from_secs(10);

/// Body timeout (total)
pub const BODY_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP/HTTPS page fetcher
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    user_agent: String,
    first_byte_timeout: Duration,
    body_timeout: Duration,
}

impl HttpFetcher {
    /// Create a fetcher with the default User-Agent and timeouts
    pub fn new() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            first_byte_timeout: FIRST_BYTE_TIMEOUT,
            body_timeout: BODY_TIMEOUT,
        }
    }

    /// Set custom User-Agent
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Set the connect and first-byte timeout
    pub fn with_first_byte_timeout(mut self, timeout: Duration) -> Self {
        self.first_byte_timeout = timeout;
        self
    }

    /// Set the total body read deadline
    pub fn with_body_timeout(mut self, timeout: Duration) -> Self {
        self.body_timeout = timeout;
        self
    }

    /// Configured User-Agent
    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    fn client(&self) -> Result<reqwest::Client, FetchError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&self.user_agent)
                .unwrap_or_else(|_| HeaderValue::from_static(DEFAULT_USER_AGENT)),
        );
        headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_HTML));

        reqwest::Client::builder()
            .default_headers(headers)
            .connect_timeout(self.first_byte_timeout)
            .build()
            .map_err(FetchError::ClientBuildError)
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn fetch(&self, url: &Url) -> Result<FetchedPage, FetchError> {
        let client = self.client()?;

        let response = tokio::time::timeout(self.first_byte_timeout, client.get(url.clone()).send())
            .await
            .map_err(|_| FetchError::FirstByteTimeout)?
            .map_err(FetchError::from_reqwest)?;

        let status_code = response.status().as_u16();
        let final_url = response.url().to_string();
        if !response.status().is_success() {
            warn!(url = %final_url, status_code, "Server returned non-success status");
            return Err(FetchError::HttpStatus(status_code));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        if let Some(ref ct) = content_type {
            if is_binary_content_type(ct) {
                return Err(FetchError::BinaryContent(ct.clone()));
            }
        }

        let (body, truncated) = read_body_with_timeout(response, self.body_timeout).await;
        debug!(
            url = %final_url,
            status_code,
            bytes = body.len(),
            truncated,
            "Fetched page"
        );

        Ok(FetchedPage {
            url: final_url,
            status_code,
            content_type,
            body: String::from_utf8_lossy(&body).into_owned(),
            truncated,
        })
    }
}

/// Check if content type indicates binary content
fn is_binary_content_type(content_type: &str) -> bool {
    let ct_lower = content_type.to_lowercase();
    BINARY_PREFIXES
        .iter()
        .any(|prefix| ct_lower.starts_with(prefix))
}

/// Read response body with timeout, returning partial content if timeout occurs
async fn read_body_with_timeout(response: reqwest::Response, timeout: Duration) -> (Bytes, bool) {
    let mut body = Vec::new();
    let mut stream = response.bytes_stream();
    let deadline = tokio::time::Instant::now() + timeout;

    loop {
        tokio::select! {
            chunk = stream.next() => {
                match chunk {
                    Some(Ok(bytes)) => body.extend_from_slice(&bytes),
                    Some(Err(e)) => {
                        error!("Error reading body chunk: {}", e);
                        let has_content = !body.is_empty();
                        return (Bytes::from(body), has_content);
                    }
                    None => return (Bytes::from(body), false),
                }
            }
            _ = tokio::time::sleep_until(deadline) => {
                warn!("Body timeout reached, returning partial content");
                return (Bytes::from(body), true);
            }
        }
    }
}
