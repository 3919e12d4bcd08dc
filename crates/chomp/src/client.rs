//! HTTP client entry points
//!
//! Validates the URL, then hands it to an [`HttpFetcher`]. For custom
//! fetchers use the [`Fetcher`](crate::Fetcher) trait directly.

use crate::error::FetchError;
use crate::fetchers::{Fetcher, HttpFetcher};
use crate::types::FetchedPage;
use std::time::Duration;
use url::Url;

/// Fetch options
#[derive(Debug, Clone, Default)]
pub struct FetchOptions {
    /// Custom User-Agent
    pub user_agent: Option<String>,
    /// Override for the total body read deadline
    pub body_timeout: Option<Duration>,
}

impl FetchOptions {
    /// Build an [`HttpFetcher`] from these options
    pub fn http_fetcher(&self) -> HttpFetcher {
        let mut fetcher = HttpFetcher::new();
        if let Some(ua) = &self.user_agent {
            fetcher = fetcher.with_user_agent(ua.clone());
        }
        if let Some(timeout) = self.body_timeout {
            fetcher = fetcher.with_body_timeout(timeout);
        }
        fetcher
    }
}

/// Check that `url` is a non-empty http(s) URL
pub fn validate_url(url: &str) -> Result<Url, FetchError> {
    let url = url.trim();
    if url.is_empty() {
        return Err(FetchError::MissingUrl);
    }

    let lower = url.to_ascii_lowercase();
    if !lower.starts_with("http://") && !lower.starts_with("https://") {
        return Err(FetchError::InvalidUrlScheme);
    }

    Url::parse(url).map_err(|_| FetchError::InvalidUrlScheme)
}

/// Fetch a page with the default options
pub async fn fetch_page(url: &str) -> Result<FetchedPage, FetchError> {
    fetch_page_with_options(url, &FetchOptions::default()).await
}

/// Fetch a page with custom options
pub async fn fetch_page_with_options(
    url: &str,
    options: &FetchOptions,
) -> Result<FetchedPage, FetchError> {
    let url = validate_url(url)?;
    let fetcher = options.http_fetcher();
    tracing::debug!(fetcher = fetcher.name(), url = %url, "Using fetcher");
    fetcher.fetch(&url).await
}
