//! Page fetchers
//!
//! The pipeline never touches the network itself. A [`Fetcher`] turns a URL
//! into a [`FetchedPage`]; [`HttpFetcher`] is the built-in implementation and
//! tests or embedders can plug in their own.

mod http;

pub use http::{HttpFetcher, BODY_TIMEOUT, FIRST_BYTE_TIMEOUT};

use crate::error::FetchError;
use crate::types::FetchedPage;
use async_trait::async_trait;
use url::Url;

/// Source of pages for the high-level API
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Identifier for logging
    fn name(&self) -> &'static str;

    /// Fetch the page at `url`
    ///
    /// Implementations report the final URL after redirects in
    /// [`FetchedPage::url`]; it becomes the base for relative links.
    async fn fetch(&self, url: &Url) -> Result<FetchedPage, FetchError>;
}
