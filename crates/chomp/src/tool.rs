//! High-level Chomp API
//!
//! [`Chomp`] bundles a [`Config`] with a [`Fetcher`] so callers can go from a
//! URL or an HTML string to Markdown in one call.

use crate::client::validate_url;
use crate::config::Config;
use crate::convert::{clean, convert, is_html};
use crate::dom::Document;
use crate::error::{ChompError, ConvertError};
use crate::fetchers::{Fetcher, HttpFetcher};
use crate::types::{ChompResponse, Format};
use std::sync::Arc;
use tracing::{info, warn};
use url::Url;

/// Timeout message appended to truncated content
pub const TIMEOUT_MESSAGE: &str = "\n\n[..more content timed out...]";

/// Builder for configuring [`Chomp`]
#[derive(Default)]
pub struct ChompBuilder {
    config: Config,
    user_agent: Option<String>,
    fetcher: Option<Arc<dyn Fetcher>>,
}

impl ChompBuilder {
    /// Create a builder with the default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole configuration
    pub fn config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Keep images in the output
    pub fn retain_images(mut self, retain: bool) -> Self {
        self.config.retain_images = retain;
        self
    }

    /// Minimum characters for a token to count as a word
    pub fn min_word_length(mut self, len: usize) -> Self {
        self.config.min_word_length = len;
        self
    }

    /// Exempt a tag from noise removal
    pub fn retain_tag(mut self, tag: impl Into<String>) -> Self {
        self.config = self.config.with_retain_tag(tag);
        self
    }

    /// Keep elements mentioning a keyword
    pub fn retain_keyword(mut self, keyword: impl Into<String>) -> Self {
        self.config = self.config.with_retain_keyword(keyword);
        self
    }

    /// Separate blocks with two blank lines
    pub fn double_space(mut self, enable: bool) -> Self {
        self.config.double_space = enable;
        self
    }

    /// Minimum words for a block of inline text to survive
    pub fn min_block_words(mut self, words: usize) -> Self {
        self.config.min_block_words = words;
        self
    }

    /// Add a class/id pattern marking noise
    pub fn noise_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.config = self.config.with_noise_pattern(pattern);
        self
    }

    /// Bound the number of nodes in a document
    pub fn max_nodes(mut self, max_nodes: usize) -> Self {
        self.config.max_nodes = max_nodes;
        self
    }

    /// Bound the nesting depth of a document
    pub fn max_depth(mut self, max_depth: usize) -> Self {
        self.config.max_depth = max_depth;
        self
    }

    /// Set custom User-Agent for the built-in HTTP fetcher
    ///
    /// Ignored when a custom fetcher is set with [`ChompBuilder::fetcher`].
    pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
        self.user_agent = Some(ua.into());
        self
    }

    /// Use a custom fetcher instead of [`HttpFetcher`]
    ///
    /// The fetcher sends its own headers, so [`ChompBuilder::user_agent`] has
    /// no effect on it.
    pub fn fetcher(mut self, fetcher: impl Fetcher + 'static) -> Self {
        self.fetcher = Some(Arc::new(fetcher));
        self
    }

    /// Build the converter
    pub fn build(self) -> Chomp {
        if let (Some(fetcher), Some(ua)) = (&self.fetcher, &self.user_agent) {
            warn!(
                fetcher = fetcher.name(),
                user_agent = %ua,
                "User-Agent ignored by custom fetcher"
            );
        }
        let fetcher = self.fetcher.unwrap_or_else(|| {
            let mut http = HttpFetcher::new();
            if let Some(ua) = self.user_agent {
                http = http.with_user_agent(ua);
            }
            Arc::new(http)
        });
        Chomp {
            config: self.config,
            fetcher,
        }
    }
}

/// Configured HTML to Markdown converter
#[derive(Clone)]
pub struct Chomp {
    config: Config,
    fetcher: Arc<dyn Fetcher>,
}

impl std::fmt::Debug for Chomp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Chomp")
            .field("config", &self.config)
            .field("fetcher", &self.fetcher.name())
            .finish()
    }
}

impl Default for Chomp {
    fn default() -> Self {
        ChompBuilder::new().build()
    }
}

impl Chomp {
    /// Create a new builder
    pub fn builder() -> ChompBuilder {
        ChompBuilder::new()
    }

    /// Active configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    fn load(&self, html: &str, base_url: Option<&Url>) -> Result<Document, ConvertError> {
        let document = Document::parse(html)?;
        Ok(match base_url {
            Some(base) => document.with_base_url(base.clone()),
            None => document,
        })
    }

    /// Convert an HTML string to Markdown
    ///
    /// `base_url` resolves relative image sources; a `<base href>` in the
    /// document is joined against it.
    pub fn convert_html(&self, html: &str, base_url: Option<&Url>) -> Result<String, ConvertError> {
        let document = self.load(html, base_url)?;
        convert(document, &self.config)
    }

    /// Clean an HTML string and serialize the result back to HTML
    pub fn clean_html(&self, html: &str, base_url: Option<&Url>) -> Result<String, ConvertError> {
        let document = self.load(html, base_url)?;
        Ok(clean(&document, &self.config)?.to_html())
    }

    /// Fetch a URL and convert it to Markdown
    ///
    /// Non-HTML bodies are returned unchanged with [`Format::Raw`]. Pages cut
    /// short by the read deadline end with [`TIMEOUT_MESSAGE`].
    pub async fn fetch_markdown(&self, url: &str) -> Result<ChompResponse, ChompError> {
        let url = validate_url(url)?;
        let page = self.fetcher.fetch(&url).await?;

        let base = Url::parse(&page.url).unwrap_or(url);
        let (format, mut content) = if is_html(&page.content_type, &page.body) {
            (Format::Markdown, self.convert_html(&page.body, Some(&base))?)
        } else {
            (Format::Raw, page.body.clone())
        };

        if page.truncated {
            content.push_str(TIMEOUT_MESSAGE);
        }

        info!(
            url = %base,
            fetcher = self.fetcher.name(),
            %format,
            bytes = page.body.len(),
            "Converted page"
        );

        Ok(ChompResponse {
            url: page.url,
            status_code: page.status_code,
            content_type: page.content_type,
            size: page.body.len() as u64,
            format,
            content,
            truncated: page.truncated.then_some(true),
        })
    }

    /// Convert a URL or an HTML string to Markdown
    ///
    /// Input starting with `http://`, `https://` or `www.` is fetched
    /// (`www.` gets an `https://` prefix). Anything else is parsed as HTML.
    pub async fn process(&self, input: &str) -> Result<String, ChompError> {
        match url_from_input(input) {
            Some(url) => Ok(self.fetch_markdown(&url).await?.content),
            None => Ok(self.convert_html(input, None)?),
        }
    }
}

/// The URL to fetch if `input` looks like one
fn url_from_input(input: &str) -> Option<String> {
    let trimmed = input.trim();
    let lower = trimmed.to_ascii_lowercase();
    if lower.starts_with("http://") || lower.starts_with("https://") {
        Some(trimmed.to_string())
    } else if lower.starts_with("www.") {
        Some(format!("https://{}", trimmed))
    } else {
        None
    }
}
