//! HTML to Markdown pipeline
//!
//! Stages run in a fixed order over an owned tree: resource check, noise
//! filter, content selector, deduplicator, image resolver and renderer. Every
//! stage takes the previous stage's [`Document`] and returns a new one, so a
//! failed conversion leaves the caller's input untouched.

use crate::config::Config;
use crate::dedup::deduplicate;
use crate::dom::{Document, HtmlParser, ScraperParser};
use crate::error::ConvertError;
use crate::filter::filter_noise;
use crate::images::resolve_images;
use crate::render::render;
use crate::select::select_content;
use tracing::debug;

/// Input accepted by [`convert`]: raw markup or an already-built tree
#[derive(Debug, Clone)]
pub enum Input<'a> {
    /// Markup handed to the [`HtmlParser`]
    Html(&'a str),
    /// Tree built by the caller, used without parsing
    Document(Document),
}

impl<'a> From<&'a str> for Input<'a> {
    fn from(html: &'a str) -> Self {
        Input::Html(html)
    }
}

impl<'a> From<&'a String> for Input<'a> {
    fn from(html: &'a String) -> Self {
        Input::Html(html.as_str())
    }
}

impl From<Document> for Input<'_> {
    fn from(document: Document) -> Self {
        Input::Document(document)
    }
}

impl Input<'_> {
    fn into_document(self, parser: &impl HtmlParser) -> Result<Document, ConvertError> {
        match self {
            Input::Html(html) => parser.parse(html),
            Input::Document(document) => Ok(document),
        }
    }
}

/// Convert HTML (or a tree) to Markdown with the default parser
///
/// ```
/// use chomp::{convert, Config};
///
/// let html = "<div><h1>Hello World</h1><p>This is a test paragraph with <strong>bold text</strong>.</p></div>";
/// let markdown = convert(html, &Config::default()).unwrap();
/// assert_eq!(markdown, "# Hello World\n\nThis is a test paragraph with **bold text**.");
/// ```
pub fn convert<'a>(input: impl Into<Input<'a>>, config: &Config) -> Result<String, ConvertError> {
    convert_with(&ScraperParser, input, config)
}

/// Convert with a caller-supplied parser
pub fn convert_with<'a>(
    parser: &impl HtmlParser,
    input: impl Into<Input<'a>>,
    config: &Config,
) -> Result<String, ConvertError> {
    let document = input.into().into_document(parser)?;
    let cleaned = clean(&document, config)?;
    render(&cleaned, config)
}

/// Run every stage except rendering
///
/// The result can be serialized with [`Document::to_html`].
pub fn clean(document: &Document, config: &Config) -> Result<Document, ConvertError> {
    document.check_limits(config)?;

    let filtered = filter_noise(document, config);
    if filtered.is_empty() {
        debug!("Nothing survived noise filtering");
        return Ok(filtered);
    }

    let selected = select_content(&filtered, config);
    let deduped = deduplicate(&selected);
    Ok(resolve_images(&deduped, config))
}

/// Check if content is HTML based on content type and body
pub fn is_html(content_type: &Option<String>, body: &str) -> bool {
    // Check Content-Type
    if let Some(ct) = content_type {
        let ct_lower = ct.to_lowercase();
        if ct_lower.contains("text/html") || ct_lower.contains("application/xhtml") {
            return true;
        }
    }

    // Check body start
    let trimmed = body.trim_start();
    trimmed
        .get(..9)
        .is_some_and(|start| start.eq_ignore_ascii_case("<!doctype"))
        || trimmed
            .get(..5)
            .is_some_and(|start| start.eq_ignore_ascii_case("<html"))
}
