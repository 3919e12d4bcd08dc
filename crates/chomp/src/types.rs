//! Core types for Chomp

use serde::{Deserialize, Serialize};

/// A page as returned by a [`Fetcher`](crate::Fetcher)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchedPage {
    /// Final URL after redirects
    pub url: String,

    /// HTTP status code
    pub status_code: u16,

    /// Content-Type header value
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,

    /// Decoded body text
    pub body: String,

    /// True if the body was cut short by the read deadline
    #[serde(default)]
    pub truncated: bool,
}

/// Content format of a [`ChompResponse`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    /// HTML converted to Markdown
    #[default]
    Markdown,
    /// Non-HTML body passed through unchanged
    Raw,
}

impl std::fmt::Display for Format {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Format::Markdown => write!(f, "markdown"),
            Format::Raw => write!(f, "raw"),
        }
    }
}

/// Result of fetching and converting a URL
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChompResponse {
    /// The fetched URL (after redirects)
    pub url: String,

    /// HTTP status code
    pub status_code: u16,

    /// Content-Type header value
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,

    /// Size of the fetched body in bytes
    pub size: u64,

    /// Content format
    pub format: Format,

    /// The converted content
    pub content: String,

    /// True if content was truncated due to timeout
    #[serde(skip_serializing_if = "Option::is_none")]
    pub truncated: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_display() {
        assert_eq!(Format::Markdown.to_string(), "markdown");
        assert_eq!(Format::Raw.to_string(), "raw");
    }

    #[test]
    fn test_response_serialization() {
        let resp = ChompResponse {
            url: "https://example.com".to_string(),
            status_code: 200,
            content: "Hello".to_string(),
            ..Default::default()
        };
        let json = serde_json::to_string(&resp).unwrap();
        // Optional None fields should be omitted
        assert!(!json.contains("content_type"));
        assert!(!json.contains("truncated"));
        assert!(json.contains("\"format\":\"markdown\""));
        assert!(json.contains("\"content\":\"Hello\""));
    }

    #[test]
    fn test_fetched_page_deserialization() {
        let page: FetchedPage = serde_json::from_str(
            r#"{"url": "https://example.com/", "status_code": 200, "body": "<p>x</p>"}"#,
        )
        .unwrap();
        assert_eq!(page.url, "https://example.com/");
        assert!(page.content_type.is_none());
        assert!(!page.truncated);
    }
}
