//! Error types for Chomp

use thiserror::Error;

/// Errors raised by the conversion pipeline
#[derive(Debug, Error)]
pub enum ConvertError {
    /// The parser could not produce a tree
    #[error("Failed to parse HTML: {0}")]
    Parse(String),

    /// The input tree exceeds a configured safety bound
    #[error("Resource limit exceeded: more than {limit} {what}")]
    ResourceLimit {
        /// What was counted ("nodes" or "levels of nesting")
        what: &'static str,
        /// The configured bound
        limit: usize,
    },
}

/// Errors that can occur while fetching a page
#[derive(Debug, Error)]
pub enum FetchError {
    /// URL is missing
    #[error("Missing required parameter: url")]
    MissingUrl,

    /// URL has invalid scheme
    #[error("Invalid URL: must start with http:// or https://")]
    InvalidUrlScheme,

    /// Failed to build HTTP client
    #[error("Failed to create HTTP client")]
    ClientBuildError(#[source] reqwest::Error),

    /// Request timed out waiting for first byte
    #[error("Request timed out: server did not respond in time")]
    FirstByteTimeout,

    /// Failed to connect to server
    #[error("Failed to connect to server")]
    ConnectError(#[source] reqwest::Error),

    /// Server answered with a non-success status
    #[error("Server returned HTTP status {0}")]
    HttpStatus(u16),

    /// Content type cannot be converted
    #[error("Binary content is not supported: {0}")]
    BinaryContent(String),

    /// Other request error
    #[error("Request failed: {0}")]
    RequestError(String),
}

impl FetchError {
    /// Create an error from a reqwest error
    pub fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchError::FirstByteTimeout
        } else if err.is_connect() {
            FetchError::ConnectError(err)
        } else {
            FetchError::RequestError(err.to_string())
        }
    }
}

/// Errors returned by the high-level [`Chomp`](crate::Chomp) API
#[derive(Debug, Error)]
pub enum ChompError {
    /// Fetching the page failed
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// Converting the page failed
    #[error(transparent)]
    Convert(#[from] ConvertError),
}
