//! Chomp - HTML to clean Markdown for LLM consumption
//!
//! Chomp parses a page into an owned element tree, strips navigation, ads and
//! other chrome, keeps the regions that look like primary content, removes
//! repeated blocks and images, and renders what is left as Markdown.
//!
//! ## Pipeline
//!
//! 1. [`Document::parse`] builds the tree (the `<body>` element is the root)
//! 2. [`filter_noise`] removes structural noise and empty elements
//! 3. [`select_content`] drops sibling regions that score far below the best
//! 4. [`deduplicate`] removes repeated blocks and images
//! 5. [`resolve_images`] strips images or makes their sources absolute
//! 6. [`render`] writes Markdown
//!
//! [`convert`] runs all of them; [`clean`] stops before rendering.
//!
//! ```
//! use chomp::{convert, Config};
//!
//! let html = r#"<nav><a href="/">Home</a></nav><article><h1>Title</h1><p>Body text.</p></article>"#;
//! assert_eq!(convert(html, &Config::default()).unwrap(), "# Title\n\nBody text.");
//! ```
//!
//! ## Fetching
//!
//! [`Chomp`] adds a pluggable [`Fetcher`] so a URL can be converted in one
//! call. [`HttpFetcher`] is the built-in implementation.

pub mod client;
mod config;
mod convert;
pub mod dedup;
pub mod dom;
mod error;
pub mod fetchers;
pub mod filter;
pub mod images;
pub mod render;
pub mod select;
mod tool;
mod types;

pub use client::{fetch_page, fetch_page_with_options, validate_url, FetchOptions};
pub use config::{Config, DEFAULT_MAX_DEPTH, DEFAULT_MAX_NODES, DEFAULT_MIN_BLOCK_WORDS};
pub use convert::{clean, convert, convert_with, is_html, Input};
pub use dedup::deduplicate;
pub use dom::{Document, ElementData, HtmlParser, NodeData, NodeId, ScraperParser, TreeNode};
pub use error::{ChompError, ConvertError, FetchError};
pub use fetchers::{Fetcher, HttpFetcher};
pub use filter::filter_noise;
pub use images::resolve_images;
pub use render::render;
pub use select::{select_content, ContentBlock};
pub use tool::{Chomp, ChompBuilder, TIMEOUT_MESSAGE};
pub use types::{ChompResponse, FetchedPage, Format};

/// Default User-Agent string
pub const DEFAULT_USER_AGENT: &str = concat!("Chomp/", env!("CARGO_PKG_VERSION"));
