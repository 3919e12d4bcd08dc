//! Conversion options shared by every pipeline stage

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Default minimum number of content words a block must keep to survive
pub const DEFAULT_MIN_BLOCK_WORDS: usize = 1;

/// Default bound on the number of nodes in an input tree
pub const DEFAULT_MAX_NODES: usize = 250_000;

/// Default bound on the nesting depth of an input tree
pub const DEFAULT_MAX_DEPTH: usize = 512;

/// Options for a single conversion
///
/// Every stage reads the same `Config`; none of them mutates it. Fields left
/// out of a JSON config file fall back to their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Keep images (resolved to absolute URLs) instead of stripping them
    pub retain_images: bool,

    /// Minimum character length for a token to count as a content word
    pub min_word_length: usize,

    /// Tag names that are never removed by the noise filter
    pub retain_tags: BTreeSet<String>,

    /// Case-insensitive keywords; matching elements are always kept
    pub retain_keywords: BTreeSet<String>,

    /// Separate blocks with two blank lines instead of one
    pub double_space: bool,

    /// Minimum content words for a block to not count as boilerplate
    pub min_block_words: usize,

    /// Extra class/id substrings treated as noise
    pub extra_noise_patterns: Vec<String>,

    /// Maximum number of nodes accepted in an input tree
    pub max_nodes: usize,

    /// Maximum nesting depth accepted in an input tree
    pub max_depth: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            retain_images: false,
            min_word_length: 0,
            retain_tags: BTreeSet::new(),
            retain_keywords: BTreeSet::new(),
            double_space: false,
            min_block_words: DEFAULT_MIN_BLOCK_WORDS,
            extra_noise_patterns: Vec::new(),
            max_nodes: DEFAULT_MAX_NODES,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl Config {
    /// Parse a (possibly partial) JSON config
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Keep or strip images
    pub fn with_retain_images(mut self, retain: bool) -> Self {
        self.retain_images = retain;
        self
    }

    /// Set the minimum content word length
    pub fn with_min_word_length(mut self, len: usize) -> Self {
        self.min_word_length = len;
        self
    }

    /// Protect a tag name from the noise filter
    pub fn with_retain_tag(mut self, tag: impl Into<String>) -> Self {
        self.retain_tags.insert(tag.into().to_ascii_lowercase());
        self
    }

    /// Protect elements mentioning a keyword
    pub fn with_retain_keyword(mut self, keyword: impl Into<String>) -> Self {
        self.retain_keywords.insert(keyword.into());
        self
    }

    /// Toggle double spacing between blocks
    pub fn with_double_space(mut self, double_space: bool) -> Self {
        self.double_space = double_space;
        self
    }

    /// Set the boilerplate word threshold
    pub fn with_min_block_words(mut self, words: usize) -> Self {
        self.min_block_words = words;
        self
    }

    /// Add a class/id substring to the noise table
    pub fn with_noise_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.extra_noise_patterns.push(pattern.into());
        self
    }

    /// Bound the node count of input trees
    pub fn with_max_nodes(mut self, max_nodes: usize) -> Self {
        self.max_nodes = max_nodes;
        self
    }

    /// Bound the nesting depth of input trees
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Check whether a tag name is protected, ignoring case
    pub fn retains_tag(&self, tag: &str) -> bool {
        self.retain_tags
            .iter()
            .any(|retained| retained.eq_ignore_ascii_case(tag))
    }

    /// Keywords folded to lower case, empty ones dropped
    pub(crate) fn keywords_lowercase(&self) -> Vec<String> {
        self.retain_keywords
            .iter()
            .map(|k| k.trim().to_lowercase())
            .filter(|k| !k.is_empty())
            .collect()
    }

    /// Count tokens long enough to count as content words
    pub fn count_words(&self, text: &str) -> usize {
        text.split_whitespace()
            .filter(|word| word.chars().count() >= self.min_word_length)
            .count()
    }
}
