//! Content selector
//!
//! Leftover chrome that the noise filter did not recognize (a "recent posts"
//! box, a signup panel) usually sits next to the article as a sibling
//! container. The selector scores sibling containers near the top of the tree
//! and drops those that score far below the best one.

use crate::config::Config;
use crate::dom::{heading_level, Document, NodeId};
use tracing::debug;

/// Tags that compete as candidate regions
const CONTAINER_TAGS: &[&str] = &[
    "article", "center", "div", "header", "main", "section", "table",
];

/// Block tags that indicate prose
const CONTENT_TAGS: &[&str] = &["blockquote", "li", "p", "pre"];

/// Share of the best score a candidate needs to be kept
const RELATIVE_THRESHOLD: f64 = 0.25;

/// A candidate region and its relevance score
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContentBlock {
    /// Root of the candidate subtree
    pub node: NodeId,
    /// Higher means more likely primary content
    pub score: f64,
    /// Distinct `retain_keywords` found in the region's text or class/id
    pub keyword_hits: usize,
}

/// Find the level where candidate containers sit
///
/// Single-child wrappers (`<div id="page"><div id="wrap">...`) are skipped.
fn candidate_parent(document: &Document) -> NodeId {
    let mut current = document.root();
    loop {
        let mut elements = document.element_children(current);
        let (Some(only), None) = (elements.next(), elements.next()) else {
            return current;
        };
        let has_loose_text = document
            .children(current)
            .iter()
            .filter_map(|&c| document.text(c))
            .any(|t| !t.trim().is_empty());
        if has_loose_text {
            return current;
        }
        current = only;
    }
}

/// Score one candidate subtree
pub fn score_block(document: &Document, node: NodeId, config: &Config) -> ContentBlock {
    let mut words = 0usize;
    let mut elements = 0usize;
    let mut content_elements = 0usize;
    let mut class_and_ids = String::new();

    for id in document.descendants(node) {
        if let Some(text) = document.text(id) {
            words += config.count_words(text);
            continue;
        }
        let Some(el) = document.element(id) else {
            continue;
        };
        elements += 1;
        if CONTENT_TAGS.contains(&el.name()) || heading_level(el.name()).is_some() {
            content_elements += 1;
        }
        class_and_ids.push(' ');
        class_and_ids.push_str(&el.class_and_id());
    }

    let density = if elements == 0 {
        0.0
    } else {
        content_elements as f64 / elements as f64
    };

    let keywords = config.keywords_lowercase();
    let keyword_hits = if keywords.is_empty() {
        0
    } else {
        let haystack = format!("{} {}", document.text_content(node), class_and_ids).to_lowercase();
        keywords.iter().filter(|k| haystack.contains(k.as_str())).count()
    };

    ContentBlock {
        node,
        score: words as f64 * (1.0 + density),
        keyword_hits,
    }
}

/// Score the candidate containers of a document, in document order
pub fn score_candidates(document: &Document, config: &Config) -> Vec<ContentBlock> {
    let parent = candidate_parent(document);
    document
        .element_children(parent)
        .filter(|&id| {
            document
                .tag(id)
                .is_some_and(|tag| CONTAINER_TAGS.contains(&tag))
        })
        .map(|id| score_block(document, id, config))
        .collect()
}

/// Keep the candidate regions that score close to the best one
///
/// Everything that is not a candidate container (headings, paragraphs, lists,
/// loose text) is kept, as are containers whose tag is in `retain_tags` and
/// containers that mention a keyword. Keywords never raise the cutoff for the
/// other regions. With fewer than two candidates, or when no candidate scores
/// above zero, the document is returned unchanged.
pub fn select_content(document: &Document, config: &Config) -> Document {
    let blocks = score_candidates(document, config);
    if blocks.len() < 2 {
        return document.clone();
    }

    // Earliest block wins ties for primary
    let Some(primary) = blocks
        .iter()
        .copied()
        .reduce(|best, block| if block.score > best.score { block } else { best })
    else {
        return document.clone();
    };
    if primary.score <= 0.0 {
        debug!(
            candidates = blocks.len(),
            "No candidate scored above threshold, keeping whole tree"
        );
        return document.clone();
    }

    let cutoff = primary.score * RELATIVE_THRESHOLD;
    let mut keep = vec![true; document.len()];
    let mut dropped = 0;
    for block in &blocks {
        let retained = document
            .tag(block.node)
            .is_some_and(|tag| config.retains_tag(tag));
        if block.score < cutoff && block.keyword_hits == 0 && !retained {
            keep[block.node.index()] = false;
            dropped += 1;
        }
    }

    debug!(
        candidates = blocks.len(),
        dropped,
        primary = primary.node.index(),
        score = primary.score,
        "Selected content regions"
    );

    document.prune(&keep)
}
