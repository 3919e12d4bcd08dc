//! Block and image deduplication
//!
//! Pages repeat themselves: teaser paragraphs reappear in the body, the same
//! hero image shows up in the header and the article. The first occurrence in
//! document order wins; later copies are removed.

use crate::dom::{is_block_tag, Document, NodeId};
use crate::images::{image_source, resolve_url};
use std::collections::HashSet;
use tracing::debug;

/// Table cells repeat by nature; removing one would shift its row
const TABLE_CELL_TAGS: &[&str] = &["td", "th"];

/// Whitespace-collapsed, case-folded text
pub fn fingerprint(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Block element without block-level descendants
fn is_leaf_block(document: &Document, id: NodeId) -> bool {
    let Some(tag) = document.tag(id) else {
        return false;
    };
    is_block_tag(tag)
        && !TABLE_CELL_TAGS.contains(&tag)
        && document
            .descendants(id)
            .skip(1)
            .filter_map(|d| document.tag(d))
            .all(|t| !is_block_tag(t))
}

/// Remove repeated blocks and repeated images
///
/// Only leaf blocks are fingerprinted, so a container never collides with the
/// single paragraph it wraps. Table cells are never fingerprinted. Images are compared by source, resolved against
/// the document's base URL when possible.
pub fn deduplicate(document: &Document) -> Document {
    let mut keep = vec![true; document.len()];
    let mut seen_blocks = HashSet::new();
    let mut seen_images = HashSet::new();
    let mut removed_blocks = 0;
    let mut removed_images = 0;

    let mut stack = vec![document.root()];
    while let Some(id) = stack.pop() {
        if id != document.root() {
            if document.tag(id) == Some("img") {
                if let Some(src) = document.element(id).and_then(image_source) {
                    let key = resolve_url(document.base_url(), src)
                        .unwrap_or_else(|| src.to_string());
                    if !seen_images.insert(key) {
                        keep[id.index()] = false;
                        removed_images += 1;
                        continue;
                    }
                }
            } else if is_leaf_block(document, id) {
                let key = fingerprint(&document.text_content(id));
                if !key.is_empty() && !seen_blocks.insert(key) {
                    keep[id.index()] = false;
                    removed_blocks += 1;
                    continue;
                }
            }
        }
        stack.extend(document.children(id).iter().rev().copied());
    }

    debug!(removed_blocks, removed_images, "Deduplication finished");

    if removed_blocks == 0 && removed_images == 0 {
        return document.clone();
    }
    document.prune(&keep)
}

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;

    #[test]
    fn test_fingerprint() {
        assert_eq!(fingerprint("  Hello \n  World  "), "hello world");
        assert_eq!(fingerprint("HELLO world"), fingerprint("hello   WORLD"));
        assert_eq!(fingerprint(" \t "), "");
    }

    #[test]
    fn test_removes_duplicate_paragraph() {
        let doc = Document::parse(
            "<p>Same text here</p><p>Other text</p><p>same   TEXT here</p>",
        )
        .unwrap();
        let out = deduplicate(&doc);
        assert_eq!(out.text_content(out.root()), "Same text hereOther text");
    }

    #[test]
    fn test_container_does_not_collide_with_child() {
        let doc = Document::parse("<div><p>Only paragraph</p></div>").unwrap();
        let out = deduplicate(&doc);
        assert_eq!(out.text_content(out.root()), "Only paragraph");
    }

    #[test]
    fn test_repeated_section_is_emptied() {
        let doc = Document::parse(
            "<section><h2>Intro</h2><p>Body text</p></section>\
             <section><h2>Intro</h2><p>Body text</p></section>",
        )
        .unwrap();
        let out = deduplicate(&doc);
        assert_eq!(out.text_content(out.root()), "IntroBody text");
    }

    #[test]
    fn test_removes_duplicate_images() {
        let doc = Document::parse(
            r#"<p><img src="a.png"> <img src="b.png"></p><p>Caption</p><img src="a.png">"#,
        )
        .unwrap();
        let out = deduplicate(&doc);
        let sources: Vec<_> = out
            .descendants(out.root())
            .filter_map(|id| out.attr(id, "src"))
            .collect();
        assert_eq!(sources, vec!["a.png", "b.png"]);
    }

    #[test]
    fn test_image_fingerprint_uses_base_url() {
        let doc = Document::parse(
            r#"<p><img src="img/a.png"></p><p>Text</p><p><img src="https://ex.com/blog/img/a.png"></p>"#,
        )
        .unwrap()
        .with_base_url(Url::parse("https://ex.com/blog/").unwrap());
        let out = deduplicate(&doc);
        let images = out
            .descendants(out.root())
            .filter(|&id| out.tag(id) == Some("img"))
            .count();
        assert_eq!(images, 1);
    }

    #[test]
    fn test_empty_blocks_never_collide() {
        let doc = Document::parse(r#"<p><img src="a.png"></p><p><img src="b.png"></p>"#).unwrap();
        let out = deduplicate(&doc);
        let images = out
            .descendants(out.root())
            .filter(|&id| out.tag(id) == Some("img"))
            .count();
        assert_eq!(images, 2);
    }

    #[test]
    fn test_repeated_table_cells_are_kept() {
        let html = "<table><tr><td>Apples</td><td>4</td></tr><tr><td>Pears</td><td>4</td></tr></table>";
        let doc = Document::parse(html).unwrap();
        let out = deduplicate(&doc);
        assert_eq!(out.text_content(out.root()), "Apples4Pears4");
    }
}
