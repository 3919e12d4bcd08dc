//! Noise filter
//!
//! Removes navigation, scripts, advertisement containers, hidden elements and
//! short boilerplate blocks. Runs as two passes over the indexed tree:
//!
//! 1. Top-down: mark protected elements (`retain_tags`, `retain_keywords`)
//!    and the regions that lie inside structural noise.
//! 2. Bottom-up: decide retention once every child has been decided, so an
//!    ancestor of a protected element is never dropped.
//!
//! The arena is then rebuilt from the keep marks with [`Document::prune`].

use crate::config::Config;
use crate::dom::{is_block_tag, Document, ElementData, NodeId};
use regex::Regex;
use std::sync::LazyLock;
use tracing::debug;

/// Tags that never hold article content
const NOISE_TAGS: &[&str] = &[
    "aside", "button", "canvas", "dialog", "embed", "fieldset", "footer", "form", "head",
    "iframe", "input", "label", "link", "meta", "nav", "noscript", "object", "script", "select",
    "style", "svg", "template", "textarea", "title",
];

/// ARIA landmark roles that mark page chrome
const NOISE_ROLES: &[&str] = &[
    "banner",
    "complementary",
    "contentinfo",
    "dialog",
    "navigation",
    "search",
];

/// Elements that survive without any text of their own
const STANDALONE_TAGS: &[&str] = &["img", "br", "hr"];

/// Cells kept as long as their row is, so columns stay aligned
const TABLE_CELL_TAGS: &[&str] = &["td", "th"];

/// Class/id fragments of navigation, ads and other page chrome
static NOISE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)sidebar|footer|banner|breadcrumb|cookie|comment|widget|social|sponsor|advert|promo|popup|related|share-?bar|menu|skip-?link|(^|[^a-z])(sub)?nav(bar|igation)?([^a-z]|$)|(^|[^a-z])ads?([^a-z]|$)",
    )
    .expect("noise pattern is a valid regex")
});

/// Noise heuristics bound to one configuration
pub(crate) struct NoiseRules<'a> {
    config: &'a Config,
    keywords: Vec<String>,
    extra_patterns: Vec<String>,
}

impl<'a> NoiseRules<'a> {
    pub(crate) fn new(config: &'a Config) -> Self {
        Self {
            config,
            keywords: config.keywords_lowercase(),
            extra_patterns: config
                .extra_noise_patterns
                .iter()
                .map(|p| p.trim().to_lowercase())
                .filter(|p| !p.is_empty())
                .collect(),
        }
    }

    /// Noise tag, noise role, or a class/id from the pattern table
    pub(crate) fn is_structural_noise(&self, el: &ElementData) -> bool {
        if NOISE_TAGS.contains(&el.name()) {
            return true;
        }

        if let Some(role) = el.attr("role") {
            if NOISE_ROLES.contains(&role.trim().to_ascii_lowercase().as_str()) {
                return true;
            }
        }

        let class_and_id = el.class_and_id();
        if class_and_id.is_empty() {
            return false;
        }
        if NOISE_PATTERN.is_match(&class_and_id) {
            return true;
        }
        let lowered = class_and_id.to_lowercase();
        self.extra_patterns.iter().any(|p| lowered.contains(p))
    }

    /// Explicitly hidden through attributes or inline style
    pub(crate) fn is_hidden(&self, el: &ElementData) -> bool {
        if el.attr("hidden").is_some() {
            return true;
        }
        if el
            .attr("aria-hidden")
            .is_some_and(|v| v.trim().eq_ignore_ascii_case("true"))
        {
            return true;
        }
        if let Some(style) = el.attr("style") {
            let compact: String = style
                .chars()
                .filter(|c| !c.is_whitespace())
                .collect::<String>()
                .to_ascii_lowercase();
            return compact.contains("display:none") || compact.contains("visibility:hidden");
        }
        false
    }

    /// Keyword in the element's text or in its class/id
    ///
    /// A block that is not itself chrome is judged by its inline text, the
    /// text of every descendant outside nested blocks, so a keyword in a
    /// `<strong>` protects the whole paragraph. Chrome containers and inline
    /// elements are judged by their direct text nodes only.
    pub(crate) fn matches_keyword(
        &self,
        document: &Document,
        id: NodeId,
        el: &ElementData,
    ) -> bool {
        if self.keywords.is_empty() {
            return false;
        }

        let text = if is_block_tag(el.name()) && !self.is_structural_noise(el) {
            inline_text(document, id)
        } else {
            document
                .children(id)
                .iter()
                .filter_map(|&child| document.text(child))
                .collect::<String>()
        }
        .to_lowercase();
        let class_and_id = el.class_and_id().to_lowercase();

        self.keywords
            .iter()
            .any(|k| text.contains(k) || class_and_id.contains(k))
    }

    fn is_protected(&self, document: &Document, id: NodeId, el: &ElementData) -> bool {
        self.config.retains_tag(el.name()) || self.matches_keyword(document, id, el)
    }
}

/// Text of `id` without the text of nested block descendants
fn inline_text(document: &Document, id: NodeId) -> String {
    let mut text = String::new();
    let mut stack: Vec<NodeId> = document.children(id).iter().rev().copied().collect();
    while let Some(node) = stack.pop() {
        match document.tag(node) {
            Some(tag) if is_block_tag(tag) => {}
            Some(_) => stack.extend(document.children(node).iter().rev().copied()),
            None => text.push_str(document.text(node).unwrap_or_default()),
        }
    }
    text
}

/// Remove non-content elements, preserving document order
///
/// Never fails. An empty document is a valid result.
pub fn filter_noise(document: &Document, config: &Config) -> Document {
    let rules = NoiseRules::new(config);
    let root = document.root();
    let order: Vec<NodeId> = document.descendants(root).collect();
    let len = document.len();

    // Pass 1: protection and noise regions, parents before children
    let mut protected = vec![false; len];
    let mut noisy = vec![false; len];
    for &id in &order {
        let i = id.index();
        let inherited = document.parent(id).is_some_and(|p| noisy[p.index()]);
        let Some(el) = document.element(id) else {
            noisy[i] = inherited;
            continue;
        };

        protected[i] = rules.is_protected(document, id, el);
        let is_noise =
            id != root && (rules.is_structural_noise(el) || rules.is_hidden(el));
        noisy[i] = !protected[i] && (inherited || is_noise);
    }

    // Pass 2: retention, children before parents
    let mut keep = vec![false; len];
    let mut words = vec![0usize; len];
    let mut carries = vec![false; len];
    let mut visible = vec![false; len];
    for &id in order.iter().rev() {
        let i = id.index();
        let Some(el) = document.element(id) else {
            if !noisy[i] {
                let text = document.text(id).unwrap_or_default();
                keep[i] = true;
                words[i] = config.count_words(text);
                visible[i] = !text.trim().is_empty();
            }
            continue;
        };

        let mut inline_words = 0;
        let mut has_content_child = false;
        let mut has_element_child = false;
        let mut has_visible_child = false;
        for &child in document.children(id) {
            let c = child.index();
            if !keep[c] {
                continue;
            }
            has_visible_child |= visible[c];
            match document.tag(child) {
                Some(tag) => {
                    has_element_child = true;
                    if is_block_tag(tag) {
                        has_content_child = true;
                    } else {
                        inline_words += words[c];
                        has_content_child |= carries[c];
                    }
                }
                None => inline_words += words[c],
            }
        }

        let name = el.name();
        let kept = if protected[i] || id == root {
            true
        } else if noisy[i] {
            has_element_child
        } else if STANDALONE_TAGS.contains(&name) || TABLE_CELL_TAGS.contains(&name) {
            true
        } else if name == "tr" {
            has_visible_child
        } else if is_block_tag(name) {
            has_content_child || inline_words >= config.min_block_words
        } else {
            // Inline runs belong to the enclosing block's word count
            has_content_child || has_visible_child
        };

        if kept {
            keep[i] = true;
            words[i] = inline_words;
            carries[i] = name == "img" || has_content_child;
            visible[i] = name == "img" || has_visible_child;
        }
    }

    let removed = order.iter().filter(|id| !keep[id.index()]).count();
    debug!(
        nodes = len,
        removed,
        protected = protected.iter().filter(|&&p| p).count(),
        "Noise filter finished"
    );

    document.prune(&keep)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filtered_text(html: &str, config: &Config) -> String {
        let doc = Document::parse(html).unwrap();
        let out = filter_noise(&doc, config);
        out.text_content(out.root())
    }

    #[test]
    fn test_removes_structural_noise_tags() {
        let html = r#"
            <nav><a href="/">Home</a></nav>
            <script>var tracking = true;</script>
            <style>p { color: red; }</style>
            <article><p>The actual article text.</p></article>
            <footer>Copyright 2024</footer>
        "#;
        let text = filtered_text(html, &Config::default());
        assert!(text.contains("The actual article text."));
        assert!(!text.contains("Home"));
        assert!(!text.contains("tracking"));
        assert!(!text.contains("color"));
        assert!(!text.contains("Copyright"));
    }

    #[test]
    fn test_removes_noise_classes() {
        let html = r#"
            <div class="sidebar-nav"><a href="/">Home</a></div>
            <div id="top-ad">Buy now</div>
            <div class="header-title"><p>Kept heading area</p></div>
            <p>Content here</p>
        "#;
        let text = filtered_text(html, &Config::default());
        assert!(!text.contains("Home"));
        assert!(!text.contains("Buy now"));
        assert!(text.contains("Kept heading area"));
        assert!(text.contains("Content here"));
    }

    #[test]
    fn test_ad_pattern_needs_token_boundary() {
        let rules_config = Config::default();
        let rules = NoiseRules::new(&rules_config);
        let doc = Document::from_tree(
            crate::dom::TreeNode::element("div")
                .child(crate::dom::TreeNode::element("div").attr("class", "ad-slot"))
                .child(crate::dom::TreeNode::element("div").attr("class", "shadow loading"))
                .child(crate::dom::TreeNode::element("div").attr("class", "unavailable"))
                .child(crate::dom::TreeNode::element("div").attr("class", "main-navigation")),
        )
        .unwrap();
        let verdicts: Vec<bool> = doc
            .element_children(doc.root())
            .map(|id| rules.is_structural_noise(doc.element(id).unwrap()))
            .collect();
        assert_eq!(verdicts, vec![true, false, false, true]);
    }

    #[test]
    fn test_retain_tags_protects_noise() {
        let html = r#"<div class="sidebar-nav"><a href="/">Home</a></div><p>Content here</p>"#;
        let text = filtered_text(html, &Config::default().with_retain_tag("div"));
        assert!(text.contains("Home"));
        assert!(text.contains("Content here"));
    }

    #[test]
    fn test_removes_hidden_elements() {
        let html = r#"
            <p style="display: none">Invisible one</p>
            <p hidden>Invisible two</p>
            <div aria-hidden="true">Invisible three</div>
            <p style="Visibility : Hidden">Invisible four</p>
            <p>Visible</p>
        "#;
        let text = filtered_text(html, &Config::default());
        assert!(!text.contains("Invisible"));
        assert!(text.contains("Visible"));
    }

    #[test]
    fn test_removes_short_boilerplate() {
        let html = "<div><p>   </p><p>a an</p><p>Real paragraph text</p></div>";

        let doc = Document::parse(html).unwrap();
        let out = filter_noise(&doc, &Config::default());
        let paragraphs = out
            .descendants(out.root())
            .filter(|&id| out.tag(id) == Some("p"))
            .count();
        assert_eq!(paragraphs, 2);

        let config = Config::default().with_min_word_length(3);
        let text = filtered_text(html, &config);
        assert!(!text.contains("a an"));
        assert!(text.contains("Real paragraph text"));
    }

    #[test]
    fn test_min_word_length_keeps_short_inline_runs() {
        let html = "<p>Release <code>v1</code> ships <b>on</b> Monday morning</p>";
        let text = filtered_text(html, &Config::default().with_min_word_length(3));
        assert_eq!(text, "Release v1 ships on Monday morning");
    }

    #[test]
    fn test_min_word_length_keeps_table_columns() {
        let html = "<table><tr><th>Name</th><th>Qty</th></tr><tr><td>Apples</td><td>4</td></tr><tr><td></td><td> </td></tr></table>";
        let doc = Document::parse(html).unwrap();
        let out = filter_noise(&doc, &Config::default().with_min_word_length(3));

        let count = |tag: &str| {
            out.descendants(out.root())
                .filter(|&id| out.tag(id) == Some(tag))
                .count()
        };
        assert_eq!(count("tr"), 2);
        assert_eq!(count("th"), 2);
        assert_eq!(count("td"), 2);
        assert_eq!(out.text_content(out.root()), "NameQtyApples4");
    }

    #[test]
    fn test_min_block_words_threshold() {
        let html = "<p>Two words</p><p>Now there are four</p>";
        let text = filtered_text(html, &Config::default().with_min_block_words(3));
        assert!(!text.contains("Two words"));
        assert!(text.contains("Now there are four"));
    }

    #[test]
    fn test_keyword_keeps_element_inside_noise() {
        let html = r#"<nav><a href="/">Home</a><a href="/rust">Rust news</a></nav><p>Body</p>"#;
        let text = filtered_text(html, &Config::default().with_retain_keyword("RUST"));
        assert!(text.contains("Rust news"));
        assert!(!text.contains("Home"));
        assert!(text.contains("Body"));
    }

    #[test]
    fn test_keyword_in_inline_child_keeps_whole_paragraph() {
        let html = r#"<div class="sidebar"><p><strong>Rust</strong> tips and tricks for everyone</p><p>Unrelated promo</p></div>"#;
        let text = filtered_text(html, &Config::default().with_retain_keyword("rust"));
        assert_eq!(text, "Rust tips and tricks for everyone");
    }

    #[test]
    fn test_keyword_in_nested_block_does_not_protect_container() {
        let rules_config = Config::default().with_retain_keyword("rust");
        let rules = NoiseRules::new(&rules_config);
        let doc = Document::parse("<div>Intro <em>text</em><p>All about Rust</p></div>").unwrap();
        let div = doc.element_children(doc.root()).next().unwrap();
        let p = doc.element_children(div).next().unwrap();

        assert_eq!(inline_text(&doc, div), "Intro text");
        assert!(!rules.matches_keyword(&doc, div, doc.element(div).unwrap()));
        assert!(rules.matches_keyword(&doc, p, doc.element(p).unwrap()));
    }

    #[test]
    fn test_keyword_in_class_protects() {
        let html = r#"<aside class="rust-callout"><p>Note</p></aside>"#;
        let text = filtered_text(html, &Config::default().with_retain_keyword("rust"));
        assert_eq!(text, "Note");
    }

    #[test]
    fn test_retained_descendant_keeps_ancestor() {
        let html = "<footer><p>Copyright notice</p><span>Links</span></footer>";
        let doc = Document::parse(html).unwrap();
        let out = filter_noise(&doc, &Config::default().with_retain_tag("p"));
        let tags: Vec<_> = out
            .descendants(out.root())
            .filter_map(|id| out.tag(id))
            .collect();
        assert_eq!(tags, vec!["body", "footer", "p"]);
        assert_eq!(out.text_content(out.root()), "Copyright notice");
    }

    #[test]
    fn test_extra_noise_patterns() {
        let html = r#"<div class="newsletter-box"><p>Subscribe today</p></div><p>Story</p>"#;
        let text = filtered_text(html, &Config::default());
        assert!(text.contains("Subscribe today"));

        let text = filtered_text(html, &Config::default().with_noise_pattern("Newsletter"));
        assert!(!text.contains("Subscribe today"));
        assert!(text.contains("Story"));
    }

    #[test]
    fn test_images_survive_without_text() {
        let html = r#"<figure><img src="a.png"></figure><div><br></div>"#;
        let doc = Document::parse(html).unwrap();
        let out = filter_noise(&doc, &Config::default());
        let tags: Vec<_> = out
            .descendants(out.root())
            .filter_map(|id| out.tag(id))
            .collect();
        assert_eq!(tags, vec!["body", "figure", "img"]);
    }

    #[test]
    fn test_all_noise_gives_empty_document() {
        let doc = Document::parse("<nav><a href='/'>Home</a></nav><script>x()</script>").unwrap();
        let out = filter_noise(&doc, &Config::default());
        assert!(out.is_empty());
    }

    #[test]
    fn test_preserves_order() {
        let html = "<p>First</p><nav>Menu</nav><p>Second</p><p>Third</p>";
        let text = filtered_text(html, &Config::default());
        assert_eq!(text, "FirstSecondThird");
    }
}
