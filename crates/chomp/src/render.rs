//! Markdown renderer
//!
//! Walks a cleaned [`Document`] in document order and produces one string
//! per block (heading, paragraph, list item, code block, quote, table). Blocks
//! are joined with one blank line, or two with `double_space`. Empty blocks
//! are dropped so separators never stack.

use crate::config::Config;
use crate::dom::{heading_level, is_block_tag, is_inline_tag, Document, NodeData, NodeId};
use crate::error::ConvertError;
use crate::images::image_source;
use std::cell::Cell;

/// Deepest heading level Markdown supports
pub const MAX_HEADING_LEVEL: usize = 6;

/// Render a document as Markdown
///
/// Fails only when the document exceeds the configured size or depth bounds.
pub fn render(document: &Document, config: &Config) -> Result<String, ConvertError> {
    document.check_limits(config)?;

    let mut renderer = Renderer::new(document);
    renderer.block(document.root(), 0);

    tracing::debug!(blocks = renderer.blocks.len(), "Rendered markdown");
    Ok(join_blocks(&renderer.blocks, config.double_space))
}

/// Join rendered blocks, skipping blank ones
pub fn join_blocks(blocks: &[String], double_space: bool) -> String {
    let separator = if double_space { "\n\n\n" } else { "\n\n" };
    blocks
        .iter()
        .filter(|block| !block.trim().is_empty())
        .map(|block| block.trim_end())
        .collect::<Vec<_>>()
        .join(separator)
        .trim()
        .to_string()
}

/// Collapse whitespace runs inside each line and drop blank lines
fn finish_inline(raw: &str) -> String {
    raw.split('\n')
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Append text with every whitespace character mapped to a space
fn push_text(out: &mut String, text: &str) {
    out.extend(text.chars().map(|c| if c.is_whitespace() { ' ' } else { c }));
}

/// Escape the brackets that would end a link label or image alt text
fn escape_brackets(text: &str) -> String {
    text.replace('[', "\\[").replace(']', "\\]")
}

/// Wrap `inner` in `marker`, keeping edge whitespace outside the markers
fn push_wrapped(out: &mut String, inner: &str, marker: &str) {
    let trimmed = inner.trim();
    if trimmed.is_empty() {
        out.push_str(inner);
        return;
    }
    if inner.starts_with(char::is_whitespace) {
        out.push(' ');
    }
    out.push_str(marker);
    out.push_str(trimmed);
    out.push_str(marker);
    if inner.ends_with(char::is_whitespace) {
        out.push(' ');
    }
}

struct Renderer<'a> {
    document: &'a Document,
    blocks: Vec<String>,
    in_link: Cell<bool>,
}

impl<'a> Renderer<'a> {
    fn new(document: &'a Document) -> Self {
        Self {
            document,
            blocks: Vec::new(),
            in_link: Cell::new(false),
        }
    }

    fn push_block(&mut self, block: String) {
        if !block.trim().is_empty() {
            self.blocks.push(block);
        }
    }

    fn is_inline_node(&self, id: NodeId) -> bool {
        self.document.tag(id).map_or(true, is_inline_tag)
    }

    fn block(&mut self, id: NodeId, depth: usize) {
        let document = self.document;
        let Some(tag) = document.tag(id) else {
            let mut inline = String::new();
            self.inline(id, &mut inline, false);
            self.push_block(finish_inline(&inline));
            return;
        };

        if let Some(level) = heading_level(tag) {
            let text = self.inline_content(id, true).replace('\n', " ");
            if !text.is_empty() {
                let hashes = "#".repeat(level.clamp(1, MAX_HEADING_LEVEL));
                self.push_block(format!("{} {}", hashes, text));
            }
            return;
        }

        match tag {
            "p" => {
                let text = self.inline_content(id, false);
                self.push_block(text);
            }
            "ul" | "ol" => self.list(id, depth),
            "li" => self.list_item(id, "-", depth),
            "pre" => self.code_block(id),
            "blockquote" => self.blockquote(id, depth),
            "hr" => self.push_block("---".to_string()),
            "table" => self.table(id),
            _ => self.container(id, depth),
        }
    }

    /// Render children, grouping runs of inline content into paragraphs
    fn container(&mut self, id: NodeId, depth: usize) {
        let document = self.document;
        let mut inline = String::new();
        for &child in document.children(id) {
            if self.is_inline_node(child) {
                self.inline(child, &mut inline, false);
            } else {
                self.push_block(finish_inline(&inline));
                inline.clear();
                self.block(child, depth);
            }
        }
        self.push_block(finish_inline(&inline));
    }

    fn list(&mut self, id: NodeId, depth: usize) {
        let document = self.document;
        let ordered = document.tag(id) == Some("ol");
        let mut number = document
            .attr(id, "start")
            .and_then(|s| s.trim().parse::<i64>().ok())
            .unwrap_or(1);

        for &child in document.children(id) {
            match document.tag(child) {
                Some("li") => {
                    let marker = if ordered {
                        format!("{}.", number)
                    } else {
                        "-".to_string()
                    };
                    number = number.saturating_add(1);
                    self.list_item(child, &marker, depth);
                }
                Some("ul") | Some("ol") => self.list(child, depth + 1),
                Some(_) => self.block(child, depth),
                None => {
                    let mut inline = String::new();
                    self.inline(child, &mut inline, false);
                    self.push_block(finish_inline(&inline));
                }
            }
        }
    }

    fn list_item(&mut self, id: NodeId, marker: &str, depth: usize) {
        let document = self.document;
        let mut inline = String::new();
        let mut nested = Vec::new();
        for &child in document.children(id) {
            match document.tag(child) {
                Some("ul") | Some("ol") => nested.push(child),
                _ => self.inline(child, &mut inline, false),
            }
        }

        let text = finish_inline(&inline).replace('\n', " ");
        if !text.is_empty() {
            self.push_block(format!("{}{} {}", "  ".repeat(depth), marker, text));
        }
        for list in nested {
            self.list(list, depth + 1);
        }
    }

    fn code_block(&mut self, id: NodeId) {
        let document = self.document;
        let raw = document.text_content(id);
        let code = raw.trim_matches('\n');
        if code.trim().is_empty() {
            return;
        }

        let language = document
            .descendants(id)
            .filter(|&d| document.tag(d) == Some("code"))
            .filter_map(|d| document.attr(d, "class"))
            .flat_map(str::split_whitespace)
            .find_map(|class| {
                class
                    .strip_prefix("language-")
                    .or_else(|| class.strip_prefix("lang-"))
            })
            .unwrap_or_default();
        let fence = if code.contains("```") { "~~~~" } else { "```" };

        self.push_block(format!("{fence}{language}\n{code}\n{fence}"));
    }

    fn blockquote(&mut self, id: NodeId, depth: usize) {
        let mut inner = Renderer::new(self.document);
        inner.container(id, depth);
        let body = join_blocks(&inner.blocks, false);
        if body.is_empty() {
            return;
        }

        let quoted = body
            .lines()
            .map(|line| {
                if line.is_empty() {
                    ">".to_string()
                } else {
                    format!("> {}", line)
                }
            })
            .collect::<Vec<_>>()
            .join("\n");
        self.push_block(quoted);
    }

    fn table(&mut self, id: NodeId) {
        let rows: Vec<NodeId> = self
            .document
            .descendants(id)
            .filter(|&d| self.document.tag(d) == Some("tr") && self.owning_table(d) == Some(id))
            .collect();

        let mut lines = Vec::new();
        for row in rows {
            let cells: Vec<String> = self
                .document
                .element_children(row)
                .filter(|&c| matches!(self.document.tag(c), Some("td") | Some("th")))
                .map(|c| {
                    self.inline_content(c, false)
                        .replace('\n', " ")
                        .replace('|', "\\|")
                })
                .collect();
            if cells.is_empty() {
                continue;
            }
            lines.push(format!("| {} |", cells.join(" | ")));
            if lines.len() == 1 {
                lines.push(format!("|{}|", vec![" --- "; cells.len()].join("|")));
            }
        }

        if !lines.is_empty() {
            self.push_block(lines.join("\n"));
        }
    }

    fn owning_table(&self, id: NodeId) -> Option<NodeId> {
        let mut current = self.document.parent(id);
        while let Some(node) = current {
            if self.document.tag(node) == Some("table") {
                return Some(node);
            }
            current = self.document.parent(node);
        }
        None
    }

    fn inline_content(&self, id: NodeId, in_heading: bool) -> String {
        let mut raw = String::new();
        self.inline_children(id, &mut raw, in_heading);
        finish_inline(&raw)
    }

    fn inline_children(&self, id: NodeId, out: &mut String, in_heading: bool) {
        for &child in self.document.children(id) {
            self.inline(child, out, in_heading);
        }
    }

    fn inline(&self, id: NodeId, out: &mut String, in_heading: bool) {
        let el = match self.document.data(id) {
            NodeData::Text(text) => {
                if self.in_link.get() {
                    push_text(out, &escape_brackets(text));
                } else {
                    push_text(out, text);
                }
                return;
            }
            NodeData::Element(el) => el,
        };

        match el.name() {
            "br" => out.push('\n'),
            "img" => {
                if let Some(src) = image_source(el) {
                    let alt = el
                        .attr("alt")
                        .map(|a| {
                            escape_brackets(&a.split_whitespace().collect::<Vec<_>>().join(" "))
                        })
                        .unwrap_or_default();
                    out.push_str(&format!("![{}]({})", alt, src));
                }
            }
            "strong" | "b" => self.wrapped(id, out, "**", in_heading),
            "em" | "i" => self.wrapped(id, out, "*", in_heading),
            "del" | "s" | "strike" => self.wrapped(id, out, "~~", in_heading),
            "code" | "kbd" | "samp" | "tt" => {
                let mut code = String::new();
                push_text(&mut code, &self.document.text_content(id));
                let marker = if code.contains('`') { "``" } else { "`" };
                push_wrapped(out, &code, marker);
            }
            "a" => self.link(id, out, in_heading),
            name if is_block_tag(name) => {
                out.push(' ');
                self.inline_children(id, out, in_heading);
                out.push(' ');
            }
            _ => self.inline_children(id, out, in_heading),
        }
    }

    fn wrapped(&self, id: NodeId, out: &mut String, marker: &str, in_heading: bool) {
        let mut inner = String::new();
        self.inline_children(id, &mut inner, in_heading);
        push_wrapped(out, &inner, marker);
    }

    fn link(&self, id: NodeId, out: &mut String, in_heading: bool) {
        let mut inner = String::new();
        let outer = self.in_link.replace(true);
        self.inline_children(id, &mut inner, in_heading);
        self.in_link.set(outer);

        let href = self
            .document
            .attr(id, "href")
            .map(str::trim)
            .filter(|href| !href.is_empty() && !href.to_ascii_lowercase().starts_with("javascript:"));
        let Some(href) = href.filter(|_| !in_heading) else {
            out.push_str(&inner);
            return;
        };

        let text = inner.split_whitespace().collect::<Vec<_>>().join(" ");
        if text.is_empty() {
            return;
        }
        if inner.starts_with(char::is_whitespace) {
            out.push(' ');
        }
        if href.contains(char::is_whitespace) {
            out.push_str(&format!("[{}](<{}>)", text, href));
        } else {
            out.push_str(&format!("[{}]({})", text, href));
        }
        if inner.ends_with(char::is_whitespace) {
            out.push(' ');
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::TreeNode;

    fn md(html: &str) -> String {
        md_with(html, &Config::default())
    }

    fn md_with(html: &str, config: &Config) -> String {
        render(&Document::parse(html).unwrap(), config).unwrap()
    }

    #[test]
    fn test_heading_and_paragraph() {
        let html = "<div><h1>Hello World</h1><p>This is a test paragraph with <strong>bold text</strong>.</p></div>";
        assert_eq!(
            md(html),
            "# Hello World\n\nThis is a test paragraph with **bold text**."
        );
    }

    #[test]
    fn test_heading_levels_are_not_renumbered() {
        assert_eq!(md("<h1>Top</h1><h3>Deeper</h3>"), "# Top\n\n### Deeper");
    }

    #[test]
    fn test_heading_level_is_clamped() {
        let tree = TreeNode::element("div")
            .child(TreeNode::element("h8").child(TreeNode::text("Deep")))
            .child(TreeNode::element("h6").child(TreeNode::text("Six")));
        let doc = Document::from_tree(tree).unwrap();
        assert_eq!(
            render(&doc, &Config::default()).unwrap(),
            "###### Deep\n\n###### Six"
        );
    }

    #[test]
    fn test_links_in_headings_render_as_text() {
        assert_eq!(md(r#"<h2><a href="/x">Section</a></h2>"#), "## Section");
    }

    #[test]
    fn test_spacing() {
        let html = "<p>One</p><p>Two</p><p>Three</p>";
        assert_eq!(md(html), "One\n\nTwo\n\nThree");
        assert_eq!(
            md_with(html, &Config::default().with_double_space(true)),
            "One\n\n\nTwo\n\n\nThree"
        );
    }

    #[test]
    fn test_empty_blocks_do_not_stack() {
        let html = "<p>One</p><p>  </p><div><p></p></div><hr><p>Two</p>";
        assert_eq!(
            md_with(html, &Config::default().with_double_space(true)),
            "One\n\n\n---\n\n\nTwo"
        );
    }

    #[test]
    fn test_inline_formatting() {
        let html = r#"<p>An <em>emphasized</em>, <b> strong </b>, <code>x < y</code> and <del>gone</del> word.</p>"#;
        assert_eq!(
            md(html),
            "An *emphasized*, **strong** , `x < y` and ~~gone~~ word."
        );
    }

    #[test]
    fn test_links_are_emitted_as_is() {
        let html = r#"<p>See <a href="/docs/page">the docs</a> or <a href="javascript:void(0)">this</a> or <a>that</a>.</p>"#;
        assert_eq!(md(html), "See [the docs](/docs/page) or this or that.");
    }

    #[test]
    fn test_brackets_in_link_text_and_alt_are_escaped() {
        let html = r#"<p>See <a href="x">a]b [c]</a> and <img src="https://ex.com/a.png" alt="[fig] 1"> [1]</p>"#;
        assert_eq!(
            md(html),
            r"See [a\]b \[c\]](x) and ![\[fig\] 1](https://ex.com/a.png) [1]"
        );
    }

    #[test]
    fn test_image_inside_link_keeps_its_syntax() {
        let html = r#"<p><a href="/full.png"><img src="https://ex.com/t.png" alt="thumb"></a></p>"#;
        assert_eq!(md(html), "[![thumb](https://ex.com/t.png)](/full.png)");
    }

    #[test]
    fn test_images() {
        let html = r#"<p><img src="https://ex.com/a.png" alt="A   cat"> <img src="https://ex.com/b.png"></p>"#;
        assert_eq!(
            md(html),
            "![A cat](https://ex.com/a.png) ![](https://ex.com/b.png)"
        );
    }

    #[test]
    fn test_lists() {
        let html = r#"
            <ul><li>Apples</li><li>Pears<ul><li>Conference</li></ul></li></ul>
            <ol start="3"><li>Third</li><li><p>Fourth</p></li></ol>
        "#;
        assert_eq!(
            md(html),
            "- Apples\n\n- Pears\n\n  - Conference\n\n3. Third\n\n4. Fourth"
        );
    }

    #[test]
    fn test_huge_list_start_does_not_overflow() {
        let html = r#"<ol start="9223372036854775807"><li>One</li><li>Two</li><li>Three</li></ol>"#;
        assert_eq!(
            md(html),
            "9223372036854775807. One\n\n9223372036854775807. Two\n\n9223372036854775807. Three"
        );
    }

    #[test]
    fn test_code_block() {
        let html = "<pre><code class=\"language-rust\">fn main() {\n    println!(\"hi\");\n}</code></pre>";
        assert_eq!(
            md(html),
            "```rust\nfn main() {\n    println!(\"hi\");\n}\n```"
        );
    }

    #[test]
    fn test_blockquote() {
        let html = "<blockquote><p>Quoted one</p><p>Quoted two</p></blockquote>";
        assert_eq!(md(html), "> Quoted one\n>\n> Quoted two");
    }

    #[test]
    fn test_table() {
        let html = "<table><tr><th>Name</th><th>Age</th></tr><tr><td>Ann</td><td>3|4</td></tr></table>";
        assert_eq!(
            md(html),
            "| Name | Age |\n| --- | --- |\n| Ann | 3\\|4 |"
        );
    }

    #[test]
    fn test_loose_inline_content_becomes_paragraphs() {
        let html = "<div>Intro text <span>here</span><p>Para</p>Outro<br>line two</div>";
        assert_eq!(md(html), "Intro text here\n\nPara\n\nOutro\nline two");
    }

    #[test]
    fn test_empty_document() {
        let doc = Document::new("body");
        assert_eq!(render(&doc, &Config::default()).unwrap(), "");
    }

    #[test]
    fn test_render_respects_limits() {
        let doc = Document::parse("<div><div><p>deep</p></div></div>").unwrap();
        let result = render(&doc, &Config::default().with_max_depth(2));
        assert!(matches!(result, Err(ConvertError::ResourceLimit { .. })));
    }

    #[test]
    fn test_join_blocks() {
        let blocks = vec![
            "a".to_string(),
            "   ".to_string(),
            "b  ".to_string(),
            String::new(),
        ];
        assert_eq!(join_blocks(&blocks, false), "a\n\nb");
        assert_eq!(join_blocks(&blocks, true), "a\n\n\nb");
    }
}
