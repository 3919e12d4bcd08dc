//! Indexed element tree and the tree loader
//!
//! Every stage of the pipeline works on a [`Document`]: an arena of nodes
//! addressed by [`NodeId`]. Parent links are plain indices into the arena, so
//! walking upward never owns or frees anything; the `Document` is the sole
//! owner of every node.
//!
//! Raw HTML enters through an [`HtmlParser`]. The default [`ScraperParser`]
//! delegates to html5ever (via `scraper`) and copies the `<body>` subtree into
//! the arena. Callers that already have a tree hand it over as a [`TreeNode`].

use crate::config::Config;
use crate::error::ConvertError;
use scraper::{ElementRef, Html, Node as HtmlNode};
use std::collections::BTreeMap;
use url::Url;

/// Tags rendered inline (inside the surrounding paragraph)
const INLINE_TAGS: &[&str] = &[
    "a", "abbr", "b", "bdi", "bdo", "big", "br", "cite", "code", "data", "del", "dfn", "em",
    "font", "i", "img", "ins", "kbd", "mark", "picture", "q", "s", "samp", "small", "source",
    "span", "strike", "strong", "sub", "sup", "time", "tt", "u", "var", "wbr",
];

/// Elements serialized without a closing tag
const VOID_TAGS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source",
    "track", "wbr",
];

/// Check whether a tag renders inline
pub fn is_inline_tag(name: &str) -> bool {
    INLINE_TAGS.contains(&name)
}

/// Check whether a tag starts its own block
pub fn is_block_tag(name: &str) -> bool {
    !is_inline_tag(name)
}

/// Heading level for `h1`..`hN` tags
pub fn heading_level(name: &str) -> Option<usize> {
    let digits = name.strip_prefix('h')?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Index of a node inside its [`Document`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    /// Position in the arena
    pub fn index(self) -> usize {
        self.0
    }
}

/// An element: tag name plus attributes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementData {
    name: String,
    attrs: BTreeMap<String, String>,
}

impl ElementData {
    fn new<I, K, V>(name: &str, attrs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            name: name.to_ascii_lowercase(),
            attrs: attrs
                .into_iter()
                .map(|(k, v)| (k.into().to_ascii_lowercase(), v.into()))
                .collect(),
        }
    }

    /// Lower-case tag name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Attribute value by (lower-case) name
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs.get(name).map(String::as_str)
    }

    /// All attributes, sorted by name
    pub fn attrs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attrs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// `class` and `id` joined by a space, for pattern matching
    pub fn class_and_id(&self) -> String {
        let class = self.attr("class").unwrap_or_default();
        let id = self.attr("id").unwrap_or_default();
        format!("{} {}", class, id).trim().to_string()
    }
}

/// Payload of a node
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeData {
    /// An element with children
    Element(ElementData),
    /// A run of text
    Text(String),
}

#[derive(Debug, Clone)]
struct Node {
    data: NodeData,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// A normalized element tree with an optional base URL
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Node>,
    root: NodeId,
    base_url: Option<Url>,
    declared_base: Option<String>,
}

impl Document {
    /// Create a document holding a single root element
    pub fn new(root_name: &str) -> Self {
        let root = Node {
            data: NodeData::Element(ElementData::new::<_, String, String>(root_name, [])),
            parent: None,
            children: Vec::new(),
        };
        Self {
            nodes: vec![root],
            root: NodeId(0),
            base_url: None,
            declared_base: None,
        }
    }

    /// Parse raw HTML with the default parser
    pub fn parse(html: &str) -> Result<Self, ConvertError> {
        ScraperParser.parse(html)
    }

    /// Wrap an already-built tree
    pub fn from_tree(tree: TreeNode) -> Result<Self, ConvertError> {
        let TreeNode::Element {
            name,
            attrs,
            children,
        } = tree
        else {
            return Err(ConvertError::Parse(
                "tree root must be an element".to_string(),
            ));
        };

        let mut document = Document::new(&name);
        let root = document.root();
        for (key, value) in attrs {
            document.set_attr(root, &key, value);
        }

        let mut stack: Vec<(TreeNode, NodeId)> =
            children.into_iter().rev().map(|c| (c, root)).collect();
        while let Some((node, parent)) = stack.pop() {
            match node {
                TreeNode::Element {
                    name,
                    attrs,
                    children,
                } => {
                    let id = document.append_element(parent, &name, attrs);
                    stack.extend(children.into_iter().rev().map(|c| (c, id)));
                }
                TreeNode::Text(text) => {
                    document.append_text(parent, text);
                }
            }
        }

        Ok(document)
    }

    /// Set the base URL used to resolve relative image sources
    ///
    /// A `<base href>` declared by the page is resolved against `url` and
    /// takes precedence, as in a browser.
    pub fn with_base_url(mut self, url: Url) -> Self {
        let declared = self
            .declared_base
            .as_deref()
            .and_then(|href| url.join(href).ok());
        self.base_url = Some(declared.unwrap_or(url));
        self
    }

    /// Base URL for image resolution, if known
    pub fn base_url(&self) -> Option<&Url> {
        self.base_url.as_ref()
    }

    /// Root element
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Number of nodes in the arena
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True when the root has no children
    pub fn is_empty(&self) -> bool {
        self.nodes[self.root.0].children.is_empty()
    }

    /// Append an element under `parent`
    pub fn append_element<I, K, V>(&mut self, parent: NodeId, name: &str, attrs: I) -> NodeId
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.push(parent, NodeData::Element(ElementData::new(name, attrs)))
    }

    /// Append a text node under `parent`
    pub fn append_text(&mut self, parent: NodeId, text: impl Into<String>) -> NodeId {
        self.push(parent, NodeData::Text(text.into()))
    }

    fn push(&mut self, parent: NodeId, data: NodeData) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            data,
            parent: Some(parent),
            children: Vec::new(),
        });
        self.nodes[parent.0].children.push(id);
        id
    }

    /// Set an attribute on an element; text nodes are left alone
    pub fn set_attr(&mut self, id: NodeId, name: &str, value: impl Into<String>) {
        if let NodeData::Element(el) = &mut self.nodes[id.0].data {
            el.attrs.insert(name.to_ascii_lowercase(), value.into());
        }
    }

    /// Node payload
    pub fn data(&self, id: NodeId) -> &NodeData {
        &self.nodes[id.0].data
    }

    /// Element payload, `None` for text nodes
    pub fn element(&self, id: NodeId) -> Option<&ElementData> {
        match &self.nodes[id.0].data {
            NodeData::Element(el) => Some(el),
            NodeData::Text(_) => None,
        }
    }

    /// Text payload, `None` for elements
    pub fn text(&self, id: NodeId) -> Option<&str> {
        match &self.nodes[id.0].data {
            NodeData::Text(text) => Some(text),
            NodeData::Element(_) => None,
        }
    }

    /// Tag name, `None` for text nodes
    pub fn tag(&self, id: NodeId) -> Option<&str> {
        self.element(id).map(ElementData::name)
    }

    /// Attribute of an element
    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        self.element(id).and_then(|el| el.attr(name))
    }

    /// Parent of a node; `None` for the root
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    /// Children in document order
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    /// Element children in document order
    pub fn element_children(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.children(id)
            .iter()
            .copied()
            .filter(move |&child| self.element(child).is_some())
    }

    /// `id` and everything below it, in document order
    pub fn descendants(&self, id: NodeId) -> Descendants<'_> {
        Descendants {
            document: self,
            stack: vec![id],
        }
    }

    /// Concatenated text of a subtree
    pub fn text_content(&self, id: NodeId) -> String {
        self.descendants(id)
            .filter_map(|node| self.text(node))
            .collect()
    }

    /// Fail when the tree is larger or deeper than the configured bounds
    pub fn check_limits(&self, config: &Config) -> Result<(), ConvertError> {
        if self.nodes.len() > config.max_nodes {
            return Err(ConvertError::ResourceLimit {
                what: "nodes",
                limit: config.max_nodes,
            });
        }

        let mut stack = vec![(self.root, 1usize)];
        while let Some((id, depth)) = stack.pop() {
            if depth > config.max_depth {
                return Err(ConvertError::ResourceLimit {
                    what: "levels of nesting",
                    limit: config.max_depth,
                });
            }
            stack.extend(self.children(id).iter().map(|&c| (c, depth + 1)));
        }

        Ok(())
    }

    /// Copy the tree, dropping every node whose `keep` mark is false
    ///
    /// A dropped node takes its whole subtree with it. The root is always
    /// copied. Nodes missing from `keep` are kept.
    pub fn prune(&self, keep: &[bool]) -> Document {
        let root = &self.nodes[self.root.0];
        let mut out = Document {
            nodes: Vec::with_capacity(self.nodes.len()),
            root: NodeId(0),
            base_url: self.base_url.clone(),
            declared_base: self.declared_base.clone(),
        };
        out.nodes.push(Node {
            data: root.data.clone(),
            parent: None,
            children: Vec::new(),
        });

        let mut stack: Vec<(NodeId, NodeId)> = root
            .children
            .iter()
            .rev()
            .map(|&c| (c, out.root))
            .collect();
        while let Some((old, new_parent)) = stack.pop() {
            if !keep.get(old.0).copied().unwrap_or(true) {
                continue;
            }
            let new_id = out.push(new_parent, self.nodes[old.0].data.clone());
            stack.extend(self.children(old).iter().rev().map(|&c| (c, new_id)));
        }

        out
    }

    /// Serialize the tree back to HTML
    pub fn to_html(&self) -> String {
        enum Step {
            Open(NodeId),
            Close(NodeId),
        }

        let mut html = String::new();
        let mut steps = vec![Step::Open(self.root)];
        while let Some(step) = steps.pop() {
            match step {
                Step::Open(id) => match self.data(id) {
                    NodeData::Text(text) => html.push_str(&escape_html(text, false)),
                    NodeData::Element(el) => {
                        html.push('<');
                        html.push_str(el.name());
                        for (key, value) in el.attrs() {
                            html.push_str(&format!(" {}=\"{}\"", key, escape_html(value, true)));
                        }
                        html.push('>');
                        if VOID_TAGS.contains(&el.name()) {
                            continue;
                        }
                        steps.push(Step::Close(id));
                        steps.extend(self.children(id).iter().rev().map(|&c| Step::Open(c)));
                    }
                },
                Step::Close(id) => {
                    if let Some(name) = self.tag(id) {
                        html.push_str("</");
                        html.push_str(name);
                        html.push('>');
                    }
                }
            }
        }

        html
    }
}

fn escape_html(text: &str, in_attribute: bool) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' if in_attribute => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

/// Preorder iterator over a subtree
pub struct Descendants<'a> {
    document: &'a Document,
    stack: Vec<NodeId>,
}

impl Iterator for Descendants<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let id = self.stack.pop()?;
        self.stack
            .extend(self.document.children(id).iter().rev().copied());
        Some(id)
    }
}

/// Owned tree handed to [`Document::from_tree`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeNode {
    /// Element with attributes and children
    Element {
        /// Tag name
        name: String,
        /// Attributes in source order
        attrs: Vec<(String, String)>,
        /// Child nodes
        children: Vec<TreeNode>,
    },
    /// Text leaf
    Text(String),
}

impl TreeNode {
    /// Create an element with no attributes or children
    pub fn element(name: impl Into<String>) -> Self {
        TreeNode::Element {
            name: name.into(),
            attrs: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Create a text leaf
    pub fn text(text: impl Into<String>) -> Self {
        TreeNode::Text(text.into())
    }

    /// Add an attribute (no-op on text leaves)
    pub fn attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        if let TreeNode::Element { attrs, .. } = &mut self {
            attrs.push((key.into(), value.into()));
        }
        self
    }

    /// Append a child (no-op on text leaves)
    pub fn child(mut self, child: TreeNode) -> Self {
        if let TreeNode::Element { children, .. } = &mut self {
            children.push(child);
        }
        self
    }
}

/// Parse capability: turns HTML text into a [`Document`]
pub trait HtmlParser {
    /// Build a document from raw HTML
    fn parse(&self, html: &str) -> Result<Document, ConvertError>;
}

/// html5ever-backed parser (via `scraper`)
///
/// html5ever recovers from malformed markup the way browsers do, so this
/// parser does not fail on bad HTML.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScraperParser;

impl HtmlParser for ScraperParser {
    fn parse(&self, html: &str) -> Result<Document, ConvertError> {
        let parsed = Html::parse_document(html);
        let html_element = parsed.root_element();

        let mut body = None;
        let mut declared_base = None;
        for child in html_element.children().filter_map(ElementRef::wrap) {
            match child.value().name() {
                "body" if body.is_none() => body = Some(child),
                "head" => {
                    declared_base = child
                        .children()
                        .filter_map(ElementRef::wrap)
                        .find(|el| el.value().name() == "base")
                        .and_then(|el| el.value().attr("href"))
                        .map(|href| href.trim().to_string())
                        .filter(|href| !href.is_empty());
                }
                _ => {}
            }
        }
        let root_element = body.unwrap_or(html_element);

        let mut document = Document::new(root_element.value().name());
        let root = document.root();
        for (key, value) in root_element.value().attrs() {
            document.set_attr(root, key, value);
        }

        let mut stack: Vec<_> = root_element.children().rev().map(|c| (c, root)).collect();
        while let Some((node, parent)) = stack.pop() {
            match node.value() {
                HtmlNode::Element(el) => {
                    let id = document.append_element(parent, el.name(), el.attrs());
                    stack.extend(node.children().rev().map(|c| (c, id)));
                }
                HtmlNode::Text(text) => {
                    let text: &str = text;
                    document.append_text(parent, text);
                }
                _ => {}
            }
        }

        if let Some(href) = declared_base {
            document.base_url = Url::parse(&href).ok();
            document.declared_base = Some(href);
        }

        tracing::debug!(nodes = document.len(), "Parsed HTML into document");
        Ok(document)
    }
}
