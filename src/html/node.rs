//! Editable document tree
//!
//! Text is stored exactly as it appeared in the source (entities are not
//! decoded), so re-serializing a tree reproduces the original bytes.

use indexmap::IndexMap;

/// Address of a node: child indices from the top-level list downwards
pub type NodePath = Vec<usize>;

/// A node in the document tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    /// Raw text data
    Text(String),
    /// Comments, doctypes, CDATA sections, processing instructions and
    /// script or style content, kept verbatim
    Raw(String),
}

/// An HTML element
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub name: String,
    /// Attribute values as written in the source (not entity-decoded)
    pub attributes: IndexMap<String, String>,
    pub children: Vec<Node>,
    /// Element was written as `<name/>`
    pub self_closing: bool,
}

impl Element {
    /// Create an element without attributes or children
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: IndexMap::new(),
            children: Vec::new(),
            self_closing: false,
        }
    }

    /// Builder-style attribute setter
    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Builder-style children setter
    pub fn with_children(mut self, children: Vec<Node>) -> Self {
        self.children = children;
        self
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    pub fn has_attr(&self, name: &str) -> bool {
        self.attributes.contains_key(name)
    }

    pub fn set_attr(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.attributes.insert(name.into(), value.into());
    }

    /// Remove an attribute, keeping the order of the others
    pub fn remove_attr(&mut self, name: &str) -> Option<String> {
        self.attributes.shift_remove(name)
    }

    /// Whitespace separated tokens of the `class` attribute
    pub fn classes(&self) -> impl Iterator<Item = &str> {
        self.attr("class").unwrap_or_default().split_whitespace()
    }

    /// Tag name comparison is ASCII case-insensitive
    pub fn is(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }

    /// Concatenated text of this element's subtree
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        collect_text(&self.children, &mut out);
        out
    }
}

impl Node {
    pub fn text(data: impl Into<String>) -> Self {
        Node::Text(data.into())
    }

    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Node::Element(el) => Some(el),
            _ => None,
        }
    }

    pub fn as_element_mut(&mut self) -> Option<&mut Element> {
        match self {
            Node::Element(el) => Some(el),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Node::Text(data) => Some(data),
            _ => None,
        }
    }

    pub fn is_text(&self) -> bool {
        matches!(self, Node::Text(_))
    }

    pub fn children(&self) -> &[Node] {
        match self {
            Node::Element(el) => &el.children,
            _ => &[],
        }
    }

    /// Number of positions a boundary offset can address in this node:
    /// characters for text, children for elements
    pub fn len(&self) -> usize {
        match self {
            Node::Element(el) => el.children.len(),
            Node::Text(data) => data.chars().count(),
            Node::Raw(_) => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Concatenated text of this node's subtree
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        collect_text(std::slice::from_ref(self), &mut out);
        out
    }
}

/// Concatenated text of a node list, in document order
pub fn text_content(nodes: &[Node]) -> String {
    let mut out = String::new();
    collect_text(nodes, &mut out);
    out
}

fn collect_text(nodes: &[Node], out: &mut String) {
    for node in nodes {
        match node {
            Node::Text(data) => out.push_str(data),
            Node::Element(el) => collect_text(&el.children, out),
            Node::Raw(_) => {}
        }
    }
}

/// Node at `path`, if the path is valid
pub fn node_at<'a>(nodes: &'a [Node], path: &[usize]) -> Option<&'a Node> {
    let (first, rest) = path.split_first()?;
    let mut node = nodes.get(*first)?;
    for idx in rest {
        node = node.children().get(*idx)?;
    }
    Some(node)
}

/// Mutable node at `path`, if the path is valid
pub fn node_at_mut<'a>(nodes: &'a mut [Node], path: &[usize]) -> Option<&'a mut Node> {
    let (first, rest) = path.split_first()?;
    let mut node = nodes.get_mut(*first)?;
    for idx in rest {
        node = node.as_element_mut()?.children.get_mut(*idx)?;
    }
    Some(node)
}

/// Children list addressed by `path`; the empty path is the top-level list
pub fn children_at_mut<'a>(nodes: &'a mut Vec<Node>, path: &[usize]) -> Option<&'a mut Vec<Node>> {
    if path.is_empty() {
        return Some(nodes);
    }
    match node_at_mut(nodes, path)? {
        Node::Element(el) => Some(&mut el.children),
        _ => None,
    }
}

/// Children list addressed by `path`; the empty path is the top-level list
pub fn children_at<'a>(nodes: &'a [Node], path: &[usize]) -> Option<&'a [Node]> {
    if path.is_empty() {
        return Some(nodes);
    }
    match node_at(nodes, path)? {
        Node::Element(el) => Some(&el.children),
        _ => None,
    }
}

/// Remove empty text nodes left behind by tree edits
pub fn prune_empty_text(nodes: &mut Vec<Node>) {
    nodes.retain(|node| !matches!(node, Node::Text(data) if data.is_empty()));
    for node in nodes.iter_mut() {
        if let Node::Element(el) = node {
            prune_empty_text(&mut el.children);
        }
    }
}
