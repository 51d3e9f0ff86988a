//! HTML <-> tree codec
//!
//! Parsing is built on quick-xml in a lenient configuration: end tag names
//! are not checked, text is not trimmed and entities are never decoded. The
//! source bytes of every text and passthrough node are sliced straight out
//! of the input, so `serialize(parse(x))` reproduces `x` apart from the
//! display normalizations undone by [`restore_display_rewrites`].

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use thiserror::Error;

use super::display::{ABSOLUTE_LINK_REL, ABSOLUTE_LINK_TARGET, STASHED_HREF_ATTRIBUTE};
use super::node::{Element, Node};

/// HTML void elements; never have children or end tags
pub const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

/// Codec errors
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("HTML parse error at position {position}: {message}")]
    Parse { position: usize, message: String },

    #[error("Invalid attribute at position {position}: {message}")]
    Attribute { position: usize, message: String },

    #[error("HTML rewrite failed: {0}")]
    Rewrite(String),
}

/// Is `name` an HTML void element
pub fn is_void_element(name: &str) -> bool {
    VOID_ELEMENTS.iter().any(|v| v.eq_ignore_ascii_case(name))
}

/// Elements whose content is text up to their end tag, never markup
pub const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style"];

/// Is `name` an element with raw text content
pub fn is_raw_text_element(name: &str) -> bool {
    RAW_TEXT_ELEMENTS.iter().any(|r| r.eq_ignore_ascii_case(name))
}

fn lenient_reader(html: &str) -> Reader<&[u8]> {
    let mut reader = Reader::from_str(html);
    reader
        .trim_text(false)
        .check_end_names(false)
        .expand_empty_elements(false);
    reader
}

/// Parse an HTML fragment into an editable tree
///
/// Unmatched end tags are ignored and elements still open at the end of the
/// input are closed implicitly. Script and style content is kept verbatim.
pub fn parse(html: &str) -> Result<Vec<Node>, CodecError> {
    let mut base = 0;
    let mut reader = lenient_reader(html);

    let mut root: Vec<Node> = Vec::new();
    let mut open: Vec<Element> = Vec::new();

    loop {
        let start = base + reader.buffer_position();
        let event = reader.read_event().map_err(|e| CodecError::Parse {
            position: base + reader.buffer_position(),
            message: e.to_string(),
        })?;
        let end = base + reader.buffer_position();

        match event {
            Event::Start(tag) => {
                let mut element = start_element(&tag, false, start)?;
                if is_void_element(&element.name) {
                    push_node(&mut root, &mut open, Node::Element(element));
                } else if is_raw_text_element(&element.name) {
                    let (content_end, resume) = raw_text_end(html, end, &element.name);
                    if content_end > end {
                        element.children.push(Node::Raw(html[end..content_end].to_string()));
                    }
                    push_node(&mut root, &mut open, Node::Element(element));
                    // Continue after the end tag with a fresh reader
                    base = resume;
                    reader = lenient_reader(&html[base..]);
                } else {
                    open.push(element);
                }
            }
            Event::Empty(tag) => {
                let element = start_element(&tag, true, start)?;
                push_node(&mut root, &mut open, Node::Element(element));
            }
            Event::End(tag) => {
                let name = String::from_utf8_lossy(tag.name().as_ref()).into_owned();
                close_element(&mut root, &mut open, &name);
            }
            Event::Text(_) => {
                let data = &html[start..end];
                if !data.is_empty() {
                    push_node(&mut root, &mut open, Node::Text(data.to_string()));
                }
            }
            Event::Eof => break,
            _ => {
                push_node(&mut root, &mut open, Node::Raw(html[start..end].to_string()));
            }
        }
    }

    while let Some(element) = open.pop() {
        push_node(&mut root, &mut open, Node::Element(element));
    }

    restore_display_rewrites(&mut root);
    Ok(root)
}

/// End of the raw text starting at `from` and the position just past its
/// end tag; both are the end of input when the element is never closed
fn raw_text_end(html: &str, from: usize, name: &str) -> (usize, usize) {
    let rest = html[from..].to_ascii_lowercase();
    let needle = format!("</{}", name.to_ascii_lowercase());

    let mut search = 0;
    while let Some(idx) = rest[search..].find(&needle) {
        let at = search + idx;
        let after = at + needle.len();
        match rest[after..].chars().next() {
            Some(c) if c == '>' || c == '/' || c.is_whitespace() => {
                let content_end = from + at;
                let tag_end = html[content_end..]
                    .find('>')
                    .map_or(html.len(), |i| content_end + i + 1);
                return (content_end, tag_end);
            }
            None => return (from + at, html.len()),
            _ => search = after,
        }
    }
    (html.len(), html.len())
}

fn start_element(tag: &BytesStart<'_>, self_closing: bool, position: usize) -> Result<Element, CodecError> {
    let mut element = Element::new(String::from_utf8_lossy(tag.name().as_ref()).into_owned());
    element.self_closing = self_closing;

    for attr in tag.html_attributes() {
        let attr = attr.map_err(|e| CodecError::Attribute {
            position,
            message: e.to_string(),
        })?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = String::from_utf8_lossy(&attr.value).into_owned();
        element.attributes.insert(key, value);
    }

    Ok(element)
}

fn push_node(root: &mut Vec<Node>, open: &mut [Element], node: Node) {
    match open.last_mut() {
        Some(parent) => parent.children.push(node),
        None => root.push(node),
    }
}

fn close_element(root: &mut Vec<Node>, open: &mut Vec<Element>, name: &str) {
    // Stray end tags are dropped
    if !open.iter().any(|el| el.is(name)) {
        return;
    }
    while let Some(element) = open.pop() {
        let done = element.is(name);
        push_node(root, open, Node::Element(element));
        if done {
            break;
        }
    }
}

/// Undo the link rewrites applied for display
///
/// Links rendered for display have `href` moved into `data-href` (relative
/// links) or `target`/`rel` added (absolute links). Reversing both on parse
/// keeps repeated edit/parse cycles idempotent.
pub fn restore_display_rewrites(nodes: &mut [Node]) {
    for node in nodes.iter_mut() {
        if let Node::Element(el) = node {
            if el.is("a") {
                restore_link(el);
            }
            restore_display_rewrites(&mut el.children);
        }
    }
}

fn restore_link(el: &mut Element) {
    if let Some(stashed) = el.remove_attr(STASHED_HREF_ATTRIBUTE) {
        if !el.has_attr("href") {
            el.set_attr("href", stashed);
        }
    }

    let absolute = el.attr("href").is_some_and(super::display::is_absolute_link);
    if absolute
        && el.attr("target") == Some(ABSOLUTE_LINK_TARGET)
        && el.attr("rel") == Some(ABSOLUTE_LINK_REL)
    {
        el.remove_attr("target");
        el.remove_attr("rel");
    }
}

/// Serialize a tree back to HTML without re-encoding anything
pub fn serialize(nodes: &[Node]) -> String {
    let mut out = String::new();
    write_nodes(nodes, &mut out);
    out
}

fn write_nodes(nodes: &[Node], out: &mut String) {
    for node in nodes {
        match node {
            Node::Text(data) | Node::Raw(data) => out.push_str(data),
            Node::Element(el) => write_element(el, out),
        }
    }
}

fn write_element(el: &Element, out: &mut String) {
    out.push('<');
    out.push_str(&el.name);
    for (key, value) in &el.attributes {
        out.push(' ');
        out.push_str(key);
        out.push('=');
        // Values are raw; pick a quote that does not occur in them
        let quote = if value.contains('"') && !value.contains('\'') {
            '\''
        } else {
            '"'
        };
        out.push(quote);
        out.push_str(value);
        out.push(quote);
    }

    if el.self_closing && el.children.is_empty() {
        out.push_str("/>");
        return;
    }
    out.push('>');

    if is_void_element(&el.name) && el.children.is_empty() {
        return;
    }

    write_nodes(&el.children, out);
    out.push_str("</");
    out.push_str(&el.name);
    out.push('>');
}
