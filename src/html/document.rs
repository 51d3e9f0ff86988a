//! Document envelope
//!
//! Only the body of a document is edited. The head, the `<html>` element
//! attributes and everything after `</body>` are kept verbatim and glued
//! back on when the document is written out.

use crate::prefix::{get_prefix_map, PrefixError, PrefixMap};

use super::codec::{parse, serialize, CodecError};
use super::node::Node;

/// A full HTML document split around its body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HtmlDocument {
    /// Everything up to and including the `<body ...>` open tag
    pub head: String,
    /// Inner HTML of the body
    pub body: String,
    /// Everything from `</body>` onwards
    pub tail: String,
}

impl HtmlDocument {
    /// Split a document at its body tags
    ///
    /// Falls back to treating the whole input as body when no `<body>` tag
    /// is present.
    pub fn split(html: &str) -> Self {
        let lower = html.to_ascii_lowercase();
        let body_open = find_body_open(&lower);

        let Some(open_start) = body_open else {
            return Self {
                head: String::new(),
                body: html.to_string(),
                tail: String::new(),
            };
        };

        let content_start = match lower[open_start..].find('>') {
            Some(idx) => open_start + idx + 1,
            None => html.len(),
        };
        let content_end = lower[content_start..]
            .rfind("</body")
            .map(|idx| content_start + idx)
            .unwrap_or(html.len());

        Self {
            head: html[..content_start].to_string(),
            body: html[content_start..content_end].to_string(),
            tail: html[content_end..].to_string(),
        }
    }

    /// Whether the input carried a body envelope
    pub fn has_envelope(&self) -> bool {
        !self.head.is_empty()
    }

    /// Parse the body into an editable tree
    pub fn parse_body(&self) -> Result<Vec<Node>, CodecError> {
        parse(&self.body)
    }

    /// Prefix map declared on the document's `html` element
    pub fn prefix_map(&self) -> Result<PrefixMap, DocumentError> {
        let nodes = if self.has_envelope() {
            parse(&self.head)?
        } else {
            parse(&self.body)?
        };
        Ok(get_prefix_map(&nodes)?)
    }

    /// Reassemble the document around an edited body
    pub fn to_html(&self, body: &[Node]) -> String {
        let body = serialize(body);
        let mut out = String::with_capacity(self.head.len() + body.len() + self.tail.len());
        out.push_str(&self.head);
        out.push_str(&body);
        out.push_str(&self.tail);
        out
    }
}

/// Errors while reading the document envelope
#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error("Invalid prefix declaration: {0}")]
    Prefix(#[from] PrefixError),
}

/// Position of a `<body` open tag (not `<bodyx`)
fn find_body_open(lower: &str) -> Option<usize> {
    let mut from = 0;
    while let Some(idx) = lower[from..].find("<body") {
        let at = from + idx;
        match lower[at + 5..].chars().next() {
            Some(c) if c == '>' || c == '/' || c.is_whitespace() => return Some(at),
            _ => from = at + 5,
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = r#"<!DOCTYPE html>
<html prefix="ddo: http://onto.fel.cvut.cz/ontologies/application/termit/pojem/" lang="cs">
<head><meta charset="utf-8"><title>Zákon</title></head>
<body class="doc"><p>Obsah &amp; text</p></body>
</html>"#;

    #[test]
    fn test_split_around_body() {
        let doc = HtmlDocument::split(DOC);
        assert!(doc.head.ends_with(r#"<body class="doc">"#));
        assert_eq!(doc.body, "<p>Obsah &amp; text</p>");
        assert!(doc.tail.starts_with("</body>"));
    }

    #[test]
    fn test_reassembly_is_verbatim() {
        let doc = HtmlDocument::split(DOC);
        let body = doc.parse_body().unwrap();
        assert_eq!(doc.to_html(&body), DOC);
    }

    #[test]
    fn test_fragment_without_body() {
        let doc = HtmlDocument::split("<p>only</p>");
        assert!(!doc.has_envelope());
        assert_eq!(doc.body, "<p>only</p>");
        assert_eq!(doc.to_html(&doc.parse_body().unwrap()), "<p>only</p>");
    }

    #[test]
    fn test_prefix_map_from_head() {
        let doc = HtmlDocument::split(DOC);
        let map = doc.prefix_map().unwrap();
        assert_eq!(
            map.namespace("ddo"),
            Some("http://onto.fel.cvut.cz/ontologies/application/termit/pojem/")
        );
    }

    #[test]
    fn test_malformed_prefix_is_fatal() {
        let doc = HtmlDocument::split(r#"<html prefix="ddo"><body><p>x</p></body></html>"#);
        assert!(matches!(doc.prefix_map(), Err(DocumentError::Prefix(_))));
    }

    #[test]
    fn test_body_lookalike_tags_are_skipped() {
        let doc = HtmlDocument::split("<bodyguard>x</bodyguard>");
        assert!(!doc.has_envelope());
    }
}
