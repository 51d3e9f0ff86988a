//! Annotation node operations
//!
//! Find, create, update and remove annotation elements in a document tree.
//! Every lookup goes through the prefix map, since `typeof` values are
//! usually written in `prefix:local` form.

use std::borrow::Cow;

use crate::html::{children_at_mut, find_elements, node_at, Element, Node, NodePath};
use crate::prefix::{resolve_iri, shorten_iri, PrefixMap};

use super::types::{
    attr, AnnotationKind, AnnotationStatus, AnnotationView, ANNOTATION_CLASS,
};

/// Block-level HTML elements; a selection containing any of them is wrapped
/// in a `div` instead of a `span`
pub const BLOCK_ELEMENTS: &[&str] = &[
    "address", "article", "aside", "blockquote", "canvas", "caption", "dd", "details", "dialog",
    "div", "dl", "dt", "fieldset", "figcaption", "figure", "footer", "form", "h1", "h2", "h3",
    "h4", "h5", "h6", "header", "hgroup", "hr", "li", "main", "nav", "noscript", "ol", "p", "pre",
    "section", "table", "tbody", "td", "tfoot", "th", "thead", "tr", "ul", "video",
];

/// Is `name` a block-level element
pub fn is_block_element(name: &str) -> bool {
    BLOCK_ELEMENTS.iter().any(|b| b.eq_ignore_ascii_case(name))
}

/// Does any node in the subtree of `nodes` have a block-level tag
pub fn contains_block_element(nodes: &[Node]) -> bool {
    nodes.iter().any(|node| match node {
        Node::Element(el) => is_block_element(&el.name) || contains_block_element(&el.children),
        _ => false,
    })
}

/// Annotation class of `element`, if it is an annotation
pub fn annotation_kind(element: &Element, prefix_map: &PrefixMap) -> Option<AnnotationKind> {
    element
        .attr(attr::TYPEOF)?
        .split_whitespace()
        .find_map(|token| AnnotationKind::from_class_iri(&resolve_iri(token, prefix_map)))
}

/// Is `element` an annotation (resolved `typeof` is a known annotation class)
pub fn is_annotation(element: &Element, prefix_map: &PrefixMap) -> bool {
    annotation_kind(element, prefix_map).is_some()
}

/// Paths of all annotation elements, in document order
pub fn annotation_paths(tree: &[Node], prefix_map: &PrefixMap) -> Vec<NodePath> {
    find_elements(tree, |el| is_annotation(el, prefix_map))
}

/// Path of the first annotation whose `about` equals `about`
pub fn find_annotation_path(tree: &[Node], about: &str, prefix_map: &PrefixMap) -> Option<NodePath> {
    find_elements(tree, |el| {
        el.attr(attr::ABOUT) == Some(about) && is_annotation(el, prefix_map)
    })
    .into_iter()
    .next()
}

/// First annotation whose `about` equals `about`
pub fn find_annotation<'a>(
    tree: &'a [Node],
    about: &str,
    prefix_map: &PrefixMap,
) -> Option<&'a Element> {
    let path = find_annotation_path(tree, about, prefix_map)?;
    node_at(tree, &path).and_then(Node::as_element)
}

/// Wrap `nodes` in a new annotation element
///
/// The wrapper is a `div` when the selection contains block content and a
/// `span` otherwise. IRIs are written in prefixed form when the document
/// declares a matching prefix.
pub fn create_new_annotation(
    about: &str,
    nodes: Vec<Node>,
    kind: AnnotationKind,
    prefix_map: &PrefixMap,
) -> Element {
    let name = if contains_block_element(&nodes) {
        "div"
    } else {
        "span"
    };

    Element::new(name)
        .with_attr(attr::ABOUT, about)
        .with_attr(attr::PROPERTY, shorten_iri(kind.property_iri(), prefix_map))
        .with_attr(attr::TYPEOF, shorten_iri(kind.class_iri(), prefix_map))
        .with_children(nodes)
}

/// How an annotation element is dismantled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Removal {
    /// Sole text child: becomes a bare text node
    Collapse,
    /// No content at all
    Drop,
    /// Only child of its parent: children are spliced into the parent
    Unwrap,
    /// Structurally load-bearing: only the RDFa attributes go
    Strip,
}

/// Remove the annotation at `path`
///
/// Returns false when `path` does not address an element.
pub fn remove_annotation(tree: &mut Vec<Node>, path: &[usize]) -> bool {
    let Some((&idx, parent_path)) = path.split_last() else {
        return false;
    };
    let Some(siblings) = children_at_mut(tree, parent_path) else {
        return false;
    };

    let removal = match siblings.get(idx) {
        Some(Node::Element(el)) => match el.children.as_slice() {
            [Node::Text(_)] => Removal::Collapse,
            [] => Removal::Drop,
            _ if siblings.len() == 1 => Removal::Unwrap,
            _ => Removal::Strip,
        },
        _ => return false,
    };
    tracing::debug!("Removing annotation at {:?} ({:?})", path, removal);

    match removal {
        Removal::Collapse => {
            if let Node::Element(mut el) = siblings.remove(idx) {
                if let Some(text) = el.children.pop() {
                    siblings.insert(idx, text);
                }
            }
            merge_adjacent_text(siblings);
        }
        Removal::Drop => {
            siblings.remove(idx);
        }
        Removal::Unwrap => {
            if let Node::Element(el) = siblings.remove(idx) {
                siblings.splice(idx..idx, el.children);
            }
        }
        Removal::Strip => {
            if let Some(Node::Element(el)) = siblings.get_mut(idx) {
                strip_annotation_attributes(el);
            }
        }
    }
    true
}

/// Remove RDFa attributes and annotation classes, keeping the element
pub fn strip_annotation_attributes(element: &mut Element) {
    for name in [
        attr::ABOUT,
        attr::RESOURCE,
        attr::PROPERTY,
        attr::TYPEOF,
        attr::SCORE,
        attr::CONTENT,
    ] {
        element.remove_attr(name);
    }

    let remaining = element
        .classes()
        .filter(|class| !is_annotation_class(class))
        .collect::<Vec<_>>()
        .join(" ");
    if remaining.is_empty() {
        element.remove_attr(attr::CLASS);
    } else {
        element.set_attr(attr::CLASS, remaining);
    }
}

fn is_annotation_class(class: &str) -> bool {
    class == ANNOTATION_CLASS
        || class
            .strip_prefix(ANNOTATION_CLASS)
            .is_some_and(|rest| rest.starts_with('-'))
}

fn merge_adjacent_text(nodes: &mut Vec<Node>) {
    let mut merged: Vec<Node> = Vec::with_capacity(nodes.len());
    for node in nodes.drain(..) {
        match node {
            Node::Text(data) => match merged.last_mut() {
                Some(Node::Text(prev)) => prev.push_str(&data),
                _ => merged.push(Node::Text(data)),
            },
            node => merged.push(node),
        }
    }
    *nodes = merged;
}

/// Replace the annotation identified by `about` with `replacement`
pub fn replace_annotation(
    tree: &mut [Node],
    about: &str,
    replacement: Element,
    prefix_map: &PrefixMap,
) -> bool {
    let Some(path) = find_annotation_path(tree, about, prefix_map) else {
        return false;
    };
    match crate::html::node_at_mut(tree, &path) {
        Some(node) => {
            *node = Node::Element(replacement);
            true
        }
        None => false,
    }
}

/// Confidence score of a machine-suggested annotation
pub fn score(element: &Element) -> Option<f64> {
    element.attr(attr::SCORE)?.trim().parse().ok()
}

/// Does the annotation meet `threshold`
///
/// Annotations without a score are treated as confident. A score that does
/// not parse never meets the threshold.
pub fn is_annotation_with_minimum_score(element: &Element, threshold: f64) -> bool {
    match element.attr(attr::SCORE) {
        None => true,
        Some(_) => score(element).is_some_and(|s| s >= threshold),
    }
}

/// Term IRI the annotation points to, fully resolved
pub fn resource_iri(element: &Element, prefix_map: &PrefixMap) -> Option<String> {
    let raw = element.attr(attr::RESOURCE)?;
    if raw.trim().is_empty() {
        return None;
    }
    let decoded = html_escape::decode_html_entities(raw);
    Some(resolve_iri(decoded.trim(), prefix_map))
}

/// Point the annotation at `term_iri`; drops any suggestion score
pub fn set_resource(element: &mut Element, term_iri: &str, prefix_map: &PrefixMap) {
    let short = shorten_iri(term_iri, prefix_map);
    let encoded: Cow<'_, str> = html_escape::encode_double_quoted_attribute(&short);
    element.set_attr(attr::RESOURCE, encoded.into_owned());
    element.remove_attr(attr::SCORE);
}

/// Summarize an annotation element
pub fn annotation_view(element: &Element, prefix_map: &PrefixMap) -> Option<AnnotationView> {
    let kind = annotation_kind(element, prefix_map)?;
    let about = element.attr(attr::ABOUT)?.to_string();
    let resource = resource_iri(element, prefix_map);
    let score = score(element);
    let status = match (&resource, score) {
        (Some(_), _) => AnnotationStatus::Confirmed,
        (None, Some(_)) => AnnotationStatus::Suggested,
        (None, None) => AnnotationStatus::Pending,
    };

    Some(AnnotationView {
        about,
        kind,
        resource,
        score,
        text: element.text_content(),
        content: element.attr(attr::CONTENT).map(str::to_string),
        status,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::types::{TERMIT_NAMESPACE, TERM_OCCURRENCE_CLASS};
    use crate::html::{parse, serialize, text_content};

    fn prefixes() -> PrefixMap {
        let mut map = PrefixMap::new();
        map.insert("ddo", TERMIT_NAMESPACE);
        map
    }

    fn occurrence(about: &str, inner: &str) -> String {
        format!(
            r#"<span about="{}" property="ddo:je-výskytem-termu" typeof="ddo:výskyt-termu">{}</span>"#,
            about, inner
        )
    }

    #[test]
    fn test_is_annotation_resolves_prefix() {
        let nodes = parse(&occurrence("_:a", "x")).unwrap();
        let el = nodes[0].as_element().unwrap();
        assert!(is_annotation(el, &prefixes()));
        // Without the prefix declaration the typeof cannot be resolved
        assert!(!is_annotation(el, &PrefixMap::new()));
    }

    #[test]
    fn test_is_annotation_with_absolute_typeof() {
        let html = format!(r#"<span about="_:a" typeof="{}">x</span>"#, TERM_OCCURRENCE_CLASS);
        let nodes = parse(&html).unwrap();
        assert!(is_annotation(nodes[0].as_element().unwrap(), &PrefixMap::new()));
    }

    #[test]
    fn test_find_annotation_requires_annotation_class() {
        let html = format!(
            r#"<p about="_:a">decoy</p><p>{}</p>"#,
            occurrence("_:a", "real")
        );
        let nodes = parse(&html).unwrap();
        let found = find_annotation(&nodes, "_:a", &prefixes()).unwrap();
        assert_eq!(found.text_content(), "real");
        assert!(find_annotation(&nodes, "_:missing", &prefixes()).is_none());
    }

    #[test]
    fn test_create_inline_annotation_is_span() {
        let nodes = parse("some <b>bold</b> text").unwrap();
        let el = create_new_annotation("_:n", nodes, AnnotationKind::Occurrence, &prefixes());
        assert_eq!(el.name, "span");
        assert_eq!(el.attr("typeof"), Some("ddo:výskyt-termu"));
        assert_eq!(el.attr("property"), Some("ddo:je-výskytem-termu"));
        assert_eq!(el.attr("about"), Some("_:n"));
    }

    #[test]
    fn test_create_block_annotation_is_div() {
        let nodes = parse("<em><div>block</div></em>").unwrap();
        let el = create_new_annotation("_:n", nodes, AnnotationKind::Definition, &PrefixMap::new());
        assert_eq!(el.name, "div");
        // No prefix declared: full IRIs are written
        assert_eq!(
            el.attr("typeof"),
            Some("http://onto.fel.cvut.cz/ontologies/application/termit/pojem/zdroj-definice-termu")
        );
    }

    #[test]
    fn test_create_over_table_cells_is_div() {
        let nodes = parse("<td>Zákon</td><td>smlouva</td>").unwrap();
        let el = create_new_annotation("_:n", nodes, AnnotationKind::Occurrence, &prefixes());
        assert_eq!(el.name, "div");
        assert!(is_block_element("TR"));
        assert!(is_block_element("th"));
    }

    #[test]
    fn test_remove_sole_text_child_scenario() {
        let mut nodes = parse(&format!("<p>Hello {}</p>", occurrence("_:1", "world"))).unwrap();
        let path = find_annotation_path(&nodes, "_:1", &prefixes()).unwrap();
        assert!(remove_annotation(&mut nodes, &path));
        assert_eq!(serialize(&nodes), "<p>Hello world</p>");
        assert!(find_annotation(&nodes, "_:1", &prefixes()).is_none());
    }

    #[test]
    fn test_remove_top_level_text_annotation_keeps_position() {
        let mut nodes = parse(&format!("<p>a</p>{}<p>b</p>", occurrence("_:1", "mid"))).unwrap();
        assert!(remove_annotation(&mut nodes, &[1]));
        assert_eq!(nodes.len(), 3);
        assert_eq!(nodes[1], Node::text("mid"));
    }

    #[test]
    fn test_remove_only_child_unwraps() {
        let inner = "a <b>b</b> c";
        let mut nodes = parse(&format!("<p>{}</p>", occurrence("_:1", inner))).unwrap();
        let before = text_content(&nodes);
        assert!(remove_annotation(&mut nodes, &[0, 0]));

        let p = nodes[0].as_element().unwrap();
        assert_eq!(p.children.len(), 3);
        assert_eq!(serialize(&nodes), format!("<p>{}</p>", inner));
        assert_eq!(text_content(&nodes), before);
    }

    #[test]
    fn test_remove_mixed_content_with_siblings_strips_attributes() {
        let html = format!(
            "<p>x {} y</p>",
            r#"<span class="annotation annotation-occurrence lead" about="_:1" resource="ddo:t" typeof="ddo:výskyt-termu" score="0.7">a <b>b</b></span>"#
        );
        let mut nodes = parse(&html).unwrap();
        let before = text_content(&nodes);
        assert!(remove_annotation(&mut nodes, &[0, 1]));

        let out = serialize(&nodes);
        assert!(!out.contains("_:1"));
        assert_eq!(out, r#"<p>x <span class="lead">a <b>b</b></span> y</p>"#);
        assert_eq!(text_content(&nodes), before);
    }

    #[test]
    fn test_remove_empty_annotation() {
        let mut nodes = parse(&format!("<p>x{}</p>", occurrence("_:1", ""))).unwrap();
        assert!(remove_annotation(&mut nodes, &[0, 1]));
        assert_eq!(serialize(&nodes), "<p>x</p>");
    }

    #[test]
    fn test_remove_invalid_path() {
        let mut nodes = parse("<p>x</p>").unwrap();
        assert!(!remove_annotation(&mut nodes, &[0, 0]));
        assert!(!remove_annotation(&mut nodes, &[]));
    }

    #[test]
    fn test_minimum_score() {
        let with = |score: Option<&str>| {
            let mut el = Element::new("span");
            if let Some(s) = score {
                el.set_attr("score", s);
            }
            el
        };
        assert!(is_annotation_with_minimum_score(&with(Some("0.5")), 0.5));
        assert!(is_annotation_with_minimum_score(&with(None), 0.5));
        assert!(!is_annotation_with_minimum_score(&with(Some("0.4")), 0.5));
        assert!(!is_annotation_with_minimum_score(&with(Some("high")), 0.5));
    }

    #[test]
    fn test_set_resource_shortens_and_drops_score() {
        let mut el = Element::new("span").with_attr("score", "0.8");
        set_resource(&mut el, &format!("{}term?a=1&b=2", TERMIT_NAMESPACE), &prefixes());
        assert_eq!(el.attr("resource"), Some("ddo:term?a=1&amp;b=2"));
        assert!(!el.has_attr("score"));
        assert_eq!(
            resource_iri(&el, &prefixes()).as_deref(),
            Some("http://onto.fel.cvut.cz/ontologies/application/termit/pojem/term?a=1&b=2")
        );
    }

    #[test]
    fn test_annotation_view_status() {
        let html = r#"<span about="_:s" typeof="ddo:výskyt-termu" score="0.9">sug</span>"#;
        let nodes = parse(html).unwrap();
        let view = annotation_view(nodes[0].as_element().unwrap(), &prefixes()).unwrap();
        assert_eq!(view.status, AnnotationStatus::Suggested);
        assert_eq!(view.score, Some(0.9));
        assert_eq!(view.text, "sug");
    }

    #[test]
    fn test_replace_annotation() {
        let mut nodes = parse(&occurrence("_:1", "x")).unwrap();
        let mut updated = find_annotation(&nodes, "_:1", &prefixes()).unwrap().clone();
        updated.set_attr("resource", "ddo:t");
        assert!(replace_annotation(&mut nodes, "_:1", updated, &prefixes()));
        assert_eq!(
            find_annotation(&nodes, "_:1", &prefixes()).unwrap().attr("resource"),
            Some("ddo:t")
        );
    }
}
