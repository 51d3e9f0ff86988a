//! Depth-first tree walking
//!
//! Rendering layers map annotation elements to widgets by implementing
//! [`TreeVisitor`]; the session uses the same walk to list annotations.

use super::node::{Element, Node, NodePath};

/// Controls descent into an element's children
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Descend {
    Yes,
    No,
}

/// Callbacks for [`walk`]
pub trait TreeVisitor {
    fn visit_element(&mut self, _path: &NodePath, _element: &Element) -> Descend {
        Descend::Yes
    }

    fn leave_element(&mut self, _path: &NodePath, _element: &Element) {}

    fn visit_text(&mut self, _path: &NodePath, _data: &str) {}
}

/// Walk `nodes` in document order
pub fn walk<V: TreeVisitor + ?Sized>(nodes: &[Node], visitor: &mut V) {
    let mut path = NodePath::new();
    walk_level(nodes, &mut path, visitor);
}

fn walk_level<V: TreeVisitor + ?Sized>(nodes: &[Node], path: &mut NodePath, visitor: &mut V) {
    for (idx, node) in nodes.iter().enumerate() {
        path.push(idx);
        match node {
            Node::Element(el) => {
                if visitor.visit_element(path, el) == Descend::Yes {
                    walk_level(&el.children, path, visitor);
                }
                visitor.leave_element(path, el);
            }
            Node::Text(data) => visitor.visit_text(path, data),
            Node::Raw(_) => {}
        }
        path.pop();
    }
}

/// Paths of all elements matching `predicate`, in document order
pub fn find_elements<F>(nodes: &[Node], mut predicate: F) -> Vec<NodePath>
where
    F: FnMut(&Element) -> bool,
{
    struct Collect<'f, F> {
        predicate: &'f mut F,
        found: Vec<NodePath>,
    }

    impl<F: FnMut(&Element) -> bool> TreeVisitor for Collect<'_, F> {
        fn visit_element(&mut self, path: &NodePath, element: &Element) -> Descend {
            if (self.predicate)(element) {
                self.found.push(path.clone());
            }
            Descend::Yes
        }
    }

    let mut collect = Collect {
        predicate: &mut predicate,
        found: Vec::new(),
    };
    walk(nodes, &mut collect);
    collect.found
}

/// Text nodes in document order with their paths
pub fn text_nodes(nodes: &[Node]) -> Vec<(NodePath, &str)> {
    fn collect<'a>(nodes: &'a [Node], path: &mut NodePath, out: &mut Vec<(NodePath, &'a str)>) {
        for (idx, node) in nodes.iter().enumerate() {
            path.push(idx);
            match node {
                Node::Text(data) => out.push((path.clone(), data.as_str())),
                Node::Element(el) => collect(&el.children, path, out),
                Node::Raw(_) => {}
            }
            path.pop();
        }
    }

    let mut out = Vec::new();
    collect(nodes, &mut NodePath::new(), &mut out);
    out
}
