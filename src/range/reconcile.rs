//! Range reconciliation
//!
//! A selection range is captured as an address, replayed against a clone of
//! the tree, and its contents are moved into a new wrapper element. The
//! caller swaps the clone in only when everything succeeded, so a failed
//! wrap never leaves a half-edited document behind.

use crate::annotation::{attr, strip_annotation_attributes};
use crate::html::{children_at_mut, node_at, prune_empty_text, Element, Node, NodePath};

use serde::{Deserialize, Serialize};

use super::types::{char_to_byte, Boundary, DomRange, RangeError};

/// Whether the range starts and ends at different element depths
///
/// Wrapping such a range would have to split elements on one side only, so
/// the caller widens it first.
pub fn does_range_span_multiple_elements(range: &DomRange) -> bool {
    if range.start.path == range.end.path {
        return false;
    }
    let ancestor = range.common_ancestor().len();
    range.start.path.len() - ancestor != range.end.path.len() - ancestor
}

/// Widen a multi-element range to the full contents of its common ancestor
pub fn extend_range_to_prevent_node_crossing(tree: &[Node], range: &DomRange) -> DomRange {
    if !does_range_span_multiple_elements(range) {
        return range.clone();
    }

    let ancestor = range.common_ancestor();
    let len = if ancestor.is_empty() {
        tree.len()
    } else {
        node_at(tree, &ancestor).map(Node::len).unwrap_or(0)
    };
    tracing::debug!("Widening range to the contents of {:?}", ancestor);
    DomRange {
        start: Boundary::new(ancestor.clone(), 0),
        end: Boundary::new(ancestor, len),
    }
}

/// One end of a captured range
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoundaryAddress {
    pub path: NodePath,
    pub offset: usize,
    /// Container was a text node at capture time
    pub in_text: bool,
}

/// A range recorded independently of any particular tree instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RangeAddress {
    pub start: BoundaryAddress,
    pub end: BoundaryAddress,
}

impl RangeAddress {
    /// Record `range` as it addresses `tree`
    pub fn capture(tree: &[Node], range: &DomRange) -> Result<Self, RangeError> {
        Ok(Self {
            start: capture_boundary(tree, &range.start)?,
            end: capture_boundary(tree, &range.end)?,
        })
    }

    /// Rebuild the range against `tree`, usually a clone of the captured one
    ///
    /// Element containers get their offset clamped to the current child
    /// count: an end boundary recorded as "after the last child" stays there.
    pub fn replay(&self, tree: &[Node]) -> Result<DomRange, RangeError> {
        Ok(DomRange {
            start: replay_boundary(tree, &self.start)?,
            end: replay_boundary(tree, &self.end)?,
        })
    }
}

fn capture_boundary(tree: &[Node], boundary: &Boundary) -> Result<BoundaryAddress, RangeError> {
    let (in_text, len) = container(tree, &boundary.path)?;
    if boundary.offset > len {
        return Err(RangeError::OffsetOutOfBounds {
            path: boundary.path.clone(),
            offset: boundary.offset,
        });
    }
    Ok(BoundaryAddress {
        path: boundary.path.clone(),
        offset: boundary.offset,
        in_text,
    })
}

fn replay_boundary(tree: &[Node], address: &BoundaryAddress) -> Result<Boundary, RangeError> {
    let (in_text, len) = container(tree, &address.path)?;
    if in_text != address.in_text {
        return Err(RangeError::Diverged(address.path.clone()));
    }
    let offset = if in_text {
        if address.offset > len {
            return Err(RangeError::OffsetOutOfBounds {
                path: address.path.clone(),
                offset: address.offset,
            });
        }
        address.offset
    } else {
        address.offset.min(len)
    };
    Ok(Boundary::new(address.path.clone(), offset))
}

/// Kind and length of the boundary container at `path`
fn container(tree: &[Node], path: &[usize]) -> Result<(bool, usize), RangeError> {
    if path.is_empty() {
        return Ok((false, tree.len()));
    }
    match node_at(tree, path) {
        Some(node @ Node::Text(_)) => Ok((true, node.len())),
        Some(node @ Node::Element(_)) => Ok((false, node.len())),
        Some(Node::Raw(_)) => Err(RangeError::InvalidContainer(path.to_vec())),
        None => Err(RangeError::PathNotFound(path.to_vec())),
    }
}

/// Wrap the contents of `range` in the element built by `wrap`
///
/// Works on a clone: `tree` is never modified and the edited copy is
/// returned. Partially selected elements are split, the selected half
/// moving into the wrapper.
pub fn replace_range<F>(tree: &[Node], range: &DomRange, wrap: F) -> Result<Vec<Node>, RangeError>
where
    F: FnOnce(Vec<Node>) -> Element,
{
    if range.is_collapsed() {
        return Err(RangeError::Collapsed);
    }
    let address = RangeAddress::capture(tree, range)?;

    let mut edited = tree.to_vec();
    let range = address.replay(&edited)?;
    let (parent, index, contents) = extract_contents(&mut edited, &range)?;

    let wrapper = wrap(contents);
    let siblings =
        children_at_mut(&mut edited, &parent).ok_or_else(|| RangeError::PathNotFound(parent.clone()))?;
    let index = index.min(siblings.len());
    siblings.insert(index, Node::Element(wrapper));

    prune_empty_text(&mut edited);
    Ok(edited)
}

/// Move the range's contents out of `tree`
///
/// Returns the children list the contents came from and the index where
/// they were.
fn extract_contents(
    tree: &mut Vec<Node>,
    range: &DomRange,
) -> Result<(NodePath, usize, Vec<Node>), RangeError> {
    if range.start.path == range.end.path {
        if let Some(Node::Text(_)) = node_at(tree, &range.start.path) {
            return split_text(tree, range);
        }
    }

    let ancestor = range.common_ancestor();
    let start = climb_start(&range.start, ancestor.len());
    let end = climb_end(tree, &range.end, ancestor.len());

    let children =
        children_at_mut(tree, &ancestor).ok_or_else(|| RangeError::InvalidContainer(ancestor.clone()))?;
    let (index, contents) = extract_children(
        children,
        edge(&start.path[ancestor.len()..], start.offset),
        edge(&end.path[ancestor.len()..], end.offset),
    );
    Ok((ancestor, index, contents))
}

/// Both boundaries inside one text node
fn split_text(
    tree: &mut Vec<Node>,
    range: &DomRange,
) -> Result<(NodePath, usize, Vec<Node>), RangeError> {
    let path = &range.start.path;
    let Some((&idx, parent)) = path.split_last() else {
        return Err(RangeError::InvalidContainer(path.clone()));
    };
    let siblings =
        children_at_mut(tree, parent).ok_or_else(|| RangeError::PathNotFound(parent.to_vec()))?;
    let Some(Node::Text(data)) = siblings.get_mut(idx) else {
        return Err(RangeError::InvalidContainer(path.clone()));
    };

    let from = char_to_byte(data, range.start.offset);
    let to = char_to_byte(data, range.end.offset);
    let after = data.split_off(to);
    let middle = data.split_off(from);
    siblings.insert(idx + 1, Node::Text(after));
    Ok((parent.to_vec(), idx + 1, vec![Node::Text(middle)]))
}

/// Move a start boundary sitting at the very beginning of its container
/// up to just before that container, stopping at `floor` depth
fn climb_start(boundary: &Boundary, floor: usize) -> Boundary {
    let mut current = boundary.clone();
    while current.path.len() > floor && current.offset == 0 {
        let Some(idx) = current.path.pop() else {
            break;
        };
        current.offset = idx;
    }
    current
}

/// Move an end boundary sitting at the very end of its container up to
/// just after that container, stopping at `floor` depth
fn climb_end(tree: &[Node], boundary: &Boundary, floor: usize) -> Boundary {
    let mut current = boundary.clone();
    while current.path.len() > floor {
        let len = node_at(tree, &current.path).map(Node::len).unwrap_or(0);
        if current.offset != len {
            break;
        }
        let Some(idx) = current.path.pop() else {
            break;
        };
        current.offset = idx + 1;
    }
    current
}

/// A boundary seen from one children list
#[derive(Debug, Clone)]
enum Edge {
    /// Between children, at this index
    At(usize),
    /// Inside child `index`, at `offset` of the descendant reached by `rest`
    Within {
        index: usize,
        rest: NodePath,
        offset: usize,
    },
}

fn edge(relative: &[usize], offset: usize) -> Edge {
    match relative.split_first() {
        None => Edge::At(offset),
        Some((&index, rest)) => Edge::Within {
            index,
            rest: rest.to_vec(),
            offset,
        },
    }
}

/// Move everything between `start` and `end` out of `children`
///
/// Returns the index where the moved contents used to begin.
fn extract_children(children: &mut Vec<Node>, start: Edge, end: Edge) -> (usize, Vec<Node>) {
    let mut out = Vec::new();

    let first_full = match start {
        Edge::At(index) => index.min(children.len()),
        Edge::Within {
            index,
            rest,
            offset,
        } => {
            if let Some(node) = children.get_mut(index) {
                out.push(split_off_tail(node, &rest, offset));
            }
            index + 1
        }
    };

    let last_full = match &end {
        Edge::At(index) => (*index).min(children.len()),
        Edge::Within { index, .. } => (*index).min(children.len()),
    };
    if last_full > first_full {
        out.extend(children.drain(first_full..last_full));
    }

    if let Edge::Within { rest, offset, .. } = end {
        // The partially selected end child now directly follows the drained ones
        if let Some(node) = children.get_mut(first_full) {
            out.push(split_off_head(node, &rest, offset));
        }
    }

    (first_full, out)
}

/// Detach the part of `node` after the boundary; `node` keeps the rest
fn split_off_tail(node: &mut Node, rest: &[usize], offset: usize) -> Node {
    match node {
        Node::Text(data) => {
            let at = char_to_byte(data, offset);
            Node::Text(data.split_off(at))
        }
        Node::Element(el) => {
            let mut part = partial_copy(el);
            let len = el.children.len();
            let (_, moved) = extract_children(&mut el.children, edge(rest, offset), Edge::At(len));
            part.children = moved;
            Node::Element(part)
        }
        Node::Raw(_) => Node::Text(String::new()),
    }
}

/// Detach the part of `node` before the boundary; `node` keeps the rest
fn split_off_head(node: &mut Node, rest: &[usize], offset: usize) -> Node {
    match node {
        Node::Text(data) => {
            let at = char_to_byte(data, offset);
            let tail = data.split_off(at);
            Node::Text(std::mem::replace(data, tail))
        }
        Node::Element(el) => {
            let mut part = partial_copy(el);
            let (_, moved) = extract_children(&mut el.children, Edge::At(0), edge(rest, offset));
            part.children = moved;
            Node::Element(part)
        }
        Node::Raw(_) => Node::Text(String::new()),
    }
}

/// Empty copy of a partially selected element
///
/// Annotation markers stay on the original so no two elements share an
/// `about` value.
fn partial_copy(el: &Element) -> Element {
    let mut copy = Element {
        name: el.name.clone(),
        attributes: el.attributes.clone(),
        children: Vec::new(),
        self_closing: el.self_closing,
    };
    if copy.has_attr(attr::ABOUT) {
        strip_annotation_attributes(&mut copy);
    }
    copy
}
