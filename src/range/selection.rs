//! User selection handling
//!
//! The live selection is reached through [`SelectionProvider`], so the
//! reconciliation logic runs the same against a browser-backed provider
//! and the in-memory [`TreeSelection`].

use std::cmp::Ordering;

use crate::annotation::is_block_element;
use crate::html::{node_at, text_nodes, Node, NodePath};

use super::types::{compare_boundaries, Boundary, DomRange};

/// Anchor (where the drag started) and focus (where it ended)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub anchor: Boundary,
    pub focus: Boundary,
}

impl Selection {
    pub fn new(anchor: Boundary, focus: Boundary) -> Self {
        Self { anchor, focus }
    }

    pub fn is_collapsed(&self) -> bool {
        self.anchor == self.focus
    }

    /// Focus lies before the anchor
    pub fn is_backward(&self) -> bool {
        compare_boundaries(&self.focus, &self.anchor) == Ordering::Less
    }

    /// The selection as a range in document order
    pub fn range(&self) -> DomRange {
        DomRange::new(self.anchor.clone(), self.focus.clone())
    }
}

/// Access to the user's current selection
pub trait SelectionProvider {
    /// Current selection, if any
    fn selection(&self) -> Option<Selection>;

    /// Collapse the selection to a single point
    fn collapse(&mut self, at: Boundary);

    /// Move the focus, keeping the anchor
    fn extend(&mut self, to: Boundary);

    /// Drop the selection
    fn clear(&mut self);
}

/// In-memory selection over a document tree
#[derive(Debug, Clone, Default)]
pub struct TreeSelection {
    current: Option<Selection>,
}

impl TreeSelection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Selection dragged from `anchor` to `focus`
    pub fn select(anchor: Boundary, focus: Boundary) -> Self {
        Self {
            current: Some(Selection::new(anchor, focus)),
        }
    }
}

impl SelectionProvider for TreeSelection {
    fn selection(&self) -> Option<Selection> {
        self.current.clone()
    }

    fn collapse(&mut self, at: Boundary) {
        self.current = Some(Selection::new(at.clone(), at));
    }

    fn extend(&mut self, to: Boundary) {
        if let Some(selection) = self.current.as_mut() {
            selection.focus = to;
        }
    }

    fn clear(&mut self) {
        self.current = None;
    }
}

/// A selection is present only when it is not collapsed
pub fn has_selection(provider: &dyn SelectionProvider) -> bool {
    provider.selection().is_some_and(|s| !s.is_collapsed())
}

/// Current non-collapsed selection as a range in document order
pub fn get_selection_range(provider: &dyn SelectionProvider) -> Option<DomRange> {
    provider
        .selection()
        .filter(|s| !s.is_collapsed())
        .map(|s| s.range())
}

/// Does the range sit inside a transient overlay (popup, menu)
///
/// Any ancestor of the range's common ancestor carrying one of
/// `popup_classes` marks the selection as UI chrome.
pub fn is_in_popup(tree: &[Node], range: &DomRange, popup_classes: &[String]) -> bool {
    let ancestor = range.common_ancestor();
    (1..=ancestor.len()).any(|depth| {
        node_at(tree, &ancestor[..depth])
            .and_then(Node::as_element)
            .is_some_and(|el| el.classes().any(|c| popup_classes.iter().any(|p| p == c)))
    })
}

/// Extend both ends of the selection to whole words
///
/// The direction of the drag is kept: for a backward selection the anchor
/// ends up on the extended end and the focus on the extended start.
/// Returns false when there is nothing to extend.
pub fn extend_selection_to_words(provider: &mut dyn SelectionProvider, tree: &[Node]) -> bool {
    let Some(selection) = provider.selection() else {
        return false;
    };
    if selection.is_collapsed() {
        return false;
    }

    let backward = selection.is_backward();
    let extended = extend_range_to_words(tree, &selection.range());

    // Collapse at the new anchor, then re-extend towards the new focus
    if backward {
        provider.collapse(extended.end);
        provider.extend(extended.start);
    } else {
        provider.collapse(extended.start);
        provider.extend(extended.end);
    }
    true
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Widen `range` so it neither starts nor ends inside a word, and drop
/// whitespace at its edges
///
/// Words never continue across a block-level element boundary.
pub fn extend_range_to_words(tree: &[Node], range: &DomRange) -> DomRange {
    let stream = TextStream::new(tree);
    if stream.chars.is_empty() {
        return range.clone();
    }

    let chars = &stream.chars;
    let mut start = stream.position(&range.start);
    let mut end = stream.position(&range.end).max(start);

    while start < end && chars[start].is_whitespace() {
        start += 1;
    }
    while end > start && chars[end - 1].is_whitespace() {
        end -= 1;
    }
    if start == end {
        return range.clone();
    }

    let joined = |a: usize, b: usize| {
        stream.blocks[a] == stream.blocks[b] && is_word_char(chars[a]) && is_word_char(chars[b])
    };
    while start > 0 && joined(start - 1, start) {
        start -= 1;
    }
    while end < chars.len() && joined(end - 1, end) {
        end += 1;
    }

    DomRange {
        start: stream.boundary(start, Edge::Start).unwrap_or_else(|| range.start.clone()),
        end: stream.boundary(end, Edge::End).unwrap_or_else(|| range.end.clone()),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Edge {
    Start,
    End,
}

/// All text of a tree flattened into one character sequence
struct TextStream {
    chars: Vec<char>,
    /// Block run of every character; runs change wherever the nearest
    /// block-level ancestor changes
    blocks: Vec<usize>,
    /// Path, first character index and length of every text node
    segments: Vec<(NodePath, usize, usize)>,
}

impl TextStream {
    fn new(tree: &[Node]) -> Self {
        let mut chars = Vec::new();
        let mut blocks = Vec::new();
        let mut segments = Vec::new();
        let mut run = 0;
        let mut last_block: Option<Option<NodePath>> = None;

        for (path, data) in text_nodes(tree) {
            let block = block_ancestor(tree, &path);
            if last_block.as_ref().is_some_and(|last| *last != block) {
                run += 1;
            }
            last_block = Some(block);

            let base = chars.len();
            chars.extend(data.chars());
            blocks.resize(chars.len(), run);
            segments.push((path, base, chars.len() - base));
        }
        Self {
            chars,
            blocks,
            segments,
        }
    }

    /// Number of characters before `boundary`
    fn position(&self, boundary: &Boundary) -> usize {
        if let Some((_, base, len)) = self.segments.iter().find(|(p, _, _)| *p == boundary.path) {
            return base + boundary.offset.min(*len);
        }

        let mut key = boundary.path.clone();
        key.push(boundary.offset);
        self.segments
            .iter()
            .find(|(p, _, _)| p.as_slice() >= key.as_slice())
            .map(|(_, base, _)| *base)
            .unwrap_or(self.chars.len())
    }

    /// Boundary inside a text node for stream position `pos`
    fn boundary(&self, pos: usize, edge: Edge) -> Option<Boundary> {
        let inside = |base: usize, len: usize| match edge {
            Edge::Start => base <= pos && pos < base + len,
            Edge::End => base < pos && pos <= base + len,
        };
        self.segments
            .iter()
            .find(|(_, base, len)| inside(*base, *len))
            .or_else(|| match edge {
                Edge::Start => self.segments.last(),
                Edge::End => self.segments.first(),
            })
            .map(|(path, base, len)| Boundary::new(path.clone(), pos.saturating_sub(*base).min(*len)))
    }
}

/// Path of the nearest block-level element above the node at `path`
fn block_ancestor(tree: &[Node], path: &[usize]) -> Option<NodePath> {
    (1..path.len()).rev().map(|depth| &path[..depth]).find_map(|prefix| {
        node_at(tree, prefix)
            .and_then(Node::as_element)
            .filter(|el| is_block_element(&el.name))
            .map(|_| prefix.to_vec())
    })
}
