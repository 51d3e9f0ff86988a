//! Range primitives
//!
//! Boundaries are addressed by path, like DOM range boundary points: the
//! offset counts characters when the container is a text node and children
//! when it is an element (or the top-level list, addressed by the empty
//! path).

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::html::NodePath;

/// Range reconciliation errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RangeError {
    #[error("Range is collapsed")]
    Collapsed,

    #[error("No node at path {0:?}")]
    PathNotFound(NodePath),

    #[error("Offset {offset} out of bounds at {path:?}")]
    OffsetOutOfBounds { path: NodePath, offset: usize },

    #[error("Node at {0:?} cannot contain a range boundary")]
    InvalidContainer(NodePath),

    #[error("Container at {0:?} no longer matches the captured range")]
    Diverged(NodePath),
}

/// A boundary point: container path plus offset
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Boundary {
    pub path: NodePath,
    pub offset: usize,
}

impl Boundary {
    pub fn new(path: NodePath, offset: usize) -> Self {
        Self { path, offset }
    }
}

/// Document order of two boundary points
pub fn compare_boundaries(a: &Boundary, b: &Boundary) -> Ordering {
    if a.path == b.path {
        return a.offset.cmp(&b.offset);
    }
    if b.path.starts_with(&a.path) {
        // a's container is an ancestor of b's
        let child = b.path[a.path.len()];
        return if child < a.offset {
            Ordering::Greater
        } else {
            Ordering::Less
        };
    }
    if a.path.starts_with(&b.path) {
        let child = a.path[b.path.len()];
        return if child < b.offset {
            Ordering::Less
        } else {
            Ordering::Greater
        };
    }
    a.path.cmp(&b.path)
}

/// A range in document order (`start <= end`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomRange {
    pub start: Boundary,
    pub end: Boundary,
}

impl DomRange {
    /// Range between two points given in any order
    pub fn new(a: Boundary, b: Boundary) -> Self {
        if compare_boundaries(&a, &b) == Ordering::Greater {
            Self { start: b, end: a }
        } else {
            Self { start: a, end: b }
        }
    }

    pub fn is_collapsed(&self) -> bool {
        self.start == self.end
    }

    /// Path of the deepest container holding both boundaries
    pub fn common_ancestor(&self) -> NodePath {
        common_prefix(&self.start.path, &self.end.path)
    }
}

pub(crate) fn common_prefix(a: &[usize], b: &[usize]) -> NodePath {
    a.iter()
        .zip(b.iter())
        .take_while(|(x, y)| x == y)
        .map(|(x, _)| *x)
        .collect()
}

/// Byte index of the `chars`-th character of `text` (clamped to the end)
pub(crate) fn char_to_byte(text: &str, chars: usize) -> usize {
    text.char_indices()
        .nth(chars)
        .map(|(idx, _)| idx)
        .unwrap_or(text.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn b(path: &[usize], offset: usize) -> Boundary {
        Boundary::new(path.to_vec(), offset)
    }

    #[test]
    fn test_compare_same_container() {
        assert_eq!(compare_boundaries(&b(&[0, 1], 2), &b(&[0, 1], 5)), Ordering::Less);
        assert_eq!(compare_boundaries(&b(&[0, 1], 5), &b(&[0, 1], 5)), Ordering::Equal);
    }

    #[test]
    fn test_compare_ancestor_container() {
        // (p, 1) sits between child 0 and child 1 of p
        assert_eq!(compare_boundaries(&b(&[0], 1), &b(&[0, 0], 3)), Ordering::Greater);
        assert_eq!(compare_boundaries(&b(&[0], 1), &b(&[0, 1], 0)), Ordering::Less);
        assert_eq!(compare_boundaries(&b(&[0, 2], 0), &b(&[0], 2)), Ordering::Greater);
    }

    #[test]
    fn test_compare_disjoint_paths() {
        assert_eq!(compare_boundaries(&b(&[0, 5], 9), &b(&[1], 0)), Ordering::Less);
    }

    #[test]
    fn test_range_normalizes_order() {
        let range = DomRange::new(b(&[1, 0], 2), b(&[0, 0], 1));
        assert_eq!(range.start, b(&[0, 0], 1));
        assert_eq!(range.common_ancestor(), Vec::<usize>::new());
    }

    #[test]
    fn test_char_to_byte_multibyte() {
        assert_eq!(char_to_byte("žluť", 1), 2);
        assert_eq!(char_to_byte("žluť", 10), "žluť".len());
    }
}
