//! Selector generation and resolution
//!
//! Annotation markers (`about`) are not guaranteed to survive a round trip
//! through text analysis, so annotations are found again by their text.
//! Resolution prefers precision: an exact text match beats a
//! whitespace-insensitive one, and within each tier a candidate is only
//! returned when it is unique or its context confirms it.

use thiserror::Error;

use crate::annotation::annotation_paths;
use crate::html::{children_at, node_at, Node, NodePath};
use crate::prefix::PrefixMap;

use super::types::TextQuoteSelector;

/// Selector resolution errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LocateError {
    #[error("No annotation matches '{0}'")]
    NotFound(String),

    #[error("{count} annotations match '{exact}' and none is confirmed by context")]
    Ambiguous { exact: String, count: usize },
}

/// Selector for a node: its rendered text, no context
pub fn generate_selector(node: &Node) -> TextQuoteSelector {
    TextQuoteSelector::new(node.text_content())
}

/// Selector for the node at `path`, with up to `context_len` characters of
/// the neighbouring siblings' text as prefix and suffix
pub fn generate_selector_in_context(
    tree: &[Node],
    path: &[usize],
    context_len: usize,
) -> Option<TextQuoteSelector> {
    let node = node_at(tree, path)?;
    let mut selector = generate_selector(node);
    if context_len == 0 {
        return Some(selector);
    }

    let (before, after) = sibling_texts(tree, path);
    let prefix = last_chars(&before, context_len);
    let suffix = first_chars(&after, context_len);
    if !prefix.trim().is_empty() {
        selector = selector.with_prefix(prefix);
    }
    if !suffix.trim().is_empty() {
        selector = selector.with_suffix(suffix);
    }
    Some(selector)
}

/// Find the annotation described by `selector`
pub fn locate(
    tree: &[Node],
    prefix_map: &PrefixMap,
    selector: &TextQuoteSelector,
) -> Result<NodePath, LocateError> {
    let wanted_loose = strip_whitespace(&selector.exact_match);
    let mut exact: Vec<NodePath> = Vec::new();
    let mut loose: Vec<NodePath> = Vec::new();

    for path in annotation_paths(tree, prefix_map) {
        let Some(node) = node_at(tree, &path) else {
            continue;
        };
        let text = node.text_content();
        if text == selector.exact_match {
            exact.push(path.clone());
        }
        if strip_whitespace(&text) == wanted_loose {
            loose.push(path);
        }
    }

    if let Some(found) = pick(tree, &exact, selector) {
        return Ok(found);
    }
    // Exact matches are also loose matches, so a loose candidate is only
    // unique when no other text variant exists
    if let Some(found) = pick(tree, &loose, selector) {
        tracing::debug!("Selector '{}' resolved by loose match", selector.exact_match);
        return Ok(found);
    }

    let count = loose.len();
    if count == 0 {
        Err(LocateError::NotFound(selector.exact_match.clone()))
    } else {
        Err(LocateError::Ambiguous {
            exact: selector.exact_match.clone(),
            count,
        })
    }
}

/// Unique candidate, or the first one whose context matches
fn pick(tree: &[Node], candidates: &[NodePath], selector: &TextQuoteSelector) -> Option<NodePath> {
    if candidates.len() == 1 {
        return candidates.first().cloned();
    }
    candidates
        .iter()
        .find(|path| context_matches(tree, path, selector))
        .cloned()
}

fn context_matches(tree: &[Node], path: &[usize], selector: &TextQuoteSelector) -> bool {
    let (before, after) = sibling_texts(tree, path);
    let prefix_ok = selector
        .prefix
        .as_deref()
        .map_or(true, |prefix| before.contains(prefix));
    let suffix_ok = selector
        .suffix
        .as_deref()
        .map_or(true, |suffix| after.contains(suffix));
    prefix_ok && suffix_ok
}

/// Text of the preceding and following sibling of the node at `path`
fn sibling_texts(tree: &[Node], path: &[usize]) -> (String, String) {
    let Some((&idx, parent)) = path.split_last() else {
        return (String::new(), String::new());
    };
    let Some(siblings) = children_at(tree, parent) else {
        return (String::new(), String::new());
    };

    let before = idx
        .checked_sub(1)
        .and_then(|i| siblings.get(i))
        .map(Node::text_content)
        .unwrap_or_default();
    let after = siblings
        .get(idx + 1)
        .map(Node::text_content)
        .unwrap_or_default();
    (before, after)
}

fn strip_whitespace(text: &str) -> String {
    text.chars().filter(|c| !c.is_whitespace()).collect()
}

fn last_chars(text: &str, n: usize) -> String {
    let count = text.chars().count();
    text.chars().skip(count.saturating_sub(n)).collect()
}

fn first_chars(text: &str, n: usize) -> String {
    text.chars().take(n).collect()
}
