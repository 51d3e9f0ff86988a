//! HTML processing module
//!
//! Provides the editable document model and its codec:
//! - Tree codec (quick-xml based, entity preserving)
//! - Display link rewriting (lol_html) and its reversal on parse
//! - Head/body envelope handling
//! - Tree addressing and visiting

mod codec;
mod display;
mod document;
mod node;
mod visit;

pub use codec::{
    is_raw_text_element, is_void_element, parse, restore_display_rewrites, serialize, CodecError,
};
pub use display::{is_absolute_link, prepare_for_display};
pub use document::{DocumentError, HtmlDocument};
pub use node::{
    children_at, children_at_mut, node_at, node_at_mut, prune_empty_text, text_content, Element,
    Node, NodePath,
};
pub use visit::{find_elements, text_nodes, walk, Descend, TreeVisitor};
