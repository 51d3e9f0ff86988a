//! Selection and range reconciliation
//!
//! Turns a raw user selection into a range that can be wrapped safely:
//! - Word extension (the drag direction is preserved)
//! - Popup detection
//! - Widening ranges that cross element depths
//! - Clone-then-swap wrapping through recorded range addresses

mod reconcile;
mod selection;
mod types;

pub use reconcile::{
    does_range_span_multiple_elements, extend_range_to_prevent_node_crossing, replace_range,
    BoundaryAddress, RangeAddress,
};
pub use selection::{
    extend_range_to_words, extend_selection_to_words, get_selection_range, has_selection,
    is_in_popup, Selection, SelectionProvider, TreeSelection,
};
pub use types::{compare_boundaries, Boundary, DomRange, RangeError};
