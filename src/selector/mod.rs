//! Selector engine
//!
//! Generates and resolves text quote selectors, the identifier-independent
//! way of finding an annotation again after a document reload.

mod locate;
mod types;

pub use locate::{generate_selector, generate_selector_in_context, locate, LocateError};
pub use types::{SelectorType, TextQuoteSelector};
