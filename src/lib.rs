//! Term Annotator Library
//!
//! Annotation engine for HTML documents carrying RDFa term markup.
//! The binary in main.rs is a thin reporting front end.
//!
//! # Modules
//!
//! - `prefix`: RDFa prefix declarations and IRI shortening
//! - `html`: Entity-preserving HTML tree codec and document envelope
//! - `selector`: Text quote selectors for re-finding annotations
//! - `range`: Selection handling and clone-then-swap range wrapping
//! - `annotation`: Annotation detection, creation and removal
//! - `session`: Annotation lifecycle over one loaded document

pub mod annotation;
pub mod config;
pub mod error;
pub mod html;
pub mod prefix;
pub mod range;
pub mod selector;
pub mod session;

pub use config::Config;
pub use error::{AnnotatorError, Result};
pub use session::{AnnotatorSession, OccurrenceStore, Services, Term, TermService};
