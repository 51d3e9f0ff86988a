//! Annotation lifecycle
//!
//! Drives an editing session over one document:
//! - Selection validation and annotation creation
//! - Term assignment with optimistic updates and rollback
//! - New-term drafts and their cancellation
//! - Cancellable, deduplicated term resolution

mod cache;
mod controller;
mod services;
mod types;

pub use cache::TermCache;
pub use controller::AnnotatorSession;
pub use services::{OccurrenceStore, ServiceError, Services, Term, TermService};
pub use types::{OccurrenceTarget, ResolutionOutcome, SessionState, TermOccurrence, TermResolution};
