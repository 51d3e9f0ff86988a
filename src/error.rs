//! Annotator error types
//!
//! Module errors are folded into one type for callers of the session API.

use thiserror::Error;

use crate::annotation::AnnotationKind;
use crate::html::{CodecError, DocumentError};
use crate::prefix::PrefixError;
use crate::range::RangeError;
use crate::selector::LocateError;
use crate::session::ServiceError;

/// Unified annotator error type
#[derive(Debug, Error)]
pub enum AnnotatorError {
    /// Document envelope or prefix declaration could not be read
    #[error(transparent)]
    Document(#[from] DocumentError),

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error("Invalid prefix declaration: {0}")]
    Prefix(#[from] PrefixError),

    /// Selector did not resolve to an annotation
    #[error("Could not find annotation: {0}")]
    Locate(#[from] LocateError),

    #[error("Range error: {0}")]
    Range(#[from] RangeError),

    /// Term lookup or persistence failed
    #[error("Service error: {0}")]
    Service(#[from] ServiceError),

    /// No annotation with this `about` marker
    #[error("Annotation not found: {0}")]
    AnnotationNotFound(String),

    #[error("Annotation {about} is a {actual:?} annotation")]
    KindMismatch { about: String, actual: AnnotationKind },

    /// Annotation has no term assigned
    #[error("Annotation {0} has no term")]
    NoResource(String),
}

/// Result type for annotator operations
pub type Result<T> = std::result::Result<T, AnnotatorError>;
