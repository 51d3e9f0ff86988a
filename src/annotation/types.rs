//! Annotation vocabulary and summary types
//!
//! An annotation is not a separate object: it is an element carrying RDFa
//! attributes whose `typeof` resolves to one of the two annotation classes.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// RDFa attribute names
pub mod attr {
    pub const ABOUT: &str = "about";
    pub const TYPEOF: &str = "typeof";
    pub const PROPERTY: &str = "property";
    pub const RESOURCE: &str = "resource";
    pub const SCORE: &str = "score";
    pub const CONTENT: &str = "content";
    pub const CLASS: &str = "class";
}

/// Namespace of the term annotation vocabulary
pub const TERMIT_NAMESPACE: &str = "http://onto.fel.cvut.cz/ontologies/application/termit/pojem/";
/// Conventional prefix for [`TERMIT_NAMESPACE`]
pub const TERMIT_PREFIX: &str = "ddo";

/// Class of term occurrence annotations
pub const TERM_OCCURRENCE_CLASS: &str =
    "http://onto.fel.cvut.cz/ontologies/application/termit/pojem/výskyt-termu";
/// Class of term definition source annotations
pub const TERM_DEFINITION_CLASS: &str =
    "http://onto.fel.cvut.cz/ontologies/application/termit/pojem/zdroj-definice-termu";
/// Property linking an occurrence to its term
pub const IS_OCCURRENCE_OF_TERM: &str =
    "http://onto.fel.cvut.cz/ontologies/application/termit/pojem/je-výskytem-termu";
/// Property linking a definition source to its term
pub const IS_DEFINITION_OF_TERM: &str =
    "http://onto.fel.cvut.cz/ontologies/application/termit/pojem/je-zdrojem-definice-termu";

/// Class token marking annotation elements for styling; variants such as
/// `annotation-occurrence` share the prefix
pub const ANNOTATION_CLASS: &str = "annotation";

/// Prefix of blank node identifiers
pub const BLANK_NODE_PREFIX: &str = "_:";

/// The two recognized annotation classes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnnotationKind {
    /// Term occurrence
    Occurrence,
    /// Term definition source
    Definition,
}

impl AnnotationKind {
    /// IRI of the annotation class (`typeof`)
    pub fn class_iri(self) -> &'static str {
        match self {
            Self::Occurrence => TERM_OCCURRENCE_CLASS,
            Self::Definition => TERM_DEFINITION_CLASS,
        }
    }

    /// IRI of the relation to the term (`property`)
    pub fn property_iri(self) -> &'static str {
        match self {
            Self::Occurrence => IS_OCCURRENCE_OF_TERM,
            Self::Definition => IS_DEFINITION_OF_TERM,
        }
    }

    /// Kind for a resolved `typeof` IRI
    pub fn from_class_iri(iri: &str) -> Option<Self> {
        match iri {
            TERM_OCCURRENCE_CLASS => Some(Self::Occurrence),
            TERM_DEFINITION_CLASS => Some(Self::Definition),
            _ => None,
        }
    }
}

/// Visual state of an annotation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnnotationStatus {
    /// No term decided yet
    Pending,
    /// Machine suggestion (has a score, no term)
    Suggested,
    /// Term assigned
    Confirmed,
    /// Term could not be resolved or saved
    Unresolved,
}

/// Read-only summary of an annotation element
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotationView {
    pub about: String,
    pub kind: AnnotationKind,
    /// Resolved term IRI
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    /// Rendered text of the annotated region
    pub text: String,
    /// Alternate textual value
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    pub status: AnnotationStatus,
}

/// Generate a fresh blank node marker for a new annotation
pub fn new_about() -> String {
    let id = Uuid::new_v4().simple().to_string();
    format!("{}{}", BLANK_NODE_PREFIX, &id[..8])
}
