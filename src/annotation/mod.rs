//! Annotation module
//!
//! Annotations are elements carrying RDFa attributes:
//!
//! ```text
//! <span about="_:a1b2c3d4"
//!       property="ddo:je-výskytem-termu"
//!       typeof="ddo:výskyt-termu"
//!       resource="ddo:zákon"
//!       score="0.82">zákona</span>
//! ```
//!
//! - `about`: blank node marker, unique per document
//! - `typeof`: occurrence or definition source class
//! - `resource`: assigned term (absent while undecided)
//! - `score`: confidence of a machine suggestion
//! - `content`: alternate text when the rendered text overlaps others

mod ops;
mod types;

pub use ops::{
    annotation_kind, annotation_paths, annotation_view, contains_block_element,
    create_new_annotation, find_annotation, find_annotation_path, is_annotation,
    is_annotation_with_minimum_score, is_block_element, remove_annotation, replace_annotation,
    resource_iri, score, set_resource, strip_annotation_attributes, BLOCK_ELEMENTS,
};
pub use types::{
    attr, new_about, AnnotationKind, AnnotationStatus, AnnotationView, ANNOTATION_CLASS,
    BLANK_NODE_PREFIX, IS_DEFINITION_OF_TERM, IS_OCCURRENCE_OF_TERM, TERMIT_NAMESPACE,
    TERMIT_PREFIX, TERM_DEFINITION_CLASS, TERM_OCCURRENCE_CLASS,
};
