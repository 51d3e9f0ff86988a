//! Text quote selector types
//!
//! Follows the W3C Web Annotation `TextQuoteSelector`: the quoted text plus
//! optional context on either side.
//!
//! Reference: <https://www.w3.org/TR/annotation-model/#text-quote-selector>

use serde::{Deserialize, Serialize};

/// Selector class IRIs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SelectorType {
    #[serde(rename = "http://www.w3.org/ns/oa#TextQuoteSelector")]
    TextQuoteSelector,
}

/// Content-based descriptor used to find an annotation again after reload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextQuoteSelector {
    /// Rendered text of the annotated node at generation time
    #[serde(rename = "exactMatch")]
    pub exact_match: String,
    /// Text expected before the annotation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
    /// Text expected after the annotation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suffix: Option<String>,
    pub types: Vec<SelectorType>,
}

impl TextQuoteSelector {
    /// Selector without context
    pub fn new(exact_match: impl Into<String>) -> Self {
        Self {
            exact_match: exact_match.into(),
            prefix: None,
            suffix: None,
            types: vec![SelectorType::TextQuoteSelector],
        }
    }

    /// Set the preceding context
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// Set the following context
    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = Some(suffix.into());
        self
    }

    /// Whether any context is present
    pub fn has_context(&self) -> bool {
        self.prefix.is_some() || self.suffix.is_some()
    }
}
