//! Session types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::annotation::AnnotationKind;
use crate::selector::TextQuoteSelector;

use super::cache::TermCache;
use super::services::{ServiceError, Term};

/// Editing session state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SessionState {
    /// Nothing in progress
    Idle,
    /// Valid selection, purpose not chosen yet
    SelectionPending,
    /// Annotation created, no term assigned yet
    AnnotatedPendingTerm,
    /// Term or definition assigned
    AnnotatedConfirmed,
}

/// Where an occurrence lives: the document plus a selector into it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OccurrenceTarget {
    /// Document IRI
    pub source: String,
    pub selector: TextQuoteSelector,
}

/// Payload handed to the occurrence store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TermOccurrence {
    pub kind: AnnotationKind,
    /// Term IRI
    pub term: String,
    pub target: OccurrenceTarget,
    pub created_at: DateTime<Utc>,
}

/// An in-flight term lookup for one annotation
///
/// Created by the session, run without borrowing it, and handed back to
/// the session when done. Removing or retargeting the annotation cancels
/// the token; the session then discards the outcome.
pub struct TermResolution {
    pub(crate) about: String,
    pub(crate) iri: String,
    pub(crate) token: CancellationToken,
    pub(crate) cache: TermCache,
}

impl TermResolution {
    pub fn about(&self) -> &str {
        &self.about
    }

    pub fn iri(&self) -> &str {
        &self.iri
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Fetch the term through the session cache
    pub async fn run(self) -> ResolutionOutcome {
        let result = self.cache.fetch(&self.iri, &self.token).await;
        ResolutionOutcome {
            about: self.about,
            iri: self.iri,
            token: self.token,
            result,
        }
    }
}

/// Result of a finished [`TermResolution`]
#[derive(Debug)]
pub struct ResolutionOutcome {
    pub(crate) about: String,
    pub(crate) iri: String,
    pub(crate) token: CancellationToken,
    pub(crate) result: Result<Option<Term>, ServiceError>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selector::TextQuoteSelector;

    #[test]
    fn test_occurrence_payload_shape() {
        let occurrence = TermOccurrence {
            kind: AnnotationKind::Occurrence,
            term: "http://example.org/pojem/zákon".to_string(),
            target: OccurrenceTarget {
                source: "http://example.org/doc".to_string(),
                selector: TextQuoteSelector::new("zákona"),
            },
            created_at: Utc::now(),
        };
        let json = serde_json::to_value(&occurrence).unwrap();

        assert_eq!(json["kind"], "occurrence");
        assert_eq!(json["target"]["source"], "http://example.org/doc");
        assert_eq!(json["target"]["selector"]["exactMatch"], "zákona");
        assert!(json.get("createdAt").is_some());
    }
}
