//! External collaborators
//!
//! Term lookup and occurrence persistence are remote calls owned by the
//! host application. Both are fallible and the lookup is cancellable.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use super::types::TermOccurrence;

/// A vocabulary term as returned by the lookup service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Term {
    pub iri: String,
    pub label: String,
    /// IRI of the vocabulary the term belongs to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vocabulary: Option<String>,
}

impl Term {
    pub fn new(iri: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            iri: iri.into(),
            label: label.into(),
            vocabulary: None,
        }
    }
}

/// Remote call failures
///
/// `Clone` so one failed fetch can be reported to every waiter sharing it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceError {
    #[error("Request cancelled")]
    Cancelled,

    #[error("Service unavailable: {0}")]
    Unavailable(String),

    #[error("Request rejected: {0}")]
    Rejected(String),
}

/// Term lookup
#[async_trait]
pub trait TermService: Send + Sync {
    /// Fetch the term identified by `iri`; `Ok(None)` when it does not exist
    async fn fetch_term(
        &self,
        iri: &str,
        token: CancellationToken,
    ) -> Result<Option<Term>, ServiceError>;
}

/// Persistence of confirmed occurrences and definition sources
#[async_trait]
pub trait OccurrenceStore: Send + Sync {
    async fn assign_term(&self, occurrence: &TermOccurrence) -> Result<(), ServiceError>;
}

/// Collaborators handed to a session
#[derive(Clone)]
pub struct Services {
    pub terms: Arc<dyn TermService>,
    pub occurrences: Arc<dyn OccurrenceStore>,
}

impl Services {
    pub fn new(terms: Arc<dyn TermService>, occurrences: Arc<dyn OccurrenceStore>) -> Self {
        Self { terms, occurrences }
    }

    /// Services for read-only use without a backend: every term is
    /// unknown and persistence is refused
    pub fn detached() -> Self {
        Self::new(Arc::new(Detached), Arc::new(Detached))
    }
}

struct Detached;

#[async_trait]
impl TermService for Detached {
    async fn fetch_term(
        &self,
        _iri: &str,
        _token: CancellationToken,
    ) -> Result<Option<Term>, ServiceError> {
        Ok(None)
    }
}

#[async_trait]
impl OccurrenceStore for Detached {
    async fn assign_term(&self, _occurrence: &TermOccurrence) -> Result<(), ServiceError> {
        Err(ServiceError::Unavailable(
            "no occurrence store configured".to_string(),
        ))
    }
}
