//! Session-scoped term cache
//!
//! Concurrent lookups of the same IRI share one pending fetch, which runs on
//! its own task; the entry is dropped as soon as that fetch completes. Resolved terms are kept in a
//! bounded LRU so reopening an annotation does not hit the service again.
//!
//! # Thread Safety
//!
//! The pending map is guarded by a `parking_lot::Mutex` that is never held
//! across an await; the LRU uses `tokio::sync::RwLock`.

use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt, Shared};
use lru::LruCache;
use parking_lot::Mutex;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

use super::services::{ServiceError, Term, TermService};

type FetchResult = Result<Option<Term>, ServiceError>;
type PendingFetch = Shared<BoxFuture<'static, FetchResult>>;

const DEFAULT_CAPACITY: usize = 256;

/// Term cache owned by one editing session
#[derive(Clone)]
pub struct TermCache {
    service: Arc<dyn TermService>,

    /// In-flight fetches keyed by term IRI
    pending: Arc<Mutex<HashMap<String, PendingFetch>>>,

    /// Resolved terms with LRU eviction
    resolved: Arc<RwLock<LruCache<String, Term>>>,

    /// Parent of every fetch token; cancelled on shutdown
    root: CancellationToken,
}

impl TermCache {
    pub fn new(service: Arc<dyn TermService>, capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity)
            .or(NonZeroUsize::new(DEFAULT_CAPACITY))
            .unwrap_or(NonZeroUsize::MIN);

        Self {
            service,
            pending: Arc::new(Mutex::new(HashMap::new())),
            resolved: Arc::new(RwLock::new(LruCache::new(capacity))),
            root: CancellationToken::new(),
        }
    }

    /// Look up a term, waiting at most until `token` is cancelled
    ///
    /// Cancelling one waiter does not cancel the shared fetch other waiters
    /// depend on.
    pub async fn fetch(&self, iri: &str, token: &CancellationToken) -> FetchResult {
        if token.is_cancelled() {
            return Err(ServiceError::Cancelled);
        }
        if let Some(term) = self.cached(iri).await {
            tracing::debug!("Term cache hit: {}", iri);
            return Ok(Some(term));
        }

        let fetch = self.pending_fetch(iri);
        tokio::select! {
            biased;
            _ = token.cancelled() => Err(ServiceError::Cancelled),
            outcome = fetch => outcome,
        }
    }

    /// Resolved term, if cached
    pub async fn cached(&self, iri: &str) -> Option<Term> {
        let mut resolved = self.resolved.write().await;
        resolved.get(iri).cloned()
    }

    /// Record a term obtained elsewhere (e.g. from an assignment)
    pub async fn remember(&self, term: Term) {
        let mut resolved = self.resolved.write().await;
        resolved.put(term.iri.clone(), term);
    }

    /// Forget a cached term
    pub async fn invalidate(&self, iri: &str) {
        let mut resolved = self.resolved.write().await;
        resolved.pop(iri);
    }

    /// Number of fetches currently in flight
    pub fn pending_count(&self) -> usize {
        self.pending.lock().len()
    }

    /// Cancel every in-flight fetch
    pub fn shutdown(&self) {
        self.root.cancel();
    }

    fn pending_fetch(&self, iri: &str) -> PendingFetch {
        let mut pending = self.pending.lock();
        if let Some(existing) = pending.get(iri) {
            tracing::debug!("Joining pending fetch for {}", iri);
            return existing.clone();
        }

        let service = self.service.clone();
        let pending_map = self.pending.clone();
        let resolved = self.resolved.clone();
        let token = self.root.child_token();
        let key = iri.to_string();

        let fetch = async move {
            tracing::debug!("Fetching term {}", key);
            let outcome = service.fetch_term(&key, token).await;
            if let Ok(Some(term)) = &outcome {
                resolved.write().await.put(key.clone(), term.clone());
            }
            pending_map.lock().remove(&key);
            outcome
        }
        .boxed()
        .shared();

        pending.insert(iri.to_string(), fetch.clone());
        // Driven to completion even when every waiter gives up, so the
        // entry is always removed
        if let Ok(runtime) = tokio::runtime::Handle::try_current() {
            runtime.spawn(fetch.clone().map(|_| ()));
        }
        fetch
    }
}
