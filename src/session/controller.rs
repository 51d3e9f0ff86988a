//! Annotation lifecycle controller
//!
//! One [`AnnotatorSession`] owns one loaded document. Every tree mutation
//! goes through `&mut self`: tree edits are built on a clone and swapped in
//! whole, so a failed edit leaves the document as it was.

use std::collections::{HashMap, HashSet};

use chrono::Utc;
use tokio_util::sync::CancellationToken;

use crate::annotation::{
    annotation_kind, annotation_view, attr, create_new_annotation, find_annotation_path,
    is_annotation, is_annotation_with_minimum_score, new_about, remove_annotation,
    replace_annotation, resource_iri, set_resource, AnnotationKind, AnnotationStatus,
    AnnotationView,
};
use crate::config::{AnnotationConfig, Config};
use crate::error::{AnnotatorError, Result};
use crate::html::{
    node_at, node_at_mut, walk, Descend, Element, HtmlDocument, Node, NodePath, TreeVisitor,
};
use crate::prefix::PrefixMap;
use crate::range::{
    extend_range_to_prevent_node_crossing, extend_selection_to_words, get_selection_range,
    is_in_popup, replace_range, DomRange, SelectionProvider,
};
use crate::selector::{generate_selector_in_context, locate, LocateError, TextQuoteSelector};

use super::cache::TermCache;
use super::services::{ServiceError, Services, Term};
use super::types::{
    OccurrenceTarget, ResolutionOutcome, SessionState, TermOccurrence, TermResolution,
};

/// Annotations created while a new term is being defined
#[derive(Debug, Default)]
struct NewTermDraft {
    annotations: Vec<String>,
}

/// Editing session over one document
pub struct AnnotatorSession {
    document: HtmlDocument,
    document_iri: String,
    tree: Vec<Node>,
    prefix_map: PrefixMap,
    config: AnnotationConfig,
    services: Services,
    terms: TermCache,
    state: SessionState,
    /// The one annotation pinned open
    sticky: Option<String>,
    selection: Option<DomRange>,
    draft: Option<NewTermDraft>,
    /// Created in this session and not persisted yet
    created: HashSet<String>,
    unresolved: HashSet<String>,
    /// Cancellation token of each running term lookup
    resolutions: HashMap<String, CancellationToken>,
}

impl AnnotatorSession {
    /// Load a full HTML document
    ///
    /// Fails when the prefix declaration is malformed; nothing is kept in
    /// that case.
    pub fn load(
        html: &str,
        document_iri: impl Into<String>,
        services: Services,
        config: &Config,
    ) -> Result<Self> {
        let document = HtmlDocument::split(html);
        let prefix_map = document.prefix_map()?;
        let tree = document.parse_body()?;
        let document_iri = document_iri.into();
        let terms = TermCache::new(services.terms.clone(), config.cache.resolved_terms);

        tracing::info!(
            "Loaded document {} ({} prefixes, {} top-level nodes)",
            document_iri,
            prefix_map.len(),
            tree.len()
        );

        Ok(Self {
            document,
            document_iri,
            tree,
            prefix_map,
            config: config.annotation.clone(),
            services,
            terms,
            state: SessionState::Idle,
            sticky: None,
            selection: None,
            draft: None,
            created: HashSet::new(),
            unresolved: HashSet::new(),
            resolutions: HashMap::new(),
        })
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn sticky(&self) -> Option<&str> {
        self.sticky.as_deref()
    }

    pub fn tree(&self) -> &[Node] {
        &self.tree
    }

    pub fn prefix_map(&self) -> &PrefixMap {
        &self.prefix_map
    }

    pub fn document_iri(&self) -> &str {
        &self.document_iri
    }

    pub fn term_cache(&self) -> &TermCache {
        &self.terms
    }

    /// Range of the last accepted selection
    pub fn pending_selection(&self) -> Option<&DomRange> {
        self.selection.as_ref()
    }

    /// Validate and normalize the user's selection
    ///
    /// The selection is extended to whole words and widened when it crosses
    /// element depths. Missing selections and selections inside popups are
    /// dropped and yield `None`.
    pub fn select(&mut self, provider: &mut dyn SelectionProvider) -> Option<DomRange> {
        let Some(range) = get_selection_range(provider) else {
            self.reset_selection(provider);
            return None;
        };
        if is_in_popup(&self.tree, &range, &self.config.popup_classes) {
            tracing::debug!("Ignoring selection inside a popup");
            self.reset_selection(provider);
            return None;
        }

        extend_selection_to_words(provider, &self.tree);
        let Some(range) = get_selection_range(provider) else {
            self.reset_selection(provider);
            return None;
        };
        let range = extend_range_to_prevent_node_crossing(&self.tree, &range);

        self.selection = Some(range.clone());
        self.state = SessionState::SelectionPending;
        Some(range)
    }

    /// Wrap the selection in a new term occurrence
    pub fn mark_occurrence(&mut self, provider: &mut dyn SelectionProvider) -> Option<String> {
        self.mark(provider, AnnotationKind::Occurrence)
    }

    /// Wrap the selection in a new definition source
    ///
    /// While a new term is being defined the annotation belongs to it and
    /// goes away if the term is cancelled.
    pub fn mark_definition(&mut self, provider: &mut dyn SelectionProvider) -> Option<String> {
        self.mark(provider, AnnotationKind::Definition)
    }

    fn mark(&mut self, provider: &mut dyn SelectionProvider, kind: AnnotationKind) -> Option<String> {
        let range = self.select(provider)?;
        let about = new_about();

        let prefix_map = &self.prefix_map;
        let edited = replace_range(&self.tree, &range, |nodes| {
            create_new_annotation(&about, nodes, kind, prefix_map)
        });

        match edited {
            Ok(tree) => {
                self.tree = tree;
                provider.clear();
                self.selection = None;
                self.created.insert(about.clone());
                if kind == AnnotationKind::Definition {
                    if let Some(draft) = self.draft.as_mut() {
                        draft.annotations.push(about.clone());
                    }
                }
                self.set_sticky(Some(&about));
                self.state = SessionState::AnnotatedPendingTerm;
                tracing::info!("Created {:?} annotation {}", kind, about);
                Some(about)
            }
            Err(err) => {
                tracing::warn!("Could not wrap selection: {}", err);
                self.reset_selection(provider);
                None
            }
        }
    }

    /// Start defining a new term from the annotation `about`
    pub fn begin_new_term(&mut self, about: &str) -> Result<()> {
        self.require(about)?;
        let draft = self.draft.get_or_insert_with(NewTermDraft::default);
        if !draft.annotations.iter().any(|a| a == about) {
            draft.annotations.push(about.to_string());
        }
        self.set_sticky(Some(about));
        tracing::info!("New term started from {}", about);
        Ok(())
    }

    /// Abandon the new term
    ///
    /// Annotations created for it are removed unless they carry a `score`
    /// (machine suggestion) or a `resource` (already confirmed). Returns
    /// the removed markers.
    pub fn cancel_new_term(&mut self) -> Vec<String> {
        let Some(draft) = self.draft.take() else {
            return Vec::new();
        };

        let mut removed = Vec::new();
        for about in draft.annotations {
            let Some(path) = find_annotation_path(&self.tree, &about, &self.prefix_map) else {
                continue;
            };
            let keep = node_at(&self.tree, &path)
                .and_then(Node::as_element)
                .is_some_and(|el| el.has_attr(attr::SCORE) || el.has_attr(attr::RESOURCE));
            if keep {
                tracing::debug!("Keeping {} after new term cancellation", about);
                continue;
            }
            if self.remove_at(&about, &path) {
                removed.push(about);
            }
        }

        self.state = SessionState::Idle;
        tracing::info!("New term cancelled, {} annotations removed", removed.len());
        removed
    }

    /// Assign `term` to the occurrence `about` and persist it
    pub async fn assign_term(&mut self, about: &str, term: &Term) -> Result<()> {
        self.assign(about, term, AnnotationKind::Occurrence).await
    }

    /// Record the annotation `about` as the definition source of `term`
    pub async fn assign_definition_source(&mut self, about: &str, term: &Term) -> Result<()> {
        self.assign(about, term, AnnotationKind::Definition).await
    }

    /// Optimistic update, then persistence
    ///
    /// On failure an annotation created in this session is removed again;
    /// an older one gets its previous attributes back and is marked
    /// unresolved.
    async fn assign(&mut self, about: &str, term: &Term, kind: AnnotationKind) -> Result<()> {
        let path = self.require(about)?;
        let previous = self.element(&path)?.clone();
        let actual = annotation_kind(&previous, &self.prefix_map)
            .ok_or_else(|| AnnotatorError::AnnotationNotFound(about.to_string()))?;
        if actual != kind {
            return Err(AnnotatorError::KindMismatch {
                about: about.to_string(),
                actual,
            });
        }

        if resource_iri(&previous, &self.prefix_map).is_some_and(|iri| iri != term.iri) {
            self.cancel_resolution(about);
        }
        if let Some(el) = node_at_mut(&mut self.tree, &path).and_then(Node::as_element_mut) {
            set_resource(el, &term.iri, &self.prefix_map);
        }

        let selector = self.selector_at(&path)?;
        let occurrence = TermOccurrence {
            kind,
            term: term.iri.clone(),
            target: OccurrenceTarget {
                source: self.document_iri.clone(),
                selector,
            },
            created_at: Utc::now(),
        };

        match self.services.occurrences.assign_term(&occurrence).await {
            Ok(()) => {
                self.created.remove(about);
                self.unresolved.remove(about);
                self.terms.remember(term.clone()).await;
                self.state = SessionState::AnnotatedConfirmed;
                tracing::info!("Assigned {} to {}", term.iri, about);
                Ok(())
            }
            Err(err) => {
                if self.created.contains(about) {
                    tracing::warn!("Persisting {} failed, rolling back: {}", about, err);
                    self.remove_at(about, &path);
                } else {
                    tracing::warn!("Persisting {} failed, marking unresolved: {}", about, err);
                    replace_annotation(&mut self.tree, about, previous, &self.prefix_map);
                    self.unresolved.insert(about.to_string());
                }
                self.state = SessionState::Idle;
                Err(err.into())
            }
        }
    }

    /// Clear the term of `about` locally
    pub fn unassign_term(&mut self, about: &str) -> Result<()> {
        let path = self.require(about)?;
        self.cancel_resolution(about);
        if let Some(el) = node_at_mut(&mut self.tree, &path).and_then(Node::as_element_mut) {
            el.remove_attr(attr::RESOURCE);
        }
        self.unresolved.remove(about);
        self.state = SessionState::AnnotatedPendingTerm;
        tracing::debug!("Unassigned term of {}", about);
        Ok(())
    }

    /// Remove the annotation `about`, keeping its text
    pub fn remove(&mut self, about: &str) -> Result<()> {
        let path = self.require(about)?;
        self.remove_at(about, &path);
        if let Some(draft) = self.draft.as_mut() {
            draft.annotations.retain(|a| a != about);
        }
        self.state = SessionState::Idle;
        tracing::info!("Removed annotation {}", about);
        Ok(())
    }

    /// Pin an annotation open; any previously pinned one is released
    pub fn set_sticky(&mut self, about: Option<&str>) {
        if let Some(previous) = self.sticky.as_deref() {
            if about != Some(previous) {
                tracing::debug!("Releasing sticky annotation {}", previous);
            }
        }
        self.sticky = about.map(str::to_string);
    }

    /// Close whatever is open and return to idle
    pub fn dismiss(&mut self) {
        self.sticky = None;
        self.selection = None;
        self.state = SessionState::Idle;
    }

    /// Find an annotation by selector and pin it open
    pub fn focus_selector(&mut self, selector: &TextQuoteSelector) -> Result<String> {
        let path = locate(&self.tree, &self.prefix_map, selector)?;
        let about = node_at(&self.tree, &path)
            .and_then(Node::as_element)
            .and_then(|el| el.attr(attr::ABOUT))
            .map(str::to_string)
            .ok_or_else(|| LocateError::NotFound(selector.exact_match.clone()))?;
        self.set_sticky(Some(&about));
        Ok(about)
    }

    /// Selector that finds `about` again after a reload
    pub fn selector_for(&self, about: &str) -> Result<TextQuoteSelector> {
        let path = self.require(about)?;
        self.selector_at(&path)
    }

    /// Annotations meeting `min_score` (the configured one when `None`)
    pub fn annotations(&self, min_score: Option<f64>) -> Vec<AnnotationView> {
        let mut collector = AnnotationCollector {
            prefix_map: &self.prefix_map,
            min_score: min_score.unwrap_or(self.config.min_score),
            unresolved: &self.unresolved,
            found: Vec::new(),
        };
        walk(&self.tree, &mut collector);
        collector.found
    }

    /// The full document with the current body
    pub fn to_html(&self) -> String {
        self.document.to_html(&self.tree)
    }

    /// Start resolving the term of `about`
    ///
    /// A lookup already running for the annotation is cancelled.
    pub fn begin_resolution(&mut self, about: &str) -> Result<TermResolution> {
        let path = self.require(about)?;
        let iri = resource_iri(self.element(&path)?, &self.prefix_map)
            .ok_or_else(|| AnnotatorError::NoResource(about.to_string()))?;

        self.cancel_resolution(about);
        let token = CancellationToken::new();
        self.resolutions.insert(about.to_string(), token.clone());

        Ok(TermResolution {
            about: about.to_string(),
            iri,
            token,
            cache: self.terms.clone(),
        })
    }

    /// Apply a finished lookup; cancelled lookups change nothing
    pub fn finish_resolution(&mut self, outcome: ResolutionOutcome) -> Option<Term> {
        if outcome.token.is_cancelled() {
            tracing::debug!("Discarding cancelled lookup of {} for {}", outcome.iri, outcome.about);
            return None;
        }
        self.resolutions.remove(&outcome.about);

        match outcome.result {
            Ok(Some(term)) => {
                self.unresolved.remove(&outcome.about);
                Some(term)
            }
            Ok(None) => {
                tracing::warn!("Term {} of {} does not exist", outcome.iri, outcome.about);
                self.unresolved.insert(outcome.about);
                None
            }
            Err(ServiceError::Cancelled) => None,
            Err(err) => {
                tracing::warn!("Resolving {} failed: {}", outcome.iri, err);
                self.unresolved.insert(outcome.about);
                None
            }
        }
    }

    /// Resolve the term of `about` in place
    pub async fn resolve_term(&mut self, about: &str) -> Result<Option<Term>> {
        let resolution = self.begin_resolution(about)?;
        let outcome = resolution.run().await;
        Ok(self.finish_resolution(outcome))
    }

    fn require(&self, about: &str) -> Result<NodePath> {
        find_annotation_path(&self.tree, about, &self.prefix_map)
            .ok_or_else(|| AnnotatorError::AnnotationNotFound(about.to_string()))
    }

    fn element(&self, path: &[usize]) -> Result<&Element> {
        node_at(&self.tree, path)
            .and_then(Node::as_element)
            .ok_or_else(|| AnnotatorError::AnnotationNotFound(format!("{:?}", path)))
    }

    fn selector_at(&self, path: &[usize]) -> Result<TextQuoteSelector> {
        generate_selector_in_context(&self.tree, path, self.config.selector_context)
            .ok_or_else(|| AnnotatorError::AnnotationNotFound(format!("{:?}", path)))
    }

    fn remove_at(&mut self, about: &str, path: &[usize]) -> bool {
        self.cancel_resolution(about);
        let removed = remove_annotation(&mut self.tree, path);
        self.created.remove(about);
        self.unresolved.remove(about);
        if self.sticky.as_deref() == Some(about) {
            self.sticky = None;
        }
        removed
    }

    fn cancel_resolution(&mut self, about: &str) {
        if let Some(token) = self.resolutions.remove(about) {
            tracing::debug!("Cancelling term lookup for {}", about);
            token.cancel();
        }
    }

    fn reset_selection(&mut self, provider: &mut dyn SelectionProvider) {
        provider.clear();
        self.selection = None;
        if self.state == SessionState::SelectionPending {
            self.state = SessionState::Idle;
        }
    }
}

impl Drop for AnnotatorSession {
    fn drop(&mut self) {
        for token in self.resolutions.values() {
            token.cancel();
        }
        self.terms.shutdown();
    }
}

/// Collects annotation summaries in document order
struct AnnotationCollector<'a> {
    prefix_map: &'a PrefixMap,
    min_score: f64,
    unresolved: &'a HashSet<String>,
    found: Vec<AnnotationView>,
}

impl TreeVisitor for AnnotationCollector<'_> {
    fn visit_element(&mut self, _path: &NodePath, element: &Element) -> Descend {
        if is_annotation(element, self.prefix_map)
            && is_annotation_with_minimum_score(element, self.min_score)
        {
            if let Some(mut view) = annotation_view(element, self.prefix_map) {
                if self.unresolved.contains(&view.about) {
                    view.status = AnnotationStatus::Unresolved;
                }
                self.found.push(view);
            }
        }
        Descend::Yes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::TERMIT_NAMESPACE;
    use crate::range::{Boundary, TreeSelection};
    use crate::session::{OccurrenceStore, TermService};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct MockTerms {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl TermService for MockTerms {
        async fn fetch_term(
            &self,
            iri: &str,
            _token: CancellationToken,
        ) -> std::result::Result<Option<Term>, ServiceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if iri.ends_with("missing") {
                return Ok(None);
            }
            Ok(Some(Term::new(iri, "term")))
        }
    }

    struct MockStore {
        fail: bool,
        saved: Mutex<Vec<TermOccurrence>>,
    }

    #[async_trait]
    impl OccurrenceStore for MockStore {
        async fn assign_term(
            &self,
            occurrence: &TermOccurrence,
        ) -> std::result::Result<(), ServiceError> {
            if self.fail {
                return Err(ServiceError::Unavailable("store down".to_string()));
            }
            self.saved.lock().push(occurrence.clone());
            Ok(())
        }
    }

    struct Fixture {
        terms: Arc<MockTerms>,
        store: Arc<MockStore>,
    }

    impl Fixture {
        fn new(fail: bool) -> Self {
            Self {
                terms: Arc::new(MockTerms {
                    calls: AtomicUsize::new(0),
                }),
                store: Arc::new(MockStore {
                    fail,
                    saved: Mutex::new(Vec::new()),
                }),
            }
        }

        fn load(&self, body: &str) -> AnnotatorSession {
            let services = Services::new(self.terms.clone(), self.store.clone());
            AnnotatorSession::load(&doc(body), DOC_IRI, services, &Config::default()).unwrap()
        }
    }

    const DOC_IRI: &str = "http://example.org/documents/law";

    const SENTENCE: &str = "<p>Podle civilního zákona se řídí smlouvy.</p>";

    const SUGGESTIONS: &str = concat!(
        r#"<p>Podle <span about="_:1" property="ddo:je-výskytem-termu" typeof="ddo:výskyt-termu" score="0.8">zákona</span>"#,
        r#" a <span about="_:2" property="ddo:je-výskytem-termu" typeof="ddo:výskyt-termu" resource="ddo:vyhláška">vyhlášky</span>"#,
        " platí pravidla.</p>"
    );

    fn doc(body: &str) -> String {
        format!(
            r#"<html prefix="ddo: {}"><head><title>Law</title></head><body>{}</body></html>"#,
            TERMIT_NAMESPACE, body
        )
    }

    fn select(path: &[usize], from: usize, to: usize) -> TreeSelection {
        TreeSelection::select(Boundary::new(path.to_vec(), from), Boundary::new(path.to_vec(), to))
    }

    fn term(local: &str) -> Term {
        Term::new(format!("{}{}", TERMIT_NAMESPACE, local), local)
    }

    #[test]
    fn test_load_rejects_bad_prefixes() {
        let html = r#"<html prefix="ddo http://example.org/"><body><p>x</p></body></html>"#;
        let result = AnnotatorSession::load(html, DOC_IRI, Services::detached(), &Config::default());
        assert!(result.is_err());
    }

    #[test]
    fn test_mark_occurrence_wraps_whole_words() {
        let fixture = Fixture::new(false);
        let mut session = fixture.load(SENTENCE);

        // "ákon" inside "zákona"
        let mut provider = select(&[0, 0], 17, 21);
        let about = session.mark_occurrence(&mut provider).unwrap();

        let expected = format!(
            r#"<p>Podle civilního <span about="{}" property="ddo:je-výskytem-termu" typeof="ddo:výskyt-termu">zákona</span> se řídí smlouvy.</p>"#,
            about
        );
        assert_eq!(session.to_html(), doc(&expected));
        assert_eq!(session.state(), SessionState::AnnotatedPendingTerm);
        assert_eq!(session.sticky(), Some(about.as_str()));
        assert!(provider.selection().is_none());
    }

    #[test]
    fn test_mark_occurrence_stays_inside_table_cell() {
        let fixture = Fixture::new(false);
        let mut session = fixture.load("<table><tr><td>Zákon</td><td>smlouva</td></tr></table>");

        let mut provider = select(&[0, 0, 1, 0], 0, 7);
        let about = session.mark_occurrence(&mut provider).unwrap();

        let expected = format!(
            r#"<table><tr><td>Zákon</td><td><span about="{}" property="ddo:je-výskytem-termu" typeof="ddo:výskyt-termu">smlouva</span></td></tr></table>"#,
            about
        );
        assert_eq!(session.to_html(), doc(&expected));
        let annotations = session.annotations(None);
        assert_eq!(annotations.len(), 1);
        assert_eq!(annotations[0].text, "smlouva");
    }

    #[test]
    fn test_missing_selection_is_not_annotated() {
        let fixture = Fixture::new(false);
        let mut session = fixture.load(SENTENCE);

        let mut provider = select(&[0, 0], 5, 5);
        assert!(session.mark_occurrence(&mut provider).is_none());
        assert_eq!(session.state(), SessionState::Idle);
        assert_eq!(session.to_html(), doc(SENTENCE));
    }

    #[test]
    fn test_selection_in_popup_is_ignored() {
        let fixture = Fixture::new(false);
        let mut session = fixture.load(r#"<p>text</p><div class="popover"><p>menu item</p></div>"#);

        let mut provider = select(&[1, 0, 0], 0, 4);
        assert!(session.select(&mut provider).is_none());
        assert!(provider.selection().is_none());
        assert!(session.mark_occurrence(&mut select(&[1, 0, 0], 0, 4)).is_none());
    }

    #[test]
    fn test_select_widens_crossing_range() {
        let fixture = Fixture::new(false);
        let mut session = fixture.load("<p>one <b>two</b> three</p>");

        let mut provider = TreeSelection::select(
            Boundary::new(vec![0, 0], 1),
            Boundary::new(vec![0, 1, 0], 2),
        );
        let range = session.select(&mut provider).unwrap();
        assert_eq!(range.start, Boundary::new(vec![0], 0));
        assert_eq!(range.end, Boundary::new(vec![0], 3));
        assert_eq!(session.state(), SessionState::SelectionPending);
    }

    #[test]
    fn test_only_one_sticky_annotation() {
        let fixture = Fixture::new(false);
        let mut session = fixture.load(SENTENCE);

        let first = session.mark_occurrence(&mut select(&[0, 0], 17, 21)).unwrap();
        // "mlou" inside "smlouvy", now in the text after the new span
        let second = session.mark_occurrence(&mut select(&[0, 2], 10, 14)).unwrap();

        assert_ne!(first, second);
        assert_eq!(session.sticky(), Some(second.as_str()));
        assert_eq!(session.annotations(None).len(), 2);
        assert_eq!(session.annotations(None)[1].text, "smlouvy");
    }

    #[tokio::test]
    async fn test_assign_term_persists_occurrence() {
        let fixture = Fixture::new(false);
        let mut session = fixture.load(SENTENCE);
        let about = session.mark_occurrence(&mut select(&[0, 0], 17, 21)).unwrap();

        session.assign_term(&about, &term("zákon")).await.unwrap();

        assert!(session.to_html().contains(r#"resource="ddo:zákon""#));
        assert_eq!(session.state(), SessionState::AnnotatedConfirmed);

        let saved = fixture.store.saved.lock().clone();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].kind, AnnotationKind::Occurrence);
        assert_eq!(saved[0].target.source, DOC_IRI);
        assert_eq!(saved[0].target.selector.exact_match, "zákona");
        assert_eq!(saved[0].target.selector.prefix.as_deref(), Some("Podle civilního "));

        let views = session.annotations(None);
        assert_eq!(views[0].status, AnnotationStatus::Confirmed);
        assert_eq!(views[0].resource.as_deref(), Some(term("zákon").iri.as_str()));
    }

    #[tokio::test]
    async fn test_assign_rejects_wrong_kind() {
        let fixture = Fixture::new(false);
        let mut session = fixture.load(SENTENCE);
        let about = session.mark_occurrence(&mut select(&[0, 0], 17, 21)).unwrap();

        let result = session.assign_definition_source(&about, &term("zákon")).await;
        assert!(matches!(result, Err(AnnotatorError::KindMismatch { .. })));
    }

    #[tokio::test]
    async fn test_failed_persistence_rolls_back_created_annotation() {
        let fixture = Fixture::new(true);
        let mut session = fixture.load(SENTENCE);
        let about = session.mark_occurrence(&mut select(&[0, 0], 17, 21)).unwrap();

        let result = session.assign_term(&about, &term("zákon")).await;

        assert!(matches!(result, Err(AnnotatorError::Service(_))));
        assert_eq!(session.to_html(), doc(SENTENCE));
        assert_eq!(session.sticky(), None);
        assert_eq!(session.state(), SessionState::Idle);
    }

    #[tokio::test]
    async fn test_failed_persistence_marks_existing_unresolved() {
        let fixture = Fixture::new(true);
        let mut session = fixture.load(SUGGESTIONS);

        assert!(session.assign_term("_:1", &term("zákon")).await.is_err());

        assert_eq!(session.to_html(), doc(SUGGESTIONS));
        let view = session
            .annotations(None)
            .into_iter()
            .find(|v| v.about == "_:1")
            .unwrap();
        assert_eq!(view.status, AnnotationStatus::Unresolved);
        assert_eq!(view.score, Some(0.8));
    }

    #[test]
    fn test_cancel_new_term_keeps_scored_and_confirmed() {
        let fixture = Fixture::new(false);
        let mut session = fixture.load(SUGGESTIONS);

        session.begin_new_term("_:1").unwrap();
        session.begin_new_term("_:2").unwrap();
        // "avid" inside "pravidla"
        let definition = session.mark_definition(&mut select(&[0, 4], 8, 12)).unwrap();
        assert!(session.to_html().contains("ddo:zdroj-definice-termu"));

        let removed = session.cancel_new_term();

        assert_eq!(removed, vec![definition]);
        assert_eq!(session.to_html(), doc(SUGGESTIONS));
        assert_eq!(session.state(), SessionState::Idle);
    }

    #[test]
    fn test_cancel_new_term_removes_plain_label_occurrence() {
        let fixture = Fixture::new(false);
        let mut session = fixture.load(SENTENCE);

        let label = session.mark_occurrence(&mut select(&[0, 0], 17, 21)).unwrap();
        session.begin_new_term(&label).unwrap();

        assert_eq!(session.cancel_new_term(), vec![label]);
        assert_eq!(session.to_html(), doc(SENTENCE));
        assert_eq!(session.sticky(), None);
    }

    #[test]
    fn test_remove_annotation_scenario() {
        let fixture = Fixture::new(false);
        let mut session =
            fixture.load(r#"<p>Hello <span about="_:1" typeof="ddo:výskyt-termu">world</span></p>"#);

        session.remove("_:1").unwrap();

        assert_eq!(session.to_html(), doc("<p>Hello world</p>"));
        assert!(find_annotation_path(session.tree(), "_:1", session.prefix_map()).is_none());
        assert!(matches!(
            session.remove("_:1"),
            Err(AnnotatorError::AnnotationNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_unassign_term() {
        let fixture = Fixture::new(false);
        let mut session = fixture.load(SUGGESTIONS);

        session.unassign_term("_:2").unwrap();

        let view = session
            .annotations(None)
            .into_iter()
            .find(|v| v.about == "_:2")
            .unwrap();
        assert_eq!(view.resource, None);
        assert_eq!(view.status, AnnotationStatus::Pending);
        assert_eq!(session.state(), SessionState::AnnotatedPendingTerm);
    }

    #[test]
    fn test_focus_selector_pins_located_annotation() {
        let fixture = Fixture::new(false);
        let mut session = fixture.load(SUGGESTIONS);

        let selector = session.selector_for("_:2").unwrap();
        assert_eq!(selector.exact_match, "vyhlášky");

        session.set_sticky(Some("_:1"));
        assert_eq!(session.focus_selector(&selector).unwrap(), "_:2");
        assert_eq!(session.sticky(), Some("_:2"));

        let missing = TextQuoteSelector::new("nařízení");
        assert!(matches!(
            session.focus_selector(&missing),
            Err(AnnotatorError::Locate(LocateError::NotFound(_)))
        ));
    }

    #[test]
    fn test_annotations_filtered_by_score() {
        let fixture = Fixture::new(false);
        let session = fixture.load(SUGGESTIONS);

        assert_eq!(session.annotations(None).len(), 2);
        let confident = session.annotations(Some(0.9));
        assert_eq!(confident.len(), 1);
        assert_eq!(confident[0].about, "_:2");
        assert_eq!(session.annotations(Some(0.8)).len(), 2);
    }

    #[tokio::test]
    async fn test_resolve_term_uses_cache() {
        let fixture = Fixture::new(false);
        let mut session = fixture.load(SUGGESTIONS);

        let resolved = session.resolve_term("_:2").await.unwrap().unwrap();
        assert_eq!(resolved.iri, format!("{}vyhláška", TERMIT_NAMESPACE));
        session.resolve_term("_:2").await.unwrap();
        assert_eq!(fixture.terms.calls.load(Ordering::SeqCst), 1);

        assert!(matches!(
            session.resolve_term("_:1").await,
            Err(AnnotatorError::NoResource(_))
        ));
    }

    #[tokio::test]
    async fn test_missing_term_marks_unresolved() {
        let fixture = Fixture::new(false);
        let body = r#"<p><span about="_:9" typeof="ddo:výskyt-termu" resource="ddo:missing">x</span> y</p>"#;
        let mut session = fixture.load(body);

        assert_eq!(session.resolve_term("_:9").await.unwrap(), None);
        assert_eq!(session.annotations(None)[0].status, AnnotationStatus::Unresolved);
    }

    #[tokio::test]
    async fn test_cancelled_resolution_is_ignored() {
        let fixture = Fixture::new(false);
        let mut session = fixture.load(SUGGESTIONS);

        let resolution = session.begin_resolution("_:2").unwrap();
        session.remove("_:2").unwrap();
        assert!(resolution.is_cancelled());

        let outcome = resolution.run().await;
        assert_eq!(session.finish_resolution(outcome), None);
        assert_eq!(fixture.terms.calls.load(Ordering::SeqCst), 0);
        assert!(session.annotations(None).iter().all(|v| v.status != AnnotationStatus::Unresolved));
    }

    #[tokio::test]
    async fn test_retargeting_cancels_previous_resolution() {
        let fixture = Fixture::new(false);
        let mut session = fixture.load(SUGGESTIONS);

        let first = session.begin_resolution("_:2").unwrap();
        let second = session.begin_resolution("_:2").unwrap();
        assert!(first.is_cancelled());
        assert!(!second.is_cancelled());

        let stale = first.run().await;
        assert_eq!(session.finish_resolution(stale), None);
        let fresh = second.run().await;
        assert!(session.finish_resolution(fresh).is_some());
    }
}
