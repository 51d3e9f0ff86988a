//! Namespace prefix resolution
//!
//! Documents declare their RDFa prefixes once, on the root `html` element:
//!
//! ```text
//! <html prefix="ddo: http://onto.fel.cvut.cz/ontologies/application/termit/pojem/ dc: http://purl.org/dc/terms/">
//! ```
//!
//! Attribute values such as `typeof="ddo:výskyt-termu"` must be resolved
//! through this table before they are compared against known IRIs, and IRIs
//! written back into the document are shortened with it when possible.

use std::collections::BTreeMap;

use thiserror::Error;

use crate::html::Node;

/// Name of the attribute carrying the prefix declarations
pub const PREFIX_ATTRIBUTE: &str = "prefix";

/// Prefix declaration parsing errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PrefixError {
    #[error("Prefix declaration has an odd number of tokens ({0})")]
    OddTokenCount(usize),

    #[error("Prefix '{0}' must end with ':'")]
    MissingColon(String),

    #[error("Prefix '{0}' is empty")]
    EmptyPrefix(String),
}

/// Prefix -> namespace IRI table scoped to one document
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrefixMap {
    entries: BTreeMap<String, String>,
}

impl PrefixMap {
    /// Create an empty prefix map
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse the value of a `prefix` attribute
    ///
    /// The format is a whitespace separated sequence of `NCName:` / IRI pairs.
    pub fn parse(value: &str) -> Result<Self, PrefixError> {
        let tokens: Vec<&str> = value.split_whitespace().collect();
        if tokens.len() % 2 != 0 {
            return Err(PrefixError::OddTokenCount(tokens.len()));
        }

        let mut entries = BTreeMap::new();
        for pair in tokens.chunks(2) {
            let prefix = pair[0]
                .strip_suffix(':')
                .ok_or_else(|| PrefixError::MissingColon(pair[0].to_string()))?;
            if prefix.is_empty() {
                return Err(PrefixError::EmptyPrefix(pair[0].to_string()));
            }
            entries.insert(prefix.to_string(), pair[1].to_string());
        }

        Ok(Self { entries })
    }

    /// Register a prefix
    pub fn insert(&mut self, prefix: impl Into<String>, namespace: impl Into<String>) {
        self.entries.insert(prefix.into(), namespace.into());
    }

    /// Namespace registered for `prefix`
    pub fn namespace(&self, prefix: &str) -> Option<&str> {
        self.entries.get(prefix).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(p, ns)| (p.as_str(), ns.as_str()))
    }

    /// Render the map back into `prefix` attribute syntax
    pub fn to_attribute_value(&self) -> String {
        self.entries
            .iter()
            .map(|(prefix, ns)| format!("{}: {}", prefix, ns))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Extract the prefix map declared on the top-level `html` element
///
/// Only top-level nodes are scanned. Returns an empty map when no `html`
/// element or no `prefix` attribute exists.
pub fn get_prefix_map(nodes: &[Node]) -> Result<PrefixMap, PrefixError> {
    let declaration = nodes.iter().find_map(|node| match node {
        Node::Element(el) if el.name.eq_ignore_ascii_case("html") => el.attr(PREFIX_ATTRIBUTE),
        _ => None,
    });

    match declaration {
        Some(value) => PrefixMap::parse(value),
        None => Ok(PrefixMap::new()),
    }
}

/// Expand `prefix:local` into a full IRI
///
/// Tokens with an unknown prefix (or no prefix at all) are returned
/// unchanged, so documents that already use absolute IRIs keep working.
pub fn resolve_iri(token: &str, prefix_map: &PrefixMap) -> String {
    if let Some((prefix, local)) = token.split_once(':') {
        if let Some(namespace) = prefix_map.namespace(prefix) {
            return format!("{}{}", namespace, local);
        }
    }
    token.to_string()
}

/// Shorten a full IRI into `prefix:local` form
///
/// The namespace is the IRI up to and including its last `/` or `#`, and it
/// must equal a registered namespace exactly.
pub fn shorten_iri(iri: &str, prefix_map: &PrefixMap) -> String {
    let split = match iri.rfind(|c| c == '/' || c == '#') {
        Some(idx) => idx + 1,
        None => return iri.to_string(),
    };
    let (namespace, local) = iri.split_at(split);

    let mut best: Option<&str> = None;
    for (prefix, ns) in prefix_map.iter() {
        if ns == namespace && best.map_or(true, |b| prefix.len() < b.len()) {
            best = Some(prefix);
        }
    }

    match best {
        Some(prefix) => format!("{}:{}", prefix, local),
        None => iri.to_string(),
    }
}
