//! `$ref` and JSON Pointer resolution.
//!
//! [`DocumentStore`] is built once and shared between concurrent validations; its
//! URI-join and fragment caches are concurrent maps over immutable inputs.
//! [`Resolver`] pairs the store with a scope stack that belongs to a single call.

use crate::schema::error::SchemaError;
use crate::value::Value;
use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, trace};
use url::Url;

/// Documents addressable by `$ref`, keyed by normalized URI.
#[derive(Debug)]
pub struct DocumentStore {
    base_uri: String,
    documents: HashMap<String, Arc<Value>>,
    joins: DashMap<(String, String), String>,
    fragments: DashMap<String, Arc<Value>>,
}

impl DocumentStore {
    /// Creates a store whose root document lives at `base_uri` (may be empty).
    pub fn new(base_uri: impl Into<String>, root: Value) -> Self {
        let base_uri = base_uri.into();
        let mut documents = HashMap::new();
        documents.insert(normalize(&base_uri), Arc::new(root));
        Self {
            base_uri,
            documents,
            joins: DashMap::new(),
            fragments: DashMap::new(),
        }
    }

    /// Registers a pre-loaded document under `uri`.
    pub fn with_document(mut self, uri: &str, document: Value) -> Self {
        self.documents.insert(normalize(uri), Arc::new(document));
        self
    }

    pub fn base_uri(&self) -> &str {
        &self.base_uri
    }

    pub fn root(&self) -> Arc<Value> {
        self.documents
            .get(&normalize(&self.base_uri))
            .cloned()
            .unwrap_or_default()
    }

    /// Starts a fresh per-call resolver whose scope stack holds the base URI.
    pub fn resolver(&self) -> Resolver<'_> {
        Resolver {
            store: self,
            scopes: vec![self.base_uri.clone()],
        }
    }

    /// URI join of `reference` against `base`, memoized per input pair.
    pub fn join(&self, base: &str, reference: &str) -> String {
        if base.is_empty() {
            return reference.to_owned();
        }
        let key = (base.to_owned(), reference.to_owned());
        if let Some(joined) = self.joins.get(&key) {
            return joined.clone();
        }
        let joined = join_uri(base, reference);
        self.joins.insert(key, joined.clone());
        joined
    }

    /// Resolves an absolute (already joined) URL to the fragment it names.
    pub fn resolve_url(&self, url: &str) -> Result<Arc<Value>, SchemaError> {
        if let Some(hit) = self.fragments.get(url) {
            return Ok(Arc::clone(&hit));
        }

        let (document_url, fragment) = split_fragment(url);
        let document = self
            .documents
            .get(&normalize(document_url))
            .ok_or_else(|| SchemaError::UnresolvableReference(url.to_owned()))?;
        debug!(url, "resolving reference");
        let resolved = Arc::new(resolve_pointer(document, fragment)?.clone());
        self.fragments.insert(url.to_owned(), Arc::clone(&resolved));
        Ok(resolved)
    }
}

/// Per-call view of a [`DocumentStore`] with its own resolution scope stack.
///
/// Every `push_scope` must be matched by one `pop_scope` on every exit path.
#[derive(Debug)]
pub struct Resolver<'s> {
    store: &'s DocumentStore,
    scopes: Vec<String>,
}

impl<'s> Resolver<'s> {
    pub fn store(&self) -> &'s DocumentStore {
        self.store
    }

    /// The innermost active scope.
    pub fn resolution_scope(&self) -> &str {
        self.scopes.last().map(String::as_str).unwrap_or("")
    }

    pub fn depth(&self) -> usize {
        self.scopes.len()
    }

    pub fn push_scope(&mut self, scope: &str) {
        let joined = self.store.join(self.resolution_scope(), scope);
        trace!(scope = %joined, depth = self.scopes.len() + 1, "push scope");
        self.scopes.push(joined);
    }

    pub fn pop_scope(&mut self) -> Result<(), SchemaError> {
        self.scopes.pop().map(|_| ()).ok_or(SchemaError::ScopeUnderflow)
    }

    /// Resolves `reference` against the active scope, returning the absolute URL and
    /// the fragment it points at.
    pub fn resolve(&self, reference: &str) -> Result<(String, Arc<Value>), SchemaError> {
        let url = self.store.join(self.resolution_scope(), reference);
        let fragment = self.store.resolve_url(&url)?;
        Ok((url, fragment))
    }
}

/// Walks a `/`-delimited JSON Pointer (percent-encoded, `~1`/`~0` escaped).
pub fn resolve_pointer<'d>(document: &'d Value, fragment: &str) -> Result<&'d Value, SchemaError> {
    let fragment = fragment.trim_start_matches('/');
    if fragment.is_empty() {
        return Ok(document);
    }
    let decoded = urlencoding::decode(fragment)
        .map_err(|_| SchemaError::UnresolvablePointer(fragment.to_owned()))?;

    let mut current = document;
    for part in decoded.split('/') {
        let part = part.replace("~1", "/").replace("~0", "~");
        let next = match current {
            Value::Array(items) => part.parse::<usize>().ok().and_then(|i| items.get(i)),
            Value::Object(map) => map.get(&part),
            _ => None,
        };
        current = next.ok_or_else(|| SchemaError::UnresolvablePointer(fragment.to_owned()))?;
    }
    Ok(current)
}

fn split_fragment(url: &str) -> (&str, &str) {
    match url.split_once('#') {
        Some((document, fragment)) => (document, fragment),
        None => (url, ""),
    }
}

fn normalize(uri: &str) -> String {
    let (document, _) = split_fragment(uri);
    match Url::parse(document) {
        Ok(url) => url.to_string(),
        Err(_) => document.to_owned(),
    }
}

fn join_uri(base: &str, reference: &str) -> String {
    if let Ok(joined) = Url::parse(base).and_then(|url| url.join(reference)) {
        return joined.to_string();
    }
    // Opaque or non-URL bases still accept fragment-only references.
    match reference.strip_prefix('#') {
        Some(fragment) => format!("{}#{}", split_fragment(base).0, fragment),
        None => reference.to_owned(),
    }
}
