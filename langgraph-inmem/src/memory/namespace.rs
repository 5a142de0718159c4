//! Namespaces and the namespace index.
//!
//! A namespace is an ordered list of non-empty segments, e.g. `["users", "42"]`. The index maps
//! each namespace to the keys stored under it; a namespace is listed only while it has keys.
//! Namespaces compare segment by segment, so every namespace sharing a prefix sits in one
//! contiguous range of the ordered map.

use std::collections::{BTreeMap, BTreeSet};

use crate::memory::store::StoreError;

/// Hierarchical path segmenting the key space, e.g. `[user_id, "memories"]`.
pub type Namespace = Vec<String>;

/// Rejects empty namespaces and empty segments.
pub(crate) fn validate_namespace(namespace: &[String]) -> Result<(), StoreError> {
    if namespace.is_empty() {
        return Err(StoreError::InvalidArgument(
            "namespace must have at least one segment".to_string(),
        ));
    }
    validate_segments(namespace)
}

/// Rejects empty segments; an empty prefix is allowed.
pub(crate) fn validate_segments(segments: &[String]) -> Result<(), StoreError> {
    if let Some(i) = segments.iter().position(|s| s.is_empty()) {
        return Err(StoreError::InvalidArgument(format!(
            "namespace segment {} is empty",
            i
        )));
    }
    Ok(())
}

pub(crate) fn validate_key(key: &str) -> Result<(), StoreError> {
    if key.is_empty() {
        return Err(StoreError::InvalidArgument("key must not be empty".to_string()));
    }
    Ok(())
}

/// Filters and pagination for listing namespaces.
///
/// Filters apply in order prefix, suffix, max_depth; then results are sorted and paginated
/// (`offset`, then `limit`). `limit: None` returns everything after `offset`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NamespaceQuery {
    /// Keep namespaces whose leading segments equal this.
    pub prefix: Option<Namespace>,
    /// Keep namespaces whose trailing segments equal this.
    pub suffix: Option<Namespace>,
    /// Keep namespaces with at most this many segments.
    pub max_depth: Option<usize>,
    pub limit: Option<usize>,
    pub offset: usize,
}

impl NamespaceQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn prefix<I, S>(mut self, prefix: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.prefix = Some(prefix.into_iter().map(Into::into).collect());
        self
    }

    pub fn suffix<I, S>(mut self, suffix: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.suffix = Some(suffix.into_iter().map(Into::into).collect());
        self
    }

    pub fn max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }
}

/// Set of live namespaces and the keys under each.
///
/// Derived state: maintained by `InMemoryStore` on every put/delete and rebuilt on replay.
#[derive(Debug, Clone, Default)]
pub struct NamespaceIndex {
    entries: BTreeMap<Namespace, BTreeSet<String>>,
}

impl NamespaceIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `key` under `namespace`. Returns `false` if it was already present.
    pub fn register(&mut self, namespace: &[String], key: &str) -> bool {
        match self.entries.get_mut(namespace) {
            Some(keys) => keys.insert(key.to_string()),
            None => {
                self.entries
                    .insert(namespace.to_vec(), BTreeSet::from([key.to_string()]));
                true
            }
        }
    }

    /// Forgets `key` under `namespace`. The namespace entry stays until
    /// [`unregister_if_empty`](Self::unregister_if_empty).
    pub fn remove_key(&mut self, namespace: &[String], key: &str) -> bool {
        self.entries
            .get_mut(namespace)
            .map_or(false, |keys| keys.remove(key))
    }

    /// Drops `namespace` if it has no keys left. Returns whether it was dropped.
    pub fn unregister_if_empty(&mut self, namespace: &[String]) -> bool {
        if self.entries.get(namespace).map_or(false, BTreeSet::is_empty) {
            self.entries.remove(namespace);
            return true;
        }
        false
    }

    pub fn contains(&self, namespace: &[String]) -> bool {
        self.entries.contains_key(namespace)
    }

    /// Keys under exactly `namespace`, sorted.
    pub fn keys(&self, namespace: &[String]) -> Vec<String> {
        self.entries
            .get(namespace)
            .map(|keys| keys.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Number of live namespaces.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Namespaces whose leading segments equal `prefix`, sorted by segments.
    pub fn list_prefixed(&self, prefix: &[String]) -> Vec<Namespace> {
        self.prefixed(prefix).cloned().collect()
    }

    /// Namespaces matching `query`, sorted by segments and paginated.
    pub fn list(&self, query: &NamespaceQuery) -> Vec<Namespace> {
        let prefix = query.prefix.as_deref().unwrap_or(&[]);
        let matching = self.prefixed(prefix).filter(|ns| {
            query.suffix.as_deref().map_or(true, |s| ns.ends_with(s))
                && query.max_depth.map_or(true, |d| ns.len() <= d)
        });
        let page = matching.skip(query.offset);
        match query.limit {
            Some(limit) => page.take(limit).cloned().collect(),
            None => page.cloned().collect(),
        }
    }

    fn prefixed<'a>(&'a self, prefix: &'a [String]) -> impl Iterator<Item = &'a Namespace> + 'a {
        self.entries
            .range(prefix.to_vec()..)
            .map(|(ns, _)| ns)
            .take_while(move |ns| ns.starts_with(prefix))
    }
}
