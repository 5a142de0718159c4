//! Long-term key-value store capability.
//!
//! Cross-thread memory for a graph runtime: values keyed by `(namespace, key)`, with prefix
//! search and equality filters. The runtime talks to [`StateStore`] only; `InMemoryStore` is
//! the provided implementation.

use async_trait::async_trait;
use thiserror::Error;

use crate::error::PersistenceError;
use crate::memory::document::Document;
use crate::memory::filter::Filter;
use crate::memory::namespace::{Namespace, NamespaceQuery};

/// Error for store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No live value for the requested item.
    #[error("not found: {0}")]
    NotFound(String),
    /// Empty namespace or segment, empty key, or malformed filter.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// Durable storage could not be opened or written; the mutation was not applied.
    #[error("persistence unavailable: {0}")]
    PersistenceUnavailable(String),
}

impl From<PersistenceError> for StoreError {
    fn from(e: PersistenceError) -> Self {
        StoreError::PersistenceUnavailable(e.to_string())
    }
}

/// Search parameters: optional filter, then `offset`, then `limit`.
///
/// `limit: None` returns every match after `offset`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchQuery {
    pub filter: Option<Filter>,
    pub limit: Option<usize>,
    pub offset: usize,
}

impl SearchQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Sets the filter from a JSON object; see [`Filter::from_value`].
    pub fn filter_value(self, value: Document) -> Result<Self, StoreError> {
        Ok(self.filter(Filter::from_value(value)?))
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

/// One search result.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchItem {
    pub namespace: Namespace,
    pub key: String,
    pub value: Document,
}

/// Namespaced key-value store used by the graph runtime for application memory.
///
/// Namespaces are matched by whole segments. Results are ordered by `(namespace, key)`, so
/// repeated calls on an unchanged store return the same sequence.
///
/// **Interaction**: Held as `Arc<dyn StateStore>` by nodes and tools; implemented by
/// [`InMemoryStore`](crate::InMemoryStore).
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Inserts or overwrites the value at `(namespace, key)`.
    async fn put(&self, namespace: &[String], key: &str, value: &Document) -> Result<(), StoreError>;

    /// Returns the live value, or `NotFound`.
    async fn get(&self, namespace: &[String], key: &str) -> Result<Document, StoreError>;

    /// Removes the item; returns whether anything was removed.
    async fn delete(&self, namespace: &[String], key: &str) -> Result<bool, StoreError>;

    /// Items in namespaces starting with `namespace_prefix` (empty prefix: all), filtered,
    /// ordered by `(namespace, key)`, then paginated.
    async fn search(
        &self,
        namespace_prefix: &[String],
        query: SearchQuery,
    ) -> Result<Vec<SearchItem>, StoreError>;

    /// Live namespaces matching `query`, sorted by segments.
    async fn list_namespaces(&self, query: &NamespaceQuery) -> Result<Vec<Namespace>, StoreError>;

    /// Keys stored under exactly `namespace`, sorted.
    async fn list_keys(&self, namespace: &[String]) -> Result<Vec<String>, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    /// **Scenario**: PersistenceError converts into PersistenceUnavailable with its message.
    #[test]
    fn store_error_from_persistence_error() {
        let err: StoreError = PersistenceError::Closed.into();
        match &err {
            StoreError::PersistenceUnavailable(s) => assert!(s.contains("closed"), "{}", s),
            _ => panic!("expected PersistenceUnavailable: {:?}", err),
        }
        assert!(err.to_string().starts_with("persistence unavailable"));
    }

    /// **Scenario**: SearchQuery builder sets filter, offset and limit.
    #[test]
    fn search_query_builder() {
        let q = SearchQuery::new()
            .filter_value(json!({"a": 1}))
            .unwrap()
            .offset(2)
            .limit(3);
        assert_eq!(q.offset, 2);
        assert_eq!(q.limit, Some(3));
        assert_eq!(q.filter.map(|f| f.len()), Some(1));
        assert!(SearchQuery::new().filter_value(json!(1)).is_err());
    }
}
