//! Search filter: field-path equality against stored documents.
//!
//! Every field in the filter must be present in the document with a deep-equal value.
//! A field is looked up literally first; if the document has no such key and the field
//! contains `.`, it is resolved as a path through nested objects (`"profile.theme"`).
//! A missing field never matches. An empty filter matches everything.

use std::collections::BTreeMap;

use crate::memory::document::{deep_eq, Document};
use crate::memory::store::StoreError;

/// Equality predicate over document fields.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    fields: BTreeMap<String, Document>,
}

impl Filter {
    /// Filter that matches every document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `path == value`. Fails on an empty path or an empty path segment.
    pub fn with(mut self, path: impl Into<String>, value: impl Into<Document>) -> Result<Self, StoreError> {
        let path = path.into();
        validate_path(&path)?;
        self.fields.insert(path, value.into());
        Ok(self)
    }

    /// Builds a filter from a JSON object of `path -> expected value`.
    ///
    /// Anything other than an object is `InvalidArgument`.
    pub fn from_value(value: Document) -> Result<Self, StoreError> {
        match value {
            Document::Object(map) => map
                .into_iter()
                .try_fold(Self::new(), |filter, (path, expected)| filter.with(path, expected)),
            other => Err(StoreError::InvalidArgument(format!(
                "filter must be a JSON object, got {}",
                kind_of(&other)
            ))),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// True iff every filter field resolves in `doc` to a deep-equal value.
    pub fn matches(&self, doc: &Document) -> bool {
        self.fields
            .iter()
            .all(|(path, expected)| resolve(doc, path).map_or(false, |actual| deep_eq(actual, expected)))
    }
}

fn validate_path(path: &str) -> Result<(), StoreError> {
    if path.is_empty() {
        return Err(StoreError::InvalidArgument(
            "filter field must not be empty".to_string(),
        ));
    }
    if path.split('.').any(str::is_empty) {
        return Err(StoreError::InvalidArgument(format!(
            "filter field '{}' has an empty path segment",
            path
        )));
    }
    Ok(())
}

fn resolve<'a>(doc: &'a Document, path: &str) -> Option<&'a Document> {
    let object = doc.as_object()?;
    if let Some(v) = object.get(path) {
        return Some(v);
    }
    if !path.contains('.') {
        return None;
    }
    path.split('.')
        .try_fold(doc, |current, segment| current.as_object()?.get(segment))
}

fn kind_of(value: &Document) -> &'static str {
    match value {
        Document::Null => "null",
        Document::Bool(_) => "bool",
        Document::Number(_) => "number",
        Document::String(_) => "string",
        Document::Array(_) => "array",
        Document::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn filter(v: Document) -> Filter {
        Filter::from_value(v).unwrap()
    }

    /// **Scenario**: Empty filter matches any document, including non-objects.
    #[test]
    fn empty_filter_matches_everything() {
        let f = Filter::new();
        assert!(f.is_empty());
        assert!(f.matches(&json!({"a": 1})));
        assert!(f.matches(&json!("scalar")));
    }

    /// **Scenario**: Equal scalar matches; different value or missing field does not.
    #[test]
    fn scalar_equality() {
        let f = filter(json!({"theme": "dark"}));
        assert!(f.matches(&json!({"theme": "dark", "other": 1})));
        assert!(!f.matches(&json!({"theme": "light"})));
        assert!(!f.matches(&json!({"other": 1})));
        assert!(!f.matches(&json!(["theme", "dark"])));
    }

    /// **Scenario**: Every field must match.
    #[test]
    fn all_fields_must_match() {
        let f = filter(json!({"a": 1, "b": true}));
        assert!(f.matches(&json!({"a": 1, "b": true})));
        assert!(!f.matches(&json!({"a": 1, "b": false})));
        assert!(!f.matches(&json!({"a": 1})));
        assert_eq!(f.len(), 2);
    }

    /// **Scenario**: Nested mapping values compare by deep equality, not containment.
    #[test]
    fn nested_mapping_deep_equality() {
        let f = filter(json!({"profile": {"theme": "dark", "size": 2}}));
        assert!(f.matches(&json!({"profile": {"size": 2.0, "theme": "dark"}})));
        assert!(!f.matches(&json!({"profile": {"theme": "dark"}})));
        assert!(!f.matches(&json!({"profile": {"theme": "dark", "size": 2, "x": 0}})));
    }

    /// **Scenario**: Dotted paths walk nested objects; a literal dotted key wins.
    #[test]
    fn dotted_paths() {
        let f = Filter::new().with("profile.theme", "dark").unwrap();
        assert!(f.matches(&json!({"profile": {"theme": "dark"}})));
        assert!(!f.matches(&json!({"profile": {"theme": "light"}})));
        assert!(!f.matches(&json!({"profile": "dark"})));
        assert!(f.matches(&json!({"profile.theme": "dark", "profile": {"theme": "light"}})));
    }

    /// **Scenario**: Null is a value; it matches only an explicit null.
    #[test]
    fn null_requires_presence() {
        let f = filter(json!({"deleted_at": null}));
        assert!(f.matches(&json!({"deleted_at": null})));
        assert!(!f.matches(&json!({})));
    }

    /// **Scenario**: Non-object filters and empty paths are InvalidArgument.
    #[test]
    fn malformed_filters_rejected() {
        for bad in [json!([1]), json!("x"), json!(null), json!({"": 1}), json!({"a..b": 1}), json!({".a": 1})] {
            let err = Filter::from_value(bad.clone()).unwrap_err();
            assert!(matches!(err, StoreError::InvalidArgument(_)), "{:?} -> {:?}", bad, err);
        }
        assert!(Filter::new().with("", 1).is_err());
    }
}
