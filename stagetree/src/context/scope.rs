//! Thread-safe layered key/value scopes.

use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::Arc;

/// One layer of an execution context's values.
///
/// Lookups fall through to the parent layer when a key is not stored
/// locally. Writes only ever touch the local layer, so a child scope can
/// shadow but never modify what its parent sees.
#[derive(Debug, Default)]
pub struct Scope {
    values: DashMap<String, serde_json::Value>,
    parent: Option<Arc<Scope>>,
}

impl Scope {
    /// Creates an empty root scope.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty scope layered over `parent`.
    #[must_use]
    pub fn with_parent(parent: Arc<Self>) -> Self {
        Self {
            values: DashMap::new(),
            parent: Some(parent),
        }
    }

    /// Creates a root scope from existing data.
    #[must_use]
    pub fn from_data(data: HashMap<String, serde_json::Value>) -> Self {
        Self {
            values: data.into_iter().collect(),
            parent: None,
        }
    }

    /// Looks up `key` here, then in each enclosing scope.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<serde_json::Value> {
        let mut current = Some(self);
        while let Some(scope) = current {
            if let Some(value) = scope.values.get(key) {
                return Some(value.value().clone());
            }
            current = scope.parent.as_deref();
        }
        None
    }

    /// Looks up `key` in this layer only.
    #[must_use]
    pub fn get_local(&self, key: &str) -> Option<serde_json::Value> {
        self.values.get(key).map(|v| v.value().clone())
    }

    /// Stores `value` in this layer, replacing any local value.
    pub fn set(&self, key: impl Into<String>, value: serde_json::Value) {
        self.values.insert(key.into(), value);
    }

    /// Removes `key` from this layer. Enclosing scopes are untouched.
    pub fn remove(&self, key: &str) -> Option<serde_json::Value> {
        self.values.remove(key).map(|(_, v)| v)
    }

    /// Returns a copy of this layer's entries.
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, serde_json::Value> {
        self.values
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect()
    }

    /// Returns the enclosing scope, if any.
    #[must_use]
    pub fn parent(&self) -> Option<&Arc<Self>> {
        self.parent.as_ref()
    }

    /// Returns the number of entries in this layer.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true if this layer is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
