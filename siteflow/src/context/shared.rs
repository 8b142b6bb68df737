//! The namespaced artifact map threaded through a pipeline run.

use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Artifacts published by the stages of one run, keyed by namespace.
///
/// Created empty for every run. Publishing into a namespace that already
/// holds a value is rejected; writes go through
/// [`StageContext::publish`](super::StageContext::publish), which fixes the
/// namespace to the running stage's kind.
#[derive(Debug, Default)]
pub struct SharedContext {
    data: RwLock<HashMap<String, Value>>,
}

impl SharedContext {
    /// Creates an empty context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the value in `namespace`.
    #[must_use]
    pub fn get(&self, namespace: &str) -> Option<Value> {
        self.data.read().get(namespace).cloned()
    }

    /// Deserializes the value in `namespace`.
    ///
    /// Returns `None` if the namespace is empty or holds a different shape.
    #[must_use]
    pub fn get_as<T: DeserializeOwned>(&self, namespace: &str) -> Option<T> {
        self.get(namespace)
            .and_then(|value| serde_json::from_value(value).ok())
    }

    /// Checks if a namespace has been published.
    #[must_use]
    pub fn contains(&self, namespace: &str) -> bool {
        self.data.read().contains_key(namespace)
    }

    /// Returns the published namespaces, sorted.
    #[must_use]
    pub fn namespaces(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.data.read().keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Returns the number of published namespaces.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    /// Returns true if nothing has been published.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }

    /// Takes a frozen copy of the current contents.
    #[must_use]
    pub fn snapshot(&self) -> ContextSnapshot {
        ContextSnapshot {
            data: Arc::new(self.data.read().clone()),
        }
    }

    /// Inserts a value; returns false without writing if the namespace is taken.
    pub(crate) fn insert_new(&self, namespace: &str, value: Value) -> bool {
        let mut data = self.data.write();
        if data.contains_key(namespace) {
            return false;
        }
        data.insert(namespace.to_string(), value);
        true
    }
}

/// An immutable, cheaply clonable copy of a [`SharedContext`].
#[derive(Debug, Clone, Default)]
pub struct ContextSnapshot {
    data: Arc<HashMap<String, Value>>,
}

impl ContextSnapshot {
    /// Returns the value in `namespace`.
    #[must_use]
    pub fn get(&self, namespace: &str) -> Option<&Value> {
        self.data.get(namespace)
    }

    /// Deserializes the value in `namespace`.
    #[must_use]
    pub fn get_as<T: DeserializeOwned>(&self, namespace: &str) -> Option<T> {
        self.get(namespace)
            .and_then(|value| serde_json::from_value(value.clone()).ok())
    }

    /// Checks if a namespace was published when the snapshot was taken.
    #[must_use]
    pub fn contains(&self, namespace: &str) -> bool {
        self.data.contains_key(namespace)
    }

    /// Returns the number of namespaces.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns true if the snapshot is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
