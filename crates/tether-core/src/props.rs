#![forbid(unsafe_code)]

//! Outbound element properties.
//!
//! [`Props`] is the key/value state an element exposes to the rendering
//! client. Values are already in wire form (`serde_json::Value`).

use serde::Serialize;
use serde_json::{Map, Value};

/// Outbound properties of an element.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Props {
    values: Map<String, Value>,
}

impl Props {
    /// Create an empty property set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `name` to `value`. Returns whether the stored value changed.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) -> bool {
        let value = value.into();
        let name = name.into();
        if self.values.get(&name) == Some(&value) {
            return false;
        }
        self.values.insert(name, value);
        true
    }

    /// Remove `name`. Returns whether it was present.
    pub fn remove(&mut self, name: &str) -> bool {
        self.values.remove(name).is_some()
    }

    /// Look up a property.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// Whether `name` is set.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Iterate over `(name, value)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.values.iter()
    }

    /// Number of properties.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether no property is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Wire form of the whole property set.
    #[must_use]
    pub fn to_json(&self) -> Map<String, Value> {
        self.values.clone()
    }
}
