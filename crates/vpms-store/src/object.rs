//! Stored archetype instances

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Instance of an archetype as held in storage
///
/// Node values are keyed by node name. Whether a value lands in a column or
/// in the details table is decided by the node's descriptor when the object
/// is saved.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IMObject {
    /// Storage id, `0` until saved
    pub id: u64,

    /// Archetype short name
    pub archetype: String,

    /// Node values by node name
    #[serde(default)]
    pub values: BTreeMap<String, String>,

    /// Ids of classification lookups
    #[serde(default)]
    pub classifications: BTreeSet<u64>,
}

impl IMObject {
    /// Create an unsaved object
    #[inline]
    #[must_use]
    pub fn new(archetype: impl Into<String>) -> Self {
        Self {
            archetype: archetype.into(),
            ..Self::default()
        }
    }

    /// Set a node value
    #[inline]
    #[must_use]
    pub fn with_value(mut self, node: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(node, value);
        self
    }

    /// Add a classification lookup
    #[inline]
    #[must_use]
    pub fn with_classification(mut self, lookup_id: u64) -> Self {
        self.classifications.insert(lookup_id);
        self
    }

    /// Set a node value
    pub fn set(&mut self, node: impl Into<String>, value: impl Into<String>) {
        self.values.insert(node.into(), value.into());
    }

    /// Clear a node value
    pub fn unset(&mut self, node: &str) -> Option<String> {
        self.values.remove(node)
    }

    /// Node value
    #[inline]
    #[must_use]
    pub fn value(&self, node: &str) -> Option<&str> {
        self.values.get(node).map(String::as_str)
    }

    /// Add a classification lookup
    pub fn classify(&mut self, lookup_id: u64) -> bool {
        self.classifications.insert(lookup_id)
    }

    /// Remove a classification lookup
    pub fn declassify(&mut self, lookup_id: u64) -> bool {
        self.classifications.remove(&lookup_id)
    }

    /// True if the object has not been saved
    #[inline]
    #[must_use]
    pub fn is_new(&self) -> bool {
        self.id == 0
    }
}
