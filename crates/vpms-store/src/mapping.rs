//! Storage shape registry
//!
//! Maps an archetype's storage kind (`Act`, `Contact`, `Party`, ...) to the
//! tables holding its instances. Kinds without a direct mapping resolve through
//! a declared parent chain, so `Party` uses the `Entity` tables.

use crate::error::StoreError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::sync::Arc;

/// Tables backing one storage kind
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StorageMapping {
    /// Kind tag, e.g. `Entity`
    pub kind: String,

    /// Primary table, e.g. `entities`
    pub table: String,

    /// Details key/value table, e.g. `entity_details`
    pub details: String,

    /// Id column shared by the primary and details tables
    pub join_column: String,
}

impl StorageMapping {
    /// Create a mapping
    #[must_use]
    pub fn new(
        kind: impl Into<String>,
        table: impl Into<String>,
        details: impl Into<String>,
        join_column: impl Into<String>,
    ) -> Self {
        Self {
            kind: kind.into(),
            table: table.into(),
            details: details.into(),
            join_column: join_column.into(),
        }
    }
}

/// Join table linking owners of one kind to classification lookups
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClassificationTable {
    /// Kind of the owning objects
    pub kind: String,

    /// Join table, e.g. `entity_classifications`
    pub table: String,

    /// Owner id column, e.g. `entity_id`
    pub owner_column: String,
}

impl ClassificationTable {
    /// Create a classification table entry
    #[must_use]
    pub fn new(
        kind: impl Into<String>,
        table: impl Into<String>,
        owner_column: impl Into<String>,
    ) -> Self {
        Self {
            kind: kind.into(),
            table: table.into(),
            owner_column: owner_column.into(),
        }
    }
}

/// Parent link in the kind hierarchy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KindParent {
    /// Derived kind
    pub kind: String,

    /// Kind it is stored as
    pub parent: String,
}

/// Declarative storage configuration
///
/// Classification tables are probed and rewritten in the order listed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Merge the built-in configuration underneath this one
    #[serde(default)]
    pub extend_builtin: bool,

    /// Direct mappings
    #[serde(default)]
    pub mappings: Vec<StorageMapping>,

    /// Kind parent links
    #[serde(default)]
    pub kinds: Vec<KindParent>,

    /// Classification join tables
    #[serde(default)]
    pub classifications: Vec<ClassificationTable>,
}

const BUILTIN_MAPPINGS: &[(&str, &str, &str, &str)] = &[
    ("Act", "acts", "act_details", "act_id"),
    ("ActRelationship", "act_relationships", "act_relationship_details", "act_relationship_id"),
    ("Contact", "contacts", "contact_details", "contact_id"),
    ("Document", "documents", "document_details", "document_id"),
    ("Entity", "entities", "entity_details", "entity_id"),
    ("EntityIdentity", "entity_identities", "entity_identity_details", "entity_identity_id"),
    ("EntityRelationship", "entity_relationships", "entity_relationship_details", "entity_relationship_id"),
    ("Lookup", "lookups", "lookup_details", "lookup_id"),
    ("LookupRelationship", "lookup_relationships", "lookup_relationship_details", "lookup_relationship_id"),
    ("Participation", "participations", "participation_details", "participation_id"),
    ("ProductPrice", "product_prices", "product_price_details", "product_price_id"),
];

const BUILTIN_PARENTS: &[(&str, &str)] = &[
    ("Party", "Entity"),
    ("Product", "Entity"),
    ("User", "Entity"),
    ("FinancialAct", "Act"),
    ("DocumentAct", "Act"),
];

const BUILTIN_CLASSIFICATIONS: &[(&str, &str, &str)] = &[
    ("Entity", "entity_classifications", "entity_id"),
    ("Contact", "contact_classifications", "contact_id"),
    ("ProductPrice", "product_price_classifications", "product_price_id"),
];

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            extend_builtin: false,
            mappings: BUILTIN_MAPPINGS
                .iter()
                .map(|(kind, table, details, join)| StorageMapping::new(*kind, *table, *details, *join))
                .collect(),
            kinds: BUILTIN_PARENTS
                .iter()
                .map(|(kind, parent)| KindParent {
                    kind: (*kind).to_string(),
                    parent: (*parent).to_string(),
                })
                .collect(),
            classifications: BUILTIN_CLASSIFICATIONS
                .iter()
                .map(|(kind, table, owner)| ClassificationTable::new(*kind, *table, *owner))
                .collect(),
        }
    }
}

impl StorageConfig {
    /// Parse TOML configuration
    ///
    /// # Errors
    /// Returns the deserializer message on failure.
    pub fn from_toml(text: &str) -> Result<Self, String> {
        toml::from_str(text).map_err(|e| e.to_string())
    }

    /// Load TOML configuration from a file
    ///
    /// # Errors
    /// Fails on IO or parse errors.
    pub fn load(path: &Path) -> Result<Self, StoreError> {
        let text = std::fs::read_to_string(path).map_err(|source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text).map_err(|message| StoreError::Config {
            path: path.to_path_buf(),
            message,
        })
    }

    /// Configuration with the built-in entries underneath this one
    ///
    /// Entries here override built-in entries for the same kind.
    #[must_use]
    pub fn over_builtin(self) -> Self {
        let mut merged = Self::default();
        for mapping in self.mappings {
            merged.mappings.retain(|m| m.kind != mapping.kind);
            merged.mappings.push(mapping);
        }
        for link in self.kinds {
            merged.kinds.retain(|k| k.kind != link.kind);
            merged.kinds.push(link);
        }
        for table in self.classifications {
            merged.classifications.retain(|c| c.kind != table.kind);
            merged.classifications.push(table);
        }
        merged
    }
}

/// Resolves storage kinds to their tables
#[derive(Debug, Clone)]
pub struct StorageRegistry {
    mappings: BTreeMap<String, Arc<StorageMapping>>,
    parents: BTreeMap<String, String>,
    classifications: Vec<ClassificationTable>,
}

impl Default for StorageRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl StorageRegistry {
    /// Build a registry from configuration
    ///
    /// # Errors
    /// Fails on duplicate mappings or a cyclic kind hierarchy.
    pub fn new(config: StorageConfig) -> Result<Self, StoreError> {
        let config = if config.extend_builtin {
            config.over_builtin()
        } else {
            config
        };

        let mut mappings = BTreeMap::new();
        for mapping in config.mappings {
            let kind = mapping.kind.clone();
            if mappings.insert(kind.clone(), Arc::new(mapping)).is_some() {
                return Err(StoreError::DuplicateMapping(kind));
            }
        }

        let parents = config
            .kinds
            .into_iter()
            .map(|link| (link.kind, link.parent))
            .collect();

        let registry = Self {
            mappings,
            parents,
            classifications: config.classifications,
        };

        for kind in registry.parents.keys() {
            registry.chain(kind)?;
        }

        tracing::debug!(
            mappings = registry.mappings.len(),
            parents = registry.parents.len(),
            classifications = registry.classifications.len(),
            "storage registry built"
        );
        Ok(registry)
    }

    /// Registry holding the built-in mappings
    #[must_use]
    pub fn builtin() -> Self {
        let config = StorageConfig::default();
        Self {
            mappings: config
                .mappings
                .into_iter()
                .map(|m| (m.kind.clone(), Arc::new(m)))
                .collect(),
            parents: config
                .kinds
                .into_iter()
                .map(|link| (link.kind, link.parent))
                .collect(),
            classifications: config.classifications,
        }
    }

    /// Load a registry from a TOML file
    ///
    /// # Errors
    /// Fails on IO, parse or validation errors.
    pub fn load(path: &Path) -> Result<Self, StoreError> {
        Self::new(StorageConfig::load(path)?)
    }

    /// Resolve the mapping for a kind, walking its parent chain
    ///
    /// # Errors
    /// Returns [`StoreError::NoMapping`] when no kind in the chain is mapped,
    /// or [`StoreError::CyclicKind`] when the chain loops.
    pub fn resolve(&self, kind: &str) -> Result<Arc<StorageMapping>, StoreError> {
        let chain = self.chain(kind)?;
        chain
            .iter()
            .find_map(|k| self.mappings.get(k))
            .cloned()
            .ok_or_else(|| StoreError::NoMapping {
                kind: kind.to_string(),
                searched: chain,
            })
    }

    /// Classification table for objects of a kind, if it supports them
    ///
    /// # Errors
    /// Fails if the kind does not resolve to a mapping.
    pub fn classification_for(&self, kind: &str) -> Result<Option<&ClassificationTable>, StoreError> {
        let mapping = self.resolve(kind)?;
        Ok(self.classifications.iter().find(|c| c.kind == mapping.kind))
    }

    /// Classification tables in probe order
    #[inline]
    #[must_use]
    pub fn classifications(&self) -> &[ClassificationTable] {
        &self.classifications
    }

    /// Direct mappings ordered by kind
    pub fn mappings(&self) -> impl Iterator<Item = &Arc<StorageMapping>> {
        self.mappings.values()
    }

    /// Kind parent links ordered by kind
    pub fn parents(&self) -> impl Iterator<Item = (&str, &str)> {
        self.parents.iter().map(|(k, p)| (k.as_str(), p.as_str()))
    }

    fn chain(&self, kind: &str) -> Result<Vec<String>, StoreError> {
        let mut seen = HashSet::new();
        let mut chain = Vec::new();
        let mut current = Some(kind);
        while let Some(k) = current {
            if !seen.insert(k) {
                return Err(StoreError::CyclicKind(k.to_string()));
            }
            chain.push(k.to_string());
            current = self.parents.get(k).map(String::as_str);
        }
        Ok(chain)
    }
}
