//! Engine configuration

use crate::error::LookupError;
use crate::usage::DEFAULT_CACHE_CAPACITY;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use vpms_archetype::ArchetypeRegistry;
use vpms_store::StorageRegistry;

/// Lookup engine configuration
///
/// ```toml
/// schema = ["archetypes/"]
/// storage = "storage.toml"
/// cache_capacity = 512
/// serialize_lookup_mutations = true
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Archetype descriptor files or directories
    pub schema: Vec<PathBuf>,

    /// Storage configuration file; built-in mappings when absent
    pub storage: Option<PathBuf>,

    /// Cached code reference sets
    pub cache_capacity: u64,

    /// Take advisory locks around replace and remove
    pub serialize_lookup_mutations: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            schema: Vec::new(),
            storage: None,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            serialize_lookup_mutations: true,
        }
    }
}

impl EngineConfig {
    /// Default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a schema path
    #[must_use]
    pub fn with_schema(mut self, path: impl Into<PathBuf>) -> Self {
        self.schema.push(path.into());
        self
    }

    /// Set the storage configuration file
    #[must_use]
    pub fn with_storage(mut self, path: impl Into<PathBuf>) -> Self {
        self.storage = Some(path.into());
        self
    }

    /// Set the reference cache capacity
    #[must_use]
    pub fn with_cache_capacity(mut self, capacity: u64) -> Self {
        self.cache_capacity = capacity;
        self
    }

    /// Enable or disable advisory locking
    #[must_use]
    pub fn with_serialized_mutations(mut self, enabled: bool) -> Self {
        self.serialize_lookup_mutations = enabled;
        self
    }

    /// Parse TOML configuration
    ///
    /// # Errors
    /// Returns the deserializer message on failure.
    pub fn from_toml(text: &str) -> Result<Self, String> {
        toml::from_str(text).map_err(|e| e.to_string())
    }

    /// Load TOML configuration from a file
    ///
    /// Relative schema and storage paths resolve against the file's directory.
    ///
    /// # Errors
    /// Fails on IO or parse errors.
    pub fn load(path: &Path) -> Result<Self, LookupError> {
        let text = std::fs::read_to_string(path).map_err(|source| LookupError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_toml(&text).map_err(|message| LookupError::Config {
            path: path.to_path_buf(),
            message,
        })?;

        if let Some(base) = path.parent() {
            for schema in &mut config.schema {
                if schema.is_relative() {
                    *schema = base.join(&*schema);
                }
            }
            if let Some(storage) = config.storage.as_mut().filter(|s| s.is_relative()) {
                *storage = base.join(&*storage);
            }
        }

        tracing::debug!(path = %path.display(), schema = config.schema.len(), "engine configuration loaded");
        Ok(config)
    }

    /// Load the archetype schema
    ///
    /// # Errors
    /// Fails on unreadable or invalid descriptors.
    pub fn archetype_registry(&self) -> Result<ArchetypeRegistry, LookupError> {
        Ok(ArchetypeRegistry::from_paths(self.schema.as_slice())?)
    }

    /// Load the storage registry
    ///
    /// # Errors
    /// Fails on unreadable or invalid storage configuration.
    pub fn storage_registry(&self) -> Result<StorageRegistry, LookupError> {
        match &self.storage {
            Some(path) => Ok(StorageRegistry::load(path)?),
            None => Ok(StorageRegistry::builtin()),
        }
    }
}
