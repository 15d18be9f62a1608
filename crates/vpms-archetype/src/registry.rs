//! Versioned in-memory archetype registry
//!
//! Provides [`ArchetypeRegistry`], the schema model consulted by the lookup
//! engine, and the [`ArchetypeSource`] trait it is consumed through.

use crate::descriptor::ArchetypeDescriptor;
use crate::error::ArchetypeError;
use crate::short_name::ShortNamePattern;
use parking_lot::RwLock;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Read-only view of the archetype descriptors known to a process
pub trait ArchetypeSource: Send + Sync {
    /// Every registered archetype
    fn archetypes(&self) -> Vec<Arc<ArchetypeDescriptor>>;

    /// Archetype by exact short name
    fn get(&self, short_name: &str) -> Option<Arc<ArchetypeDescriptor>>;

    /// Archetypes whose short name matches `pattern`
    ///
    /// # Errors
    /// Returns an error if the pattern is malformed.
    fn matching(&self, pattern: &str) -> Result<Vec<Arc<ArchetypeDescriptor>>, ArchetypeError>;

    /// Counter that changes whenever the descriptor set changes
    fn version(&self) -> u64;
}

impl<T: ArchetypeSource + ?Sized> ArchetypeSource for Arc<T> {
    fn archetypes(&self) -> Vec<Arc<ArchetypeDescriptor>> {
        (**self).archetypes()
    }

    fn get(&self, short_name: &str) -> Option<Arc<ArchetypeDescriptor>> {
        (**self).get(short_name)
    }

    fn matching(&self, pattern: &str) -> Result<Vec<Arc<ArchetypeDescriptor>>, ArchetypeError> {
        (**self).matching(pattern)
    }

    fn version(&self) -> u64 {
        (**self).version()
    }
}

/// Thread-safe archetype registry
///
/// Archetypes are compiled on registration, so every descriptor handed out
/// carries parsed lookup references. Each mutation bumps the version.
#[derive(Debug, Default)]
pub struct ArchetypeRegistry {
    inner: RwLock<RegistryState>,
}

#[derive(Debug, Default)]
struct RegistryState {
    archetypes: BTreeMap<String, Arc<ArchetypeDescriptor>>,
    version: u64,
}

/// Descriptor file contents: one archetype or a list
#[derive(Deserialize)]
#[serde(untagged)]
enum DescriptorDocument {
    Many(Vec<ArchetypeDescriptor>),
    One(ArchetypeDescriptor),
}

impl DescriptorDocument {
    fn into_vec(self) -> Vec<ArchetypeDescriptor> {
        match self {
            Self::Many(all) => all,
            Self::One(one) => vec![one],
        }
    }
}

impl ArchetypeRegistry {
    /// Create empty registry
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create registry from descriptors
    ///
    /// # Errors
    /// Fails on the first descriptor that does not compile.
    pub fn with_archetypes(
        archetypes: impl IntoIterator<Item = ArchetypeDescriptor>,
    ) -> Result<Self, ArchetypeError> {
        let registry = Self::new();
        registry.register_all(archetypes)?;
        Ok(registry)
    }

    /// Load descriptors from JSON or YAML files or directories of them
    ///
    /// # Errors
    /// Fails on unreadable paths, unparseable documents, or invalid descriptors.
    pub fn from_paths<P: AsRef<Path>>(paths: &[P]) -> Result<Self, ArchetypeError> {
        let registry = Self::new();
        for path in paths {
            registry.load_path(path.as_ref())?;
        }
        Ok(registry)
    }

    /// Register or replace an archetype
    ///
    /// # Errors
    /// Fails if the descriptor does not compile; the registry is unchanged.
    pub fn register(&self, archetype: ArchetypeDescriptor) -> Result<(), ArchetypeError> {
        self.register_all([archetype])
    }

    /// Register several archetypes
    ///
    /// Every descriptor is compiled before any is registered.
    ///
    /// # Errors
    /// Fails on the first descriptor that does not compile; the registry is
    /// unchanged.
    pub fn register_all(
        &self,
        archetypes: impl IntoIterator<Item = ArchetypeDescriptor>,
    ) -> Result<(), ArchetypeError> {
        let compiled = archetypes
            .into_iter()
            .map(|mut archetype| {
                archetype.compile()?;
                Ok(archetype)
            })
            .collect::<Result<Vec<_>, ArchetypeError>>()?;

        let mut state = self.inner.write();
        for archetype in compiled {
            let short_name = archetype.short_name.clone();
            let replaced = state
                .archetypes
                .insert(short_name.clone(), Arc::new(archetype))
                .is_some();
            state.version += 1;

            tracing::debug!(short_name = %short_name, replaced, version = state.version, "archetype registered");
        }
        Ok(())
    }

    /// Remove an archetype
    pub fn remove(&self, short_name: &str) -> Option<Arc<ArchetypeDescriptor>> {
        let mut state = self.inner.write();
        let removed = state.archetypes.remove(short_name);
        if removed.is_some() {
            state.version += 1;
        }
        removed
    }

    /// Number of registered archetypes
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.read().archetypes.len()
    }

    /// Check if registry is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Load one file, or every `.json`/`.yaml`/`.yml` file in a directory
    ///
    /// Directory entries are read in file name order. Every file is parsed
    /// and compiled before anything is registered, so a failed load leaves
    /// the registry unchanged.
    ///
    /// # Errors
    /// Fails on IO, parse, or compile errors.
    pub fn load_path(&self, path: &Path) -> Result<usize, ArchetypeError> {
        let files = if path.is_dir() {
            let mut files: Vec<PathBuf> = std::fs::read_dir(path)
                .map_err(|e| ArchetypeError::io_error(path, e))?
                .filter_map(Result::ok)
                .map(|entry| entry.path())
                .filter(|p| descriptor_format(p).is_some())
                .collect();
            files.sort();
            files
        } else {
            vec![path.to_path_buf()]
        };

        let mut archetypes = Vec::new();
        for file in &files {
            archetypes.extend(read_file(file)?);
        }

        let count = archetypes.len();
        self.register_all(archetypes)?;
        tracing::info!(path = %path.display(), files = files.len(), count, "loaded archetype descriptors");
        Ok(count)
    }
}

fn read_file(path: &Path) -> Result<Vec<ArchetypeDescriptor>, ArchetypeError> {
    let text = std::fs::read_to_string(path).map_err(|e| ArchetypeError::io_error(path, e))?;
    match descriptor_format(path) {
        Some(Format::Yaml) => parse_yaml(&text),
        _ => parse_json(&text),
    }
    .map_err(|message| ArchetypeError::Parse {
        path: path.to_path_buf(),
        message,
    })
}

impl ArchetypeSource for ArchetypeRegistry {
    fn archetypes(&self) -> Vec<Arc<ArchetypeDescriptor>> {
        self.inner.read().archetypes.values().cloned().collect()
    }

    fn get(&self, short_name: &str) -> Option<Arc<ArchetypeDescriptor>> {
        self.inner.read().archetypes.get(short_name).cloned()
    }

    fn matching(&self, pattern: &str) -> Result<Vec<Arc<ArchetypeDescriptor>>, ArchetypeError> {
        let pattern = ShortNamePattern::parse(pattern)?;
        let state = self.inner.read();

        if !pattern.is_wildcard() {
            return Ok(state.archetypes.get(pattern.as_str()).cloned().into_iter().collect());
        }

        Ok(state
            .archetypes
            .iter()
            .filter(|(name, _)| pattern.matches(name))
            .map(|(_, archetype)| Arc::clone(archetype))
            .collect())
    }

    fn version(&self) -> u64 {
        self.inner.read().version
    }
}

#[derive(Debug, Clone, Copy)]
enum Format {
    Json,
    Yaml,
}

fn descriptor_format(path: &Path) -> Option<Format> {
    match path.extension()?.to_str()? {
        "json" => Some(Format::Json),
        "yaml" | "yml" => Some(Format::Yaml),
        _ => None,
    }
}

/// Parse a JSON document holding one descriptor or a list
///
/// # Errors
/// Returns the deserializer message on failure.
pub fn parse_json(text: &str) -> Result<Vec<ArchetypeDescriptor>, String> {
    serde_json::from_str::<DescriptorDocument>(text)
        .map(DescriptorDocument::into_vec)
        .map_err(|e| e.to_string())
}

/// Parse a YAML document holding one descriptor or a list
///
/// # Errors
/// Returns the deserializer message on failure.
pub fn parse_yaml(text: &str) -> Result<Vec<ArchetypeDescriptor>, String> {
    serde_yaml::from_str::<DescriptorDocument>(text)
        .map(DescriptorDocument::into_vec)
        .map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{AssertionDescriptor, NodeDescriptor};

    fn state() -> ArchetypeDescriptor {
        ArchetypeDescriptor::new("lookup.state", "Lookup").with_node(NodeDescriptor::new("code", "/code"))
    }

    fn suburb() -> ArchetypeDescriptor {
        ArchetypeDescriptor::new("lookup.suburb", "Lookup").with_node(NodeDescriptor::new("code", "/code"))
    }

    #[test]
    fn register_bumps_version() {
        let registry = ArchetypeRegistry::new();
        assert_eq!(registry.version(), 0);

        registry.register(state()).unwrap();
        registry.register(suburb()).unwrap();
        assert_eq!(registry.version(), 2);
        assert_eq!(registry.len(), 2);

        registry.register(state()).unwrap();
        assert_eq!(registry.version(), 3);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn failed_register_leaves_registry_unchanged() {
        let registry = ArchetypeRegistry::new();
        let broken = ArchetypeDescriptor::new("party.broken", "Party").with_node(
            NodeDescriptor::new("title", "/details/title")
                .with_assertion(AssertionDescriptor::new("lookup").with_property("type", "lookup")),
        );

        assert!(registry.register(broken).is_err());
        assert!(registry.is_empty());
        assert_eq!(registry.version(), 0);
    }

    #[test]
    fn register_all_is_all_or_nothing() {
        let registry = ArchetypeRegistry::new();
        let broken = ArchetypeDescriptor::new("lookup.*", "Lookup");

        assert!(registry.register_all([state(), broken, suburb()]).is_err());
        assert!(registry.is_empty());
        assert_eq!(registry.version(), 0);
    }

    #[test]
    fn matching_exact_and_wildcard() {
        let registry = ArchetypeRegistry::with_archetypes([state(), suburb()]).unwrap();

        assert_eq!(registry.matching("lookup.state").unwrap().len(), 1);
        assert_eq!(registry.matching("lookup.*").unwrap().len(), 2);
        assert!(registry.matching("party.*").unwrap().is_empty());
        assert!(registry.matching("lookup..x").is_err());
    }

    #[test]
    fn remove_bumps_version_only_when_present() {
        let registry = ArchetypeRegistry::with_archetypes([state()]).unwrap();
        let version = registry.version();

        assert!(registry.remove("lookup.missing").is_none());
        assert_eq!(registry.version(), version);

        assert!(registry.remove("lookup.state").is_some());
        assert_eq!(registry.version(), version + 1);
    }

    #[test]
    fn parse_single_and_list_documents() {
        let one = r#"{"shortName": "lookup.state", "kind": "Lookup"}"#;
        assert_eq!(parse_json(one).unwrap().len(), 1);

        let many = r#"[{"shortName": "lookup.state", "kind": "Lookup"},
                       {"shortName": "lookup.suburb", "kind": "Lookup"}]"#;
        assert_eq!(parse_json(many).unwrap().len(), 2);

        let yaml = "- shortName: lookup.state\n  kind: Lookup\n  nodes:\n    - name: code\n      path: /code\n";
        let parsed = parse_yaml(yaml).unwrap();
        assert_eq!(parsed[0].nodes[0].name, "code");
    }
}
