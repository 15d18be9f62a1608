//! Node reference index
//!
//! [`LookupUsageFinder`] answers "which nodes, on which archetypes, may hold a
//! code of this lookup archetype". The scan walks every archetype in the
//! schema and interprets the parsed lookup reference of each node. Results are
//! cached per lookup name and schema version.

use crate::error::LookupError;
use moka::sync::Cache;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use vpms_archetype::{
    overlaps, ArchetypeDescriptor, ArchetypeSource, LookupReference, NodeDescriptor, RelationshipEnd,
    ShortNamePattern,
};

/// Default number of cached reference sets
pub const DEFAULT_CACHE_CAPACITY: u64 = 1024;

/// Node that may hold a lookup code, with the archetype declaring it
#[derive(Debug, Clone)]
pub struct CodeReference {
    archetype: Arc<ArchetypeDescriptor>,
    node: NodeDescriptor,
}

impl CodeReference {
    /// Create a reference
    #[must_use]
    pub fn new(archetype: Arc<ArchetypeDescriptor>, node: NodeDescriptor) -> Self {
        Self { archetype, node }
    }

    /// Declaring archetype
    #[inline]
    #[must_use]
    pub fn archetype(&self) -> &ArchetypeDescriptor {
        &self.archetype
    }

    /// Referencing node
    #[inline]
    #[must_use]
    pub fn node(&self) -> &NodeDescriptor {
        &self.node
    }

    /// Short name of the declaring archetype
    #[inline]
    #[must_use]
    pub fn short_name(&self) -> &str {
        &self.archetype.short_name
    }

    /// Storage path of the node
    #[inline]
    #[must_use]
    pub fn path(&self) -> &str {
        &self.node.path
    }

    fn key(&self) -> (&str, &str) {
        (self.short_name(), self.path())
    }
}

impl PartialEq for CodeReference {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for CodeReference {}

impl fmt::Display for CodeReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.short_name(), self.path())
    }
}

/// Finds the nodes that reference a lookup archetype
pub struct LookupUsageFinder {
    source: Arc<dyn ArchetypeSource>,
    cache: Cache<(u64, String), Arc<[CodeReference]>>,
}

impl fmt::Debug for LookupUsageFinder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LookupUsageFinder")
            .field("version", &self.source.version())
            .field("cached", &self.cache.entry_count())
            .finish_non_exhaustive()
    }
}

impl LookupUsageFinder {
    /// Create a finder with the default cache capacity
    #[must_use]
    pub fn new(source: Arc<dyn ArchetypeSource>) -> Self {
        Self::with_capacity(source, DEFAULT_CACHE_CAPACITY)
    }

    /// Create a finder caching at most `capacity` reference sets
    #[must_use]
    pub fn with_capacity(source: Arc<dyn ArchetypeSource>, capacity: u64) -> Self {
        Self {
            source,
            cache: Cache::new(capacity),
        }
    }

    /// Schema the finder scans
    #[inline]
    #[must_use]
    pub fn source(&self) -> &Arc<dyn ArchetypeSource> {
        &self.source
    }

    /// Nodes that may hold a code of the lookup archetype `lookup`
    ///
    /// `lookup` may be a wildcard family such as `lookup.sta*`. Archetypes
    /// matched by `lookup` themselves are never reported. The result holds
    /// each (archetype, node path) pair once, ordered by archetype then path.
    ///
    /// # Errors
    /// Fails if `lookup` or any pattern consulted during the scan is
    /// malformed; no partial result is returned.
    pub fn get_code_references(&self, lookup: &str) -> Result<Arc<[CodeReference]>, LookupError> {
        let version = self.source.version();
        let key = (version, lookup.to_string());
        if let Some(references) = self.cache.get(&key) {
            tracing::debug!(lookup, version, "code references cache hit");
            return Ok(references);
        }

        let references: Arc<[CodeReference]> = self.scan(lookup)?.into();
        self.cache.insert(key, Arc::clone(&references));
        tracing::debug!(lookup, version, count = references.len(), "code references computed");
        Ok(references)
    }

    /// Drop every cached reference set
    pub fn clear_cache(&self) {
        self.cache.invalidate_all();
    }

    fn scan(&self, lookup: &str) -> Result<Vec<CodeReference>, LookupError> {
        let pattern = ShortNamePattern::parse(lookup)?;
        let mut seen = HashSet::new();
        let mut references = Vec::new();

        for archetype in self.source.archetypes() {
            if pattern.matches(&archetype.short_name) {
                continue;
            }
            for (node, reference) in archetype.lookup_nodes() {
                if self.is_reference(reference, lookup)?
                    && seen.insert((archetype.short_name.clone(), node.path.clone()))
                {
                    references.push(CodeReference::new(Arc::clone(&archetype), node.clone()));
                }
            }
        }

        references.sort_by(|a, b| a.key().cmp(&b.key()));
        Ok(references)
    }

    fn is_reference(&self, reference: &LookupReference, lookup: &str) -> Result<bool, LookupError> {
        match reference {
            LookupReference::Direct { source } => Ok(overlaps(source, lookup)?),
            LookupReference::Target { relationship } => {
                self.relates_to(relationship, RelationshipEnd::Target, lookup)
            }
            LookupReference::Source { relationship } => {
                self.relates_to(relationship, RelationshipEnd::Source, lookup)
            }
            LookupReference::Local => Ok(false),
        }
    }

    /// True if `end` of any relationship archetype matching `relationship`
    /// can hold a lookup of `lookup`
    fn relates_to(&self, relationship: &str, end: RelationshipEnd, lookup: &str) -> Result<bool, LookupError> {
        for descriptor in self.source.matching(relationship)? {
            let Some(node) = descriptor.node(end.node_name()) else {
                continue;
            };
            let range = node.archetype_range();
            if range.is_empty() {
                if let Some(filter) = &node.filter {
                    if overlaps(filter, lookup)? {
                        return Ok(true);
                    }
                }
                continue;
            }
            for short_name in range {
                if overlaps(short_name, lookup)? {
                    return Ok(true);
                }
            }
        }
        Ok(false)
    }
}
