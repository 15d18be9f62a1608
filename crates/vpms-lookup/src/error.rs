//! Error types for lookup usage discovery and replacement

use std::path::PathBuf;
use vpms_archetype::ArchetypeError;
use vpms_store::StoreError;

/// Lookup engine errors
#[derive(Debug, thiserror::Error)]
pub enum LookupError {
    /// Source and target of a replace are the same lookup
    #[error("Source and target lookups are identical: {0}")]
    IdenticalLookups(String),

    /// Source and target of a replace belong to different archetypes
    #[error("Source and target lookups must have the same archetype: {replaced} != {replacement}")]
    ArchetypeMismatch {
        /// Archetype of the lookup being replaced
        replaced: String,
        /// Archetype of the replacement lookup
        replacement: String,
    },

    /// Lookup is still referenced and cannot be removed
    #[error("lookup {archetype}:{code} (id {id}) is in use")]
    LookupInUse {
        /// Lookup archetype
        archetype: String,
        /// Lookup code
        code: String,
        /// Lookup id
        id: u64,
    },

    /// Lookup to remove is not stored
    #[error("lookup {archetype}:{code} (id {id}) not found")]
    LookupNotFound {
        /// Lookup archetype
        archetype: String,
        /// Lookup code
        code: String,
        /// Lookup id
        id: u64,
    },

    /// A lookup-bearing archetype has no storage mapping
    #[error("unsupported archetype {archetype} for node '{node}': {source}")]
    UnsupportedArchetype {
        /// Archetype holding the lookup node
        archetype: String,
        /// Lookup node name
        node: String,
        /// Mapping failure
        #[source]
        source: StoreError,
    },

    /// Schema model error
    #[error(transparent)]
    Archetype(#[from] ArchetypeError),

    /// Storage error
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Engine configuration could not be parsed
    #[error("invalid engine configuration in {path}: {message}")]
    Config {
        /// Configuration file
        path: PathBuf,
        /// Parser message
        message: String,
    },

    /// IO error reading engine configuration
    #[error("io error reading {path}: {source}")]
    Io {
        /// Configuration file
        path: PathBuf,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },
}

impl LookupError {
    /// True for errors caused by schema or storage configuration
    #[must_use]
    pub fn is_configuration(&self) -> bool {
        match self {
            Self::UnsupportedArchetype { .. } | Self::Config { .. } => true,
            Self::Archetype(e) => e.is_schema_defect(),
            Self::Store(e) => e.is_configuration(),
            _ => false,
        }
    }

    /// True for rejected preconditions; nothing was modified
    #[inline]
    #[must_use]
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            Self::IdenticalLookups(_)
                | Self::ArchetypeMismatch { .. }
                | Self::LookupInUse { .. }
                | Self::LookupNotFound { .. }
        )
    }
}
