//! Error types for the storage layer

use std::path::PathBuf;

/// Storage errors
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// No storage mapping for a kind or any of its parents
    #[error("no storage mapping for kind '{kind}' (searched: {searched:?})")]
    NoMapping {
        /// Kind that was resolved
        kind: String,
        /// Kinds tried, in parent chain order
        searched: Vec<String>,
    },

    /// Kind parent chain loops back on itself
    #[error("cyclic kind hierarchy at '{0}'")]
    CyclicKind(String),

    /// Two mappings declared for one kind
    #[error("duplicate storage mapping for kind '{0}'")]
    DuplicateMapping(String),

    /// Unique key violated
    #[error("unique constraint violated on {table}: {key}")]
    UniqueViolation {
        /// Table holding the key
        table: String,
        /// Offending key
        key: String,
    },

    /// Object archetype unknown to the schema
    #[error("unknown archetype: {0}")]
    UnknownArchetype(String),

    /// Value set for a node the archetype does not declare
    #[error("archetype {archetype} has no node '{node}'")]
    UnknownNode {
        /// Archetype short name
        archetype: String,
        /// Undeclared node name
        node: String,
    },

    /// Object kind has no classification table
    #[error("kind '{0}' does not support classifications")]
    ClassificationsUnsupported(String),

    /// Statement cannot be executed by this session
    #[error("unsupported statement: {0}")]
    Unsupported(String),

    /// Storage configuration could not be parsed
    #[error("invalid storage configuration in {path}: {message}")]
    Config {
        /// Configuration file
        path: PathBuf,
        /// Parser message
        message: String,
    },

    /// IO error while reading configuration
    #[error("io error reading {path}: {source}")]
    Io {
        /// Configuration file
        path: PathBuf,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },

    /// Backend failure
    #[error("backend error: {0}")]
    Backend(String),
}

impl StoreError {
    /// True for errors caused by registry or schema configuration
    #[inline]
    #[must_use]
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::NoMapping { .. }
                | Self::CyclicKind(_)
                | Self::DuplicateMapping(_)
                | Self::Config { .. }
                | Self::ClassificationsUnsupported(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_mapping_names_kind() {
        let err = StoreError::NoMapping {
            kind: "Invoice".into(),
            searched: vec!["Invoice".into(), "FinancialAct".into()],
        };
        assert!(err.to_string().contains("Invoice"));
        assert!(err.is_configuration());
    }

    #[test]
    fn backend_errors_are_not_configuration() {
        assert!(!StoreError::Backend("connection reset".into()).is_configuration());
        assert!(!StoreError::UniqueViolation {
            table: "entity_classifications".into(),
            key: "(1, 2)".into()
        }
        .is_configuration());
    }
}
