//! Error types for the archetype schema model

use std::path::PathBuf;

/// Errors raised while building, parsing or querying archetype descriptors
#[derive(Debug, thiserror::Error)]
pub enum ArchetypeError {
    /// Short name or short-name pattern is malformed
    #[error("invalid short name '{name}': {reason}")]
    InvalidShortName {
        /// Name or pattern as given
        name: String,
        /// What is wrong with it
        reason: String,
    },

    /// Lookup assertion parameters on a node cannot be interpreted
    #[error("malformed lookup assertion on node '{node}' of archetype {archetype}: {reason}")]
    MalformedAssertion {
        /// Archetype declaring the node
        archetype: String,
        /// Node carrying the assertion
        node: String,
        /// What is wrong with the parameters
        reason: String,
    },

    /// Two nodes in one archetype share a name
    #[error("duplicate node '{node}' in archetype {archetype}")]
    DuplicateNode {
        /// Archetype short name
        archetype: String,
        /// Repeated node name
        node: String,
    },

    /// Archetype is not registered
    #[error("archetype not found: {0}")]
    NotFound(String),

    /// IO error while loading descriptors
    #[error("io error reading {path}: {source}")]
    Io {
        /// File or directory being read
        path: PathBuf,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },

    /// Descriptor document could not be deserialized
    #[error("failed to parse descriptors in {path}: {message}")]
    Parse {
        /// Descriptor file
        path: PathBuf,
        /// Deserializer message
        message: String,
    },
}

impl ArchetypeError {
    /// Create an invalid short name error
    pub fn invalid_short_name(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidShortName {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Create a malformed assertion error
    pub fn malformed_assertion(
        archetype: impl Into<String>,
        node: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::MalformedAssertion {
            archetype: archetype.into(),
            node: node.into(),
            reason: reason.into(),
        }
    }

    /// Create an IO error for path
    pub fn io_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// True for errors caused by a defective schema rather than IO
    #[inline]
    #[must_use]
    pub fn is_schema_defect(&self) -> bool {
        matches!(
            self,
            Self::InvalidShortName { .. } | Self::MalformedAssertion { .. } | Self::DuplicateNode { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_assertion_names_node_and_archetype() {
        let err = ArchetypeError::malformed_assertion("contact.location", "state", "missing type");
        let message = err.to_string();
        assert!(message.contains("contact.location"));
        assert!(message.contains("state"));
        assert!(err.is_schema_defect());
    }

    #[test]
    fn io_error_is_not_schema_defect() {
        let err = ArchetypeError::io_error(
            "/tmp/missing.json",
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );
        assert!(!err.is_schema_defect());
        assert!(err.to_string().contains("missing.json"));
    }
}
