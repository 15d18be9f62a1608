//! Typed lookup references parsed from node assertions
//!
//! A lookup-bearing node declares how its string value resolves to a lookup.
//! The assertion parameters are interpreted once, when the archetype is
//! registered, into a [`LookupReference`].

use crate::descriptor::NodeDescriptor;
use crate::error::ArchetypeError;
use crate::short_name::ShortNamePattern;
use serde::{Deserialize, Serialize};

/// Name of the assertion carrying lookup parameters
pub const LOOKUP_ASSERTION: &str = "lookup";

/// Name of the assertion for inline (schema-local) lookups
pub const LOCAL_LOOKUP_ASSERTION: &str = "lookup.local";

/// How a lookup node's code resolves to a lookup archetype
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum LookupReference {
    /// `type = "lookup"`: code of a lookup whose archetype matches `source`
    Direct {
        /// Lookup archetype name or pattern
        source: String,
    },

    /// `type = "targetLookup"`: code of a lookup at the `target` end of a
    /// relationship archetype matching `relationship`
    Target {
        /// Relationship archetype name or pattern
        relationship: String,
    },

    /// `type = "sourceLookup"`: code of a lookup at the `source` end of a
    /// relationship archetype matching `relationship`
    Source {
        /// Relationship archetype name or pattern
        relationship: String,
    },

    /// Codes enumerated in the schema itself
    Local,
}

/// End of a relationship archetype that names the referenced lookups
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationshipEnd {
    /// The relationship's `source` node
    Source,
    /// The relationship's `target` node
    Target,
}

impl RelationshipEnd {
    /// Node name on the relationship archetype
    #[inline]
    #[must_use]
    pub fn node_name(self) -> &'static str {
        match self {
            Self::Source => "source",
            Self::Target => "target",
        }
    }
}

impl LookupReference {
    /// Interpret the lookup assertions of `node`
    ///
    /// Returns `Ok(None)` for nodes that are not lookups.
    ///
    /// # Errors
    /// Returns [`ArchetypeError::MalformedAssertion`] when the `type` is
    /// missing or unknown, a required parameter is absent, or a parameter is
    /// not a valid short-name pattern.
    pub fn parse(archetype: &str, node: &NodeDescriptor) -> Result<Option<Self>, ArchetypeError> {
        if !node.is_lookup() {
            return Ok(None);
        }

        let malformed =
            |reason: String| ArchetypeError::malformed_assertion(archetype, &node.name, reason);

        let Some(assertion) = node.assertion(LOOKUP_ASSERTION) else {
            if node.assertion(LOCAL_LOOKUP_ASSERTION).is_some() {
                return Ok(Some(Self::Local));
            }
            return Err(malformed("no 'lookup' assertion".to_string()));
        };

        let required = |param: &str| -> Result<String, ArchetypeError> {
            let value = assertion
                .property(param)
                .filter(|v| !v.is_empty())
                .ok_or_else(|| malformed(format!("missing '{param}' parameter")))?;
            ShortNamePattern::parse(value)
                .map_err(|e| malformed(format!("bad '{param}' parameter: {e}")))?;
            Ok(value.to_string())
        };

        let reference = match assertion.property("type") {
            Some("lookup") => Self::Direct {
                source: required("source")?,
            },
            Some("targetLookup") => Self::Target {
                relationship: required("relationship")?,
            },
            Some("sourceLookup") => Self::Source {
                relationship: required("relationship")?,
            },
            Some("local") => Self::Local,
            Some(other) => return Err(malformed(format!("unknown type '{other}'"))),
            None => return Err(malformed("missing 'type' parameter".to_string())),
        };

        Ok(Some(reference))
    }

    /// Relationship pattern and end, for indirect references
    #[must_use]
    pub fn relationship(&self) -> Option<(&str, RelationshipEnd)> {
        match self {
            Self::Target { relationship } => Some((relationship, RelationshipEnd::Target)),
            Self::Source { relationship } => Some((relationship, RelationshipEnd::Source)),
            Self::Direct { .. } | Self::Local => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::AssertionDescriptor;

    fn lookup_node(assertion: AssertionDescriptor) -> NodeDescriptor {
        NodeDescriptor::new("state", "/details/state").with_assertion(assertion)
    }

    #[test]
    fn plain_node_has_no_reference() {
        let node = NodeDescriptor::new("name", "/name");
        assert_eq!(LookupReference::parse("party.basic", &node).unwrap(), None);
    }

    #[test]
    fn parses_direct_reference() {
        let node = lookup_node(
            AssertionDescriptor::new("lookup")
                .with_property("type", "lookup")
                .with_property("source", "lookup.state"),
        );
        assert_eq!(
            LookupReference::parse("contact.location", &node).unwrap(),
            Some(LookupReference::Direct {
                source: "lookup.state".into()
            })
        );
    }

    #[test]
    fn parses_target_and_source_references() {
        let target = lookup_node(
            AssertionDescriptor::new("lookup")
                .with_property("type", "targetLookup")
                .with_property("relationship", "lookupRelationship.countryState")
                .with_property("value", "/details/country"),
        );
        let reference = LookupReference::parse("contact.location", &target)
            .unwrap()
            .unwrap();
        assert_eq!(
            reference.relationship(),
            Some(("lookupRelationship.countryState", RelationshipEnd::Target))
        );

        let source = lookup_node(
            AssertionDescriptor::new("lookup")
                .with_property("type", "sourceLookup")
                .with_property("relationship", "lookupRelationship.*"),
        );
        let reference = LookupReference::parse("contact.location", &source)
            .unwrap()
            .unwrap();
        assert_eq!(reference.relationship().map(|(_, end)| end), Some(RelationshipEnd::Source));
    }

    #[test]
    fn local_lookup_assertion() {
        let node = lookup_node(AssertionDescriptor::new("lookup.local"));
        assert_eq!(
            LookupReference::parse("party.basic", &node).unwrap(),
            Some(LookupReference::Local)
        );
    }

    #[test]
    fn rejects_missing_type() {
        let node = lookup_node(AssertionDescriptor::new("lookup").with_property("source", "lookup.state"));
        let err = LookupReference::parse("contact.location", &node).unwrap_err();
        assert!(matches!(err, ArchetypeError::MalformedAssertion { .. }));
        assert!(err.to_string().contains("missing 'type'"));
    }

    #[test]
    fn rejects_unknown_type_and_missing_parameters() {
        let unknown = lookup_node(AssertionDescriptor::new("lookup").with_property("type", "remote"));
        assert!(LookupReference::parse("a.b", &unknown).is_err());

        let no_source = lookup_node(AssertionDescriptor::new("lookup").with_property("type", "lookup"));
        assert!(LookupReference::parse("a.b", &no_source).is_err());

        let bad_pattern = lookup_node(
            AssertionDescriptor::new("lookup")
                .with_property("type", "lookup")
                .with_property("source", "lookup..state"),
        );
        assert!(LookupReference::parse("a.b", &bad_pattern).is_err());
    }
}
