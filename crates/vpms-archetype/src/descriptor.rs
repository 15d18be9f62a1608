//! Archetype, node and assertion descriptors
//!
//! Descriptors are plain serde data. [`ArchetypeDescriptor::compile`] validates
//! the node set and interprets lookup assertions once; the registry compiles
//! every archetype on registration.

use crate::error::ArchetypeError;
use crate::reference::LookupReference;
use crate::short_name::validate_short_name;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// Prefix of storage paths held in an object's details map
pub const DETAILS_PATH_PREFIX: &str = "/details/";

/// Name of the assertion declaring the archetypes a node may hold
pub const ARCHETYPE_RANGE_ASSERTION: &str = "archetypeRange";

/// Named assertion with string parameters
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AssertionDescriptor {
    /// Assertion name, e.g. `lookup` or `archetypeRange`
    pub name: String,

    /// Scalar parameters
    #[serde(default)]
    pub properties: BTreeMap<String, String>,

    /// Short names listed by range-style assertions
    #[serde(default)]
    pub archetypes: Vec<String>,
}

impl AssertionDescriptor {
    /// Create assertion with no parameters
    #[inline]
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Add a scalar parameter
    #[inline]
    #[must_use]
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// Add a short name to the archetype list
    #[inline]
    #[must_use]
    pub fn with_archetype(mut self, short_name: impl Into<String>) -> Self {
        self.archetypes.push(short_name.into());
        self
    }

    /// Scalar parameter value
    #[inline]
    #[must_use]
    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }
}

/// One declared attribute of an archetype
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeDescriptor {
    /// Node name, unique within its archetype
    pub name: String,

    /// Storage path, e.g. `/code` or `/details/state`
    pub path: String,

    /// Declared value type
    #[serde(default, rename = "type")]
    pub type_name: Option<String>,

    /// Short-name filter for collection and reference nodes
    #[serde(default)]
    pub filter: Option<String>,

    /// Assertions
    #[serde(default)]
    pub assertions: Vec<AssertionDescriptor>,

    /// Nested nodes
    #[serde(default)]
    pub children: Vec<NodeDescriptor>,

    #[serde(skip)]
    lookup: Option<LookupReference>,
}

impl NodeDescriptor {
    /// Create node with name and storage path
    #[inline]
    #[must_use]
    pub fn new(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            type_name: None,
            filter: None,
            assertions: Vec::new(),
            children: Vec::new(),
            lookup: None,
        }
    }

    /// Set declared type
    #[inline]
    #[must_use]
    pub fn with_type(mut self, type_name: impl Into<String>) -> Self {
        self.type_name = Some(type_name.into());
        self
    }

    /// Set short-name filter
    #[inline]
    #[must_use]
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    /// Add assertion
    #[inline]
    #[must_use]
    pub fn with_assertion(mut self, assertion: AssertionDescriptor) -> Self {
        self.assertions.push(assertion);
        self
    }

    /// Add nested node
    #[inline]
    #[must_use]
    pub fn with_child(mut self, child: NodeDescriptor) -> Self {
        self.children.push(child);
        self
    }

    /// Restrict the node to the given archetypes via an `archetypeRange` assertion
    #[must_use]
    pub fn with_range(self, short_names: &[&str]) -> Self {
        let assertion = short_names
            .iter()
            .fold(AssertionDescriptor::new(ARCHETYPE_RANGE_ASSERTION), |a, s| {
                a.with_archetype(*s)
            });
        self.with_assertion(assertion)
    }

    /// Assertion by name
    #[must_use]
    pub fn assertion(&self, name: &str) -> Option<&AssertionDescriptor> {
        self.assertions.iter().find(|a| a.name == name)
    }

    /// True if any assertion marks this node as a lookup
    #[must_use]
    pub fn is_lookup(&self) -> bool {
        self.assertions.iter().any(|a| a.name.starts_with("lookup"))
    }

    /// True if the value lives in the owning object's details map
    #[inline]
    #[must_use]
    pub fn is_details(&self) -> bool {
        self.path.starts_with(DETAILS_PATH_PREFIX)
    }

    /// Column or property name addressed by the path
    #[inline]
    #[must_use]
    pub fn column(&self) -> &str {
        self.path.strip_prefix('/').unwrap_or(&self.path)
    }

    /// Short names listed by the `archetypeRange` assertion
    #[must_use]
    pub fn archetype_range(&self) -> &[String] {
        self.assertion(ARCHETYPE_RANGE_ASSERTION)
            .map_or(&[], |a| a.archetypes.as_slice())
    }

    /// Parsed lookup reference
    ///
    /// Only populated once the owning archetype has been compiled.
    #[inline]
    #[must_use]
    pub fn lookup(&self) -> Option<&LookupReference> {
        self.lookup.as_ref()
    }

    fn compile(&mut self, archetype: &str) -> Result<(), ArchetypeError> {
        self.lookup = LookupReference::parse(archetype, self)?;
        for child in &mut self.children {
            child.compile(archetype)?;
        }
        Ok(())
    }

    fn collect<'a>(&'a self, out: &mut Vec<&'a NodeDescriptor>) {
        out.push(self);
        for child in &self.children {
            child.collect(out);
        }
    }
}

/// Declared shape of one object type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchetypeDescriptor {
    /// Short name, e.g. `contact.location`
    pub short_name: String,

    /// Storage kind tag, e.g. `Contact` or `Party`
    pub kind: String,

    /// Human readable name
    #[serde(default)]
    pub display_name: Option<String>,

    /// Top-level nodes
    #[serde(default)]
    pub nodes: Vec<NodeDescriptor>,
}

impl ArchetypeDescriptor {
    /// Create archetype with short name and storage kind
    #[inline]
    #[must_use]
    pub fn new(short_name: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            short_name: short_name.into(),
            kind: kind.into(),
            display_name: None,
            nodes: Vec::new(),
        }
    }

    /// Set display name
    #[inline]
    #[must_use]
    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    /// Add top-level node
    #[inline]
    #[must_use]
    pub fn with_node(mut self, node: NodeDescriptor) -> Self {
        self.nodes.push(node);
        self
    }

    /// Every node, nested ones included, depth first
    #[must_use]
    pub fn all_nodes(&self) -> Vec<&NodeDescriptor> {
        let mut out = Vec::new();
        for node in &self.nodes {
            node.collect(&mut out);
        }
        out
    }

    /// Node by name, searching nested nodes
    #[must_use]
    pub fn node(&self, name: &str) -> Option<&NodeDescriptor> {
        self.all_nodes().into_iter().find(|n| n.name == name)
    }

    /// Nodes holding a parsed lookup reference
    pub fn lookup_nodes(&self) -> impl Iterator<Item = (&NodeDescriptor, &LookupReference)> {
        self.all_nodes()
            .into_iter()
            .filter_map(|n| n.lookup().map(|r| (n, r)))
    }

    /// Validate the descriptor and interpret its lookup assertions
    ///
    /// # Errors
    /// Fails on an invalid short name, duplicate node names, or malformed
    /// lookup assertions.
    pub fn compile(&mut self) -> Result<(), ArchetypeError> {
        validate_short_name(&self.short_name)?;

        let mut seen = HashSet::new();
        for node in self.all_nodes() {
            if !seen.insert(node.name.as_str()) {
                return Err(ArchetypeError::DuplicateNode {
                    archetype: self.short_name.clone(),
                    node: node.name.clone(),
                });
            }
        }

        let short_name = self.short_name.clone();
        for node in &mut self.nodes {
            node.compile(&short_name)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn location() -> ArchetypeDescriptor {
        ArchetypeDescriptor::new("contact.location", "Contact")
            .with_node(NodeDescriptor::new("address", "/details/address"))
            .with_node(
                NodeDescriptor::new("state", "/details/state").with_assertion(
                    AssertionDescriptor::new("lookup")
                        .with_property("type", "lookup")
                        .with_property("source", "lookup.state"),
                ),
            )
            .with_node(
                NodeDescriptor::new("purposes", "/classifications")
                    .with_child(NodeDescriptor::new("purpose", "/purpose")),
            )
    }

    #[test]
    fn details_and_column_paths() {
        let archetype = location();
        let state = archetype.node("state").unwrap();
        assert!(state.is_details());
        assert_eq!(state.column(), "details/state");

        let code = NodeDescriptor::new("code", "/code");
        assert!(!code.is_details());
        assert_eq!(code.column(), "code");
    }

    #[test]
    fn all_nodes_includes_children() {
        let archetype = location();
        let names: Vec<_> = archetype.all_nodes().iter().map(|n| n.name.as_str()).collect();
        assert_eq!(names, vec!["address", "state", "purposes", "purpose"]);
        assert!(archetype.node("purpose").is_some());
    }

    #[test]
    fn lookup_only_populated_after_compile() {
        let mut archetype = location();
        assert_eq!(archetype.lookup_nodes().count(), 0);

        archetype.compile().unwrap();
        let lookups: Vec<_> = archetype.lookup_nodes().map(|(n, _)| n.name.clone()).collect();
        assert_eq!(lookups, vec!["state".to_string()]);
    }

    #[test]
    fn compile_rejects_duplicate_nodes() {
        let mut archetype = location().with_node(NodeDescriptor::new("address", "/address"));
        assert!(matches!(
            archetype.compile(),
            Err(ArchetypeError::DuplicateNode { .. })
        ));
    }

    #[test]
    fn compile_rejects_wildcard_short_name() {
        let mut archetype = ArchetypeDescriptor::new("contact.*", "Contact");
        assert!(archetype.compile().is_err());
    }

    #[test]
    fn archetype_range_from_assertion() {
        let node = NodeDescriptor::new("target", "/target").with_range(&["lookup.state", "lookup.suburb"]);
        assert_eq!(
            node.archetype_range().to_vec(),
            vec!["lookup.state".to_string(), "lookup.suburb".to_string()]
        );
        assert!(NodeDescriptor::new("x", "/x").archetype_range().is_empty());
    }

    #[test]
    fn deserializes_camel_case_json() {
        let json = r#"{
            "shortName": "party.basic",
            "kind": "Party",
            "nodes": [
                {"name": "title", "path": "/details/title", "type": "java.lang.String",
                 "assertions": [{"name": "lookup", "properties": {"type": "lookup", "source": "lookup.personTitle"}}]}
            ]
        }"#;
        let mut archetype: ArchetypeDescriptor = serde_json::from_str(json).unwrap();
        archetype.compile().unwrap();
        let title = archetype.node("title").unwrap();
        assert_eq!(title.type_name.as_deref(), Some("java.lang.String"));
        assert!(title.lookup().is_some());
    }
}
