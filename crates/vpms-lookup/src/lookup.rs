//! Lookup reference data and lookup relationships

use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};
use std::hash::{Hash, Hasher};
use vpms_store::IMObject;

/// Node names a lookup archetype stores its fields under
pub mod nodes {
    /// Code, unique within the archetype
    pub const CODE: &str = "code";
    /// Display name
    pub const NAME: &str = "name";
    /// Description
    pub const DESCRIPTION: &str = "description";
    /// Default flag
    pub const DEFAULT_LOOKUP: &str = "defaultLookup";
}

/// Directed edge between two lookups
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LookupRelationship {
    /// Relationship archetype, e.g. `lookupRelationship.countryState`
    pub archetype: String,

    /// Id of the source lookup
    pub source: u64,

    /// Id of the target lookup
    pub target: u64,
}

/// Reference data value such as a state, species or contact purpose
///
/// Two lookups are equal when they share archetype and code.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Lookup {
    /// Storage id
    pub id: u64,

    /// Archetype short name, e.g. `lookup.state`
    pub archetype: String,

    /// Code, unique within the archetype
    pub code: String,

    /// Display name
    pub name: Option<String>,

    /// Description
    pub description: Option<String>,

    /// Default lookup for its archetype
    pub default_lookup: bool,

    /// Relationships where this lookup is the source
    #[serde(default)]
    pub source_relationships: Vec<LookupRelationship>,

    /// Relationships where this lookup is the target
    #[serde(default)]
    pub target_relationships: Vec<LookupRelationship>,
}

impl Lookup {
    /// Create a lookup
    #[must_use]
    pub fn new(id: u64, archetype: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            id,
            archetype: archetype.into(),
            code: code.into(),
            ..Self::default()
        }
    }

    /// Set display name
    #[inline]
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set description
    #[inline]
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Mark as default lookup
    #[inline]
    #[must_use]
    pub fn as_default(mut self) -> Self {
        self.default_lookup = true;
        self
    }

    /// Relate `source` to `target`, recording the edge on both
    pub fn relate(source: &mut Lookup, target: &mut Lookup, archetype: impl Into<String>) -> LookupRelationship {
        let relationship = LookupRelationship {
            archetype: archetype.into(),
            source: source.id,
            target: target.id,
        };
        source.add_source_relationship(relationship.clone());
        target.add_target_relationship(relationship.clone());
        relationship
    }

    /// Record a relationship this lookup is the source of
    pub fn add_source_relationship(&mut self, relationship: LookupRelationship) {
        if !self.source_relationships.contains(&relationship) {
            self.source_relationships.push(relationship);
        }
    }

    /// Record a relationship this lookup is the target of
    pub fn add_target_relationship(&mut self, relationship: LookupRelationship) {
        if !self.target_relationships.contains(&relationship) {
            self.target_relationships.push(relationship);
        }
    }

    /// Forget a relationship at either end
    pub fn remove_relationship(&mut self, relationship: &LookupRelationship) -> bool {
        let before = self.source_relationships.len() + self.target_relationships.len();
        self.source_relationships.retain(|r| r != relationship);
        self.target_relationships.retain(|r| r != relationship);
        before != self.source_relationships.len() + self.target_relationships.len()
    }

    /// Remove a relationship from both of its lookups
    pub fn unrelate(source: &mut Lookup, target: &mut Lookup, relationship: &LookupRelationship) -> bool {
        let removed = source.remove_relationship(relationship);
        target.remove_relationship(relationship) || removed
    }

    /// Storage form of this lookup
    #[must_use]
    pub fn to_object(&self) -> IMObject {
        let mut object = IMObject::new(&self.archetype)
            .with_value(nodes::CODE, &self.code)
            .with_value(nodes::DEFAULT_LOOKUP, self.default_lookup.to_string());
        object.id = self.id;
        if let Some(name) = &self.name {
            object.set(nodes::NAME, name);
        }
        if let Some(description) = &self.description {
            object.set(nodes::DESCRIPTION, description);
        }
        object
    }

    /// Lookup held by a stored object, without relationships
    #[must_use]
    pub fn from_object(object: &IMObject) -> Self {
        Self {
            id: object.id,
            archetype: object.archetype.clone(),
            code: object.value(nodes::CODE).unwrap_or_default().to_string(),
            name: object.value(nodes::NAME).map(str::to_string),
            description: object.value(nodes::DESCRIPTION).map(str::to_string),
            default_lookup: object.value(nodes::DEFAULT_LOOKUP) == Some("true"),
            source_relationships: Vec::new(),
            target_relationships: Vec::new(),
        }
    }
}

impl PartialEq for Lookup {
    fn eq(&self, other: &Self) -> bool {
        self.archetype == other.archetype && self.code == other.code
    }
}

impl Eq for Lookup {}

impl Hash for Lookup {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.archetype.hash(state);
        self.code.hash(state);
    }
}

impl Display for Lookup {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.archetype, self.code)
    }
}
