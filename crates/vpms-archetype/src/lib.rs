//! VPMS Archetype Model
//!
//! Runtime schema for archetype-driven objects.
//!
//! # Overview
//!
//! - **ArchetypeDescriptor / NodeDescriptor**: declared object shapes and their
//!   storage paths
//! - **LookupReference**: typed interpretation of a node's lookup assertion
//! - **ShortNamePattern**: short-name matching with `*` wildcards
//! - **ArchetypeRegistry**: versioned registry, loadable from JSON or YAML
//!
//! # Example
//!
//! ```rust
//! use vpms_archetype::{
//!     ArchetypeDescriptor, ArchetypeRegistry, ArchetypeSource, AssertionDescriptor, NodeDescriptor,
//! };
//!
//! let registry = ArchetypeRegistry::new();
//! registry
//!     .register(
//!         ArchetypeDescriptor::new("contact.location", "Contact").with_node(
//!             NodeDescriptor::new("state", "/details/state").with_assertion(
//!                 AssertionDescriptor::new("lookup")
//!                     .with_property("type", "lookup")
//!                     .with_property("source", "lookup.state"),
//!             ),
//!         ),
//!     )
//!     .unwrap();
//!
//! let location = registry.get("contact.location").unwrap();
//! assert!(location.node("state").unwrap().lookup().is_some());
//! ```

#![warn(missing_docs)]

pub mod descriptor;
pub mod error;
pub mod reference;
pub mod registry;
pub mod short_name;

// Re-exports
pub use descriptor::{
    ArchetypeDescriptor, AssertionDescriptor, NodeDescriptor, ARCHETYPE_RANGE_ASSERTION,
    DETAILS_PATH_PREFIX,
};
pub use error::ArchetypeError;
pub use reference::{LookupReference, RelationshipEnd, LOCAL_LOOKUP_ASSERTION, LOOKUP_ASSERTION};
pub use registry::{parse_json, parse_yaml, ArchetypeRegistry, ArchetypeSource};
pub use short_name::{matches, overlaps, validate_short_name, ShortNamePattern};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
