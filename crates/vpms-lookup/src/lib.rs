//! VPMS Lookup Engine
//!
//! Finds every place a lookup code may be stored and safely rewrites those
//! references from one lookup to another.
//!
//! # Overview
//!
//! - **LookupUsageFinder**: node reference index over the archetype schema
//! - **CodeDialect**: statement builders for details and column storage
//! - **LookupReplacer**: `is_used` and `replace` over a caller's session
//! - **LookupService**: transactional replace and remove with advisory locks
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use vpms_archetype::{ArchetypeDescriptor, ArchetypeRegistry, AssertionDescriptor, NodeDescriptor};
//! use vpms_lookup::{Lookup, LookupReplacer, LookupUsageFinder};
//! use vpms_store::{IMObject, MemoryStore, StorageRegistry};
//!
//! let registry = Arc::new(
//!     ArchetypeRegistry::with_archetypes([
//!         ArchetypeDescriptor::new("lookup.state", "Lookup")
//!             .with_node(NodeDescriptor::new("code", "/code"))
//!             .with_node(NodeDescriptor::new("defaultLookup", "/defaultLookup")),
//!         ArchetypeDescriptor::new("contact.location", "Contact").with_node(
//!             NodeDescriptor::new("state", "/details/state").with_assertion(
//!                 AssertionDescriptor::new("lookup")
//!                     .with_property("type", "lookup")
//!                     .with_property("source", "lookup.state"),
//!             ),
//!         ),
//!     ])
//!     .unwrap(),
//! );
//! let storage = Arc::new(StorageRegistry::builtin());
//! let store = MemoryStore::new(registry.clone(), storage.clone());
//! let replacer = LookupReplacer::new(Arc::new(LookupUsageFinder::new(registry)), storage);
//!
//! let mut session = store.session();
//! let mut vic = Lookup::new(0, "lookup.state", "VIC").to_object();
//! let mut victoria = Lookup::new(0, "lookup.state", "VICTORIA").to_object();
//! session.save(&mut vic).unwrap();
//! session.save(&mut victoria).unwrap();
//! let (vic, victoria) = (Lookup::from_object(&vic), Lookup::from_object(&victoria));
//!
//! let mut home = IMObject::new("contact.location").with_value("state", "VIC");
//! session.save(&mut home).unwrap();
//!
//! assert!(replacer.is_used(&vic, &mut session).unwrap());
//! replacer.replace(&vic, &victoria, &mut session).unwrap();
//! assert!(!replacer.is_used(&vic, &mut session).unwrap());
//! ```

pub mod check;
pub mod config;
pub mod dialect;
pub mod error;
pub mod locks;
pub mod lookup;
pub mod replacer;
pub mod service;
pub mod usage;

// Re-exports
pub use check::{unmapped_archetypes, verify_storage};
pub use config::EngineConfig;
pub use dialect::{dialect_for, CodeDialect, ColumnDialect, DetailsDialect};
pub use error::LookupError;
pub use locks::{LookupGuard, LookupLocks};
pub use lookup::{Lookup, LookupRelationship};
pub use replacer::{LookupReplacer, MergeOrDrop, ReplacePlan, ReplaceSummary};
pub use service::LookupService;
pub use usage::{CodeReference, LookupUsageFinder, DEFAULT_CACHE_CAPACITY};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
