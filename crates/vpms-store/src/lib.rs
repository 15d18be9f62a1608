//! # VPMS Store
//!
//! Storage boundary for the lookup engine.
//!
//! ## Overview
//!
//! Archetype instances live in one of three storage shapes:
//! first-class columns on a primary table, a key/value details table joined on
//! the primary id, and classification join tables linking owners to lookups.
//! This crate provides:
//!
//! - [`StorageRegistry`]: resolves a storage kind to its tables
//! - [`Statement`]: the parameterized statements the engine issues
//! - [`Session`], [`Transaction`], [`Transactional`]: execution seams
//! - [`MemoryStore`]: an in-memory transactional implementation
//!
//! ## Example
//!
//! ```rust
//! use vpms_store::StorageRegistry;
//!
//! let registry = StorageRegistry::builtin();
//! let mapping = registry.resolve("Party").unwrap();
//! assert_eq!(mapping.table, "entities");
//! ```

#![warn(unreachable_pub)]

pub mod error;
pub mod mapping;
pub mod memory;
pub mod object;
pub mod session;
pub mod statement;

pub use error::StoreError;
pub use mapping::{ClassificationTable, KindParent, StorageConfig, StorageMapping, StorageRegistry};
pub use memory::{MemorySession, MemoryStore};
pub use object::IMObject;
pub use session::{Session, Transaction, Transactional};
pub use statement::{Param, Row, Statement};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
