//! Code dialects
//!
//! A lookup code is stored either in the details table of its owner, keyed
//! by node name, or in a column of the owner's primary table. Each storage
//! shape has a [`CodeDialect`] that builds the existence probe and the
//! rewrite statement for a [`CodeReference`].

use crate::usage::CodeReference;
use vpms_archetype::NodeDescriptor;
use vpms_store::{Statement, StorageMapping};

/// Builds statements for one storage shape
pub trait CodeDialect: Send + Sync {
    /// Probe for objects whose referencing node holds `code`
    fn exists(&self, mapping: &StorageMapping, reference: &CodeReference, code: &str) -> Statement;

    /// Rewrite `old_code` to `new_code` in the referencing node
    fn replace(
        &self,
        mapping: &StorageMapping,
        reference: &CodeReference,
        old_code: &str,
        new_code: &str,
    ) -> Statement;
}

/// Codes held in the details key/value table
#[derive(Debug, Clone, Copy, Default)]
pub struct DetailsDialect;

impl CodeDialect for DetailsDialect {
    fn exists(&self, mapping: &StorageMapping, reference: &CodeReference, code: &str) -> Statement {
        Statement::DetailsExists {
            mapping: mapping.clone(),
            archetype: reference.short_name().to_string(),
            name: reference.node().name.clone(),
            code: code.to_string(),
        }
    }

    fn replace(
        &self,
        mapping: &StorageMapping,
        reference: &CodeReference,
        old_code: &str,
        new_code: &str,
    ) -> Statement {
        Statement::DetailsUpdate {
            mapping: mapping.clone(),
            archetype: reference.short_name().to_string(),
            name: reference.node().name.clone(),
            old_code: old_code.to_string(),
            new_code: new_code.to_string(),
        }
    }
}

/// Codes held in a primary table column
#[derive(Debug, Clone, Copy, Default)]
pub struct ColumnDialect;

impl CodeDialect for ColumnDialect {
    fn exists(&self, mapping: &StorageMapping, reference: &CodeReference, code: &str) -> Statement {
        Statement::ColumnExists {
            mapping: mapping.clone(),
            archetype: reference.short_name().to_string(),
            column: reference.node().column().to_string(),
            code: code.to_string(),
        }
    }

    fn replace(
        &self,
        mapping: &StorageMapping,
        reference: &CodeReference,
        old_code: &str,
        new_code: &str,
    ) -> Statement {
        Statement::ColumnUpdate {
            mapping: mapping.clone(),
            archetype: reference.short_name().to_string(),
            column: reference.node().column().to_string(),
            old_code: old_code.to_string(),
            new_code: new_code.to_string(),
        }
    }
}

/// Dialect for the storage shape of `node`
#[must_use]
pub fn dialect_for(node: &NodeDescriptor) -> &'static dyn CodeDialect {
    if node.is_details() {
        &DetailsDialect
    } else {
        &ColumnDialect
    }
}
