//! Startup check that lookup-bearing archetypes have storage

use crate::error::LookupError;
use vpms_archetype::{ArchetypeSource, LookupReference};
use vpms_store::StorageRegistry;

/// Archetypes holding stored lookup codes whose kind has no storage mapping
///
/// Nodes with schema-local lookups are ignored. One error is reported per
/// archetype, naming its first lookup node.
#[must_use]
pub fn unmapped_archetypes(source: &dyn ArchetypeSource, storage: &StorageRegistry) -> Vec<LookupError> {
    let mut errors = Vec::new();
    for archetype in source.archetypes() {
        let Some((node, _)) = archetype
            .lookup_nodes()
            .find(|(_, reference)| !matches!(reference, LookupReference::Local))
        else {
            continue;
        };
        if let Err(source) = storage.resolve(&archetype.kind) {
            errors.push(LookupError::UnsupportedArchetype {
                archetype: archetype.short_name.clone(),
                node: node.name.clone(),
                source,
            });
        }
    }
    errors
}

/// Fail on the first lookup-bearing archetype without storage
///
/// Returns the number of archetypes in the schema.
///
/// # Errors
/// The first [`LookupError::UnsupportedArchetype`] found.
pub fn verify_storage(source: &dyn ArchetypeSource, storage: &StorageRegistry) -> Result<usize, LookupError> {
    if let Some(error) = unmapped_archetypes(source, storage).into_iter().next() {
        return Err(error);
    }
    let count = source.archetypes().len();
    tracing::info!(archetypes = count, "storage mappings verified");
    Ok(count)
}
