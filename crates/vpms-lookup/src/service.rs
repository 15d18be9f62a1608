//! Transactional lookup maintenance
//!
//! [`LookupService`] runs each operation in its own transaction, rolling back
//! on any error, and optionally serializes mutations of the same lookups
//! through [`LookupLocks`].

use crate::config::EngineConfig;
use crate::error::LookupError;
use crate::locks::{LookupGuard, LookupLocks};
use crate::lookup::Lookup;
use crate::replacer::{LookupReplacer, ReplaceSummary};
use std::sync::Arc;
use vpms_archetype::ArchetypeError;
use vpms_store::{Session, Statement, Transactional};

/// Lookup maintenance over a transactional store
#[derive(Debug)]
pub struct LookupService<T> {
    replacer: LookupReplacer,
    store: Arc<T>,
    locks: Option<LookupLocks>,
}

impl<T: Transactional> LookupService<T> {
    /// Create a service with advisory locking enabled
    #[must_use]
    pub fn new(replacer: LookupReplacer, store: Arc<T>) -> Self {
        Self {
            replacer,
            store,
            locks: Some(LookupLocks::new()),
        }
    }

    /// Create a service honoring the configured locking switch
    #[must_use]
    pub fn with_config(replacer: LookupReplacer, store: Arc<T>, config: &EngineConfig) -> Self {
        Self {
            replacer,
            store,
            locks: config.serialize_lookup_mutations.then(LookupLocks::new),
        }
    }

    /// Underlying replacer
    #[inline]
    #[must_use]
    pub fn replacer(&self) -> &LookupReplacer {
        &self.replacer
    }

    /// True if mutations take advisory locks
    #[inline]
    #[must_use]
    pub fn is_serialized(&self) -> bool {
        self.locks.is_some()
    }

    /// Determine whether `lookup` is referenced anywhere
    ///
    /// # Errors
    /// See [`LookupReplacer::is_used`].
    pub fn is_used(&self, lookup: &Lookup) -> Result<bool, LookupError> {
        self.read(|session| self.replacer.is_used(lookup, session))
    }

    /// Replace `source` with `target` in one transaction
    ///
    /// # Errors
    /// See [`LookupReplacer::replace`]; the transaction is rolled back.
    pub fn replace(&self, source: &Lookup, target: &Lookup) -> Result<ReplaceSummary, LookupError> {
        let _guard = self.lock(&[source.id, target.id]);
        self.write(|session| self.replacer.replace(source, target, session))
    }

    /// Delete `lookup` if nothing references it
    ///
    /// # Errors
    /// [`LookupError::LookupInUse`] if the lookup is referenced,
    /// [`LookupError::LookupNotFound`] if it is not stored, or any error from
    /// the usage check or the delete.
    pub fn remove(&self, lookup: &Lookup) -> Result<(), LookupError> {
        let _guard = self.lock(&[lookup.id]);
        self.write(|session| {
            if self.replacer.is_used(lookup, session)? {
                tracing::warn!(lookup = %lookup, id = lookup.id, "refusing to remove lookup in use");
                return Err(LookupError::LookupInUse {
                    archetype: lookup.archetype.clone(),
                    code: lookup.code.clone(),
                    id: lookup.id,
                });
            }

            let descriptor = self
                .replacer
                .finder()
                .source()
                .get(&lookup.archetype)
                .ok_or_else(|| ArchetypeError::NotFound(lookup.archetype.clone()))?;
            let mapping = self.replacer.storage().resolve(&descriptor.kind)?;
            let removed = session.execute(&Statement::DeleteObject {
                mapping: (*mapping).clone(),
                id: lookup.id,
            })?;
            if removed == 0 {
                tracing::warn!(lookup = %lookup, id = lookup.id, table = %mapping.table, "lookup to remove not found");
                return Err(LookupError::LookupNotFound {
                    archetype: lookup.archetype.clone(),
                    code: lookup.code.clone(),
                    id: lookup.id,
                });
            }

            tracing::info!(lookup = %lookup, id = lookup.id, "lookup removed");
            Ok(())
        })
    }

    fn lock(&self, ids: &[u64]) -> Option<LookupGuard<'_>> {
        self.locks.as_ref().map(|locks| locks.lock(ids))
    }

    fn read<R>(&self, work: impl FnOnce(&mut dyn Session) -> Result<R, LookupError>) -> Result<R, LookupError> {
        let mut tx = self.store.begin()?;
        let result = work(&mut tx);
        tx.rollback()?;
        result
    }

    fn write<R>(&self, work: impl FnOnce(&mut dyn Session) -> Result<R, LookupError>) -> Result<R, LookupError> {
        let mut tx = self.store.begin()?;
        match work(&mut tx) {
            Ok(value) => {
                tx.commit()?;
                Ok(value)
            }
            Err(error) => {
                if let Err(rollback) = tx.rollback() {
                    tracing::warn!(error = %rollback, "rollback failed");
                }
                tracing::debug!(error = %error, "transaction rolled back");
                Err(error)
            }
        }
    }
}
