//! Lookup usage checks and replacement
//!
//! [`LookupReplacer`] is stateless over a caller-supplied [`Session`]. It
//! never begins, commits or rolls back work; wrap calls in a transaction to
//! get all-or-nothing behavior.
//!
//! A replace is planned in full before the first statement runs. Every
//! storage mapping is resolved during planning, so a configuration error
//! leaves storage untouched.

use crate::dialect::dialect_for;
use crate::error::LookupError;
use crate::lookup::Lookup;
use crate::usage::{CodeReference, LookupUsageFinder};
use std::sync::Arc;
use vpms_store::{ClassificationTable, Session, Statement, StorageMapping, StorageRegistry};

/// Rows touched by a replace
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplaceSummary {
    /// Rows whose stored code was rewritten
    pub updated_codes: u64,

    /// Classification rows moved to the replacement lookup
    pub merged_classifications: u64,

    /// Classification rows dropped because the owner already had the
    /// replacement
    pub dropped_classifications: u64,
}

impl ReplaceSummary {
    /// Total rows touched
    #[inline]
    #[must_use]
    pub fn total(&self) -> u64 {
        self.updated_codes + self.merged_classifications + self.dropped_classifications
    }
}

/// Merge-then-drop statements for one classification table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeOrDrop {
    /// Reassign old to new where the owner lacks new
    pub merge: Statement,

    /// Delete remaining old rows
    pub drop: Statement,
}

impl MergeOrDrop {
    /// Plan the pair for one table
    #[must_use]
    pub fn new(classification: &ClassificationTable, old_id: u64, new_id: u64) -> Self {
        Self {
            merge: Statement::ClassificationMerge {
                classification: classification.clone(),
                old_id,
                new_id,
            },
            drop: Statement::ClassificationDelete {
                classification: classification.clone(),
                lookup_id: old_id,
            },
        }
    }
}

/// Ordered statements implementing one replace
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplacePlan {
    /// Code rewrites, one per code reference
    pub code_updates: Vec<Statement>,

    /// Classification merge-or-drop pairs, in table order
    pub classifications: Vec<MergeOrDrop>,
}

impl ReplacePlan {
    /// Every statement in execution order
    pub fn statements(&self) -> impl Iterator<Item = &Statement> {
        self.code_updates.iter().chain(
            self.classifications
                .iter()
                .flat_map(|pair| [&pair.merge, &pair.drop]),
        )
    }

    /// Number of statements
    #[must_use]
    pub fn len(&self) -> usize {
        self.code_updates.len() + 2 * self.classifications.len()
    }

    /// True if the plan holds no statements
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Run the plan on `session`
    ///
    /// # Errors
    /// Stops at the first failing statement and returns its error; earlier
    /// statements are not undone.
    pub fn execute(&self, session: &mut dyn Session) -> Result<ReplaceSummary, LookupError> {
        let mut summary = ReplaceSummary::default();
        for statement in &self.code_updates {
            summary.updated_codes += run(session, statement)?;
        }
        for pair in &self.classifications {
            summary.merged_classifications += run(session, &pair.merge)?;
            summary.dropped_classifications += run(session, &pair.drop)?;
        }
        Ok(summary)
    }
}

fn run(session: &mut dyn Session, statement: &Statement) -> Result<u64, LookupError> {
    let affected = session.execute(statement)?;
    tracing::debug!(statement = %statement, affected, "executed");
    Ok(affected)
}

/// Checks whether lookups are used and replaces one lookup with another
#[derive(Debug, Clone)]
pub struct LookupReplacer {
    finder: Arc<LookupUsageFinder>,
    storage: Arc<StorageRegistry>,
}

impl LookupReplacer {
    /// Create a replacer
    #[must_use]
    pub fn new(finder: Arc<LookupUsageFinder>, storage: Arc<StorageRegistry>) -> Self {
        Self { finder, storage }
    }

    /// Reference index in use
    #[inline]
    #[must_use]
    pub fn finder(&self) -> &Arc<LookupUsageFinder> {
        &self.finder
    }

    /// Storage registry in use
    #[inline]
    #[must_use]
    pub fn storage(&self) -> &Arc<StorageRegistry> {
        &self.storage
    }

    /// Determine whether `lookup` is referenced anywhere
    ///
    /// Classification tables are probed first, then every code reference of
    /// the lookup's archetype. Stops at the first hit. The answer holds only
    /// for the instant of the check, under the session's isolation.
    ///
    /// # Errors
    /// Fails on malformed schema patterns, unmapped archetypes, or statement
    /// failures.
    pub fn is_used(&self, lookup: &Lookup, session: &mut dyn Session) -> Result<bool, LookupError> {
        for classification in self.storage.classifications() {
            let probe = Statement::ClassificationExists {
                classification: classification.clone(),
                lookup_id: lookup.id,
            };
            if session.exists(&probe)? {
                tracing::debug!(lookup = %lookup, table = %classification.table, "lookup used as classification");
                return Ok(true);
            }
        }

        for reference in self.finder.get_code_references(&lookup.archetype)?.iter() {
            let mapping = self.mapping(reference)?;
            let probe = dialect_for(reference.node()).exists(&mapping, reference, &lookup.code);
            if session.exists(&probe)? {
                tracing::debug!(lookup = %lookup, reference = %reference, "lookup code in use");
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Plan the replacement of `source` by `target`
    ///
    /// # Errors
    /// Fails if the lookups are identical, belong to different archetypes,
    /// or a referencing archetype has no storage mapping.
    pub fn plan(&self, source: &Lookup, target: &Lookup) -> Result<ReplacePlan, LookupError> {
        if source.id == target.id {
            return Err(LookupError::IdenticalLookups(source.to_string()));
        }
        if source.archetype != target.archetype {
            return Err(LookupError::ArchetypeMismatch {
                replaced: source.archetype.clone(),
                replacement: target.archetype.clone(),
            });
        }

        let references = self.finder.get_code_references(&source.archetype)?;
        let code_updates = references
            .iter()
            .map(|reference| -> Result<Statement, LookupError> {
                let mapping = self.mapping(reference)?;
                Ok(dialect_for(reference.node()).replace(&mapping, reference, &source.code, &target.code))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let classifications = self
            .storage
            .classifications()
            .iter()
            .map(|table| MergeOrDrop::new(table, source.id, target.id))
            .collect();

        Ok(ReplacePlan {
            code_updates,
            classifications,
        })
    }

    /// Replace every reference to `source` with `target`
    ///
    /// Code references are rewritten first, then each classification table
    /// is merged. Afterwards `source` is no longer used, barring concurrent
    /// writers.
    ///
    /// # Errors
    /// Precondition and configuration errors are raised before any statement
    /// executes. Statement failures are returned as they occur.
    pub fn replace(
        &self,
        source: &Lookup,
        target: &Lookup,
        session: &mut dyn Session,
    ) -> Result<ReplaceSummary, LookupError> {
        let plan = self.plan(source, target)?;
        let summary = plan.execute(session)?;
        tracing::info!(
            source = %source,
            target = %target,
            statements = plan.len(),
            updated = summary.updated_codes,
            merged = summary.merged_classifications,
            dropped = summary.dropped_classifications,
            "lookup replaced"
        );
        Ok(summary)
    }

    fn mapping(&self, reference: &CodeReference) -> Result<Arc<StorageMapping>, LookupError> {
        self.storage
            .resolve(&reference.archetype().kind)
            .map_err(|source| LookupError::UnsupportedArchetype {
                archetype: reference.short_name().to_string(),
                node: reference.node().name.clone(),
                source,
            })
    }
}
