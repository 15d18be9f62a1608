//! In-memory transactional store
//!
//! [`MemoryStore`] keeps every primary table as a map of id to stored row,
//! with the row's details entries held alongside it, and every
//! classification table as a set of `(owner, lookup)` pairs.
//!
//! A session reads from a private copy of the tables and records each write
//! it makes. Commit replays that log onto the current tables under the write
//! lock, so transactions touching different rows never overwrite each other.
//! Writes to the same row resolve last writer wins, one statement at a time.

use crate::error::StoreError;
use crate::mapping::StorageRegistry;
use crate::object::IMObject;
use crate::session::{Session, Transaction, Transactional};
use crate::statement::{Param, Row, Statement};
use parking_lot::RwLock;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use vpms_archetype::{ArchetypeDescriptor, ArchetypeSource};

#[derive(Debug, Clone, Default)]
struct StoredObject {
    archetype: String,
    columns: BTreeMap<String, String>,
    details: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default)]
struct Tables {
    objects: BTreeMap<String, BTreeMap<u64, StoredObject>>,
    classifications: BTreeMap<String, BTreeSet<(u64, u64)>>,
}

/// One write made by a session, replayed on commit
#[derive(Debug, Clone)]
enum Change {
    Save {
        table: String,
        classification: Option<String>,
        id: u64,
        row: StoredObject,
        lookups: BTreeSet<u64>,
    },
    Execute(Statement),
}

impl Change {
    fn apply(&self, tables: &mut Tables) -> Result<u64, StoreError> {
        match self {
            Self::Save {
                table,
                classification,
                id,
                row,
                lookups,
            } => {
                tables.put(table, classification.as_deref(), *id, row.clone(), lookups)?;
                Ok(1)
            }
            Self::Execute(statement) => tables.execute(statement),
        }
    }
}

impl Tables {
    fn select(
        &self,
        table: &str,
        archetype: &str,
        predicate: impl Fn(&StoredObject) -> bool,
        limit: usize,
    ) -> Vec<u64> {
        self.objects
            .get(table)
            .into_iter()
            .flat_map(|rows| rows.iter())
            .filter(|(_, row)| row.archetype == archetype && predicate(row))
            .map(|(id, _)| *id)
            .take(limit)
            .collect()
    }

    fn update(
        &mut self,
        table: &str,
        archetype: &str,
        mut apply: impl FnMut(&mut StoredObject) -> bool,
    ) -> u64 {
        let Some(rows) = self.objects.get_mut(table) else {
            return 0;
        };
        let mut affected = 0;
        for row in rows.values_mut().filter(|row| row.archetype == archetype) {
            if apply(row) {
                affected += 1;
            }
        }
        affected
    }

    fn classify(&mut self, table: &str, owner: u64, lookup: u64) -> Result<(), StoreError> {
        let rows = self.classifications.entry(table.to_string()).or_default();
        if !rows.insert((owner, lookup)) {
            return Err(StoreError::UniqueViolation {
                table: table.to_string(),
                key: format!("({owner}, {lookup})"),
            });
        }
        Ok(())
    }

    /// Overwrite a row and its classification set
    fn put(
        &mut self,
        table: &str,
        classification: Option<&str>,
        id: u64,
        row: StoredObject,
        lookups: &BTreeSet<u64>,
    ) -> Result<(), StoreError> {
        if let Some(classification) = classification {
            if let Some(rows) = self.classifications.get_mut(classification) {
                rows.retain(|(owner, _)| *owner != id);
            }
            for lookup in lookups {
                self.classify(classification, id, *lookup)?;
            }
        }
        self.objects.entry(table.to_string()).or_default().insert(id, row);
        Ok(())
    }

    fn execute(&mut self, statement: &Statement) -> Result<u64, StoreError> {
        let affected = match statement {
            Statement::DetailsUpdate {
                mapping,
                archetype,
                name,
                old_code,
                new_code,
            } => self.update(&mapping.table, archetype, |row| {
                match row.details.get_mut(name) {
                    Some(value) if value == old_code => {
                        value.clone_from(new_code);
                        true
                    }
                    _ => false,
                }
            }),
            Statement::ColumnUpdate {
                mapping,
                archetype,
                column,
                old_code,
                new_code,
            } => self.update(&mapping.table, archetype, |row| {
                match row.columns.get_mut(column) {
                    Some(value) if value == old_code => {
                        value.clone_from(new_code);
                        true
                    }
                    _ => false,
                }
            }),
            Statement::ClassificationMerge {
                classification,
                old_id,
                new_id,
            } => {
                let table = &classification.table;
                let owners: Vec<u64> = self
                    .classifications
                    .get(table)
                    .into_iter()
                    .flatten()
                    .filter(|(_, lookup)| lookup == old_id)
                    .map(|(owner, _)| *owner)
                    .collect();

                let mut merged = 0;
                for owner in owners {
                    let already = self
                        .classifications
                        .get(table)
                        .is_some_and(|rows| rows.contains(&(owner, *new_id)));
                    if already {
                        continue;
                    }
                    if let Some(rows) = self.classifications.get_mut(table) {
                        rows.remove(&(owner, *old_id));
                    }
                    self.classify(table, owner, *new_id)?;
                    merged += 1;
                }
                merged
            }
            Statement::ClassificationDelete {
                classification,
                lookup_id,
            } => match self.classifications.get_mut(&classification.table) {
                Some(rows) => {
                    let before = rows.len();
                    rows.retain(|(_, lookup)| lookup != lookup_id);
                    rows_affected(before - rows.len())
                }
                None => 0,
            },
            Statement::DeleteObject { mapping, id } => {
                let removed = self
                    .objects
                    .get_mut(&mapping.table)
                    .and_then(|rows| rows.remove(id));
                u64::from(removed.is_some())
            }
            other => {
                return Err(StoreError::Unsupported(format!(
                    "not an update: {}",
                    other.sql()
                )))
            }
        };
        Ok(affected)
    }
}

fn rows_affected(n: usize) -> u64 {
    u64::try_from(n).unwrap_or(u64::MAX)
}

/// In-memory reference store
pub struct MemoryStore {
    tables: RwLock<Tables>,
    next_id: AtomicU64,
    archetypes: Arc<dyn ArchetypeSource>,
    storage: Arc<StorageRegistry>,
}

impl fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryStore")
            .field("tables", &self.tables.read().objects.len())
            .field("next_id", &self.next_id)
            .finish_non_exhaustive()
    }
}

impl MemoryStore {
    /// Create an empty store
    #[must_use]
    pub fn new(archetypes: Arc<dyn ArchetypeSource>, storage: Arc<StorageRegistry>) -> Self {
        Self {
            tables: RwLock::new(Tables::default()),
            next_id: AtomicU64::new(1),
            archetypes,
            storage,
        }
    }

    /// Open a session reading from a copy of the current tables
    #[must_use]
    pub fn session(&self) -> MemorySession<'_> {
        MemorySession {
            store: self,
            tables: self.tables.read().clone(),
            changes: Vec::new(),
        }
    }

    /// Schema used to route object values
    #[inline]
    #[must_use]
    pub fn archetypes(&self) -> &Arc<dyn ArchetypeSource> {
        &self.archetypes
    }

    /// Storage registry
    #[inline]
    #[must_use]
    pub fn storage(&self) -> &Arc<StorageRegistry> {
        &self.storage
    }

    fn allocate_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    fn descriptor(&self, archetype: &str) -> Result<Arc<ArchetypeDescriptor>, StoreError> {
        self.archetypes
            .get(archetype)
            .ok_or_else(|| StoreError::UnknownArchetype(archetype.to_string()))
    }
}

impl Transactional for MemoryStore {
    fn begin(&self) -> Result<Box<dyn Transaction + '_>, StoreError> {
        Ok(Box::new(self.session()))
    }
}

/// Unit of work on a [`MemoryStore`]
#[derive(Debug)]
pub struct MemorySession<'a> {
    store: &'a MemoryStore,
    tables: Tables,
    changes: Vec<Change>,
}

impl MemorySession<'_> {
    /// Insert or overwrite an object, assigning an id if it has none
    ///
    /// # Errors
    /// Fails for unknown archetypes or nodes, kinds without a storage
    /// mapping, and classifications on kinds that do not support them.
    pub fn save(&mut self, object: &mut IMObject) -> Result<u64, StoreError> {
        let store = self.store;
        let descriptor = store.descriptor(&object.archetype)?;
        let mapping = store.storage.resolve(&descriptor.kind)?;
        let classification = store.storage.classification_for(&descriptor.kind)?;
        if classification.is_none() && !object.classifications.is_empty() {
            return Err(StoreError::ClassificationsUnsupported(descriptor.kind.clone()));
        }

        let mut row = StoredObject {
            archetype: object.archetype.clone(),
            ..StoredObject::default()
        };
        for (name, value) in &object.values {
            let node = descriptor.node(name).ok_or_else(|| StoreError::UnknownNode {
                archetype: object.archetype.clone(),
                node: name.clone(),
            })?;
            if node.is_details() {
                row.details.insert(name.clone(), value.clone());
            } else {
                row.columns.insert(node.column().to_string(), value.clone());
            }
        }

        if object.is_new() {
            object.id = store.allocate_id();
        }
        let id = object.id;

        let change = Change::Save {
            table: mapping.table.clone(),
            classification: classification.map(|c| c.table.clone()),
            id,
            row,
            lookups: object.classifications.clone(),
        };
        change.apply(&mut self.tables)?;
        self.changes.push(change);

        tracing::debug!(id, archetype = %object.archetype, table = %mapping.table, "object saved");
        Ok(id)
    }

    /// Read an object back by archetype and id
    ///
    /// # Errors
    /// Fails for unknown archetypes or kinds without a storage mapping.
    pub fn get(&self, archetype: &str, id: u64) -> Result<Option<IMObject>, StoreError> {
        let descriptor = self.store.descriptor(archetype)?;
        let mapping = self.store.storage.resolve(&descriptor.kind)?;

        let Some(stored) = self
            .tables
            .objects
            .get(&mapping.table)
            .and_then(|rows| rows.get(&id))
            .filter(|row| row.archetype == archetype)
        else {
            return Ok(None);
        };

        let mut object = IMObject::new(archetype);
        object.id = id;
        object.values.extend(stored.details.clone());
        for node in descriptor.all_nodes().into_iter().filter(|n| !n.is_details()) {
            if let Some(value) = stored.columns.get(node.column()) {
                object.values.insert(node.name.clone(), value.clone());
            }
        }

        if let Some(classification) = self.store.storage.classification_for(&descriptor.kind)? {
            object.classifications = self
                .tables
                .classifications
                .get(&classification.table)
                .into_iter()
                .flatten()
                .filter(|(owner, _)| *owner == id)
                .map(|(_, lookup)| *lookup)
                .collect();
        }
        Ok(Some(object))
    }

    /// Publish this session's changes
    ///
    /// The recorded writes are replayed, in order, onto the tables as they
    /// stand now. Either every write lands or none does.
    ///
    /// # Errors
    /// A constraint violation raised by the replay; the store is unchanged.
    pub fn commit(self) -> Result<(), StoreError> {
        let mut live = self.store.tables.write();
        let mut next = live.clone();
        for change in &self.changes {
            change.apply(&mut next)?;
        }
        *live = next;

        tracing::debug!(changes = self.changes.len(), "memory session committed");
        Ok(())
    }
}

impl Session for MemorySession<'_> {
    fn query(&mut self, statement: &Statement, max_rows: Option<usize>) -> Result<Vec<Row>, StoreError> {
        let limit = max_rows.unwrap_or(usize::MAX);
        let ids = |ids: Vec<u64>| -> Vec<Row> { ids.into_iter().map(|id| Row(vec![Param::Id(id)])).collect() };

        let rows: Vec<Row> = match statement {
            Statement::DetailsExists {
                mapping,
                archetype,
                name,
                code,
            } => ids(self.tables.select(
                &mapping.table,
                archetype,
                |row| row.details.get(name) == Some(code),
                limit,
            )),
            Statement::ColumnExists {
                mapping,
                archetype,
                column,
                code,
            } => ids(self.tables.select(
                &mapping.table,
                archetype,
                |row| row.columns.get(column) == Some(code),
                limit,
            )),
            Statement::ClassificationExists {
                classification,
                lookup_id,
            } => self
                .tables
                .classifications
                .get(&classification.table)
                .into_iter()
                .flatten()
                .filter(|(_, lookup)| lookup == lookup_id)
                .take(limit)
                .map(|(owner, lookup)| Row(vec![Param::Id(*owner), Param::Id(*lookup)]))
                .collect(),
            other => return Err(StoreError::Unsupported(format!("not a query: {}", other.sql()))),
        };

        tracing::debug!(table = statement.table(), rows = rows.len(), "query");
        Ok(rows)
    }

    fn execute(&mut self, statement: &Statement) -> Result<u64, StoreError> {
        let change = Change::Execute(statement.clone());
        let affected = change.apply(&mut self.tables)?;
        self.changes.push(change);

        tracing::debug!(table = statement.table(), affected, "execute");
        Ok(affected)
    }
}

impl Transaction for MemorySession<'_> {
    fn commit(self: Box<Self>) -> Result<(), StoreError> {
        Self::commit(*self)
    }

    fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        tracing::debug!(changes = self.changes.len(), "memory session rolled back");
        Ok(())
    }
}
