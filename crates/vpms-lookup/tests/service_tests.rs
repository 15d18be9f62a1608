//! Transactional replace and remove

use pretty_assertions::assert_eq;
use std::collections::BTreeSet;
use std::sync::Arc;
use vpms_lookup::{EngineConfig, LookupError, LookupService};
use vpms_store::{
    MemorySession, MemoryStore, Row, Session, Statement, StoreError, Transaction, Transactional,
};
use vpms_test_utils::archetypes::*;
use vpms_test_utils::{customer, direct_lookup, location, schema, Fixture};
use vpms_archetype::ArchetypeDescriptor;

/// Store whose sessions fail on the first classification merge
struct FailingMergeStore {
    inner: Arc<MemoryStore>,
}

struct FailingMergeSession<'a> {
    inner: MemorySession<'a>,
}

impl Session for FailingMergeSession<'_> {
    fn query(&mut self, statement: &Statement, max_rows: Option<usize>) -> Result<Vec<Row>, StoreError> {
        self.inner.query(statement, max_rows)
    }

    fn execute(&mut self, statement: &Statement) -> Result<u64, StoreError> {
        if matches!(statement, Statement::ClassificationMerge { .. }) {
            return Err(StoreError::Backend("lock wait timeout".into()));
        }
        self.inner.execute(statement)
    }
}

impl Transaction for FailingMergeSession<'_> {
    fn commit(self: Box<Self>) -> Result<(), StoreError> {
        self.inner.commit()
    }

    fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        Ok(())
    }
}

impl Transactional for FailingMergeStore {
    fn begin(&self) -> Result<Box<dyn Transaction + '_>, StoreError> {
        Ok(Box::new(FailingMergeSession {
            inner: self.inner.session(),
        }))
    }
}

#[test]
fn test_remove_refuses_lookup_in_use() {
    let fixture = Fixture::new();
    let vic = fixture.lookup(STATE, "VIC");
    fixture.object(location("VIC"));

    let err = fixture.service().remove(&vic).unwrap_err();
    assert!(matches!(err, LookupError::LookupInUse { id, .. } if id == vic.id));
    assert!(err.is_precondition());
    assert!(fixture.session().get(STATE, vic.id).unwrap().is_some());
}

#[test]
fn test_remove_refuses_classification_in_use() {
    let fixture = Fixture::new();
    let gold = fixture.lookup(ACCOUNT_TYPE, "GOLD");
    fixture.object(customer("Ann", &[&gold]));

    assert!(matches!(
        fixture.service().remove(&gold),
        Err(LookupError::LookupInUse { .. })
    ));
}

#[test]
fn test_remove_deletes_unused_lookup() {
    let fixture = Fixture::new();
    let vic = fixture.lookup(STATE, "VIC");
    let nsw = fixture.lookup(STATE, "NSW");
    fixture.object(location("NSW"));

    fixture.service().remove(&vic).unwrap();
    assert!(fixture.session().get(STATE, vic.id).unwrap().is_none());
    assert!(fixture.session().get(STATE, nsw.id).unwrap().is_some());
}

#[test]
fn test_replace_then_remove_retires_lookup() {
    let fixture = Fixture::new();
    let vic = fixture.lookup(STATE, "VIC");
    let victoria = fixture.lookup(STATE, "VICTORIA");
    let home = fixture.object(location("VIC"));
    let service = fixture.service();

    assert!(service.remove(&vic).is_err());
    service.replace(&vic, &victoria).unwrap();
    service.remove(&vic).unwrap();

    assert!(fixture.session().get(STATE, vic.id).unwrap().is_none());
    assert_eq!(fixture.reload(&home).value("state"), Some("VICTORIA"));
}

#[test]
fn test_failed_replace_rolls_back_code_updates() {
    let fixture = Fixture::new();
    let vic = fixture.lookup(STATE, "VIC");
    let victoria = fixture.lookup(STATE, "VICTORIA");
    let home = fixture.object(location("VIC"));

    let store = Arc::new(FailingMergeStore {
        inner: Arc::clone(&fixture.store),
    });
    let service = LookupService::new(fixture.replacer.clone(), store);

    let err = service.replace(&vic, &victoria).unwrap_err();
    assert!(matches!(err, LookupError::Store(StoreError::Backend(_))));
    assert_eq!(fixture.reload(&home).value("state"), Some("VIC"));
}

#[test]
fn test_unmapped_archetype_fails_replace_without_changes() {
    let mut archetypes = schema();
    archetypes.push(
        ArchetypeDescriptor::new("task.reminder", "Task").with_node(direct_lookup("state", "/details/state", STATE)),
    );
    let fixture = Fixture::with_schema(archetypes);
    let vic = fixture.lookup(STATE, "VIC");
    let victoria = fixture.lookup(STATE, "VICTORIA");
    let home = fixture.object(location("VIC"));

    let err = fixture.service().replace(&vic, &victoria).unwrap_err();
    assert!(err.is_configuration());
    assert!(err.to_string().contains("task.reminder"));
    assert_eq!(fixture.reload(&home).value("state"), Some("VIC"));
}

#[test]
fn test_locking_follows_configuration() {
    let fixture = Fixture::new();
    assert!(fixture.service().is_serialized());

    let config = EngineConfig::new().with_serialized_mutations(false);
    let service = LookupService::with_config(fixture.replacer.clone(), fixture.store.clone(), &config);
    assert!(!service.is_serialized());

    let vic = fixture.lookup(STATE, "VIC");
    let victoria = fixture.lookup(STATE, "VICTORIA");
    fixture.object(location("VIC"));
    service.replace(&vic, &victoria).unwrap();
    assert!(!service.is_used(&vic).unwrap());
}

#[test]
fn test_concurrent_replacements_of_the_same_lookup() {
    let fixture = Fixture::new();
    let vic = fixture.lookup(STATE, "VIC");
    let victoria = fixture.lookup(STATE, "VICTORIA");
    let homes: Vec<_> = (0..4).map(|_| fixture.object(location("VIC"))).collect();
    let service = Arc::new(fixture.service());

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let service = Arc::clone(&service);
            let (vic, victoria) = (vic.clone(), victoria.clone());
            std::thread::spawn(move || service.replace(&vic, &victoria).unwrap())
        })
        .collect();
    let updated: u64 = handles.into_iter().map(|h| h.join().unwrap().updated_codes).sum();

    assert_eq!(updated, 4);
    for home in &homes {
        assert_eq!(fixture.reload(home).value("state"), Some("VICTORIA"));
    }
}

#[test]
fn test_interleaved_replacements_of_separate_lookups_both_commit() {
    let fixture = Fixture::new();
    let vic = fixture.lookup(STATE, "VIC");
    let victoria = fixture.lookup(STATE, "VICTORIA");
    let gold = fixture.lookup(ACCOUNT_TYPE, "GOLD");
    let platinum = fixture.lookup(ACCOUNT_TYPE, "PLATINUM");
    let home = fixture.object(location("VIC"));
    let ann = fixture.object(customer("Ann", &[&gold]));

    let mut first = fixture.session();
    let mut second = fixture.session();
    fixture.replacer.replace(&vic, &victoria, &mut first).unwrap();
    fixture.replacer.replace(&gold, &platinum, &mut second).unwrap();
    first.commit().unwrap();
    second.commit().unwrap();

    assert_eq!(fixture.reload(&home).value("state"), Some("VICTORIA"));
    assert_eq!(fixture.reload(&ann).classifications, BTreeSet::from([platinum.id]));

    let service = fixture.service();
    assert!(!service.is_used(&vic).unwrap());
    assert!(!service.is_used(&gold).unwrap());
}

#[test]
fn test_concurrent_replacements_of_separate_lookups() {
    let fixture = Fixture::new();
    let pairs: Vec<_> = (0..8)
        .map(|i| {
            let old = fixture.lookup(STATE, &format!("OLD{i}"));
            let new = fixture.lookup(STATE, &format!("NEW{i}"));
            let home = fixture.object(location(&old.code));
            (old, new, home)
        })
        .collect();
    let service = Arc::new(fixture.service());

    let handles: Vec<_> = pairs
        .iter()
        .map(|(old, new, _)| {
            let service = Arc::clone(&service);
            let (old, new) = (old.clone(), new.clone());
            std::thread::spawn(move || service.replace(&old, &new).unwrap())
        })
        .collect();
    for handle in handles {
        assert_eq!(handle.join().unwrap().updated_codes, 1);
    }

    for (old, new, home) in &pairs {
        assert_eq!(fixture.reload(home).value("state"), Some(new.code.as_str()));
        assert!(!service.is_used(old).unwrap());
    }
}

#[test]
fn test_remove_of_unstored_lookup_is_not_found() {
    let fixture = Fixture::new();
    let vic = fixture.lookup(STATE, "VIC");
    let service = fixture.service();
    service.remove(&vic).unwrap();

    let err = service.remove(&vic).unwrap_err();
    assert!(matches!(err, LookupError::LookupNotFound { id, .. } if id == vic.id));
    assert!(err.is_precondition());
}
