//! Tests for the tab store

use super::*;
use pretty_assertions::assert_eq;

fn query(token: u64) -> TabState {
    TabState::empty_query(TabId::query(token))
}

#[test]
fn test_create_and_get() {
    let mut store = TabStateStore::new();
    store.create(query(1)).unwrap();

    let state = store.get(&TabId::query(1)).unwrap();
    assert_eq!(state.label(), "Query");
    assert_eq!(store.len(), 1);
    assert!(store.take_pending_write());
    assert!(!store.take_pending_write());
}

#[test]
fn test_duplicate_create_fails() {
    let mut store = TabStateStore::new();
    store.create(query(1)).unwrap();

    let err = store.create(query(1)).unwrap_err();
    assert_eq!(err, TabError::DuplicateId(TabId::query(1)));
    assert_eq!(store.len(), 1);
}

#[test]
fn test_import_does_not_schedule_write() {
    let mut store = TabStateStore::new();
    store.import(query(1)).unwrap();
    assert!(!store.take_pending_write());
    assert!(store.import(query(1)).is_err());
}

#[test]
fn test_update_missing_tab() {
    let mut store = TabStateStore::new();
    let err = store
        .update(&TabId::query(9), &TabPatch::sql("SELECT 1"))
        .unwrap_err();
    assert_eq!(err, TabError::NotFound(TabId::query(9)));
}

#[test]
fn test_update_schedules_write_only_on_change() {
    let mut store = TabStateStore::new();
    store.import(query(1)).unwrap();

    assert!(!store.update(&TabId::query(1), &TabPatch::sql("")).unwrap());
    assert!(!store.take_pending_write());

    assert!(store.update(&TabId::query(1), &TabPatch::sql("SELECT 1")).unwrap());
    assert!(store.take_pending_write());
}

#[test]
fn test_remove() {
    let mut store = TabStateStore::new();
    store.import(query(1)).unwrap();
    store.import(query(2)).unwrap();

    let removed = store.remove(&TabId::query(1)).unwrap();
    assert_eq!(removed.id(), &TabId::query(1));
    assert!(store.take_pending_write());
    assert_eq!(store.ids().collect::<Vec<_>>(), vec![&TabId::query(2)]);

    assert!(matches!(
        store.remove(&TabId::query(1)),
        Err(TabError::NotFound(_))
    ));
}

#[test]
fn test_reset_clears_without_write() {
    let mut store = TabStateStore::new();
    store.create(query(1)).unwrap();
    store.reset();
    assert!(store.is_empty());
    assert!(!store.take_pending_write());
}

#[test]
fn test_snapshot_keeps_insertion_order() {
    let mut store = TabStateStore::new();
    store.import(query(3)).unwrap();
    store.import(query(1)).unwrap();
    store.import(query(2)).unwrap();

    let ids: Vec<_> = store.snapshot().into_keys().collect();
    assert_eq!(ids, vec![TabId::query(3), TabId::query(1), TabId::query(2)]);
}
