//! SQLite slot backend: listing, overwrite, delete, on-disk reopen.

mod common;

use common::{at, sample_snapshot};
use profile_core::{
    error::StoreError,
    store::{ProfileStore, SlotBackend, SqliteSlots},
    types::ProfileId,
};
use tempfile::tempdir;

fn sqlite_store() -> ProfileStore<SqliteSlots> {
    let slots = SqliteSlots::in_memory().expect("in-memory db");
    slots.migrate().expect("migration");
    ProfileStore::new(slots)
}

#[test]
fn missing_row_is_slot_not_found() {
    let store = sqlite_store();
    let err = store.load_profile(&ProfileId::new("Run1", 0)).unwrap_err();
    assert!(matches!(err, StoreError::SlotNotFound { .. }), "{err}");
}

/// Overwriting replaces the row rather than adding a second one.
#[test]
fn overwrite_keeps_single_row() {
    let store = sqlite_store();
    let id = ProfileId::new("Run1", 0);
    let mut snapshot = sample_snapshot(id.clone());
    store.save_profile(&id, &snapshot).unwrap();

    snapshot.inventory.currency = 9_999;
    store.save_profile(&id, &snapshot).unwrap();

    assert_eq!(store.backend().slots().unwrap(), vec![id.clone()]);
    assert_eq!(store.load_profile(&id).unwrap().inventory.currency, 9_999);
}

#[test]
fn listing_is_newest_first() {
    let store = sqlite_store();
    for (index, offset) in [(0u32, 100), (1, 300), (2, 200)] {
        let id = ProfileId::new("Run1", index);
        let mut snapshot = sample_snapshot(id.clone());
        snapshot.meta.last_played_utc = at(offset);
        store.save_profile(&id, &snapshot).unwrap();
    }

    let indexes: Vec<u32> = store
        .list_profiles()
        .unwrap()
        .iter()
        .map(|s| s.id.slot_index)
        .collect();

    assert_eq!(indexes, [1, 2, 0]);
}

#[test]
fn delete_removes_row() {
    let store = sqlite_store();
    let id = ProfileId::new("Run1", 0);
    store.save_profile(&id, &sample_snapshot(id.clone())).unwrap();

    assert!(store.delete_profile(&id).unwrap());
    assert!(!store.slot_exists(&id).unwrap());
    assert!(!store.delete_profile(&id).unwrap());
}

/// Slots written to a database file survive reopening it.
#[test]
fn database_file_survives_reopen() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("profiles.db");
    let path = path.to_string_lossy();
    let id = ProfileId::new("Run1", 0);
    let snapshot = sample_snapshot(id.clone());
    {
        let slots = SqliteSlots::open(&path).unwrap();
        slots.migrate().unwrap();
        ProfileStore::new(slots).save_profile(&id, &snapshot).unwrap();
    }

    let slots = SqliteSlots::open(&path).unwrap();
    slots.migrate().unwrap();
    let store = ProfileStore::new(slots);

    assert_eq!(store.load_profile(&id).unwrap(), snapshot);
}

/// Rows written behind the store's back with an unusable name or an
/// index outside `u32` are not reported as slots.
#[test]
fn foreign_rows_are_not_listed() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("profiles.db");
    let path = path.to_string_lossy();
    let slots = SqliteSlots::open(&path).unwrap();
    slots.migrate().unwrap();
    let store = ProfileStore::new(slots);
    let id = ProfileId::new("Run1", 0);
    store.save_profile(&id, &sample_snapshot(id.clone())).unwrap();

    let conn = rusqlite::Connection::open(&*path).unwrap();
    for (name, index) in [("bad name", 1i64), ("Run1", -1), ("Run1", i64::from(u32::MAX) + 1)] {
        conn.execute(
            "INSERT INTO profile_slot (slot_name, slot_index, payload, updated_at)
             VALUES (?1, ?2, x'00', '2024-01-01T00:00:00Z')",
            rusqlite::params![name, index],
        )
        .unwrap();
    }

    assert_eq!(store.backend().slots().unwrap(), vec![id.clone()]);
    assert_eq!(store.list_profiles().unwrap().len(), 1);
}
