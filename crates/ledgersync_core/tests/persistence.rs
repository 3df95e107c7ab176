//! Reopening file-backed stores.

use ledgersync_core::{row, DataStore, JournalOperation, StoreConfig, Value};
use ledgersync_storage::FileBackend;
use tempfile::tempdir;

#[test]
fn state_survives_reopen() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("ledger.db");

    {
        let store = DataStore::open_file(&path).unwrap();
        store.define_table("entries", &["caption", "value"]).unwrap();
        store.install_key_series(1000, 1999).unwrap();
        let id = store.insert("entries", row! { "caption" => "rent" }).unwrap();
        assert_eq!(id, 1000);
        store.set_anchor(1).unwrap();
        store.update("entries", id, row! { "value" => -900 }).unwrap();
    }

    let store = DataStore::open_file(&path).unwrap();
    assert_eq!(store.anchor(), 1);
    assert_eq!(
        store.get("entries", 1000).unwrap().unwrap()["value"],
        Value::Integer(-900)
    );
    assert_eq!(store.key_series().unwrap().next_key, 1001);

    let window = store.open_window();
    assert_eq!(window.len(), 1);
    assert_eq!(window[0].operation, JournalOperation::Update);

    // The allocator reloads from the persisted journal.
    store.update("entries", 1000, row! { "caption" => "Rent" }).unwrap();
    let sequences: Vec<u64> = store.open_window().iter().map(|e| e.sequence).collect();
    assert_eq!(sequences, vec![1, 2]);
}

#[test]
fn second_open_is_locked() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("ledger.db");
    let _store = DataStore::open_file(&path).unwrap();
    assert!(DataStore::open_file(&path).is_err());
}

#[test]
fn deferred_persistence_needs_flush() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("ledger.db");

    {
        let backend = FileBackend::open(&path).unwrap();
        let store =
            DataStore::open_with_config(backend, StoreConfig::new().sync_on_commit(false)).unwrap();
        store.define_table("entries", &["value"]).unwrap();
        store.insert_with_id("entries", 1, row! { "value" => 1 }).unwrap();
    }
    assert!(DataStore::open_file(&path).unwrap().tables().is_empty());

    {
        let backend = FileBackend::open(&path).unwrap();
        let store =
            DataStore::open_with_config(backend, StoreConfig::new().sync_on_commit(false)).unwrap();
        store.define_table("entries", &["value"]).unwrap();
        store.insert_with_id("entries", 1, row! { "value" => 1 }).unwrap();
        store.flush().unwrap();
    }
    let store = DataStore::open_file(&path).unwrap();
    assert_eq!(store.rows("entries").unwrap().len(), 1);
}
