//! # ledgersync core
//!
//! The local half of ledgersync: a transactional table store whose writes
//! are recorded in a compacting mutation journal, plus per-field revision
//! tracking for optimistic concurrency.
//!
//! This crate provides:
//! - [`DataStore`] - tables of rows addressed by integer ids, with
//!   all-or-nothing transactions spanning data, journal and revisions
//! - [`SequenceJournal`] - sequence allocation and journal compaction
//! - [`JournalSnapshot`] / [`RevisionSnapshot`] - immutable views used to
//!   build one sync push
//! - [`KeySeries`] - high-low row-id allocation
//! - [`StoreOperation`] - batch operations applied atomically after a sync
//!
//! ## Key Invariants
//!
//! - Journal entries with `sequence < anchor` are acknowledged history and
//!   are never touched by compaction
//! - A data mutation and its journal append commit together or not at all
//! - Revisions never decrease except when the server supplies a value
//! - Server-origin writes are applied with journaling suspended
//! - Entries of an in-flight push are never compacted, and edits made
//!   during the push stay in the open window after the new anchor
//!
//! ## Example
//!
//! ```rust
//! use ledgersync_core::{row, DataStore, JournalOperation};
//!
//! let store = DataStore::open_in_memory().unwrap();
//! store.define_table("entries", &["caption", "value"]).unwrap();
//! store.insert_with_id("entries", 5, row! { "caption" => "coffee", "value" => -300 }).unwrap();
//! store.update("entries", 5, row! { "caption" => "Coffee" }).unwrap();
//!
//! // The update was folded into the pending create.
//! let snapshot = store.journal_snapshot();
//! assert_eq!(snapshot.len(), 1);
//! assert!(snapshot.agenda(JournalOperation::Create)["entries"].contains(&5));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod error;
mod journal;
mod keys;
mod operation;
mod revision;
mod schema;
mod state;
mod store;
mod value;

pub use config::StoreConfig;
pub use error::{CoreError, CoreResult};
pub use journal::{
    Agenda, AppendOutcome, JournalEntry, JournalOperation, JournalSnapshot, SequenceAllocator,
    SequenceJournal,
};
pub use keys::KeySeries;
pub use operation::StoreOperation;
pub use revision::{RevisionSnapshot, RowRevisions};
pub use schema::TableSchema;
pub use store::{
    DataStore, JournalingSuspended, RowSource, SyncInFlight, SyncSnapshot, Transaction,
};
pub use value::{Row, Value};

/// Re-export of the storage crate for convenience.
pub use ledgersync_storage as storage;
