//! Mutation journal.
//!
//! Every local data change appends an entry describing *what* changed
//! (table, row, optionally column) under a monotonically increasing
//! sequence number. The persisted anchor splits the journal into
//! acknowledged history (`sequence < anchor`) and the open window
//! (`sequence >= anchor`) that the next sync pushes.
//!
//! ## Compaction
//!
//! Appends keep the open window minimal:
//!
//! - An `Update` is dropped if the window already holds an `Update` of the
//!   same column or a `Create` of the row.
//! - A `Delete` removes all `Create`/`Update` entries of the row from the
//!   window. If one of them was a `Create`, the server never saw the row
//!   and the `Delete` itself is dropped too.
//!
//! Entries below the anchor are never touched. While a push is in flight
//! the pushed entries are frozen as well: compaction only looks at entries
//! appended after the push snapshot was taken.

mod sequence;
mod snapshot;

pub use sequence::SequenceAllocator;
pub use snapshot::{Agenda, JournalSnapshot};

use crate::error::{CoreError, CoreResult};
use crate::state::StoreState;
use crate::store::Transaction;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, trace};

/// Kind of change recorded by a journal entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JournalOperation {
    /// A row was created.
    Create,
    /// One column of a row was updated.
    Update,
    /// A row was deleted.
    Delete,
}

impl fmt::Display for JournalOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(match self {
            JournalOperation::Create => "create",
            JournalOperation::Update => "update",
            JournalOperation::Delete => "delete",
        })
    }
}

/// One journal record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalEntry {
    /// Sequence number, unique within the journal.
    pub sequence: u64,
    /// Kind of change.
    pub operation: JournalOperation,
    /// Table name.
    pub table: String,
    /// Row id.
    pub row: i64,
    /// Changed column; only set for updates.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<String>,
}

impl JournalEntry {
    /// Creates an entry.
    pub fn new(
        sequence: u64,
        operation: JournalOperation,
        table: impl Into<String>,
        row: i64,
        column: Option<&str>,
    ) -> Self {
        Self {
            sequence,
            operation,
            table: table.into(),
            row,
            column: column.map(str::to_string),
        }
    }
}

/// What an append did to the journal.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppendOutcome {
    /// Sequence of the new entry, `None` if it was compacted away.
    pub sequence: Option<u64>,
    /// Sequences of open-window entries removed by the append.
    pub removed: Vec<u64>,
}

impl AppendOutcome {
    fn appended(sequence: u64) -> Self {
        Self {
            sequence: Some(sequence),
            removed: Vec::new(),
        }
    }

    /// Returns true if a new entry was written.
    pub fn is_appended(&self) -> bool {
        self.sequence.is_some()
    }
}

/// Sequence allocation plus compacting appends.
///
/// Appends operate on a [`Transaction`], so a journal entry commits or
/// rolls back together with the data change it describes.
#[derive(Debug, Default)]
pub struct SequenceJournal {
    allocator: SequenceAllocator,
    // Exclusive upper bound of the entries of an in-flight push.
    frozen_below: Mutex<Option<u64>>,
}

impl SequenceJournal {
    /// Creates a journal with a fresh allocator.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn next_sequence_for(&self, state: &StoreState) -> u64 {
        self.allocator
            .next_sequence(|| (state.anchor, state.max_sequence()))
    }

    /// Allocates a sequence number against the state visible to `txn`.
    pub fn next_sequence(&self, txn: &Transaction<'_>) -> u64 {
        self.next_sequence_for(txn.state())
    }

    /// Gives back the last issued sequence number, if possible.
    pub fn return_sequence(&self, sequence: u64) -> bool {
        self.allocator.return_sequence(sequence)
    }

    /// Forces the allocator to reload from persisted state.
    pub fn invalidate(&self) {
        self.allocator.invalidate();
    }

    /// Freezes every entry below `bound` until [`SequenceJournal::thaw`].
    pub(crate) fn freeze(&self, bound: u64) {
        *self.frozen_below.lock() = Some(bound);
        debug!(bound, "journal frozen for push");
    }

    pub(crate) fn thaw(&self) {
        *self.frozen_below.lock() = None;
    }

    /// Exclusive upper bound of the frozen entries, if a push is in flight.
    pub fn frozen_below(&self) -> Option<u64> {
        *self.frozen_below.lock()
    }

    /// First sequence compaction may touch.
    fn compaction_floor(&self, state: &StoreState) -> u64 {
        self.frozen_below()
            .map_or(state.anchor, |bound| bound.max(state.anchor))
    }

    /// Records the creation of a row.
    ///
    /// Fails with [`CoreError::RowIdReused`] if the row's deletion is still
    /// in the open window.
    pub fn append_create(
        &self,
        txn: &mut Transaction<'_>,
        table: &str,
        row: i64,
    ) -> CoreResult<AppendOutcome> {
        let state = txn.state_mut();
        if state.has_open(table, row, JournalOperation::Delete) {
            return Err(CoreError::RowIdReused {
                table: table.to_string(),
                row,
            });
        }
        let sequence = self.next_sequence_for(state);
        state.journal.insert(
            sequence,
            JournalEntry::new(sequence, JournalOperation::Create, table, row, None),
        );
        trace!(sequence, table, row, "journaled create");
        Ok(AppendOutcome::appended(sequence))
    }

    /// Records the update of one column.
    pub fn append_update(
        &self,
        txn: &mut Transaction<'_>,
        table: &str,
        row: i64,
        column: &str,
    ) -> CoreResult<AppendOutcome> {
        let state = txn.state_mut();
        let sequence = self.next_sequence_for(state);
        let floor = self.compaction_floor(state);
        let redundant = state.pending_for(table, row, floor).any(|entry| match entry.operation {
            JournalOperation::Create => true,
            JournalOperation::Update => entry.column.as_deref() == Some(column),
            JournalOperation::Delete => false,
        });
        if redundant {
            let reclaimed = self.allocator.return_sequence(sequence);
            debug!(table, row, column, reclaimed, "update already pending, not journaled");
            return Ok(AppendOutcome::default());
        }
        state.journal.insert(
            sequence,
            JournalEntry::new(sequence, JournalOperation::Update, table, row, Some(column)),
        );
        trace!(sequence, table, row, column, "journaled update");
        Ok(AppendOutcome::appended(sequence))
    }

    /// Records the deletion of a row, compacting its pending entries.
    pub fn append_delete(
        &self,
        txn: &mut Transaction<'_>,
        table: &str,
        row: i64,
    ) -> CoreResult<AppendOutcome> {
        let state = txn.state_mut();
        let sequence = self.next_sequence_for(state);
        let floor = self.compaction_floor(state);

        let pending: Vec<(u64, JournalOperation)> = state
            .pending_for(table, row, floor)
            .filter(|entry| entry.operation != JournalOperation::Delete)
            .map(|entry| (entry.sequence, entry.operation))
            .collect();
        let created_locally = pending
            .iter()
            .any(|(_, operation)| *operation == JournalOperation::Create);
        for (seq, _) in &pending {
            state.journal.remove(seq);
        }
        let removed: Vec<u64> = pending.into_iter().map(|(seq, _)| seq).collect();

        if created_locally {
            let reclaimed = self.allocator.return_sequence(sequence);
            debug!(
                table,
                row,
                removed = removed.len(),
                reclaimed,
                "row created and deleted within open window, nothing to sync"
            );
            return Ok(AppendOutcome {
                sequence: None,
                removed,
            });
        }

        state.journal.insert(
            sequence,
            JournalEntry::new(sequence, JournalOperation::Delete, table, row, None),
        );
        debug!(sequence, table, row, removed = removed.len(), "journaled delete");
        Ok(AppendOutcome {
            sequence: Some(sequence),
            removed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{row, DataStore};

    fn store() -> DataStore {
        let store = DataStore::open_in_memory().unwrap();
        store.define_table("entries", &["caption", "value"]).unwrap();
        store
    }

    fn window(store: &DataStore) -> Vec<(JournalOperation, i64, Option<String>)> {
        store
            .open_window()
            .into_iter()
            .map(|e| (e.operation, e.row, e.column))
            .collect()
    }

    #[test]
    fn update_after_create_is_dropped() {
        let store = store();
        store.insert_with_id("entries", 1, row! { "caption" => "a" }).unwrap();
        store.update("entries", 1, row! { "caption" => "b", "value" => 2 }).unwrap();
        assert_eq!(window(&store), vec![(JournalOperation::Create, 1, None)]);
    }

    #[test]
    fn repeated_update_of_same_column_is_dropped() {
        let store = store();
        store.apply_batch(&[crate::StoreOperation::InsertRow {
            table: "entries".into(),
            row: 1,
            data: row! { "caption" => "a", "value" => 1 },
        }])
        .unwrap();
        let window_before = window(&store);
        assert_eq!(window_before.len(), 1);

        store.set_anchor(1).unwrap();
        store.update("entries", 1, row! { "value" => 2 }).unwrap();
        store.update("entries", 1, row! { "value" => 3 }).unwrap();
        store.update("entries", 1, row! { "caption" => "b" }).unwrap();
        assert_eq!(
            window(&store),
            vec![
                (JournalOperation::Update, 1, Some("value".to_string())),
                (JournalOperation::Update, 1, Some("caption".to_string())),
            ]
        );
    }

    #[test]
    fn create_then_delete_leaves_nothing() {
        let store = store();
        store.insert_with_id("entries", 1, row! { "caption" => "a" }).unwrap();
        store.delete("entries", 1).unwrap();
        assert!(window(&store).is_empty());
    }

    #[test]
    fn delete_replaces_pending_updates() {
        let store = store();
        store.insert_with_id("entries", 1, row! { "caption" => "a" }).unwrap();
        store.set_anchor(1).unwrap();
        store.update("entries", 1, row! { "caption" => "b", "value" => 3 }).unwrap();
        store.delete("entries", 1).unwrap();
        assert_eq!(window(&store), vec![(JournalOperation::Delete, 1, None)]);
    }

    #[test]
    fn acknowledged_history_is_untouched() {
        let store = store();
        store.insert_with_id("entries", 1, row! { "caption" => "a" }).unwrap();
        store.set_anchor(1).unwrap();
        store.delete("entries", 1).unwrap();

        let all: Vec<JournalOperation> =
            store.journal_entries().into_iter().map(|e| e.operation).collect();
        assert_eq!(all, vec![JournalOperation::Create, JournalOperation::Delete]);
    }

    #[test]
    fn reusing_deleted_row_id_is_rejected() {
        let store = store();
        store.insert_with_id("entries", 1, row! { "caption" => "a" }).unwrap();
        store.set_anchor(1).unwrap();
        store.delete("entries", 1).unwrap();

        let err = store
            .insert_with_id("entries", 1, row! { "caption" => "again" })
            .unwrap_err();
        assert!(matches!(err, CoreError::RowIdReused { row: 1, .. }));
        assert!(store.get("entries", 1).unwrap().is_none());
    }

    #[test]
    fn compacted_delete_reclaims_its_sequence() {
        let store = store();
        store.insert_with_id("entries", 1, row! { "caption" => "a" }).unwrap();
        store.delete("entries", 1).unwrap();
        store.insert_with_id("entries", 2, row! { "caption" => "b" }).unwrap();

        let sequences: Vec<u64> = store.open_window().iter().map(|e| e.sequence).collect();
        // 0 was the removed create, 1 the reclaimed delete sequence.
        assert_eq!(sequences, vec![1]);
    }
}
