//! Persisted store state.

use crate::error::{CoreError, CoreResult};
use crate::journal::{JournalEntry, JournalOperation};
use crate::keys::KeySeries;
use crate::revision::RevisionTable;
use crate::schema::TableSchema;
use crate::value::Row;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Schema and rows of one table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct TableData {
    pub schema: TableSchema,
    #[serde(default)]
    pub rows: BTreeMap<i64, Row>,
}

/// Everything a store persists, written as one image per commit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub(crate) struct StoreState {
    #[serde(default)]
    pub tables: BTreeMap<String, TableData>,
    #[serde(default)]
    pub journal: BTreeMap<u64, JournalEntry>,
    #[serde(default)]
    pub revisions: RevisionTable,
    #[serde(default)]
    pub anchor: u64,
    #[serde(default)]
    pub key_series: Option<KeySeries>,
}

impl StoreState {
    pub fn decode(image: &[u8]) -> CoreResult<Self> {
        Ok(serde_json::from_slice(image)?)
    }

    pub fn encode(&self) -> CoreResult<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn table(&self, name: &str) -> CoreResult<&TableData> {
        self.tables
            .get(name)
            .ok_or_else(|| CoreError::table_not_found(name))
    }

    pub fn table_mut(&mut self, name: &str) -> CoreResult<&mut TableData> {
        self.tables
            .get_mut(name)
            .ok_or_else(|| CoreError::table_not_found(name))
    }

    pub fn max_sequence(&self) -> Option<u64> {
        self.journal.keys().next_back().copied()
    }

    /// Entries with `sequence >= anchor`, ascending.
    pub fn open_window(&self) -> impl Iterator<Item = &JournalEntry> {
        self.journal.range(self.anchor..).map(|(_, entry)| entry)
    }

    /// Entries for one row with `sequence >= from`.
    pub fn pending_for<'a>(
        &'a self,
        table: &'a str,
        row: i64,
        from: u64,
    ) -> impl Iterator<Item = &'a JournalEntry> + 'a {
        self.journal
            .range(from..)
            .map(|(_, entry)| entry)
            .filter(move |entry| entry.row == row && entry.table == table)
    }

    /// Moves entries with `sequence >= from` to the anchor or above.
    ///
    /// Order is kept. Returns the number of renumbered entries; nothing
    /// moves if the first such entry is already at or above the anchor.
    pub fn rebase_pending(&mut self, from: u64) -> usize {
        let anchor = self.anchor;
        match self.journal.range(from..).next() {
            Some((&first, _)) if first < anchor => {}
            _ => return 0,
        }
        let pending = self.journal.split_off(&from);
        let moved = pending.len();
        for (sequence, mut entry) in (anchor..).zip(pending.into_values()) {
            entry.sequence = sequence;
            self.journal.insert(sequence, entry);
        }
        moved
    }

    pub fn has_open(&self, table: &str, row: i64, operation: JournalOperation) -> bool {
        self.pending_for(table, row, self.anchor)
            .any(|entry| entry.operation == operation)
    }

    pub fn set_revision(&mut self, table: &str, row: i64, column: &str, revision: u32) {
        self.revisions
            .entry(table.to_string())
            .or_default()
            .entry(row)
            .or_default()
            .insert(column.to_string(), revision);
    }

    pub fn remove_row_revisions(&mut self, table: &str, row: i64) -> usize {
        let Some(rows) = self.revisions.get_mut(table) else {
            return 0;
        };
        let removed = rows.remove(&row).map_or(0, |columns| columns.len());
        if rows.is_empty() {
            self.revisions.remove(table);
        }
        removed
    }
}
