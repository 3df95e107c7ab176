//! Immutable views of the journal's open window.

use super::{JournalEntry, JournalOperation};
use std::collections::{BTreeMap, BTreeSet};

/// Rows grouped by table.
pub type Agenda = BTreeMap<String, BTreeSet<i64>>;

static EMPTY_AGENDA: Agenda = BTreeMap::new();

/// A point-in-time copy of journal entries, indexed for marshalling.
///
/// Later journal writes do not affect a snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JournalSnapshot {
    agendas: BTreeMap<JournalOperation, Agenda>,
    columns: BTreeMap<(String, i64), BTreeSet<String>>,
    entries: Vec<JournalEntry>,
}

impl JournalSnapshot {
    /// Builds a snapshot from entries in ascending sequence order.
    pub fn from_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = JournalEntry>,
    {
        let mut snapshot = Self::default();
        for entry in entries {
            snapshot
                .agendas
                .entry(entry.operation)
                .or_default()
                .entry(entry.table.clone())
                .or_default()
                .insert(entry.row);
            if let (JournalOperation::Update, Some(column)) = (entry.operation, &entry.column) {
                snapshot
                    .columns
                    .entry((entry.table.clone(), entry.row))
                    .or_default()
                    .insert(column.clone());
            }
            snapshot.entries.push(entry);
        }
        snapshot
    }

    /// Rows with at least one entry of `operation`, grouped by table.
    pub fn agenda(&self, operation: JournalOperation) -> &Agenda {
        self.agendas.get(&operation).unwrap_or(&EMPTY_AGENDA)
    }

    /// Columns with a pending update for the row.
    pub fn changed_columns(&self, table: &str, row: i64) -> Option<&BTreeSet<String>> {
        self.columns.get(&(table.to_string(), row))
    }

    /// Entries in ascending sequence order.
    pub fn entries(&self) -> &[JournalEntry] {
        &self.entries
    }

    /// Highest sequence in the snapshot.
    pub fn max_sequence(&self) -> Option<u64> {
        self.entries.last().map(|entry| entry.sequence)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the snapshot has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
