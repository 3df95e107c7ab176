//! Per-field revision snapshots.

use crate::error::{CoreError, CoreResult};
use std::collections::BTreeMap;

/// Revisions of one row: column to revision.
pub type RowRevisions = BTreeMap<String, u32>;

/// Nested revision table: table, then row, then column.
pub(crate) type RevisionTable = BTreeMap<String, BTreeMap<i64, RowRevisions>>;

/// An immutable copy of the revision records.
///
/// Taken in the same critical section as the journal snapshot of a sync
/// round so both describe the same committed state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RevisionSnapshot {
    revisions: RevisionTable,
}

impl RevisionSnapshot {
    pub(crate) fn new(revisions: RevisionTable) -> Self {
        Self { revisions }
    }

    /// Returns the revision of one field.
    pub fn revision_of(&self, table: &str, row: i64, column: &str) -> CoreResult<u32> {
        self.revisions
            .get(table)
            .and_then(|rows| rows.get(&row))
            .and_then(|columns| columns.get(column))
            .copied()
            .ok_or_else(|| CoreError::RevisionNotFound {
                table: table.to_string(),
                row,
                column: Some(column.to_string()),
            })
    }

    /// Returns every known field revision of a row.
    pub fn revisions_of_row(&self, table: &str, row: i64) -> CoreResult<&RowRevisions> {
        self.revisions
            .get(table)
            .and_then(|rows| rows.get(&row))
            .filter(|columns| !columns.is_empty())
            .ok_or_else(|| CoreError::RevisionNotFound {
                table: table.to_string(),
                row,
                column: None,
            })
    }

    /// Returns the highest field revision of a row.
    pub fn max_revision(&self, table: &str, row: i64) -> CoreResult<u32> {
        let columns = self.revisions_of_row(table, row)?;
        Ok(columns.values().copied().max().unwrap_or_default())
    }

    /// Number of field revision records.
    pub fn len(&self) -> usize {
        self.revisions
            .values()
            .flat_map(BTreeMap::values)
            .map(BTreeMap::len)
            .sum()
    }

    /// Returns true if no revisions are recorded.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
