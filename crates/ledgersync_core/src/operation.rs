//! Batch operations applied to the store after a sync round.

use crate::value::Row;
use serde::{Deserialize, Serialize};

/// A single write in an atomic batch.
///
/// Batches are produced by the sync layer (acknowledgements and unmarshalled
/// server changes) and applied with [`crate::DataStore::apply_batch`] or
/// through [`crate::JournalingSuspended::apply_batch`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum StoreOperation {
    /// Insert a row. Fails if the row already exists.
    InsertRow {
        /// Table name.
        table: String,
        /// Row id.
        row: i64,
        /// Column values; missing columns become null.
        data: Row,
    },
    /// Overwrite the given columns of a row. A missing row is skipped.
    UpdateRow {
        /// Table name.
        table: String,
        /// Row id.
        row: i64,
        /// Columns to overwrite.
        data: Row,
    },
    /// Delete a row and its revision records. A missing row is skipped.
    DeleteRow {
        /// Table name.
        table: String,
        /// Row id.
        row: i64,
    },
    /// Insert or replace the revision of one field.
    SetRevision {
        /// Table name.
        table: String,
        /// Row id.
        row: i64,
        /// Column name.
        column: String,
        /// New revision.
        revision: u32,
    },
    /// Replace the persisted anchor.
    SetAnchor {
        /// New anchor.
        anchor: u64,
    },
}

impl StoreOperation {
    /// Table touched by this operation, if any.
    pub fn table(&self) -> Option<&str> {
        match self {
            StoreOperation::InsertRow { table, .. }
            | StoreOperation::UpdateRow { table, .. }
            | StoreOperation::DeleteRow { table, .. }
            | StoreOperation::SetRevision { table, .. } => Some(table),
            StoreOperation::SetAnchor { .. } => None,
        }
    }

    /// Short operation name, for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            StoreOperation::InsertRow { .. } => "insert_row",
            StoreOperation::UpdateRow { .. } => "update_row",
            StoreOperation::DeleteRow { .. } => "delete_row",
            StoreOperation::SetRevision { .. } => "set_revision",
            StoreOperation::SetAnchor { .. } => "set_anchor",
        }
    }
}
