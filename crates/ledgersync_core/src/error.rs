//! Error types for ledgersync core.

use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in local store, journal and revision operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Storage backend error.
    #[error("storage error: {0}")]
    Storage(#[from] ledgersync_storage::StorageError),

    /// The persisted state could not be encoded or decoded.
    #[error("state serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The table has not been defined.
    #[error("table not found: {table}")]
    TableNotFound {
        /// Name of the table.
        table: String,
    },

    /// A table was redefined with a different column list.
    #[error("table {table} already defined with different columns")]
    SchemaMismatch {
        /// Name of the table.
        table: String,
    },

    /// The column is not part of the table's schema.
    #[error("unknown column {column} in table {table}")]
    UnknownColumn {
        /// Name of the table.
        table: String,
        /// Name of the column.
        column: String,
    },

    /// A real value is NaN or infinite and cannot be stored.
    #[error("non-finite value in column {column} of table {table}")]
    NonFiniteValue {
        /// Name of the table.
        table: String,
        /// Name of the column.
        column: String,
    },

    /// A row with this id already exists.
    #[error("row {row} already exists in table {table}")]
    RowExists {
        /// Name of the table.
        table: String,
        /// Row id.
        row: i64,
    },

    /// No revision record exists for the requested key.
    #[error("no revision for table {table}, row {row}{}", column.as_ref().map(|c| format!(", column {c}")).unwrap_or_default())]
    RevisionNotFound {
        /// Name of the table.
        table: String,
        /// Row id.
        row: i64,
        /// Column name, `None` when a whole row was requested.
        column: Option<String>,
    },

    /// The current key series is exhausted (or was never installed).
    #[error("out of keys: no row ids left in the current key series")]
    OutOfKeys,

    /// A key series with `next_key > upper_bound + 1` was supplied.
    #[error("invalid key series: next key {next_key}, upper bound {upper_bound}")]
    InvalidKeySeries {
        /// First key of the series.
        next_key: i64,
        /// Last key of the series (inclusive).
        upper_bound: i64,
    },

    /// A row id was reused while its deletion is still unsynced.
    #[error("row {row} in table {table} was deleted in the open window and cannot be recreated")]
    RowIdReused {
        /// Name of the table.
        table: String,
        /// Row id.
        row: i64,
    },

    /// Transaction was aborted by the caller.
    #[error("transaction aborted: {reason}")]
    TransactionAborted {
        /// Reason for abort.
        reason: String,
    },
}

impl CoreError {
    /// Creates a table-not-found error.
    pub fn table_not_found(table: impl Into<String>) -> Self {
        Self::TableNotFound {
            table: table.into(),
        }
    }

    /// Creates a transaction-aborted error.
    pub fn aborted(reason: impl Into<String>) -> Self {
        Self::TransactionAborted {
            reason: reason.into(),
        }
    }

    /// Returns true if this is a missing-revision error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, CoreError::RevisionNotFound { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn revision_not_found_display() {
        let err = CoreError::RevisionNotFound {
            table: "entries".into(),
            row: 7,
            column: Some("value".into()),
        };
        assert_eq!(
            err.to_string(),
            "no revision for table entries, row 7, column value"
        );
        assert!(err.is_not_found());

        let err = CoreError::RevisionNotFound {
            table: "entries".into(),
            row: 7,
            column: None,
        };
        assert_eq!(err.to_string(), "no revision for table entries, row 7");
    }

    #[test]
    fn other_errors_are_not_not_found() {
        assert!(!CoreError::OutOfKeys.is_not_found());
        assert!(!CoreError::table_not_found("x").is_not_found());
    }
}
