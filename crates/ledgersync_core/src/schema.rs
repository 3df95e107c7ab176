//! Table schemas.

use crate::error::{CoreError, CoreResult};
use crate::value::{Row, Value};
use serde::{Deserialize, Serialize};

/// The fixed column list of a table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSchema {
    /// Table name.
    pub name: String,
    /// Column names in definition order.
    pub columns: Vec<String>,
}

impl TableSchema {
    /// Creates a schema.
    pub fn new(name: impl Into<String>, columns: &[&str]) -> Self {
        Self {
            name: name.into(),
            columns: columns.iter().map(|c| (*c).to_string()).collect(),
        }
    }

    /// Returns true if `column` belongs to this table.
    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }

    /// Checks that every column of `values` exists and holds a storable
    /// value.
    pub fn validate(&self, values: &Row) -> CoreResult<()> {
        for (column, value) in values {
            if !self.has_column(column) {
                return Err(CoreError::UnknownColumn {
                    table: self.name.clone(),
                    column: column.clone(),
                });
            }
            if !value.is_finite() {
                return Err(CoreError::NonFiniteValue {
                    table: self.name.clone(),
                    column: column.clone(),
                });
            }
        }
        Ok(())
    }

    /// Returns a full row: `values` plus `Null` for every missing column.
    pub fn complete(&self, mut values: Row) -> Row {
        for column in &self.columns {
            values.entry(column.clone()).or_insert(Value::Null);
        }
        values
    }
}
