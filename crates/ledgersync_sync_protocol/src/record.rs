//! Typed sync records.

use crate::error::{CodecError, CodecResult};
use crate::payload::{RecordKind, WireRecord};
use ledgersync_core::{Row, RowRevisions, StoreOperation, Value};

/// A record of one kind, with the fields that kind requires.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncRecord {
    /// A row that did not exist on the other side.
    Create {
        /// Table name.
        table: String,
        /// Row id.
        row: i64,
        /// All column values.
        data: Row,
        /// Field revisions.
        revisions: RowRevisions,
    },
    /// A changed column.
    Update {
        /// Table name.
        table: String,
        /// Row id.
        row: i64,
        /// The changed column.
        column: String,
        /// New value(s), normally just `column`.
        data: Row,
        /// Field revisions, normally just `column`.
        revisions: RowRevisions,
    },
    /// A deleted row.
    Delete {
        /// Table name.
        table: String,
        /// Row id.
        row: i64,
        /// Revisions of every column the row had.
        revisions: RowRevisions,
    },
}

impl SyncRecord {
    /// Kind of the record.
    pub fn kind(&self) -> RecordKind {
        match self {
            SyncRecord::Create { .. } => RecordKind::Create,
            SyncRecord::Update { .. } => RecordKind::Update,
            SyncRecord::Delete { .. } => RecordKind::Delete,
        }
    }

    /// Table name.
    pub fn table(&self) -> &str {
        match self {
            SyncRecord::Create { table, .. }
            | SyncRecord::Update { table, .. }
            | SyncRecord::Delete { table, .. } => table,
        }
    }

    /// Row id.
    pub fn row(&self) -> i64 {
        match self {
            SyncRecord::Create { row, .. }
            | SyncRecord::Update { row, .. }
            | SyncRecord::Delete { row, .. } => *row,
        }
    }

    /// Parses a wire record found in the array for `kind`.
    pub fn from_wire(kind: RecordKind, wire: WireRecord) -> CodecResult<Self> {
        let WireRecord {
            table,
            row,
            column,
            data,
            revisions,
        } = wire;
        if table.is_empty() {
            return Err(CodecError::invalid("empty table name"));
        }

        match kind {
            RecordKind::Create => Ok(SyncRecord::Create {
                table,
                row,
                data: data.ok_or(CodecError::MissingField {
                    kind: "create",
                    field: "data",
                })?,
                revisions,
            }),
            RecordKind::Update => {
                let data = data
                    .filter(|data| !data.is_empty())
                    .ok_or(CodecError::MissingField {
                        kind: "update",
                        field: "data",
                    })?;
                let column = match column {
                    Some(column) if data.contains_key(&column) => column,
                    Some(column) => {
                        return Err(CodecError::invalid(format!(
                            "update of column {column} carries no value for it"
                        )))
                    }
                    None if data.len() == 1 => data.keys().next().cloned().unwrap_or_default(),
                    None => {
                        return Err(CodecError::MissingField {
                            kind: "update",
                            field: "column",
                        })
                    }
                };
                Ok(SyncRecord::Update {
                    table,
                    row,
                    column,
                    data,
                    revisions,
                })
            }
            RecordKind::Delete => Ok(SyncRecord::Delete {
                table,
                row,
                revisions,
            }),
        }
    }

    /// Converts to the wire shape, rejecting values JSON cannot carry.
    pub fn into_wire(self) -> CodecResult<WireRecord> {
        match self {
            SyncRecord::Create {
                table,
                row,
                data,
                revisions,
            } => {
                check_encodable(&table, row, &data)?;
                Ok(WireRecord {
                    table,
                    row,
                    column: None,
                    data: Some(data),
                    revisions,
                })
            }
            SyncRecord::Update {
                table,
                row,
                column,
                data,
                revisions,
            } => {
                check_encodable(&table, row, &data)?;
                Ok(WireRecord {
                    table,
                    row,
                    column: Some(column),
                    data: Some(data),
                    revisions,
                })
            }
            SyncRecord::Delete {
                table,
                row,
                revisions,
            } => Ok(WireRecord {
                table,
                row,
                column: None,
                data: None,
                revisions,
            }),
        }
    }

    /// Store operations that apply this record locally.
    ///
    /// Server-supplied revisions are applied verbatim. Revisions of a
    /// deleted row are dropped along with the row.
    pub fn into_operations(self) -> Vec<StoreOperation> {
        match self {
            SyncRecord::Create {
                table,
                row,
                data,
                revisions,
            } => {
                let mut ops = vec![StoreOperation::InsertRow {
                    table: table.clone(),
                    row,
                    data,
                }];
                ops.extend(revision_ops(&table, row, revisions));
                ops
            }
            SyncRecord::Update {
                table,
                row,
                data,
                revisions,
                ..
            } => {
                let mut ops = vec![StoreOperation::UpdateRow {
                    table: table.clone(),
                    row,
                    data,
                }];
                ops.extend(revision_ops(&table, row, revisions));
                ops
            }
            SyncRecord::Delete { table, row, .. } => {
                vec![StoreOperation::DeleteRow { table, row }]
            }
        }
    }
}

fn revision_ops(
    table: &str,
    row: i64,
    revisions: RowRevisions,
) -> impl Iterator<Item = StoreOperation> + '_ {
    revisions
        .into_iter()
        .map(move |(column, revision)| StoreOperation::SetRevision {
            table: table.to_string(),
            row,
            column,
            revision,
        })
}

fn check_encodable(table: &str, row: i64, data: &Row) -> CodecResult<()> {
    for (column, value) in data {
        if let Value::Real(v) = value {
            if !v.is_finite() {
                return Err(CodecError::NonFiniteReal {
                    table: table.to_string(),
                    row,
                    column: column.clone(),
                });
            }
        }
    }
    Ok(())
}

/// Fluent construction of a [`SyncRecord`].
///
/// ```rust
/// use ledgersync_sync_protocol::{RecordBuilder, SyncRecord};
///
/// let record = RecordBuilder::update("entries", 7, "value")
///     .value("value", 700)
///     .revision("value", 5)
///     .build()
///     .unwrap();
/// assert!(matches!(record, SyncRecord::Update { .. }));
/// ```
#[derive(Debug, Clone)]
pub struct RecordBuilder {
    kind: RecordKind,
    wire: WireRecord,
}

impl RecordBuilder {
    fn new(kind: RecordKind, table: &str, row: i64) -> Self {
        Self {
            kind,
            wire: WireRecord {
                table: table.to_string(),
                row,
                column: None,
                data: None,
                revisions: RowRevisions::new(),
            },
        }
    }

    /// Starts a create record.
    pub fn create(table: &str, row: i64) -> Self {
        Self::new(RecordKind::Create, table, row)
    }

    /// Starts an update record for one column.
    pub fn update(table: &str, row: i64, column: &str) -> Self {
        let mut builder = Self::new(RecordKind::Update, table, row);
        builder.wire.column = Some(column.to_string());
        builder
    }

    /// Starts a delete record.
    pub fn delete(table: &str, row: i64) -> Self {
        Self::new(RecordKind::Delete, table, row)
    }

    /// Replaces the column values.
    #[must_use]
    pub fn data(mut self, data: Row) -> Self {
        self.wire.data = Some(data);
        self
    }

    /// Sets one column value.
    #[must_use]
    pub fn value(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.wire
            .data
            .get_or_insert_with(Row::new)
            .insert(column.to_string(), value.into());
        self
    }

    /// Replaces the revisions.
    #[must_use]
    pub fn revisions(mut self, revisions: RowRevisions) -> Self {
        self.wire.revisions = revisions;
        self
    }

    /// Sets one field revision.
    #[must_use]
    pub fn revision(mut self, column: &str, revision: u32) -> Self {
        self.wire.revisions.insert(column.to_string(), revision);
        self
    }

    /// Validates and builds the record.
    pub fn build(self) -> CodecResult<SyncRecord> {
        SyncRecord::from_wire(self.kind, self.wire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledgersync_core::row;

    #[test]
    fn update_infers_column_from_single_value() {
        let wire = WireRecord {
            table: "entries".into(),
            row: 7,
            column: None,
            data: Some(row! { "value" => 700 }),
            revisions: RowRevisions::from([("value".to_string(), 6)]),
        };
        let record = SyncRecord::from_wire(RecordKind::Update, wire).unwrap();
        assert!(matches!(record, SyncRecord::Update { ref column, .. } if column == "value"));
    }

    #[test]
    fn update_without_data_is_rejected() {
        let err = RecordBuilder::update("entries", 7, "value").build().unwrap_err();
        assert_eq!(
            err,
            CodecError::MissingField {
                kind: "update",
                field: "data"
            }
        );
    }

    #[test]
    fn update_column_must_have_value() {
        let err = RecordBuilder::update("entries", 7, "value")
            .value("caption", "x")
            .build()
            .unwrap_err();
        assert!(matches!(err, CodecError::InvalidRecord { .. }));
    }

    #[test]
    fn create_requires_data() {
        assert!(RecordBuilder::create("entries", 1).build().is_err());
        assert!(RecordBuilder::create("", 1).data(row! {}).build().is_err());
    }

    #[test]
    fn non_finite_reals_cannot_be_encoded() {
        let record = RecordBuilder::create("entries", 1)
            .value("value", f64::NAN)
            .build()
            .unwrap();
        assert!(matches!(
            record.into_wire(),
            Err(CodecError::NonFiniteReal { row: 1, .. })
        ));
    }

    #[test]
    fn create_operations_insert_then_set_revisions() {
        let ops = RecordBuilder::create("entries", 3)
            .value("caption", "tea")
            .revision("caption", 0)
            .build()
            .unwrap()
            .into_operations();
        assert_eq!(ops.len(), 2);
        assert!(matches!(ops[0], StoreOperation::InsertRow { row: 3, .. }));
        assert!(matches!(
            ops[1],
            StoreOperation::SetRevision { revision: 0, ref column, .. } if column == "caption"
        ));
    }

    #[test]
    fn delete_operations_drop_revisions() {
        let ops = RecordBuilder::delete("entries", 3)
            .revision("caption", 4)
            .build()
            .unwrap()
            .into_operations();
        assert_eq!(
            ops,
            vec![StoreOperation::DeleteRow {
                table: "entries".into(),
                row: 3
            }]
        );
    }
}
