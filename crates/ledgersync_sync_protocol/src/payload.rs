//! The JSON payload exchanged with the server.

use crate::error::CodecResult;
use ledgersync_core::{Row, RowRevisions};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which array of the payload a record belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    /// `created`
    Create,
    /// `updated`
    Update,
    /// `deleted`
    Delete,
}

impl RecordKind {
    /// All kinds in payload order.
    pub const ALL: [RecordKind; 3] = [RecordKind::Create, RecordKind::Update, RecordKind::Delete];

    /// JSON field holding records of this kind.
    pub fn field(self) -> &'static str {
        match self {
            RecordKind::Create => "created",
            RecordKind::Update => "updated",
            RecordKind::Delete => "deleted",
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RecordKind::Create => "create",
            RecordKind::Update => "update",
            RecordKind::Delete => "delete",
        })
    }
}

/// One record as it appears on the wire.
///
/// Older servers use `table_name` and `column_name`; both are accepted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireRecord {
    /// Table name.
    #[serde(alias = "table_name")]
    pub table: String,
    /// Row id.
    pub row: i64,
    /// Column, for update records.
    #[serde(default, alias = "column_name", skip_serializing_if = "Option::is_none")]
    pub column: Option<String>,
    /// Column values; absent for delete records.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Row>,
    /// Field revisions the record is based on.
    #[serde(default)]
    pub revisions: RowRevisions,
}

/// A complete push or reply payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SyncPayload {
    /// Created rows.
    #[serde(default)]
    pub created: Vec<WireRecord>,
    /// Updated columns, one record per column.
    #[serde(default)]
    pub updated: Vec<WireRecord>,
    /// Deleted rows.
    #[serde(default)]
    pub deleted: Vec<WireRecord>,
    /// Watermark: on push the anchor the journal window starts at, on
    /// reply the new anchor to persist.
    pub anchor: u64,
}

impl SyncPayload {
    /// Creates an empty payload.
    pub fn new(anchor: u64) -> Self {
        Self {
            anchor,
            ..Self::default()
        }
    }

    /// Records of one kind.
    pub fn records(&self, kind: RecordKind) -> &[WireRecord] {
        match kind {
            RecordKind::Create => &self.created,
            RecordKind::Update => &self.updated,
            RecordKind::Delete => &self.deleted,
        }
    }

    pub(crate) fn records_mut(&mut self, kind: RecordKind) -> &mut Vec<WireRecord> {
        match kind {
            RecordKind::Create => &mut self.created,
            RecordKind::Update => &mut self.updated,
            RecordKind::Delete => &mut self.deleted,
        }
    }

    /// Total number of records.
    pub fn len(&self) -> usize {
        self.created.len() + self.updated.len() + self.deleted.len()
    }

    /// Returns true if the payload carries no records.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Serializes to JSON bytes. Output is deterministic.
    pub fn to_bytes(&self) -> CodecResult<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Converts to a JSON value.
    pub fn to_json(&self) -> CodecResult<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledgersync_core::row;

    #[test]
    fn optional_fields_are_omitted() {
        let record = WireRecord {
            table: "entries".into(),
            row: 9,
            column: None,
            data: None,
            revisions: RowRevisions::from([("value".to_string(), 3)]),
        };
        let json = serde_json::to_string(&record).unwrap();
        assert_eq!(json, r#"{"table":"entries","row":9,"revisions":{"value":3}}"#);
    }

    #[test]
    fn legacy_field_names_are_accepted() {
        let record: WireRecord = serde_json::from_str(
            r#"{"table_name":"entries","row":7,"column_name":"value","data":{"value":700},"revisions":{"value":6}}"#,
        )
        .unwrap();
        assert_eq!(record.table, "entries");
        assert_eq!(record.column.as_deref(), Some("value"));
        assert_eq!(record.data, Some(row! { "value" => 700 }));
    }

    #[test]
    fn payload_field_order_is_stable() {
        let json = String::from_utf8(SyncPayload::new(4).to_bytes().unwrap()).unwrap();
        assert_eq!(json, r#"{"created":[],"updated":[],"deleted":[],"anchor":4}"#);
    }
}
