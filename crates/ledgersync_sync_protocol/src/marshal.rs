//! Building a push payload from journal and revision snapshots.

use crate::payload::{RecordKind, SyncPayload};
use crate::record::SyncRecord;
use ledgersync_core::{
    JournalOperation, JournalSnapshot, RevisionSnapshot, Row, RowRevisions, RowSource, Value,
};
use tracing::{debug, warn};

/// Counters for one marshal run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MarshalStats {
    /// Create records emitted.
    pub num_creates: u64,
    /// Update records emitted.
    pub num_updates: u64,
    /// Delete records emitted.
    pub num_deletes: u64,
    /// Records that could not be built.
    pub skipped_entries: u64,
}

/// A marshalled payload and its counters.
#[derive(Debug, Clone, PartialEq)]
pub struct MarshalOutput {
    /// The payload to push.
    pub payload: SyncPayload,
    /// Counters for this run.
    pub stats: MarshalStats,
}

/// Builds the push payload for the rows in `journal`'s agendas.
///
/// Row contents come live from `rows`; a row that vanished since the
/// snapshot is skipped and counted. `anchor` is copied into the payload.
/// Tables, rows and columns are emitted in ascending order, so the same
/// inputs always yield the same bytes.
pub fn marshal<R>(
    journal: &JournalSnapshot,
    revisions: &RevisionSnapshot,
    rows: &R,
    anchor: u64,
) -> MarshalOutput
where
    R: RowSource + ?Sized,
{
    let mut out = MarshalOutput {
        payload: SyncPayload::new(anchor),
        stats: MarshalStats::default(),
    };

    for (table, ids) in journal.agenda(JournalOperation::Create) {
        for &row in ids {
            let Some(data) = rows.fetch_row(table, row) else {
                warn!(table = %table, row, "created row no longer exists, skipping");
                out.stats.skipped_entries += 1;
                continue;
            };
            let revisions: RowRevisions = data.keys().map(|column| (column.clone(), 0)).collect();
            out.push(SyncRecord::Create {
                table: table.clone(),
                row,
                data,
                revisions,
            });
        }
    }

    for (table, ids) in journal.agenda(JournalOperation::Update) {
        for &row in ids {
            let Some(columns) = journal.changed_columns(table, row) else {
                continue;
            };
            let Some(data) = rows.fetch_row(table, row) else {
                warn!(table = %table, row, columns = columns.len(), "updated row no longer exists, skipping");
                out.stats.skipped_entries += columns.len() as u64;
                continue;
            };
            for column in columns {
                let revision = match revisions.revision_of(table, row, column) {
                    Ok(revision) => revision,
                    Err(err) => {
                        warn!(error = %err, "skipping update");
                        out.stats.skipped_entries += 1;
                        continue;
                    }
                };
                let value = data.get(column).cloned().unwrap_or(Value::Null);
                out.push(SyncRecord::Update {
                    table: table.clone(),
                    row,
                    column: column.clone(),
                    data: Row::from([(column.clone(), value)]),
                    revisions: RowRevisions::from([(column.clone(), revision)]),
                });
            }
        }
    }

    for (table, ids) in journal.agenda(JournalOperation::Delete) {
        for &row in ids {
            match revisions.revisions_of_row(table, row) {
                Ok(row_revisions) => out.push(SyncRecord::Delete {
                    table: table.clone(),
                    row,
                    revisions: row_revisions.clone(),
                }),
                Err(err) => {
                    warn!(error = %err, "skipping delete");
                    out.stats.skipped_entries += 1;
                }
            }
        }
    }

    debug!(
        creates = out.stats.num_creates,
        updates = out.stats.num_updates,
        deletes = out.stats.num_deletes,
        skipped = out.stats.skipped_entries,
        anchor,
        "marshalled payload"
    );
    out
}

impl MarshalOutput {
    fn push(&mut self, record: SyncRecord) {
        let kind = record.kind();
        match record.into_wire() {
            Ok(wire) => {
                self.payload.records_mut(kind).push(wire);
                match kind {
                    RecordKind::Create => self.stats.num_creates += 1,
                    RecordKind::Update => self.stats.num_updates += 1,
                    RecordKind::Delete => self.stats.num_deletes += 1,
                }
            }
            Err(err) => {
                warn!(error = %err, kind = %kind, "record cannot be encoded, skipping");
                self.stats.skipped_entries += 1;
            }
        }
    }
}
