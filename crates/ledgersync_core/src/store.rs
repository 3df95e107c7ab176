//! The transactional table store.
//!
//! [`DataStore`] keeps all state in memory behind a single `RwLock` and
//! writes a full image through its [`StorageBackend`] on every commit.
//! A transaction works on a copy of the state; the copy replaces the
//! committed state only after the image was stored, so data, journal,
//! revisions and anchor change together or not at all.

use crate::config::StoreConfig;
use crate::error::{CoreError, CoreResult};
use crate::journal::{JournalEntry, JournalSnapshot, SequenceJournal};
use crate::keys::{self, KeySeries};
use crate::operation::StoreOperation;
use crate::revision::RevisionSnapshot;
use crate::schema::TableSchema;
use crate::state::{StoreState, TableData};
use crate::value::Row;
use ledgersync_storage::{FileBackend, InMemoryBackend, StorageBackend};
use parking_lot::{Mutex, MutexGuard, RwLock, RwLockWriteGuard};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info, trace};

/// Read access to current row contents.
///
/// Marshalling fetches row data live rather than from a snapshot; only the
/// journal and revisions are frozen per sync round.
pub trait RowSource {
    /// Returns the row, or `None` if it does not exist.
    fn fetch_row(&self, table: &str, row: i64) -> Option<Row>;
}

impl RowSource for BTreeMap<(String, i64), Row> {
    fn fetch_row(&self, table: &str, row: i64) -> Option<Row> {
        self.get(&(table.to_string(), row)).cloned()
    }
}

/// Journal window, revisions and anchor read in one critical section.
#[derive(Debug, Clone, Default)]
pub struct SyncSnapshot {
    /// Persisted anchor at snapshot time.
    pub anchor: u64,
    /// Entries with `sequence >= anchor`.
    pub journal: JournalSnapshot,
    /// All revision records.
    pub revisions: RevisionSnapshot,
}

/// A write transaction over a private copy of the store state.
///
/// Returned errors roll the whole transaction back. While journaling is
/// active, row writes append journal entries and initialize revisions.
pub struct Transaction<'a> {
    state: &'a mut StoreState,
    journal: &'a SequenceJournal,
    journaling: bool,
    anchor_changed: bool,
}

impl<'a> Transaction<'a> {
    fn new(state: &'a mut StoreState, journal: &'a SequenceJournal, journaling: bool) -> Self {
        Self {
            state,
            journal,
            journaling,
            anchor_changed: false,
        }
    }

    pub(crate) fn state(&self) -> &StoreState {
        &*self.state
    }

    pub(crate) fn state_mut(&mut self) -> &mut StoreState {
        &mut *self.state
    }

    /// Returns true if writes in this transaction are journaled.
    pub fn is_journaling(&self) -> bool {
        self.journaling
    }

    /// Reads a row as seen by this transaction.
    pub fn get(&self, table: &str, row: i64) -> CoreResult<Option<&Row>> {
        Ok(self.state.table(table)?.rows.get(&row))
    }

    /// Current anchor as seen by this transaction.
    pub fn anchor(&self) -> u64 {
        self.state.anchor
    }

    /// Inserts a row under a caller-chosen id.
    ///
    /// Missing columns are stored as null. Fails if the row exists.
    pub fn insert(&mut self, table: &str, row: i64, values: Row) -> CoreResult<()> {
        let schema = self.state.table(table)?.schema.clone();
        schema.validate(&values)?;

        let data = self.state.table_mut(table)?;
        if data.rows.contains_key(&row) {
            return Err(CoreError::RowExists {
                table: table.to_string(),
                row,
            });
        }
        data.rows.insert(row, schema.complete(values));

        if self.journaling {
            let journal = self.journal;
            journal.append_create(self, table, row)?;
            for column in &schema.columns {
                self.state.set_revision(table, row, column, 0);
            }
        }
        trace!(table, row, "inserted row");
        Ok(())
    }

    /// Inserts a row under the next id from the key series.
    pub fn insert_generated(&mut self, table: &str, values: Row) -> CoreResult<i64> {
        let row = self.generate_key()?;
        self.insert(table, row, values)?;
        Ok(row)
    }

    /// Overwrites the given columns of a row.
    ///
    /// Only columns whose value actually changes are journaled. Returns
    /// false if the row does not exist.
    pub fn update(&mut self, table: &str, row: i64, values: Row) -> CoreResult<bool> {
        self.state.table(table)?.schema.validate(&values)?;

        let data = self.state.table_mut(table)?;
        let Some(current) = data.rows.get_mut(&row) else {
            return Ok(false);
        };
        let mut changed = Vec::new();
        for (column, value) in values {
            if current.get(&column) != Some(&value) {
                current.insert(column.clone(), value);
                changed.push(column);
            }
        }

        if self.journaling {
            let journal = self.journal;
            for column in &changed {
                journal.append_update(self, table, row, column)?;
            }
        }
        trace!(table, row, changed = changed.len(), "updated row");
        Ok(true)
    }

    /// Deletes a row. Returns false if it did not exist.
    pub fn delete(&mut self, table: &str, row: i64) -> CoreResult<bool> {
        if self.state.table_mut(table)?.rows.remove(&row).is_none() {
            return Ok(false);
        }
        if self.journaling {
            let journal = self.journal;
            let outcome = journal.append_delete(self, table, row)?;
            if !outcome.is_appended() && !outcome.removed.is_empty() {
                // Never reached the server, so its revisions are meaningless.
                self.state.remove_row_revisions(table, row);
            }
        }
        trace!(table, row, "deleted row");
        Ok(true)
    }

    /// Inserts or replaces the revision of one field.
    pub fn set_revision(
        &mut self,
        table: &str,
        row: i64,
        column: &str,
        revision: u32,
    ) -> CoreResult<()> {
        let schema = &self.state.table(table)?.schema;
        if !schema.has_column(column) {
            return Err(CoreError::UnknownColumn {
                table: table.to_string(),
                column: column.to_string(),
            });
        }
        self.state.set_revision(table, row, column, revision);
        Ok(())
    }

    /// Replaces the anchor. The sequence allocator reloads after commit.
    pub fn set_anchor(&mut self, anchor: u64) {
        self.state.anchor = anchor;
        self.anchor_changed = true;
    }

    /// Issues the next row id from the key series.
    pub fn generate_key(&mut self) -> CoreResult<i64> {
        self.state
            .key_series
            .as_mut()
            .ok_or(CoreError::OutOfKeys)?
            .take()
    }

    /// Replaces the key series.
    pub fn install_key_series(&mut self, series: KeySeries) {
        self.state.key_series = Some(series);
    }

    /// Applies one batch operation.
    pub fn apply(&mut self, operation: &StoreOperation) -> CoreResult<()> {
        match operation {
            StoreOperation::InsertRow { table, row, data } => {
                if self.get(table, *row)?.is_some() {
                    debug!(table, row, "insert for existing row applied as update");
                    return self.update(table, *row, data.clone()).map(|_| ());
                }
                self.insert(table, *row, data.clone())
            }
            StoreOperation::UpdateRow { table, row, data } => {
                if !self.update(table, *row, data.clone())? {
                    debug!(table, row, "update for missing row skipped");
                }
                Ok(())
            }
            StoreOperation::DeleteRow { table, row } => {
                self.delete(table, *row)?;
                self.state.remove_row_revisions(table, *row);
                Ok(())
            }
            StoreOperation::SetRevision {
                table,
                row,
                column,
                revision,
            } => self.set_revision(table, *row, column, *revision),
            StoreOperation::SetAnchor { anchor } => {
                self.set_anchor(*anchor);
                Ok(())
            }
        }
    }
}

/// A local table store with a mutation journal and revision records.
///
/// # Example
///
/// ```rust
/// use ledgersync_core::{row, DataStore};
///
/// let store = DataStore::open_in_memory().unwrap();
/// store.define_table("entries", &["caption", "value"]).unwrap();
/// store.install_key_series(100, 199).unwrap();
///
/// let id = store.insert("entries", row! { "caption" => "rent", "value" => -900 }).unwrap();
/// assert_eq!(id, 100);
/// assert_eq!(store.revision_snapshot().revision_of("entries", id, "value").unwrap(), 0);
/// ```
pub struct DataStore {
    state: RwLock<StoreState>,
    backend: Mutex<Box<dyn StorageBackend>>,
    journal: SequenceJournal,
    journaling: AtomicBool,
    sync_running: Mutex<()>,
    config: StoreConfig,
}

impl std::fmt::Debug for DataStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataStore")
            .field("journaling", &self.is_journaling())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl DataStore {
    /// Opens a store over `backend`, loading any persisted image.
    pub fn open<B>(backend: B) -> CoreResult<Self>
    where
        B: StorageBackend + 'static,
    {
        Self::open_with_config(backend, StoreConfig::default())
    }

    /// Opens a store with explicit configuration.
    pub fn open_with_config<B>(backend: B, config: StoreConfig) -> CoreResult<Self>
    where
        B: StorageBackend + 'static,
    {
        let state = match backend.load()? {
            Some(image) => StoreState::decode(&image)?,
            None => StoreState::default(),
        };
        info!(
            tables = state.tables.len(),
            journal_entries = state.journal.len(),
            anchor = state.anchor,
            "opened data store"
        );
        Ok(Self {
            state: RwLock::new(state),
            backend: Mutex::new(Box::new(backend)),
            journal: SequenceJournal::new(),
            journaling: AtomicBool::new(true),
            sync_running: Mutex::new(()),
            config,
        })
    }

    /// Opens a store backed by a file.
    pub fn open_file(path: &Path) -> CoreResult<Self> {
        Self::open(FileBackend::open_with_create_dirs(path)?)
    }

    /// Opens an empty in-memory store.
    pub fn open_in_memory() -> CoreResult<Self> {
        Self::open(InMemoryBackend::new())
    }

    /// The journal's sequence allocator and append operations.
    pub fn journal(&self) -> &SequenceJournal {
        &self.journal
    }

    /// Declares a table. Redeclaring with the same columns is a no-op.
    pub fn define_table(&self, name: &str, columns: &[&str]) -> CoreResult<()> {
        let schema = TableSchema::new(name, columns);
        self.transaction(|txn| {
            let state = txn.state_mut();
            match state.tables.get(name) {
                Some(existing) if existing.schema == schema => Ok(()),
                Some(_) => Err(CoreError::SchemaMismatch {
                    table: name.to_string(),
                }),
                None => {
                    state.tables.insert(
                        name.to_string(),
                        TableData {
                            schema,
                            rows: BTreeMap::new(),
                        },
                    );
                    Ok(())
                }
            }
        })
    }

    /// Declared tables.
    pub fn tables(&self) -> Vec<TableSchema> {
        self.state
            .read()
            .tables
            .values()
            .map(|data| data.schema.clone())
            .collect()
    }

    /// Runs `f` in a transaction and commits if it returns `Ok`.
    ///
    /// Must not be called while this thread holds a [`JournalingSuspended`]
    /// guard of the same store; use the guard's own methods instead.
    pub fn transaction<F, T>(&self, f: F) -> CoreResult<T>
    where
        F: FnOnce(&mut Transaction<'_>) -> CoreResult<T>,
    {
        let mut state = self.state.write();
        let journaling = self.is_journaling();
        self.run_transaction(&mut state, journaling, f)
    }

    fn run_transaction<F, T>(&self, state: &mut StoreState, journaling: bool, f: F) -> CoreResult<T>
    where
        F: FnOnce(&mut Transaction<'_>) -> CoreResult<T>,
    {
        let mut working = state.clone();
        let mut txn = Transaction::new(&mut working, &self.journal, journaling);
        let result = f(&mut txn);
        let anchor_changed = txn.anchor_changed;

        let value = match result {
            Ok(value) => value,
            Err(err) => {
                debug!(error = %err, "transaction rolled back");
                return Err(err);
            }
        };

        if self.config.sync_on_commit {
            if let Err(err) = self.persist(&working) {
                debug!(error = %err, "commit failed, transaction rolled back");
                return Err(err);
            }
        }
        *state = working;
        if anchor_changed {
            self.journal.invalidate();
        }
        Ok(value)
    }

    fn persist(&self, state: &StoreState) -> CoreResult<()> {
        let image = state.encode()?;
        self.backend.lock().store(&image)?;
        Ok(())
    }

    /// Writes the committed state through the backend.
    pub fn flush(&self) -> CoreResult<()> {
        let state = self.state.read();
        self.persist(&state)
    }

    /// Inserts a row under a generated id and returns the id.
    pub fn insert(&self, table: &str, values: Row) -> CoreResult<i64> {
        self.transaction(|txn| txn.insert_generated(table, values))
    }

    /// Inserts a row under a caller-chosen id.
    pub fn insert_with_id(&self, table: &str, row: i64, values: Row) -> CoreResult<()> {
        self.transaction(|txn| txn.insert(table, row, values))
    }

    /// Overwrites columns of a row. Returns false if it does not exist.
    pub fn update(&self, table: &str, row: i64, values: Row) -> CoreResult<bool> {
        self.transaction(|txn| txn.update(table, row, values))
    }

    /// Deletes a row. Returns false if it did not exist.
    pub fn delete(&self, table: &str, row: i64) -> CoreResult<bool> {
        self.transaction(|txn| txn.delete(table, row))
    }

    /// Reads a row.
    pub fn get(&self, table: &str, row: i64) -> CoreResult<Option<Row>> {
        Ok(self.state.read().table(table)?.rows.get(&row).cloned())
    }

    /// All rows of a table, ordered by id.
    pub fn rows(&self, table: &str) -> CoreResult<Vec<(i64, Row)>> {
        Ok(self
            .state
            .read()
            .table(table)?
            .rows
            .iter()
            .map(|(id, row)| (*id, row.clone()))
            .collect())
    }

    /// Applies `operations` in one transaction.
    pub fn apply_batch(&self, operations: &[StoreOperation]) -> CoreResult<()> {
        self.transaction(|txn| operations.iter().try_for_each(|op| txn.apply(op)))
    }

    /// Replaces the anchor.
    pub fn set_anchor(&self, anchor: u64) -> CoreResult<()> {
        self.transaction(|txn| {
            txn.set_anchor(anchor);
            Ok(())
        })
    }

    /// Persisted anchor.
    pub fn anchor(&self) -> u64 {
        self.state.read().anchor
    }

    /// Returns true unless a [`JournalingSuspended`] guard is live.
    pub fn is_journaling(&self) -> bool {
        self.journaling.load(Ordering::SeqCst)
    }

    /// Suspends journaling and revision keeping until the guard drops.
    ///
    /// The guard holds the store's write lock, so foreground writers wait
    /// instead of slipping through unjournaled.
    pub fn suspend_journaling(&self) -> JournalingSuspended<'_> {
        let state = self.state.write();
        let previous = self.journaling.swap(false, Ordering::SeqCst);
        debug!("journaling suspended");
        JournalingSuspended {
            store: self,
            state,
            previous,
        }
    }

    /// Every journal entry, acknowledged history included.
    pub fn journal_entries(&self) -> Vec<JournalEntry> {
        self.state.read().journal.values().cloned().collect()
    }

    /// Entries with `sequence >= anchor`.
    pub fn open_window(&self) -> Vec<JournalEntry> {
        self.state.read().open_window().cloned().collect()
    }

    /// Snapshot of the open window.
    pub fn journal_snapshot(&self) -> JournalSnapshot {
        JournalSnapshot::from_entries(self.open_window())
    }

    /// Snapshot of entries with `sequence >= from`.
    pub fn journal_snapshot_from(&self, from: u64) -> JournalSnapshot {
        let state = self.state.read();
        JournalSnapshot::from_entries(state.journal.range(from..).map(|(_, e)| e.clone()))
    }

    /// Snapshot of all revision records.
    pub fn revision_snapshot(&self) -> RevisionSnapshot {
        RevisionSnapshot::new(self.state.read().revisions.clone())
    }

    /// Anchor, open window and revisions, read consistently.
    pub fn sync_snapshot(&self) -> SyncSnapshot {
        Self::snapshot_of(&self.state.read())
    }

    fn snapshot_of(state: &StoreState) -> SyncSnapshot {
        SyncSnapshot {
            anchor: state.anchor,
            journal: JournalSnapshot::from_entries(state.open_window().cloned()),
            revisions: RevisionSnapshot::new(state.revisions.clone()),
        }
    }

    /// Claims the store for one sync run.
    ///
    /// Returns `None` while another [`SyncInFlight`] guard of this store is
    /// alive.
    pub fn try_begin_sync(&self) -> Option<SyncInFlight<'_>> {
        let running = self.sync_running.try_lock()?;
        Some(SyncInFlight {
            store: self,
            frozen_below: None,
            _running: running,
        })
    }

    /// Replaces the key series with `next..=upper`.
    pub fn install_key_series(&self, next_key: i64, upper_bound: i64) -> CoreResult<()> {
        let series = KeySeries::new(next_key, upper_bound)?;
        self.transaction(|txn| {
            txn.install_key_series(series);
            Ok(())
        })?;
        info!(next_key, upper_bound, "installed key series");
        Ok(())
    }

    /// Current key series, if one was installed.
    pub fn key_series(&self) -> Option<KeySeries> {
        self.state.read().key_series
    }

    /// Returns true if fewer than `threshold` keys remain.
    pub fn wants_keys(&self, threshold: u64) -> bool {
        keys::wants_keys(self.state.read().key_series.as_ref(), threshold)
    }
}

impl RowSource for DataStore {
    fn fetch_row(&self, table: &str, row: i64) -> Option<Row> {
        self.get(table, row).ok().flatten()
    }
}

/// Guard returned by [`DataStore::suspend_journaling`].
///
/// Holds the store's write lock. Journaling is restored when dropped, on
/// every exit path.
pub struct JournalingSuspended<'a> {
    store: &'a DataStore,
    state: RwLockWriteGuard<'a, StoreState>,
    previous: bool,
}

impl JournalingSuspended<'_> {
    /// Runs an unjournaled transaction.
    pub fn transaction<F, T>(&mut self, f: F) -> CoreResult<T>
    where
        F: FnOnce(&mut Transaction<'_>) -> CoreResult<T>,
    {
        self.store.run_transaction(&mut self.state, false, f)
    }

    /// Applies `operations` atomically without journaling them.
    pub fn apply_batch(&mut self, operations: &[StoreOperation]) -> CoreResult<()> {
        self.transaction(|txn| operations.iter().try_for_each(|op| txn.apply(op)))
    }
}

impl Drop for JournalingSuspended<'_> {
    fn drop(&mut self) {
        self.store.journaling.store(self.previous, Ordering::SeqCst);
        debug!("journaling resumed");
    }
}

/// A sync run in progress, returned by [`DataStore::try_begin_sync`].
///
/// Entries captured by [`SyncInFlight::snapshot`] are frozen until the
/// guard drops: later edits of the same rows append new entries instead of
/// compacting into entries the server is about to acknowledge.
pub struct SyncInFlight<'a> {
    store: &'a DataStore,
    frozen_below: Option<u64>,
    _running: MutexGuard<'a, ()>,
}

impl SyncInFlight<'_> {
    /// Reads anchor, open window and revisions and freezes the window.
    pub fn snapshot(&mut self) -> SyncSnapshot {
        let state = self.store.state.read();
        let bound = state
            .max_sequence()
            .map_or(state.anchor, |max| state.anchor.max(max + 1));
        self.store.journal.freeze(bound);
        self.frozen_below = Some(bound);
        DataStore::snapshot_of(&state)
    }

    /// Applies `operations` in one unjournaled transaction.
    ///
    /// Entries journaled after [`SyncInFlight::snapshot`] were not pushed;
    /// if the new anchor passed them they are renumbered to start at the
    /// anchor, in the same transaction.
    pub fn apply(&mut self, operations: &[StoreOperation]) -> CoreResult<()> {
        let frozen_below = self.frozen_below;
        self.store.suspend_journaling().transaction(|txn| {
            operations.iter().try_for_each(|op| txn.apply(op))?;
            if let Some(bound) = frozen_below {
                let moved = txn.state_mut().rebase_pending(bound);
                if moved > 0 {
                    debug!(
                        moved,
                        anchor = txn.anchor(),
                        "renumbered entries journaled during push"
                    );
                    txn.anchor_changed = true;
                }
            }
            Ok(())
        })
    }
}

impl Drop for SyncInFlight<'_> {
    fn drop(&mut self) {
        if self.frozen_below.is_some() {
            self.store.journal.thaw();
        }
    }
}
