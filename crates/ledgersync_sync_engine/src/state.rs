//! Sync engine state machine.

use crate::auth::{AuthError, TokenProvider};
use crate::config::SyncConfig;
use crate::error::{SyncError, SyncResult};
use crate::transport::SyncTransport;
use ledgersync_core::{DataStore, JournalOperation, StoreOperation, SyncInFlight, SyncSnapshot};
use ledgersync_sync_protocol::{marshal, unmarshal_slice, MarshalStats, UnmarshalStats};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// The current state of the sync engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    /// Engine is idle, not syncing.
    Idle,
    /// Waiting for a bearer credential.
    AcquiringToken,
    /// Reading anchor, journal window and revisions.
    Snapshotting,
    /// Building the push payload.
    Marshalling,
    /// Waiting for the server's reply.
    Pushing,
    /// Parsing the server's reply.
    Unmarshalling,
    /// Applying acknowledgements and server changes.
    Applying,
    /// Engine has completed a sync cycle.
    Synced,
    /// Engine encountered an error.
    Error,
    /// Engine is waiting before retrying.
    RetryWait,
}

impl SyncState {
    /// Returns true if the engine is in an active sync state.
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            SyncState::AcquiringToken
                | SyncState::Snapshotting
                | SyncState::Marshalling
                | SyncState::Pushing
                | SyncState::Unmarshalling
                | SyncState::Applying
        )
    }

    /// Returns true if the engine can start a new sync.
    pub fn can_start_sync(&self) -> bool {
        matches!(
            self,
            SyncState::Idle | SyncState::Synced | SyncState::Error | SyncState::RetryWait
        )
    }
}

/// Cumulative statistics about sync runs.
#[derive(Debug, Clone, Default)]
pub struct SyncStats {
    /// Total number of sync cycles completed.
    pub cycles_completed: u64,
    /// Transport, timeout and token store failures.
    pub io_errors: u64,
    /// Credential failures.
    pub auth_errors: u64,
    /// Malformed reply fields and records.
    pub parse_exceptions: u64,
    /// Journal entries and reply records that were skipped.
    pub skipped_entries: u64,
    /// Rows inserted from server replies.
    pub inserts: u64,
    /// Fields updated from server replies.
    pub updates: u64,
    /// Rows deleted from server replies.
    pub deletes: u64,
    /// Failed apply transactions.
    pub database_errors: u64,
    /// Total number of retries.
    pub retries: u64,
    /// Set when the server rejected the credential; cleared by the next
    /// successful run.
    pub full_sync_requested: bool,
    /// Last sync time.
    pub last_sync_time: Option<Instant>,
    /// Last error message.
    pub last_error: Option<String>,
}

/// Result of one successful sync run.
#[derive(Debug, Clone)]
pub struct SyncReport {
    /// What was pushed.
    pub marshal: MarshalStats,
    /// What came back.
    pub unmarshal: UnmarshalStats,
    /// Anchor before the run.
    pub previous_anchor: u64,
    /// Anchor returned by the server.
    pub new_anchor: u64,
    /// Operations in the apply transaction, acknowledgements included.
    pub applied_operations: usize,
    /// Whether a new key series was installed.
    pub keys_refilled: bool,
    /// Whether this run answered a full resync request.
    pub full_sync: bool,
    /// Duration of the sync run.
    pub duration: Duration,
}

/// The sync engine pushes the local journal window and applies the reply.
///
/// Everything before Apply is read-only with respect to the store, so any
/// failure up to that point can be retried and produces the same payload.
pub struct SyncEngine<T: SyncTransport, P: TokenProvider> {
    config: SyncConfig,
    store: Arc<DataStore>,
    transport: T,
    tokens: P,
    state: RwLock<SyncState>,
    stats: RwLock<SyncStats>,
    cancelled: AtomicBool,
}

impl<T: SyncTransport, P: TokenProvider> SyncEngine<T, P> {
    /// Creates a new sync engine.
    pub fn new(config: SyncConfig, store: Arc<DataStore>, transport: T, tokens: P) -> Self {
        Self {
            config,
            store,
            transport,
            tokens,
            state: RwLock::new(SyncState::Idle),
            stats: RwLock::new(SyncStats::default()),
            cancelled: AtomicBool::new(false),
        }
    }

    /// Gets the current state.
    pub fn state(&self) -> SyncState {
        *self.state.read()
    }

    /// Gets the current stats.
    pub fn stats(&self) -> SyncStats {
        self.stats.read().clone()
    }

    /// The engine's configuration.
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// The local store.
    pub fn store(&self) -> &Arc<DataStore> {
        &self.store
    }

    /// The transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// The token provider.
    pub fn tokens(&self) -> &P {
        &self.tokens
    }

    /// Cancels an ongoing sync run.
    ///
    /// Honored at every step boundary before Apply. Once Apply has begun
    /// the run completes or rolls back.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Resets the cancelled flag.
    pub fn reset_cancel(&self) {
        self.cancelled.store(false, Ordering::SeqCst);
    }

    fn check_cancelled(&self) -> SyncResult<()> {
        if self.cancelled.load(Ordering::SeqCst) {
            Err(SyncError::Cancelled)
        } else {
            Ok(())
        }
    }

    fn set_state(&self, state: SyncState) {
        debug!(from = ?self.state(), to = ?state, "sync state transition");
        *self.state.write() = state;
    }

    /// Performs one sync run.
    ///
    /// Fails with [`SyncError::AlreadyRunning`] if another run is in
    /// flight on the same store, from this engine or any other.
    pub fn sync(&self) -> SyncResult<SyncReport> {
        let Some(mut flight) = self.store.try_begin_sync() else {
            return Err(SyncError::AlreadyRunning);
        };
        self.reset_cancel();

        if !self.state().can_start_sync() {
            return Err(SyncError::InvalidStateTransition {
                from: format!("{:?}", self.state()),
                to: "sync".into(),
            });
        }

        match self.run(&mut flight) {
            Ok(report) => Ok(report),
            Err(SyncError::Cancelled) => {
                info!("sync cancelled");
                self.set_state(SyncState::Idle);
                Err(SyncError::Cancelled)
            }
            Err(e) => {
                self.handle_error(&e);
                Err(e)
            }
        }
    }

    /// Performs a sync with retry on transient errors.
    ///
    /// A rejected credential is retried immediately with a fresh token.
    pub fn sync_with_retry(&self) -> SyncResult<SyncReport> {
        let retry_config = &self.config.retry;
        let mut last_error = None;

        for attempt in 0..retry_config.max_attempts {
            if attempt > 0 {
                if !matches!(last_error, Some(SyncError::Unauthorized)) {
                    self.set_state(SyncState::RetryWait);
                    std::thread::sleep(retry_config.delay_for_attempt(attempt));
                }
                self.stats.write().retries += 1;
            }

            self.check_cancelled()?;

            match self.sync() {
                Ok(report) => return Ok(report),
                Err(e) => {
                    if e.is_retryable() && attempt + 1 < retry_config.max_attempts {
                        debug!(attempt, error = %e, "sync attempt failed, retrying");
                        last_error = Some(e);
                        continue;
                    }
                    return Err(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| SyncError::Protocol("no sync attempts made".into())))
    }

    fn run(&self, flight: &mut SyncInFlight<'_>) -> SyncResult<SyncReport> {
        let start = Instant::now();
        let full_sync = self.stats.read().full_sync_requested;

        self.set_state(SyncState::AcquiringToken);
        let token = self.acquire_token()?;
        self.check_cancelled()?;

        self.set_state(SyncState::Snapshotting);
        let snapshot = flight.snapshot();
        self.check_cancelled()?;

        self.set_state(SyncState::Marshalling);
        let marshalled = marshal(
            &snapshot.journal,
            &snapshot.revisions,
            &*self.store,
            snapshot.anchor,
        );
        self.stats.write().skipped_entries += marshalled.stats.skipped_entries;
        let body = marshalled
            .payload
            .to_bytes()
            .map_err(|e| SyncError::Protocol(e.to_string()))?;
        self.check_cancelled()?;

        self.set_state(SyncState::Pushing);
        debug!(
            anchor = snapshot.anchor,
            records = marshalled.payload.len(),
            bytes = body.len(),
            "pushing journal window"
        );
        let reply = match self.transport.push(&token, &body) {
            Ok(reply) => reply,
            Err(SyncError::Unauthorized) => {
                warn!("server rejected the credential, full resync requested");
                self.tokens.invalidate_token(&token);
                self.stats.write().full_sync_requested = true;
                return Err(SyncError::Unauthorized);
            }
            Err(e) => {
                if e.is_io() {
                    self.stats.write().io_errors += 1;
                }
                return Err(e);
            }
        };
        self.check_cancelled()?;

        self.set_state(SyncState::Unmarshalling);
        let reply = unmarshal_slice(&reply).map_err(|e| {
            self.stats.write().parse_exceptions += 1;
            SyncError::Protocol(e.to_string())
        })?;
        {
            let mut stats = self.stats.write();
            stats.parse_exceptions += reply.stats.parse_exceptions;
            stats.skipped_entries += reply.stats.skipped_entries;
        }
        let new_anchor = reply
            .anchor
            .ok_or_else(|| SyncError::Protocol("reply carries no anchor".into()))?;
        self.check_cancelled()?;

        self.set_state(SyncState::Applying);
        let mut operations = acknowledgements(&snapshot);
        operations.extend(reply.operations);
        operations.push(StoreOperation::SetAnchor { anchor: new_anchor });

        if let Err(e) = flight.apply(&operations) {
            self.stats.write().database_errors += 1;
            warn!(error = %e, operations = operations.len(), "apply failed, rolled back");
            return Err(SyncError::Database(e));
        }
        info!(
            previous_anchor = snapshot.anchor,
            new_anchor,
            operations = operations.len(),
            "applied sync reply"
        );

        let keys_refilled = self.refill_keys(&token);

        let report = SyncReport {
            marshal: marshalled.stats,
            unmarshal: reply.stats,
            previous_anchor: snapshot.anchor,
            new_anchor,
            applied_operations: operations.len(),
            keys_refilled,
            full_sync,
            duration: start.elapsed(),
        };

        self.set_state(SyncState::Synced);
        {
            let mut stats = self.stats.write();
            stats.cycles_completed += 1;
            stats.inserts += report.unmarshal.num_inserts;
            stats.updates += report.unmarshal.num_updates;
            stats.deletes += report.unmarshal.num_deletes;
            stats.full_sync_requested = false;
            stats.last_sync_time = Some(Instant::now());
            stats.last_error = None;
        }

        Ok(report)
    }

    fn acquire_token(&self) -> SyncResult<String> {
        self.tokens.get_token().map_err(|e| match e {
            AuthError::Cancelled => SyncError::Cancelled,
            AuthError::Failed(message) => {
                self.stats.write().auth_errors += 1;
                SyncError::AuthenticationFailed(message)
            }
            AuthError::Io(message) => {
                self.stats.write().io_errors += 1;
                SyncError::TokenIo(message)
            }
        })
    }

    /// Requests a new key series if the store is running low.
    ///
    /// The sync run has already committed, so failures are only counted.
    fn refill_keys(&self, token: &str) -> bool {
        if !self.store.wants_keys(self.config.key_refill_threshold) {
            return false;
        }
        let installed = self
            .transport
            .request_key_series(token)
            .and_then(|reply| {
                self.store
                    .install_key_series(reply.next_key, reply.upper_bound)
                    .map_err(SyncError::from)
            });
        match installed {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "key series refill failed");
                self.stats.write().io_errors += 1;
                false
            }
        }
    }

    fn handle_error(&self, error: &SyncError) {
        warn!(error = %error, "sync failed");
        self.set_state(SyncState::Error);
        self.stats.write().last_error = Some(error.to_string());
    }
}

/// Revision bumps for every field that was just pushed.
///
/// Created rows acknowledge every column they had; updated rows only the
/// columns that changed. A pushed delete is acknowledged by dropping the
/// row's revisions. Ordered before the server's operations so that a
/// server-supplied revision wins.
fn acknowledgements(snapshot: &SyncSnapshot) -> Vec<StoreOperation> {
    let mut operations = Vec::new();
    let mut acknowledge = |table: &str, row: i64, column: &str, revision: u32| {
        operations.push(StoreOperation::SetRevision {
            table: table.to_string(),
            row,
            column: column.to_string(),
            revision: revision.saturating_add(1),
        });
    };

    for (table, rows) in snapshot.journal.agenda(JournalOperation::Create) {
        for &row in rows {
            if let Ok(revisions) = snapshot.revisions.revisions_of_row(table, row) {
                for (column, &revision) in revisions {
                    acknowledge(table.as_str(), row, column.as_str(), revision);
                }
            }
        }
    }

    for (table, rows) in snapshot.journal.agenda(JournalOperation::Update) {
        for &row in rows {
            let Some(columns) = snapshot.journal.changed_columns(table, row) else {
                continue;
            };
            for column in columns {
                if let Ok(revision) = snapshot.revisions.revision_of(table, row, column) {
                    acknowledge(table.as_str(), row, column.as_str(), revision);
                }
            }
        }
    }

    // Last, so bumps for the same row above do not outlive it.
    for (table, rows) in snapshot.journal.agenda(JournalOperation::Delete) {
        for &row in rows {
            operations.push(StoreOperation::DeleteRow {
                table: table.clone(),
                row,
            });
        }
    }

    operations
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::StaticTokenProvider;
    use crate::transport::{MockReply, MockTransport};
    use ledgersync_core::row;
    use serde_json::json;

    fn engine() -> SyncEngine<MockTransport, StaticTokenProvider> {
        let store = DataStore::open_in_memory().unwrap();
        store.define_table("entries", &["caption", "value"]).unwrap();
        store.install_key_series(1, 10_000).unwrap();
        SyncEngine::new(
            SyncConfig::new("https://ledger.example.com"),
            Arc::new(store),
            MockTransport::new(),
            StaticTokenProvider::new("token"),
        )
    }

    fn empty_reply(anchor: u64) -> MockReply {
        MockReply::json(&json!({"created": [], "updated": [], "deleted": [], "anchor": anchor}))
    }

    #[test]
    fn sync_state_checks() {
        assert!(SyncState::Idle.can_start_sync());
        assert!(SyncState::Synced.can_start_sync());
        assert!(SyncState::Error.can_start_sync());
        assert!(!SyncState::Pushing.can_start_sync());
        assert!(!SyncState::Applying.can_start_sync());

        assert!(SyncState::Pushing.is_active());
        assert!(SyncState::AcquiringToken.is_active());
        assert!(!SyncState::Idle.is_active());
        assert!(!SyncState::RetryWait.is_active());
    }

    #[test]
    fn sync_engine_initial_state() {
        let engine = engine();
        assert_eq!(engine.state(), SyncState::Idle);
        assert_eq!(engine.stats().cycles_completed, 0);
    }

    #[test]
    fn successful_sync_acknowledges_and_advances_anchor() {
        let engine = engine();
        engine
            .store()
            .insert_with_id("entries", 5, row! { "caption" => "coffee", "value" => -300 })
            .unwrap();
        engine.transport().enqueue(empty_reply(3));

        let report = engine.sync().unwrap();
        assert_eq!(report.marshal.num_creates, 1);
        assert_eq!(report.previous_anchor, 0);
        assert_eq!(report.new_anchor, 3);
        assert_eq!(engine.state(), SyncState::Synced);
        assert_eq!(engine.stats().cycles_completed, 1);

        let store = engine.store();
        assert_eq!(store.anchor(), 3);
        assert!(store.open_window().is_empty());
        let revisions = store.revision_snapshot();
        assert_eq!(revisions.revision_of("entries", 5, "caption").unwrap(), 1);
        assert_eq!(revisions.revision_of("entries", 5, "value").unwrap(), 1);
    }

    #[test]
    fn acknowledgements_cover_pushed_fields() {
        let store = DataStore::open_in_memory().unwrap();
        store.define_table("entries", &["caption", "value"]).unwrap();
        store.insert_with_id("entries", 1, row! {}).unwrap();
        store.insert_with_id("entries", 2, row! {}).unwrap();
        store.set_anchor(2).unwrap();
        store.update("entries", 1, row! { "value" => 10 }).unwrap();
        store.insert_with_id("entries", 3, row! {}).unwrap();

        let operations = acknowledgements(&store.sync_snapshot());
        let acknowledged: Vec<_> = operations
            .iter()
            .map(|op| match op {
                StoreOperation::SetRevision {
                    row,
                    column,
                    revision,
                    ..
                } => (*row, column.as_str(), *revision),
                other => panic!("unexpected {other:?}"),
            })
            .collect();
        assert_eq!(
            acknowledged,
            vec![(3, "caption", 1), (3, "value", 1), (1, "value", 1)]
        );
    }

    #[test]
    fn pushed_delete_is_acknowledged_by_dropping_revisions() {
        let store = DataStore::open_in_memory().unwrap();
        store.define_table("entries", &["caption", "value"]).unwrap();
        store.insert_with_id("entries", 1, row! {}).unwrap();
        store.set_anchor(1).unwrap();
        store.delete("entries", 1).unwrap();

        let operations = acknowledgements(&store.sync_snapshot());
        assert_eq!(
            operations,
            vec![StoreOperation::DeleteRow {
                table: "entries".into(),
                row: 1,
            }]
        );
    }

    #[test]
    fn synced_delete_leaves_no_revisions() {
        let engine = engine();
        let store = engine.store();
        store.insert_with_id("entries", 1, row! { "value" => 1 }).unwrap();
        store.set_anchor(1).unwrap();
        store.delete("entries", 1).unwrap();
        engine.transport().enqueue(empty_reply(2));

        engine.sync().unwrap();
        assert!(store
            .revision_snapshot()
            .revisions_of_row("entries", 1)
            .unwrap_err()
            .is_not_found());
        assert!(store.revision_snapshot().is_empty());
        assert!(store.open_window().is_empty());
    }

    #[test]
    fn second_engine_on_same_store_is_refused() {
        let engine = engine();
        let other = SyncEngine::new(
            SyncConfig::new("https://ledger.example.com"),
            Arc::clone(engine.store()),
            MockTransport::new(),
            StaticTokenProvider::new("token"),
        );

        let flight = engine.store().try_begin_sync();
        assert!(flight.is_some());
        assert!(matches!(other.sync(), Err(SyncError::AlreadyRunning)));
        assert!(other.transport().pushed().is_empty());
        drop(flight);

        other.transport().enqueue(empty_reply(0));
        other.sync().unwrap();
    }

    #[test]
    fn push_failure_leaves_store_untouched() {
        let engine = engine();
        engine.store().insert_with_id("entries", 1, row! {}).unwrap();
        engine.transport().enqueue(MockReply::Timeout);

        let err = engine.sync().unwrap_err();
        assert!(matches!(err, SyncError::Timeout));
        assert_eq!(engine.state(), SyncState::Error);
        assert_eq!(engine.stats().io_errors, 1);
        assert!(engine.stats().last_error.is_some());
        assert_eq!(engine.store().anchor(), 0);
        assert_eq!(engine.store().open_window().len(), 1);
    }

    #[test]
    fn unauthorized_invalidates_token() {
        let engine = engine();
        engine.transport().enqueue(MockReply::Unauthorized);

        assert!(matches!(engine.sync(), Err(SyncError::Unauthorized)));
        assert_eq!(engine.tokens().invalidations(), 1);
        assert!(engine.stats().full_sync_requested);
        assert_eq!(engine.stats().io_errors, 0);

        engine.transport().enqueue(empty_reply(1));
        let report = engine.sync().unwrap();
        assert!(report.full_sync);
        assert!(!engine.stats().full_sync_requested);
    }

    #[test]
    fn token_failures_are_classified() {
        let engine = engine();
        engine.tokens().set_token_error(AuthError::Failed("no account".into()));
        assert!(matches!(
            engine.sync(),
            Err(SyncError::AuthenticationFailed(_))
        ));
        assert_eq!(engine.stats().auth_errors, 1);

        engine.tokens().set_token_error(AuthError::Io("keystore locked".into()));
        assert!(matches!(engine.sync(), Err(SyncError::TokenIo(_))));
        assert_eq!(engine.stats().io_errors, 1);

        engine.tokens().set_token_error(AuthError::Cancelled);
        assert!(matches!(engine.sync(), Err(SyncError::Cancelled)));
        assert_eq!(engine.state(), SyncState::Idle);
        assert_eq!(engine.transport().push_count(), 0);
    }

    #[test]
    fn missing_anchor_aborts_before_apply() {
        let engine = engine();
        engine.store().insert_with_id("entries", 1, row! {}).unwrap();
        engine
            .transport()
            .enqueue(MockReply::json(&json!({"created": [], "updated": [], "deleted": []})));

        assert!(matches!(engine.sync(), Err(SyncError::Protocol(_))));
        assert_eq!(engine.stats().parse_exceptions, 1);
        assert_eq!(
            engine
                .store()
                .revision_snapshot()
                .revision_of("entries", 1, "value")
                .unwrap(),
            0
        );
    }

    #[test]
    fn non_json_reply_is_a_protocol_error() {
        let engine = engine();
        engine.transport().enqueue(MockReply::Body(b"<html>".to_vec()));
        assert!(matches!(engine.sync(), Err(SyncError::Protocol(_))));
        assert_eq!(engine.stats().parse_exceptions, 1);
    }

    #[test]
    fn retry_recovers_from_transient_failure() {
        let store = DataStore::open_in_memory().unwrap();
        store.install_key_series(1, 10_000).unwrap();
        let engine = SyncEngine::new(
            SyncConfig::new("https://ledger.example.com").with_retry(
                crate::config::RetryConfig::new(3)
                    .with_initial_delay(Duration::from_millis(1))
                    .with_jitter(false),
            ),
            Arc::new(store),
            MockTransport::new(),
            StaticTokenProvider::new("token"),
        );
        engine
            .transport()
            .enqueue(MockReply::Transport("connection reset".into()));
        engine.transport().enqueue(MockReply::Status(503));
        engine.transport().enqueue(empty_reply(9));

        let report = engine.sync_with_retry().unwrap();
        assert_eq!(report.new_anchor, 9);
        assert_eq!(engine.stats().retries, 2);
        assert_eq!(engine.stats().io_errors, 2);
        assert_eq!(engine.transport().push_count(), 3);
    }

    #[test]
    fn fatal_errors_are_not_retried() {
        let store = DataStore::open_in_memory().unwrap();
        store.install_key_series(1, 10_000).unwrap();
        let engine = SyncEngine::new(
            SyncConfig::new("https://ledger.example.com")
                .with_retry(crate::config::RetryConfig::new(3)),
            Arc::new(store),
            MockTransport::new(),
            StaticTokenProvider::new("token"),
        );
        engine.transport().enqueue(MockReply::Status(400));

        assert!(matches!(
            engine.sync_with_retry(),
            Err(SyncError::ServerStatus { status: 400 })
        ));
        assert_eq!(engine.transport().push_count(), 1);
        assert_eq!(engine.stats().retries, 0);
    }

    #[test]
    fn key_series_is_refilled_after_sync() {
        let engine = engine();
        engine.store().install_key_series(1, 10).unwrap();
        engine.transport().enqueue(empty_reply(1));
        engine
            .transport()
            .enqueue_keys(MockReply::json(&json!({"next_key": 1000, "upper_bound": 1999})));

        let report = engine.sync().unwrap();
        assert!(report.keys_refilled);
        let series = engine.store().key_series().unwrap();
        assert_eq!(series.next_key, 1000);
        assert_eq!(series.upper_bound, 1999);
    }

    #[test]
    fn failed_key_refill_does_not_fail_sync() {
        let engine = engine();
        engine.store().install_key_series(1, 10).unwrap();
        engine.transport().enqueue(empty_reply(1));
        engine.transport().enqueue_keys(MockReply::Status(500));

        let report = engine.sync().unwrap();
        assert!(!report.keys_refilled);
        assert_eq!(engine.stats().io_errors, 1);
        assert_eq!(engine.store().anchor(), 1);
    }

    #[test]
    fn cancel_flag() {
        let engine = engine();
        assert!(!engine.cancelled.load(Ordering::SeqCst));
        engine.cancel();
        assert!(engine.cancelled.load(Ordering::SeqCst));
        engine.reset_cancel();
        assert!(!engine.cancelled.load(Ordering::SeqCst));
    }
}
