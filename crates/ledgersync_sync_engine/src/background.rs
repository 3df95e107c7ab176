//! Running sync off the caller's thread.

use crate::auth::TokenProvider;
use crate::error::SyncResult;
use crate::state::{SyncEngine, SyncReport};
use crate::transport::SyncTransport;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::debug;

/// Runs one sync on tokio's blocking pool.
///
/// The push blocks on the network, so it never runs on a runtime worker
/// or on the caller's thread. Must be called from within a tokio runtime.
pub fn spawn_sync<T, P>(engine: Arc<SyncEngine<T, P>>) -> JoinHandle<SyncResult<SyncReport>>
where
    T: SyncTransport + 'static,
    P: TokenProvider + 'static,
{
    debug!("spawning background sync");
    tokio::task::spawn_blocking(move || engine.sync())
}

/// Like [`spawn_sync`], retrying transient failures per the engine's
/// retry configuration.
pub fn spawn_sync_with_retry<T, P>(
    engine: Arc<SyncEngine<T, P>>,
) -> JoinHandle<SyncResult<SyncReport>>
where
    T: SyncTransport + 'static,
    P: TokenProvider + 'static,
{
    debug!("spawning background sync with retry");
    tokio::task::spawn_blocking(move || engine.sync_with_retry())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::StaticTokenProvider;
    use crate::config::{RetryConfig, SyncConfig};
    use crate::state::SyncState;
    use crate::transport::{MockReply, MockTransport};
    use ledgersync_core::DataStore;
    use serde_json::json;
    use std::time::Duration;

    fn engine(retry: RetryConfig) -> Arc<SyncEngine<MockTransport, StaticTokenProvider>> {
        let store = DataStore::open_in_memory().unwrap();
        store.install_key_series(1, 10_000).unwrap();
        Arc::new(SyncEngine::new(
            SyncConfig::new("https://ledger.example.com").with_retry(retry),
            Arc::new(store),
            MockTransport::new(),
            StaticTokenProvider::new("token"),
        ))
    }

    #[tokio::test]
    async fn background_sync_completes() {
        let engine = engine(RetryConfig::no_retry());
        engine
            .transport()
            .enqueue(MockReply::json(&json!({"created": [], "updated": [], "deleted": [], "anchor": 4})));

        let report = spawn_sync(Arc::clone(&engine)).await.unwrap().unwrap();
        assert_eq!(report.new_anchor, 4);
        assert_eq!(engine.state(), SyncState::Synced);
    }

    #[tokio::test]
    async fn background_retry() {
        let engine = engine(
            RetryConfig::new(2)
                .with_initial_delay(Duration::from_millis(1))
                .with_jitter(false),
        );
        engine.transport().enqueue(MockReply::Timeout);
        engine
            .transport()
            .enqueue(MockReply::json(&json!({"created": [], "updated": [], "deleted": [], "anchor": 2})));

        let report = spawn_sync_with_retry(Arc::clone(&engine))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(report.new_anchor, 2);
        assert_eq!(engine.stats().retries, 1);
    }
}
