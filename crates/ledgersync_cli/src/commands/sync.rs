//! Sync command implementation.

use super::open_existing;
use ledgersync_sync_engine::{
    HttpTransport, ReqwestClient, RetryConfig, StaticTokenProvider, SyncConfig, SyncEngine,
};
use std::path::Path;
use std::sync::Arc;

/// Runs the sync command.
pub fn run(
    path: &Path,
    url: &str,
    token: &str,
    attempts: u32,
) -> Result<(), Box<dyn std::error::Error>> {
    let store = Arc::new(open_existing(path)?);
    let config = SyncConfig::new(url).with_retry(RetryConfig::new(attempts.max(1)));
    let transport = HttpTransport::new(&config, ReqwestClient::new(config.timeout)?);
    let engine = SyncEngine::new(config, store, transport, StaticTokenProvider::new(token));

    let report = engine.sync_with_retry()?;
    let stats = engine.stats();

    println!("Sync complete in {:?}", report.duration);
    println!("================");
    println!(
        "Pushed:   {} created, {} updated, {} deleted ({} skipped)",
        report.marshal.num_creates,
        report.marshal.num_updates,
        report.marshal.num_deletes,
        report.marshal.skipped_entries
    );
    println!(
        "Received: {} created, {} updated, {} deleted ({} skipped, {} parse errors)",
        report.unmarshal.num_inserts,
        report.unmarshal.num_updates,
        report.unmarshal.num_deletes,
        report.unmarshal.skipped_entries,
        report.unmarshal.parse_exceptions
    );
    println!("Anchor:   {} -> {}", report.previous_anchor, report.new_anchor);
    if report.keys_refilled {
        println!("Installed a new key series");
    }
    if stats.retries > 0 {
        println!("Retries:  {}", stats.retries);
    }
    Ok(())
}
