//! Marshal command implementation.

use super::open_existing;
use ledgersync_core::DataStore;
use ledgersync_sync_protocol::{marshal, MarshalOutput};
use std::path::Path;
use tracing::info;

/// Builds the payload a push would send now.
pub fn preview(store: &DataStore) -> MarshalOutput {
    let snapshot = store.sync_snapshot();
    marshal(&snapshot.journal, &snapshot.revisions, store, snapshot.anchor)
}

/// Runs the marshal command.
pub fn run(path: &Path, compact: bool) -> Result<(), Box<dyn std::error::Error>> {
    let store = open_existing(path)?;
    let output = preview(&store);
    info!(
        creates = output.stats.num_creates,
        updates = output.stats.num_updates,
        deletes = output.stats.num_deletes,
        skipped = output.stats.skipped_entries,
        "marshalled open window"
    );

    let json = output.payload.to_json()?;
    if compact {
        println!("{}", serde_json::to_string(&json)?);
    } else {
        println!("{}", serde_json::to_string_pretty(&json)?);
    }
    Ok(())
}
