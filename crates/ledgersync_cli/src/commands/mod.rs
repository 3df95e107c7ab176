//! CLI command implementations.

pub mod dump_journal;
pub mod init;
pub mod inspect;
pub mod install_keys;
pub mod marshal;
pub mod sync;

use ledgersync_core::DataStore;
use std::path::Path;

/// Opens an existing store file.
pub fn open_existing(path: &Path) -> Result<DataStore, Box<dyn std::error::Error>> {
    if !path.exists() {
        return Err(format!("No store found at {:?}", path).into());
    }
    Ok(DataStore::open_file(path)?)
}
