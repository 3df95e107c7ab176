//! Install-keys command implementation.

use super::open_existing;
use std::path::Path;

/// Runs the install-keys command.
pub fn run(path: &Path, next: i64, upper: i64) -> Result<(), Box<dyn std::error::Error>> {
    let store = open_existing(path)?;
    store.install_key_series(next, upper)?;
    store.flush()?;
    println!("Installed key series {}..={}", next, upper);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledgersync_core::DataStore;

    #[test]
    fn installs_and_rejects() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.lsyn");
        DataStore::open_file(&path).unwrap().flush().unwrap();

        run(&path, 100, 199).unwrap();
        assert!(run(&path, 10, 5).is_err());

        let series = DataStore::open_file(&path).unwrap().key_series().unwrap();
        assert_eq!((series.next_key, series.upper_bound), (100, 199));
    }
}
