//! Dump journal command implementation.

use super::open_existing;
use ledgersync_core::{DataStore, JournalEntry};
use std::path::Path;

/// Selects the entries to dump.
pub fn select_entries(store: &DataStore, all: bool, limit: Option<usize>) -> Vec<JournalEntry> {
    let entries = if all {
        store.journal_entries()
    } else {
        store.open_window()
    };
    entries.into_iter().take(limit.unwrap_or(usize::MAX)).collect()
}

/// Runs the dump-journal command.
pub fn run(
    path: &Path,
    all: bool,
    limit: Option<usize>,
    format: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let store = open_existing(path)?;
    let entries = select_entries(&store, all, limit);

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&entries)?);
        }
        _ => {
            print_text_output(&entries, store.anchor());
        }
    }

    Ok(())
}

fn print_text_output(entries: &[JournalEntry], anchor: u64) {
    println!("Journal Entries ({} total, anchor {})", entries.len(), anchor);
    println!("================");
    println!();

    for entry in entries {
        let marker = if entry.sequence < anchor { "acked" } else { "open" };
        print!(
            "[{:08}] {:6} {:5} {}#{}",
            entry.sequence, entry.operation, marker, entry.table, entry.row
        );
        if let Some(ref column) = entry.column {
            print!(".{}", column);
        }
        println!();
    }
}
