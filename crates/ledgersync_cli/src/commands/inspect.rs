//! Inspect command implementation.

use super::open_existing;
use ledgersync_core::DataStore;
use serde::Serialize;
use std::path::Path;

/// Store inspection result.
#[derive(Debug, Serialize)]
pub struct InspectResult {
    /// Store path.
    pub path: String,
    /// Persisted anchor.
    pub anchor: u64,
    /// Journal entries, acknowledged history included.
    pub journal_entries: usize,
    /// Entries with `sequence >= anchor`.
    pub open_window: usize,
    /// Revision records.
    pub revisions: usize,
    /// Row-id key series, if installed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_series: Option<KeySeriesInfo>,
    /// Per-table statistics.
    pub tables: Vec<TableStats>,
}

/// Key series state.
#[derive(Debug, Serialize)]
pub struct KeySeriesInfo {
    /// Next key to issue.
    pub next_key: i64,
    /// Last key (inclusive).
    pub upper_bound: i64,
    /// Keys left.
    pub remaining: u64,
}

/// Statistics for a single table.
#[derive(Debug, Serialize)]
pub struct TableStats {
    /// Table name.
    pub name: String,
    /// Column names.
    pub columns: Vec<String>,
    /// Number of rows.
    pub rows: usize,
}

/// Collects statistics for `store`.
pub fn inspect(path: &Path, store: &DataStore) -> Result<InspectResult, Box<dyn std::error::Error>> {
    let tables = store
        .tables()
        .into_iter()
        .map(|schema| {
            let rows = store.rows(&schema.name)?.len();
            Ok(TableStats {
                name: schema.name,
                columns: schema.columns,
                rows,
            })
        })
        .collect::<Result<Vec<_>, ledgersync_core::CoreError>>()?;

    Ok(InspectResult {
        path: path.display().to_string(),
        anchor: store.anchor(),
        journal_entries: store.journal_entries().len(),
        open_window: store.open_window().len(),
        revisions: store.revision_snapshot().len(),
        key_series: store.key_series().map(|series| KeySeriesInfo {
            next_key: series.next_key,
            upper_bound: series.upper_bound,
            remaining: series.remaining(),
        }),
        tables,
    })
}

/// Runs the inspect command.
pub fn run(path: &Path, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let store = open_existing(path)?;
    let result = inspect(path, &store)?;

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        _ => {
            print_text_output(&result);
        }
    }

    Ok(())
}

fn print_text_output(result: &InspectResult) {
    println!("Store: {}", result.path);
    println!("================");
    println!("Anchor:          {}", result.anchor);
    println!("Journal entries: {}", result.journal_entries);
    println!("Open window:     {}", result.open_window);
    println!("Revisions:       {}", result.revisions);
    match &result.key_series {
        Some(keys) => println!(
            "Key series:      {}..={} ({} remaining)",
            keys.next_key, keys.upper_bound, keys.remaining
        ),
        None => println!("Key series:      none"),
    }
    println!();
    println!("Tables ({}):", result.tables.len());
    for table in &result.tables {
        println!(
            "  {:20} {:>8} rows  [{}]",
            table.name,
            table.rows,
            table.columns.join(", ")
        );
    }
}
