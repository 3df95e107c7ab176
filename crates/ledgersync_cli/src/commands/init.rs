//! Init command implementation.

use ledgersync_core::DataStore;
use std::path::Path;

/// Parses a `name:col,col,...` table definition.
pub fn parse_table(definition: &str) -> Result<(String, Vec<String>), String> {
    let (name, columns) = definition
        .split_once(':')
        .ok_or_else(|| format!("expected name:col,col,... but got {definition:?}"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("missing table name in {definition:?}"));
    }
    let columns: Vec<String> = columns
        .split(',')
        .map(str::trim)
        .filter(|column| !column.is_empty())
        .map(String::from)
        .collect();
    if columns.is_empty() {
        return Err(format!("table {name:?} has no columns"));
    }
    Ok((name.to_string(), columns))
}

/// Runs the init command.
pub fn run(path: &Path, definitions: &[String]) -> Result<(), Box<dyn std::error::Error>> {
    let tables = definitions
        .iter()
        .map(|definition| parse_table(definition))
        .collect::<Result<Vec<_>, _>>()?;

    let store = DataStore::open_file(path)?;
    for (name, columns) in &tables {
        let columns: Vec<&str> = columns.iter().map(String::as_str).collect();
        store.define_table(name, &columns)?;
        println!("Defined table {} ({})", name, columns.join(", "));
    }
    store.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_definitions() {
        let (name, columns) = parse_table("entries: caption, value ,category").unwrap();
        assert_eq!(name, "entries");
        assert_eq!(columns, vec!["caption", "value", "category"]);
    }

    #[test]
    fn rejects_bad_definitions() {
        assert!(parse_table("entries").is_err());
        assert!(parse_table(":caption").is_err());
        assert!(parse_table("entries:").is_err());
    }

    #[test]
    fn init_creates_store() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.lsyn");
        run(&path, &["entries:caption,value".to_string()]).unwrap();

        let store = DataStore::open_file(&path).unwrap();
        let tables = store.tables();
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].columns, vec!["caption", "value"]);
    }
}
