//! Stats command implementation.

use super::open_store;
use burrow_core::{PROPERTY_NUM_ENTRIES, PROPERTY_OPTIONS, PROPERTY_SEQUENCE};
use serde::Serialize;
use std::io::Write;
use std::path::Path;

/// Store summary.
#[derive(Debug, Serialize)]
pub struct StatsResult {
    /// Store path.
    pub path: String,
    /// Number of live keys.
    pub entries: u64,
    /// Last committed sequence number.
    pub sequence: u64,
    /// Engine options in effect.
    pub options: String,
}

/// Runs the stats command.
pub fn run(
    path: &Path,
    format: &str,
    out: &mut impl Write,
) -> Result<(), Box<dyn std::error::Error>> {
    let store = open_store(path, false)?;
    let number = |name: &str| -> Result<u64, Box<dyn std::error::Error>> {
        Ok(store.property(name)?.unwrap_or_default().parse().unwrap_or(0))
    };

    let result = StatsResult {
        path: path.display().to_string(),
        entries: number(PROPERTY_NUM_ENTRIES)?,
        sequence: number(PROPERTY_SEQUENCE)?,
        options: store.property(PROPERTY_OPTIONS)?.unwrap_or_default(),
    };
    store.close()?;

    match format {
        "json" => writeln!(out, "{}", serde_json::to_string_pretty(&result)?)?,
        _ => {
            writeln!(out, "Burrow Store Statistics")?;
            writeln!(out, "=======================")?;
            writeln!(out)?;
            writeln!(out, "Path:     {}", result.path)?;
            writeln!(out, "Entries:  {}", result.entries)?;
            writeln!(out, "Sequence: {}", result.sequence)?;
            writeln!(out, "Options:  {}", result.options)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::write::{delete, put};

    #[test]
    fn counts_live_entries() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db");
        put(&path, b"a", b"1").unwrap();
        put(&path, b"b", b"2").unwrap();
        delete(&path, b"a").unwrap();

        let mut out = Vec::new();
        run(&path, "json", &mut out).unwrap();
        let parsed: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(parsed["entries"], 1);
        assert!(parsed["sequence"].as_u64().unwrap() >= 3);
    }

    #[test]
    fn text_output_has_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db");
        put(&path, b"a", b"1").unwrap();

        let mut out = Vec::new();
        run(&path, "text", &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("Burrow Store Statistics"));
        assert!(text.contains("Entries:  1"));
    }
}
