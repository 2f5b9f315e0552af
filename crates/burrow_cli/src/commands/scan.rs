//! Scan command implementation.

use super::{display_bytes, open_store};
use serde::Serialize;
use std::io::Write;
use std::path::Path;

/// What to scan.
#[derive(Debug, Default)]
pub struct ScanArgs {
    /// Start at the first key `>=` this one (forward) or the last key
    /// `<=` it (reverse).
    pub from: Option<Vec<u8>>,
    /// Walk from the largest key down.
    pub reverse: bool,
    /// Stop after this many entries.
    pub limit: Option<usize>,
}

/// One listed entry.
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct ScanEntry {
    /// Key, escaped for display.
    pub key: String,
    /// Value, escaped for display.
    pub value: String,
}

/// Runs the scan command.
pub fn run(
    path: &Path,
    args: &ScanArgs,
    format: &str,
    out: &mut impl Write,
) -> Result<(), Box<dyn std::error::Error>> {
    let store = open_store(path, false)?;
    let entries = collect(&store, args)?;
    store.close()?;

    match format {
        "json" => writeln!(out, "{}", serde_json::to_string_pretty(&entries)?)?,
        _ => {
            for entry in &entries {
                writeln!(out, "{} = {}", entry.key, entry.value)?;
            }
            writeln!(out, "({} entries)", entries.len())?;
        }
    }
    Ok(())
}

fn collect(
    store: &burrow_core::Store,
    args: &ScanArgs,
) -> burrow_core::BurrowResult<Vec<ScanEntry>> {
    let mut cursor = store.cursor()?;
    match (&args.from, args.reverse) {
        (None, false) => cursor.seek_to_first()?,
        (None, true) => cursor.seek_to_last()?,
        (Some(from), false) => cursor.seek(from)?,
        (Some(from), true) => {
            // Land on the last key <= from.
            cursor.seek(from)?;
            if !cursor.is_valid() {
                cursor.seek_to_last()?;
            } else if cursor.key()? != *from {
                cursor.prev()?;
            }
        }
    }

    let limit = args.limit.unwrap_or(usize::MAX);
    let mut entries = Vec::new();
    while cursor.is_valid() && entries.len() < limit {
        let (key, value) = cursor.entry()?;
        entries.push(ScanEntry {
            key: display_bytes(&key),
            value: display_bytes(&value),
        });
        if args.reverse {
            cursor.prev()?;
        } else {
            cursor.next()?;
        }
    }
    cursor.close();
    Ok(entries)
}
