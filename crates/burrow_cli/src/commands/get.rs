//! Get command implementation.

use super::{display_bytes, open_store};
use serde::Serialize;
use std::io::Write;
use std::path::Path;

/// Lookup result.
#[derive(Debug, Serialize)]
pub struct GetResult {
    /// Key that was looked up.
    pub key: String,
    /// Value, if the key is present.
    pub value: Option<String>,
}

/// Runs the get command.
///
/// A missing key prints `(not found)` in text mode and a null value in
/// JSON mode; neither is an error.
pub fn run(
    path: &Path,
    key: &[u8],
    format: &str,
    out: &mut impl Write,
) -> Result<(), Box<dyn std::error::Error>> {
    let store = open_store(path, false)?;
    let value = store.get(key)?;
    store.close()?;

    let result = GetResult {
        key: display_bytes(key),
        value: value.as_deref().map(display_bytes),
    };

    match format {
        "json" => writeln!(out, "{}", serde_json::to_string_pretty(&result)?)?,
        _ => match &result.value {
            Some(value) => writeln!(out, "{value}")?,
            None => writeln!(out, "(not found)")?,
        },
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::write::put;

    fn get(path: &Path, key: &[u8], format: &str) -> String {
        let mut out = Vec::new();
        run(path, key, format, &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn prints_value_or_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db");
        put(&path, b"k", b"v").unwrap();

        assert_eq!(get(&path, b"k", "text"), "v\n");
        assert_eq!(get(&path, b"nope", "text"), "(not found)\n");
    }

    #[test]
    fn json_output() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db");
        put(&path, b"k", b"v").unwrap();

        let parsed: serde_json::Value = serde_json::from_str(&get(&path, b"k", "json")).unwrap();
        assert_eq!(parsed["key"], "k");
        assert_eq!(parsed["value"], "v");

        let parsed: serde_json::Value =
            serde_json::from_str(&get(&path, b"nope", "json")).unwrap();
        assert!(parsed["value"].is_null());
    }
}
