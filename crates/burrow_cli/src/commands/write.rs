//! Put and delete commands.

use super::{display_bytes, open_store};
use std::path::Path;
use tracing::info;

/// Stores `value` under `key`, creating the store if needed.
pub fn put(path: &Path, key: &[u8], value: &[u8]) -> Result<(), Box<dyn std::error::Error>> {
    let store = open_store(path, true)?;
    store.put(key, value)?;
    store.close()?;
    info!("Stored {} ({} bytes)", display_bytes(key), value.len());
    Ok(())
}

/// Removes `key`. Removing a missing key is not an error.
pub fn delete(path: &Path, key: &[u8]) -> Result<(), Box<dyn std::error::Error>> {
    let store = open_store(path, false)?;
    store.delete(key)?;
    store.close()?;
    info!("Deleted {}", display_bytes(key));
    Ok(())
}
