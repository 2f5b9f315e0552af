//! CLI command implementations.

pub mod get;
pub mod scan;
pub mod stats;
pub mod write;

use burrow_core::{BurrowResult, Options, Store};
use std::path::Path;
use tracing::debug;

/// Opens the store at `path`. Only writes may create it.
pub fn open_store(path: &Path, create: bool) -> BurrowResult<Store> {
    debug!(?path, create, "opening store");
    Store::open(path, Options::new().create_if_missing(create))
}

/// Renders bytes for a terminal: printable ASCII as is, the rest escaped.
pub fn display_bytes(bytes: &[u8]) -> String {
    bytes.escape_ascii().to_string()
}
