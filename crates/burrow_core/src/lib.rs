//! # Burrow Core
//!
//! Safe handles over an embedded, ordered, byte-keyed store.
//!
//! This crate provides:
//! - [`Store`] - owner of one engine connection: point reads and writes
//! - [`Cursor`] - ordered, bidirectional, seekable iteration over a frozen view
//! - [`WriteBatch`] - puts and deletes applied atomically, exactly once
//! - [`Snapshot`] - a caller-held frozen view for reads and cursors
//! - [`Options`] - how to open a store
//!
//! Every child resource is released when it is closed or dropped, in any
//! order. Closing a store with children still open closes them first; they
//! then report [`BurrowError::Closed`] instead of touching a dead
//! connection.
//!
//! ## Example
//!
//! ```rust
//! use burrow_core::{Options, Store};
//!
//! let dir = tempfile::tempdir()?;
//! let store = Store::open(dir.path().join("db"), Options::new().create_if_missing(true))?;
//!
//! let mut batch = store.write_batch()?;
//! batch.put(b"a", b"1")?;
//! batch.put(b"b", b"2")?;
//! batch.write()?;
//!
//! let mut cursor = store.cursor()?;
//! cursor.seek_to_first()?;
//! while cursor.is_valid() {
//!     let (key, value) = cursor.entry()?;
//!     println!("{key:?} = {value:?}");
//!     cursor.next()?;
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod batch;
mod cursor;
mod error;
mod options;
mod resource;
mod snapshot;
mod stats;
mod store;

pub use batch::{BatchState, WriteBatch};
pub use cursor::{Cursor, CursorState};
pub use error::{BurrowError, BurrowResult};
pub use options::Options;
pub use resource::Resource;
pub use snapshot::Snapshot;
pub use stats::StatsSnapshot;
pub use store::Store;

pub use burrow_engine::{
    Engine, EngineCursor, EngineError, EngineOptions, EngineResult, EngineSnapshot, WriteBatchRep,
    PROPERTY_NUM_ENTRIES, PROPERTY_OPTIONS, PROPERTY_PINNED, PROPERTY_SEQUENCE,
};
