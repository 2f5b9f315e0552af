//! # Burrow Engine
//!
//! The storage side of Burrow: the capability set the binding layer needs
//! from an ordered key-value engine, plus a compact engine that provides it.
//!
//! The binding layer (`burrow_core`) only ever talks to the traits in this
//! crate. Everything behind them - log format, version retention, directory
//! locking - is the engine's business.
//!
//! ## Boundary
//!
//! - [`Engine`] - open connection: point reads/writes, batch apply, factories
//! - [`EngineCursor`] - ordered, bidirectional, seekable cursor token
//! - [`EngineSnapshot`] - pinned point-in-time read view
//! - [`WriteBatchRep`] - batch token accumulating ordered operations
//!
//! ## Bundled engine
//!
//! - [`Db`] - multi-version ordered map persisted to an append-only log
//! - [`FileLog`] / [`MemoryLog`] - where that log lives
//!
//! ## Example
//!
//! ```rust
//! use burrow_engine::{Db, Engine, EngineOptions};
//!
//! let db = Db::open_in_memory(EngineOptions::default()).unwrap();
//! db.put(b"k", b"v").unwrap();
//! assert_eq!(db.get(b"k").unwrap(), Some(b"v".to_vec()));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod batch;
mod db;
mod dir;
mod error;
mod log;
mod options;
mod record;
mod storage;
mod traits;
mod versions;

pub use batch::{BatchOp, WriteBatchRep};
pub use db::{Db, PROPERTY_NUM_ENTRIES, PROPERTY_OPTIONS, PROPERTY_PINNED, PROPERTY_SEQUENCE};
pub use error::{EngineError, EngineResult};
pub use options::{EngineOptions, MAX_BLOOM_BITS_PER_KEY};
pub use storage::{FileLog, LogStorage, MemoryLog};
pub use traits::{Engine, EngineCursor, EngineSnapshot};

/// Sequence number stamped on every committed write.
///
/// Sequence `0` is the empty store; the first write gets `1`.
pub type Sequence = u64;
