//! The engine boundary.

use crate::batch::WriteBatchRep;
use crate::error::EngineResult;
use crate::Sequence;

/// An open connection to an ordered key-value engine.
///
/// This is the whole capability set the binding layer relies on. Keys are
/// ordered by unsigned lexicographic byte comparison.
///
/// # Invariants
///
/// - Point operations are linearizable with respect to each other
/// - [`Engine::apply`] makes every operation of a batch visible at once, or none
/// - Cursors and snapshots never observe writes committed after their creation
/// - Every method except `close` fails with [`crate::EngineError::Closed`]
///   once the connection is closed
///
/// # Implementors
///
/// - [`crate::Db`] - the bundled engine
pub trait Engine: Send + Sync {
    /// Reads the current value of `key`. `Ok(None)` means no such key.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection is closed or the read fails.
    fn get(&self, key: &[u8]) -> EngineResult<Option<Vec<u8>>>;

    /// Inserts or overwrites `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection is closed or the write fails.
    fn put(&self, key: &[u8], value: &[u8]) -> EngineResult<()>;

    /// Removes `key`. Removing a missing key succeeds.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection is closed or the write fails.
    fn delete(&self, key: &[u8]) -> EngineResult<()>;

    /// Applies every operation of `batch` atomically, in append order.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection is closed or the write fails. On
    /// error no operation of the batch is visible.
    fn apply(&self, batch: &WriteBatchRep) -> EngineResult<()>;

    /// Opens a cursor over the data as of this call.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection is closed.
    fn cursor_open(&self) -> EngineResult<Box<dyn EngineCursor>>;

    /// Pins a read view of the data as of this call.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection is closed.
    fn snapshot(&self) -> EngineResult<Box<dyn EngineSnapshot>>;

    /// Reports an engine property, or `None` if the name is unknown.
    fn property(&self, name: &str) -> Option<String>;

    /// Releases the connection. Closing twice is a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error if final bookkeeping (log compaction, sync) fails.
    /// The connection is closed regardless.
    fn close(&self) -> EngineResult<()>;
}

/// A cursor token: ordered, bidirectional and seekable.
///
/// A fresh cursor is not positioned; `valid()` is false until one of the
/// seek methods is called.
pub trait EngineCursor: Send {
    /// Positions at the smallest key, or invalid if the view is empty.
    fn seek_to_first(&mut self);

    /// Positions at the largest key, or invalid if the view is empty.
    fn seek_to_last(&mut self);

    /// Positions at the smallest key `>= target`, or invalid if none.
    fn seek(&mut self, target: &[u8]);

    /// Moves to the next larger key, or invalid at the end.
    /// Does nothing while invalid.
    fn next(&mut self);

    /// Moves to the next smaller key, or invalid at the start.
    /// Does nothing while invalid.
    fn prev(&mut self);

    /// True while positioned on an entry.
    fn valid(&self) -> bool;

    /// Key at the current position.
    fn key(&self) -> Option<&[u8]>;

    /// Value at the current position.
    fn value(&self) -> Option<&[u8]>;
}

/// A pinned point-in-time view. Dropping it releases the pin.
pub trait EngineSnapshot: Send {
    /// Sequence number the view is pinned at.
    fn sequence(&self) -> Sequence;

    /// Reads `key` as of the pinned sequence.
    ///
    /// # Errors
    ///
    /// Returns an error if the read fails.
    fn get(&self, key: &[u8]) -> EngineResult<Option<Vec<u8>>>;

    /// Opens a cursor over the pinned view.
    fn cursor(&self) -> Box<dyn EngineCursor>;
}
