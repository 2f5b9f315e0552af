//! Byte stores holding the engine's record log.
//!
//! Stores are opaque: they never interpret the records written to them.

mod file;
mod memory;

pub use file::FileLog;
pub use memory::MemoryLog;

use crate::error::EngineResult;

/// An append-only byte store for the record log.
///
/// # Invariants
///
/// - `append` returns the offset the data was written at
/// - `read_all` returns every byte appended since the last `truncate`/`rewrite`
/// - `rewrite` replaces the whole content atomically: a crash leaves either
///   the old or the new content, never a mix
pub trait LogStorage: Send {
    /// Reads the whole log.
    ///
    /// # Errors
    ///
    /// Returns an error if an I/O error occurs.
    fn read_all(&self) -> EngineResult<Vec<u8>>;

    /// Appends data at the end of the log and returns its offset.
    ///
    /// # Errors
    ///
    /// Returns an error if an I/O error occurs.
    fn append(&mut self, data: &[u8]) -> EngineResult<u64>;

    /// Makes every appended byte durable.
    ///
    /// # Errors
    ///
    /// Returns an error if the sync fails.
    fn sync(&mut self) -> EngineResult<()>;

    /// Returns the current size in bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the size cannot be determined.
    fn size(&self) -> EngineResult<u64>;

    /// Cuts the log back to `new_size` bytes. Used to drop a torn tail.
    ///
    /// # Errors
    ///
    /// Returns an error if `new_size` exceeds the current size or the
    /// truncation fails.
    fn truncate(&mut self, new_size: u64) -> EngineResult<()>;

    /// Replaces the whole log with `data`. Used by compaction.
    ///
    /// # Errors
    ///
    /// Returns an error if an I/O error occurs; the old content is kept.
    fn rewrite(&mut self, data: &[u8]) -> EngineResult<()>;
}
