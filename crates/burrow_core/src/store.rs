//! Store handle.

use crate::batch::WriteBatch;
use crate::cursor::Cursor;
use crate::error::{BurrowError, BurrowResult};
use crate::options::Options;
use crate::resource::{Registry, Resource};
use crate::snapshot::Snapshot;
use crate::stats::{StatsSnapshot, StoreStats};
use burrow_engine::{Db, Engine, EngineResult};
use parking_lot::{Mutex, RwLock};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

/// State shared between a store and the children it hands out.
///
/// Children keep a `Weak` to this, never a strong reference, so a
/// dropped store is not kept alive by its cursors.
pub(crate) struct StoreInner {
    path: Option<PathBuf>,
    options: Options,
    /// `None` once the store is closed.
    pub engine: RwLock<Option<Box<dyn Engine>>>,
    pub children: Mutex<Registry>,
    pub stats: StoreStats,
}

impl StoreInner {
    /// Runs `f` against the open engine, holding off `close` meanwhile.
    pub fn call<R>(&self, f: impl FnOnce(&dyn Engine) -> EngineResult<R>) -> BurrowResult<R> {
        let engine = self.engine.read();
        let engine = engine
            .as_deref()
            .ok_or_else(|| BurrowError::closed(Resource::Store))?;
        f(engine).map_err(|e| {
            self.stats.record_error();
            BurrowError::io(e)
        })
    }
}

/// An open store.
///
/// `Store` exclusively owns one engine connection. It is `Send + Sync`;
/// share it between threads with an `Arc`. Cursors, write batches and
/// snapshots created from it are independent of each other but depend on
/// the store staying open: closing the store closes all of them first.
///
/// # Example
///
/// ```rust
/// use burrow_core::{Options, Store};
///
/// let store = Store::open_in_memory(Options::default())?;
/// store.put(b"apple", b"red")?;
/// store.put(b"banana", b"yellow")?;
///
/// let mut cursor = store.cursor()?;
/// cursor.seek(b"b")?;
/// assert_eq!(cursor.key()?, b"banana");
///
/// store.close()?;
/// assert!(!cursor.is_valid());
/// # Ok::<(), burrow_core::BurrowError>(())
/// ```
pub struct Store {
    inner: Arc<StoreInner>,
}

impl Store {
    /// Opens the store at `path`.
    ///
    /// # Errors
    ///
    /// - [`BurrowError::AlreadyExists`] if the store exists and
    ///   `error_if_exists` is set
    /// - [`BurrowError::OpenFailure`] for any other reason the engine
    ///   refuses: missing store without `create_if_missing`, a store held
    ///   by another handle, a damaged store, or an I/O error
    pub fn open(path: impl AsRef<Path>, options: Options) -> BurrowResult<Self> {
        let path = path.as_ref();
        let db = Db::open(path, options.to_engine_options())
            .map_err(|e| BurrowError::open(path.to_path_buf(), e))?;
        debug!(path = %path.display(), "store opened");
        Ok(Self::from_parts(Some(path.to_path_buf()), options, Box::new(db)))
    }

    /// Opens a store held entirely in memory.
    ///
    /// # Errors
    ///
    /// Returns [`BurrowError::OpenFailure`] if the engine refuses.
    pub fn open_in_memory(options: Options) -> BurrowResult<Self> {
        let db = Db::open_in_memory(options.to_engine_options())
            .map_err(|e| BurrowError::open(PathBuf::from(":memory:"), e))?;
        Ok(Self::from_parts(None, options, Box::new(db)))
    }

    /// Wraps an already open engine connection.
    #[must_use]
    pub fn with_engine(engine: Box<dyn Engine>, options: Options) -> Self {
        Self::from_parts(None, options, engine)
    }

    fn from_parts(path: Option<PathBuf>, options: Options, engine: Box<dyn Engine>) -> Self {
        Self {
            inner: Arc::new(StoreInner {
                path,
                options,
                engine: RwLock::new(Some(engine)),
                children: Mutex::new(Registry::default()),
                stats: StoreStats::default(),
            }),
        }
    }

    /// Reads `key`. `Ok(None)` means the key does not exist.
    ///
    /// # Errors
    ///
    /// - [`BurrowError::Closed`] if the store is closed
    /// - [`BurrowError::IoFailure`] if the engine read fails
    pub fn get(&self, key: &[u8]) -> BurrowResult<Option<Vec<u8>>> {
        let value = self.inner.call(|engine| engine.get(key))?;
        let bytes = value.as_ref().map_or(0, Vec::len);
        self.inner.stats.record_read(bytes as u64);
        Ok(value)
    }

    /// Writes `key`, replacing any previous value. Empty keys and values
    /// are allowed.
    ///
    /// # Errors
    ///
    /// - [`BurrowError::Closed`] if the store is closed
    /// - [`BurrowError::IoFailure`] if the engine write fails
    pub fn put(&self, key: &[u8], value: &[u8]) -> BurrowResult<()> {
        self.inner.call(|engine| engine.put(key, value))?;
        self.inner
            .stats
            .record_write((key.len() + value.len()) as u64);
        Ok(())
    }

    /// Removes `key`. Removing a missing key succeeds.
    ///
    /// # Errors
    ///
    /// - [`BurrowError::Closed`] if the store is closed
    /// - [`BurrowError::IoFailure`] if the engine write fails
    pub fn delete(&self, key: &[u8]) -> BurrowResult<()> {
        self.inner.call(|engine| engine.delete(key))?;
        self.inner.stats.record_delete();
        Ok(())
    }

    /// Creates a cursor over the store as it is now.
    ///
    /// The cursor starts unpositioned; call one of the seek methods first.
    ///
    /// # Errors
    ///
    /// Returns [`BurrowError::Closed`] if the store is closed.
    pub fn cursor(&self) -> BurrowResult<Cursor> {
        let engine = self.inner.engine.read();
        let engine = engine
            .as_deref()
            .ok_or_else(|| BurrowError::closed(Resource::Store))?;
        let raw = engine.cursor_open().map_err(BurrowError::io)?;
        self.inner.stats.record_cursor();
        Ok(Cursor::new(&self.inner, raw))
    }

    /// Creates an empty write batch.
    ///
    /// # Errors
    ///
    /// Returns [`BurrowError::Closed`] if the store is closed.
    pub fn write_batch(&self) -> BurrowResult<WriteBatch> {
        let engine = self.inner.engine.read();
        if engine.is_none() {
            return Err(BurrowError::closed(Resource::Store));
        }
        Ok(WriteBatch::new(&self.inner))
    }

    /// Pins a read view of the store as it is now.
    ///
    /// # Errors
    ///
    /// Returns [`BurrowError::Closed`] if the store is closed.
    pub fn snapshot(&self) -> BurrowResult<Snapshot> {
        let engine = self.inner.engine.read();
        let engine = engine
            .as_deref()
            .ok_or_else(|| BurrowError::closed(Resource::Store))?;
        let raw = engine.snapshot().map_err(BurrowError::io)?;
        self.inner.stats.record_snapshot();
        Ok(Snapshot::new(&self.inner, raw))
    }

    /// Closes the store.
    ///
    /// Every cursor, write batch and snapshot still open on this store is
    /// closed first; unwritten batches are discarded. Closing an already
    /// closed store does nothing.
    ///
    /// # Errors
    ///
    /// Returns [`BurrowError::IoFailure`] if the engine fails to shut down
    /// cleanly. The store is closed regardless.
    pub fn close(&self) -> BurrowResult<()> {
        let engine = {
            let mut slot = self.inner.engine.write();
            let Some(engine) = slot.take() else {
                return Ok(());
            };

            let children = self.inner.children.lock().drain();
            let mut released = 0usize;
            for (kind, token) in children {
                if token.release() {
                    debug!(%kind, "released child on store close");
                    released += 1;
                }
            }
            if released > 0 {
                warn!(released, "store closed with live cursors, batches or snapshots");
            }
            engine
        };

        let result = engine.close().map_err(|e| {
            self.inner.stats.record_error();
            BurrowError::IoFailure(e)
        });
        debug!(path = ?self.inner.path, "store closed");
        result
    }

    /// Returns true until [`Store::close`] is called.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.inner.engine.read().is_some()
    }

    /// Returns the store directory, or `None` for a store without one.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.inner.path.as_deref()
    }

    /// Returns the options the store was opened with.
    #[must_use]
    pub fn options(&self) -> &Options {
        &self.inner.options
    }

    /// Number of open cursors.
    #[must_use]
    pub fn live_cursors(&self) -> usize {
        self.inner.children.lock().live(Resource::Cursor)
    }

    /// Number of open write batches.
    #[must_use]
    pub fn live_batches(&self) -> usize {
        self.inner.children.lock().live(Resource::WriteBatch)
    }

    /// Number of open snapshots.
    #[must_use]
    pub fn live_snapshots(&self) -> usize {
        self.inner.children.lock().live(Resource::Snapshot)
    }

    /// Returns a copy of the store's counters.
    #[must_use]
    pub fn stats(&self) -> StatsSnapshot {
        self.inner.stats.snapshot()
    }

    /// Reports an engine property such as `burrow.num-entries`.
    ///
    /// # Errors
    ///
    /// Returns [`BurrowError::Closed`] if the store is closed.
    pub fn property(&self, name: &str) -> BurrowResult<Option<String>> {
        self.inner.call(|engine| Ok(engine.property(name)))
    }
}

impl Drop for Store {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!(error = %e, "failed to close store on drop");
        }
    }
}

impl fmt::Debug for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("path", &self.inner.path)
            .field("open", &self.is_open())
            .field("children", &*self.inner.children.lock())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> Store {
        Store::open_in_memory(Options::default()).unwrap()
    }

    #[test]
    fn put_get_delete() {
        let store = store();
        store.put(b"k", b"v").unwrap();
        assert_eq!(store.get(b"k").unwrap(), Some(b"v".to_vec()));

        store.delete(b"k").unwrap();
        assert_eq!(store.get(b"k").unwrap(), None);
        store.delete(b"never-written").unwrap();
    }

    #[test]
    fn empty_key_and_value() {
        let store = store();
        store.put(b"", b"").unwrap();
        assert_eq!(store.get(b"").unwrap(), Some(Vec::new()));
    }

    #[test]
    fn close_is_idempotent() {
        let store = store();
        assert!(store.is_open());
        store.close().unwrap();
        store.close().unwrap();
        assert!(!store.is_open());
    }

    #[test]
    fn closed_store_rejects_operations() {
        let store = store();
        store.close().unwrap();

        let closed = |r: BurrowError| {
            matches!(
                r,
                BurrowError::Closed {
                    resource: Resource::Store
                }
            )
        };
        assert!(closed(store.get(b"k").unwrap_err()));
        assert!(closed(store.put(b"k", b"v").unwrap_err()));
        assert!(closed(store.delete(b"k").unwrap_err()));
        assert!(closed(store.cursor().unwrap_err()));
        assert!(closed(store.write_batch().unwrap_err()));
        assert!(closed(store.snapshot().unwrap_err()));
        assert!(closed(store.property("burrow.sequence").unwrap_err()));
    }

    #[test]
    fn children_are_counted() {
        let store = store();
        let cursor = store.cursor().unwrap();
        let _batch = store.write_batch().unwrap();
        let _snapshot = store.snapshot().unwrap();
        assert_eq!(store.live_cursors(), 1);
        assert_eq!(store.live_batches(), 1);
        assert_eq!(store.live_snapshots(), 1);

        drop(cursor);
        assert_eq!(store.live_cursors(), 0);
    }

    #[test]
    fn stats_track_operations() {
        let store = store();
        store.put(b"ab", b"cde").unwrap();
        store.get(b"ab").unwrap();
        store.get(b"missing").unwrap();
        store.delete(b"ab").unwrap();
        let _cursor = store.cursor().unwrap();

        let stats = store.stats();
        assert_eq!(stats.writes, 1);
        assert_eq!(stats.bytes_written, 5);
        assert_eq!(stats.reads, 2);
        assert_eq!(stats.bytes_read, 3);
        assert_eq!(stats.deletes, 1);
        assert_eq!(stats.cursors_opened, 1);
        assert_eq!(stats.errors, 0);
    }

    #[test]
    fn property_passthrough() {
        let store = store();
        store.put(b"a", b"1").unwrap();
        assert_eq!(
            store.property("burrow.num-entries").unwrap().as_deref(),
            Some("1")
        );
        assert_eq!(store.property("nope").unwrap(), None);
    }

    #[test]
    fn store_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Store>();
    }
}
