//! Caller-held point-in-time views.

use crate::cursor::Cursor;
use crate::error::{BurrowError, BurrowResult};
use crate::resource::{Release, Resource, Token};
use crate::store::StoreInner;
use burrow_engine::EngineSnapshot;
use std::fmt;
use std::sync::{Arc, Weak};
use tracing::debug;

/// A read view of a store pinned at the moment it was taken.
///
/// Reads and cursors through a snapshot never see later writes. The engine
/// keeps the versions the snapshot needs until it is closed.
///
/// # Example
///
/// ```rust
/// use burrow_core::{Options, Store};
///
/// let store = Store::open_in_memory(Options::default())?;
/// store.put(b"k", b"before")?;
///
/// let snapshot = store.snapshot()?;
/// store.put(b"k", b"after")?;
///
/// assert_eq!(snapshot.get(b"k")?, Some(b"before".to_vec()));
/// assert_eq!(store.get(b"k")?, Some(b"after".to_vec()));
/// # Ok::<(), burrow_core::BurrowError>(())
/// ```
pub struct Snapshot {
    token: Arc<Token<Box<dyn EngineSnapshot>>>,
    id: u64,
    store: Weak<StoreInner>,
}

impl Snapshot {
    pub(crate) fn new(store: &Arc<StoreInner>, raw: Box<dyn EngineSnapshot>) -> Self {
        let token = Token::new(raw);
        let id = store.children.lock().register(Resource::Snapshot, &token);
        Self {
            token,
            id,
            store: Arc::downgrade(store),
        }
    }

    /// Returns true until the snapshot or its store is closed.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.token.is_live()
    }

    /// Sequence number the view is pinned at.
    ///
    /// # Errors
    ///
    /// Returns [`BurrowError::Closed`] if the snapshot is closed.
    pub fn sequence(&self) -> BurrowResult<u64> {
        self.token
            .with(|s| s.sequence())
            .ok_or_else(|| BurrowError::closed(Resource::Snapshot))
    }

    /// Reads `key` as of the snapshot.
    ///
    /// # Errors
    ///
    /// - [`BurrowError::Closed`] if the snapshot is closed
    /// - [`BurrowError::IoFailure`] if the engine read fails
    pub fn get(&self, key: &[u8]) -> BurrowResult<Option<Vec<u8>>> {
        self.token
            .with(|s| s.get(key))
            .ok_or_else(|| BurrowError::closed(Resource::Snapshot))?
            .map_err(BurrowError::io)
    }

    /// Creates a cursor over the snapshot.
    ///
    /// The cursor belongs to the store like any other cursor and stays
    /// usable after the snapshot is closed.
    ///
    /// # Errors
    ///
    /// Returns [`BurrowError::Closed`] if the snapshot is closed.
    pub fn cursor(&self) -> BurrowResult<Cursor> {
        let closed = || BurrowError::closed(Resource::Snapshot);
        let store = self.store.upgrade().ok_or_else(closed)?;
        let engine = store.engine.read();
        if engine.is_none() {
            return Err(closed());
        }

        let raw = self.token.with(|s| s.cursor()).ok_or_else(closed)?;
        store.stats.record_cursor();
        Ok(Cursor::new(&store, raw))
    }

    /// Releases the snapshot. Closing twice does nothing.
    pub fn close(&mut self) {
        if self.token.release() {
            debug!(id = self.id, "snapshot closed");
        }
        if let Some(store) = self.store.upgrade() {
            store.children.lock().unregister(self.id);
        }
    }
}

impl Drop for Snapshot {
    fn drop(&mut self) {
        self.close();
    }
}

impl fmt::Debug for Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Snapshot")
            .field("id", &self.id)
            .field("open", &self.is_open())
            .finish()
    }
}
