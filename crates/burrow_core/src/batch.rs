//! One-shot atomic write batches.

use crate::error::{BurrowError, BurrowResult};
use crate::resource::{Release, Resource, Token};
use crate::store::StoreInner;
use burrow_engine::{EngineError, WriteBatchRep};
use std::fmt;
use std::sync::{Arc, Weak};
use tracing::{debug, warn};

/// Lifecycle of a write batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchState {
    /// Accepting operations; not yet written.
    Pending,
    /// Written successfully.
    Applied,
    /// The engine rejected the write. Nothing was applied.
    Failed,
    /// Released, explicitly or by closing the store.
    Closed,
}

/// An ordered group of puts and deletes applied as one unit.
///
/// Operations apply in the order they were added; when a key appears more
/// than once the last operation wins. [`write`](Self::write) applies them
/// all or none, and only once: the first call consumes the batch whether
/// it succeeds or fails. Build a new batch to retry.
///
/// Closing or dropping an unwritten batch discards it.
///
/// # Example
///
/// ```rust
/// use burrow_core::{Options, Store};
///
/// let store = Store::open_in_memory(Options::default())?;
/// store.put(b"k1", b"a")?;
/// store.put(b"k2", b"b")?;
///
/// let mut batch = store.write_batch()?;
/// batch.put(b"k1", b"aaa")?;
/// batch.delete(b"k2")?;
/// batch.put(b"k3", b"ccc")?;
/// assert!(batch.write()?);
/// assert!(!batch.write()?);
///
/// assert_eq!(store.get(b"k1")?, Some(b"aaa".to_vec()));
/// assert_eq!(store.get(b"k2")?, None);
/// assert_eq!(store.get(b"k3")?, Some(b"ccc".to_vec()));
/// # Ok::<(), burrow_core::BurrowError>(())
/// ```
pub struct WriteBatch {
    token: Arc<Token<WriteBatchRep>>,
    id: u64,
    store: Weak<StoreInner>,
    /// Never `Closed`; that is read off the token.
    state: BatchState,
}

impl WriteBatch {
    /// Registers a new batch with `store`. The caller holds the store's
    /// engine lock.
    pub(crate) fn new(store: &Arc<StoreInner>) -> Self {
        let token = Token::new(WriteBatchRep::new());
        let id = store.children.lock().register(Resource::WriteBatch, &token);
        Self {
            token,
            id,
            store: Arc::downgrade(store),
            state: BatchState::Pending,
        }
    }

    /// Returns the current state.
    #[must_use]
    pub fn state(&self) -> BatchState {
        if self.token.is_live() {
            self.state
        } else {
            BatchState::Closed
        }
    }

    /// Number of operations added so far. Zero once closed.
    #[must_use]
    pub fn len(&self) -> usize {
        self.token.with(|rep| rep.len()).unwrap_or(0)
    }

    /// Returns true if no operation has been added.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Adds a put of `key`.
    ///
    /// # Errors
    ///
    /// - [`BurrowError::AlreadyApplied`] once [`write`](Self::write) was called
    /// - [`BurrowError::Closed`] if the batch is closed
    pub fn put(&mut self, key: &[u8], value: &[u8]) -> BurrowResult<()> {
        self.ensure_pending()?;
        self.token
            .with(|rep| rep.put(key, value))
            .ok_or_else(|| BurrowError::closed(Resource::WriteBatch))
    }

    /// Adds a delete of `key`.
    ///
    /// # Errors
    ///
    /// - [`BurrowError::AlreadyApplied`] once [`write`](Self::write) was called
    /// - [`BurrowError::Closed`] if the batch is closed
    pub fn delete(&mut self, key: &[u8]) -> BurrowResult<()> {
        self.ensure_pending()?;
        self.token
            .with(|rep| rep.delete(key))
            .ok_or_else(|| BurrowError::closed(Resource::WriteBatch))
    }

    /// Applies every operation atomically.
    ///
    /// Returns `Ok(true)` the first time. Every later call returns
    /// `Ok(false)` and changes nothing, including after a failed apply.
    ///
    /// # Errors
    ///
    /// - [`BurrowError::ApplyFailure`] if the engine rejects the batch;
    ///   the batch is consumed and none of its operations are visible
    /// - [`BurrowError::Closed`] if the batch or its store is closed
    pub fn write(&mut self) -> BurrowResult<bool> {
        if !self.token.is_live() {
            return Err(BurrowError::closed(Resource::WriteBatch));
        }
        if self.state != BatchState::Pending {
            return Ok(false);
        }

        let store = self
            .store
            .upgrade()
            .ok_or_else(|| BurrowError::closed(Resource::Store))?;
        let engine = store.engine.read();
        let engine = engine
            .as_deref()
            .ok_or_else(|| BurrowError::closed(Resource::Store))?;

        let outcome = self
            .token
            .with(|rep| engine.apply(rep).map(|()| rep.byte_size() as u64))
            .ok_or_else(|| BurrowError::closed(Resource::WriteBatch))?;

        match outcome {
            Ok(bytes) => {
                self.state = BatchState::Applied;
                store.stats.record_batch_applied(bytes);
                debug!(id = self.id, bytes, "write batch applied");
                Ok(true)
            }
            Err(EngineError::Closed) => Err(BurrowError::closed(Resource::Store)),
            Err(e) => {
                self.state = BatchState::Failed;
                store.stats.record_batch_failed();
                warn!(id = self.id, error = %e, "write batch apply failed");
                Err(BurrowError::ApplyFailure(e))
            }
        }
    }

    /// Applies the batch, then closes it.
    ///
    /// # Errors
    ///
    /// Same as [`write`](Self::write). The batch is closed either way.
    pub fn write_and_close(mut self) -> BurrowResult<bool> {
        let result = self.write();
        self.close();
        result
    }

    /// Releases the batch, discarding it if it was never written. Closing
    /// twice does nothing.
    pub fn close(&mut self) {
        let discarded = if self.state == BatchState::Pending {
            self.len()
        } else {
            0
        };
        if self.token.release() && discarded > 0 {
            debug!(id = self.id, ops = discarded, "discarded unwritten write batch");
        }
        if let Some(store) = self.store.upgrade() {
            store.children.lock().unregister(self.id);
        }
    }

    fn ensure_pending(&self) -> BurrowResult<()> {
        match self.state() {
            BatchState::Pending => Ok(()),
            BatchState::Closed => Err(BurrowError::closed(Resource::WriteBatch)),
            BatchState::Applied | BatchState::Failed => Err(BurrowError::AlreadyApplied),
        }
    }
}

impl Drop for WriteBatch {
    fn drop(&mut self) {
        self.close();
    }
}

impl fmt::Debug for WriteBatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WriteBatch")
            .field("id", &self.id)
            .field("state", &self.state())
            .field("len", &self.len())
            .finish()
    }
}
