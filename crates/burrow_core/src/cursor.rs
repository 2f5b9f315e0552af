//! Ordered, bidirectional cursors.

use crate::error::{BurrowError, BurrowResult};
use crate::resource::{Release, Resource, Token};
use crate::store::StoreInner;
use burrow_engine::EngineCursor;
use std::fmt;
use std::sync::{Arc, Weak};
use tracing::debug;

/// Where a cursor stands.
///
/// ```text
/// Unset ──seek*──► Positioned ◄──seek*/next/prev──► Exhausted
///   └───────────────────┴──────────close─────────────┴──► Closed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorState {
    /// Created, not yet seeked.
    Unset,
    /// On an entry; `key()` and `value()` are available.
    Positioned,
    /// Moved past either end, or a seek found nothing.
    Exhausted,
    /// Released, explicitly or by closing the store.
    Closed,
}

impl fmt::Display for CursorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Unset => "unset",
            Self::Positioned => "positioned",
            Self::Exhausted => "exhausted",
            Self::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// A cursor over a store, frozen at the moment it was created.
///
/// Writes made after creation, through `put`, `delete` or a write batch,
/// are never seen by the cursor, including after a re-seek.
///
/// A new cursor is [`CursorState::Unset`]: it is not valid until one of
/// [`seek_to_first`](Self::seek_to_first), [`seek_to_last`](Self::seek_to_last)
/// or [`seek`](Self::seek) picks a starting point.
///
/// # Example
///
/// ```rust
/// use burrow_core::{Options, Store};
///
/// let store = Store::open_in_memory(Options::default())?;
/// for (k, v) in [(b"a", b"av"), (b"b", b"bv"), (b"c", b"cv")] {
///     store.put(k, v)?;
/// }
///
/// let mut cursor = store.cursor()?;
/// let mut seen = Vec::new();
/// cursor.seek_to_last()?;
/// while cursor.is_valid() {
///     seen.push(cursor.key()?);
///     cursor.prev()?;
/// }
/// assert_eq!(seen, vec![b"c".to_vec(), b"b".to_vec(), b"a".to_vec()]);
/// # Ok::<(), burrow_core::BurrowError>(())
/// ```
pub struct Cursor {
    token: Arc<Token<Box<dyn EngineCursor>>>,
    id: u64,
    store: Weak<StoreInner>,
    /// Never `Closed`; that is read off the token.
    position: CursorState,
}

impl Cursor {
    /// Registers a new cursor with `store`. The caller holds the store's
    /// engine lock.
    pub(crate) fn new(store: &Arc<StoreInner>, raw: Box<dyn EngineCursor>) -> Self {
        let token = Token::new(raw);
        let id = store.children.lock().register(Resource::Cursor, &token);
        Self {
            token,
            id,
            store: Arc::downgrade(store),
            position: CursorState::Unset,
        }
    }

    /// Returns the current state.
    #[must_use]
    pub fn state(&self) -> CursorState {
        if self.token.is_live() {
            self.position
        } else {
            CursorState::Closed
        }
    }

    /// True while positioned on an entry. Never an error.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.state() == CursorState::Positioned
    }

    /// Moves to the smallest key.
    ///
    /// # Errors
    ///
    /// Returns [`BurrowError::Closed`] if the cursor is closed.
    pub fn seek_to_first(&mut self) -> BurrowResult<()> {
        self.step(|c| c.seek_to_first())
    }

    /// Moves to the largest key.
    ///
    /// # Errors
    ///
    /// Returns [`BurrowError::Closed`] if the cursor is closed.
    pub fn seek_to_last(&mut self) -> BurrowResult<()> {
        self.step(|c| c.seek_to_last())
    }

    /// Moves to the smallest key `>= target`.
    ///
    /// # Errors
    ///
    /// Returns [`BurrowError::Closed`] if the cursor is closed.
    pub fn seek(&mut self, target: &[u8]) -> BurrowResult<()> {
        self.step(|c| c.seek(target))
    }

    /// Moves to the next larger key.
    ///
    /// # Errors
    ///
    /// - [`BurrowError::InvalidCursorState`] unless positioned
    /// - [`BurrowError::Closed`] if the cursor is closed
    pub fn next(&mut self) -> BurrowResult<()> {
        self.require_positioned("next")?;
        self.step(|c| c.next())
    }

    /// Moves to the next smaller key.
    ///
    /// # Errors
    ///
    /// - [`BurrowError::InvalidCursorState`] unless positioned
    /// - [`BurrowError::Closed`] if the cursor is closed
    pub fn prev(&mut self) -> BurrowResult<()> {
        self.require_positioned("prev")?;
        self.step(|c| c.prev())
    }

    /// Returns the key at the current position.
    ///
    /// # Errors
    ///
    /// - [`BurrowError::InvalidCursorState`] unless positioned
    /// - [`BurrowError::Closed`] if the cursor is closed
    pub fn key(&self) -> BurrowResult<Vec<u8>> {
        self.read("key", |c| c.key().map(<[u8]>::to_vec))
    }

    /// Returns the value at the current position.
    ///
    /// # Errors
    ///
    /// - [`BurrowError::InvalidCursorState`] unless positioned
    /// - [`BurrowError::Closed`] if the cursor is closed
    pub fn value(&self) -> BurrowResult<Vec<u8>> {
        self.read("value", |c| c.value().map(<[u8]>::to_vec))
    }

    /// Returns the key and value at the current position.
    ///
    /// # Errors
    ///
    /// - [`BurrowError::InvalidCursorState`] unless positioned
    /// - [`BurrowError::Closed`] if the cursor is closed
    pub fn entry(&self) -> BurrowResult<(Vec<u8>, Vec<u8>)> {
        self.read("entry", |c| Some((c.key()?.to_vec(), c.value()?.to_vec())))
    }

    /// Releases the cursor. Closing twice does nothing.
    pub fn close(&mut self) {
        if self.token.release() {
            debug!(id = self.id, "cursor closed");
        }
        if let Some(store) = self.store.upgrade() {
            store.children.lock().unregister(self.id);
        }
    }

    fn step(&mut self, f: impl FnOnce(&mut dyn EngineCursor)) -> BurrowResult<()> {
        let valid = self
            .token
            .with(|c| {
                f(&mut **c);
                c.valid()
            })
            .ok_or_else(|| BurrowError::closed(Resource::Cursor))?;
        self.position = if valid {
            CursorState::Positioned
        } else {
            CursorState::Exhausted
        };
        Ok(())
    }

    fn require_positioned(&self, op: &'static str) -> BurrowResult<()> {
        match self.state() {
            CursorState::Positioned => Ok(()),
            CursorState::Closed => Err(BurrowError::closed(Resource::Cursor)),
            state => Err(BurrowError::InvalidCursorState { op, state }),
        }
    }

    fn read<R>(
        &self,
        op: &'static str,
        f: impl FnOnce(&dyn EngineCursor) -> Option<R>,
    ) -> BurrowResult<R> {
        self.require_positioned(op)?;
        self.token
            .with(|c| f(&**c))
            .ok_or_else(|| BurrowError::closed(Resource::Cursor))?
            .ok_or(BurrowError::InvalidCursorState {
                op,
                state: CursorState::Exhausted,
            })
    }
}

impl Drop for Cursor {
    fn drop(&mut self) {
        self.close();
    }
}

impl fmt::Debug for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cursor")
            .field("id", &self.id)
            .field("state", &self.state())
            .finish()
    }
}
