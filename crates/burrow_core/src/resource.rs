//! Ownership plumbing between a store and its children.
//!
//! Each child (cursor, write batch, snapshot) owns its engine token through
//! a shared [`Token`] slot. The store's [`Registry`] keeps a weak reference
//! to every live slot, so closing the store can empty them all before the
//! engine connection goes away. An emptied slot is how a child learns it
//! has been closed.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Weak};

/// The kinds of resource a caller can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    /// A store handle.
    Store,
    /// A cursor.
    Cursor,
    /// A write batch.
    WriteBatch,
    /// A snapshot.
    Snapshot,
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Store => "store",
            Self::Cursor => "cursor",
            Self::WriteBatch => "write batch",
            Self::Snapshot => "snapshot",
        };
        f.write_str(name)
    }
}

/// Something the store can release on a child's behalf.
pub(crate) trait Release: Send + Sync {
    /// Drops the held engine token. Returns true if one was held.
    fn release(&self) -> bool;
}

/// Slot holding one engine token until it is released.
#[derive(Debug)]
pub(crate) struct Token<T> {
    slot: Mutex<Option<T>>,
}

impl<T: Send> Token<T> {
    pub fn new(value: T) -> Arc<Self> {
        Arc::new(Self {
            slot: Mutex::new(Some(value)),
        })
    }

    /// Runs `f` on the token, or returns `None` if it was released.
    pub fn with<R>(&self, f: impl FnOnce(&mut T) -> R) -> Option<R> {
        self.slot.lock().as_mut().map(f)
    }

    pub fn is_live(&self) -> bool {
        self.slot.lock().is_some()
    }
}

impl<T: Send> Release for Token<T> {
    fn release(&self) -> bool {
        // Take under the lock, drop outside it.
        let value = self.slot.lock().take();
        value.is_some()
    }
}

struct Child {
    kind: Resource,
    token: Weak<dyn Release>,
}

/// Live children of one store.
#[derive(Default)]
pub(crate) struct Registry {
    next_id: u64,
    children: HashMap<u64, Child>,
}

impl Registry {
    /// Tracks a child token and returns its registration id.
    pub fn register<T: Send + 'static>(&mut self, kind: Resource, token: &Arc<Token<T>>) -> u64 {
        self.next_id += 1;
        let weak: Weak<Token<T>> = Arc::downgrade(token);
        self.children.insert(
            self.next_id,
            Child {
                kind,
                token: weak,
            },
        );
        self.next_id
    }

    pub fn unregister(&mut self, id: u64) {
        self.children.remove(&id);
    }

    /// Number of registered children of `kind`.
    pub fn live(&self, kind: Resource) -> usize {
        self.children.values().filter(|c| c.kind == kind).count()
    }

    /// Removes every child and hands back the tokens still alive.
    pub fn drain(&mut self) -> Vec<(Resource, Arc<dyn Release>)> {
        self.children
            .drain()
            .filter_map(|(_, child)| child.token.upgrade().map(|token| (child.kind, token)))
            .collect()
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("cursors", &self.live(Resource::Cursor))
            .field("write_batches", &self.live(Resource::WriteBatch))
            .field("snapshots", &self.live(Resource::Snapshot))
            .finish()
    }
}
