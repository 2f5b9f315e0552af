//! Process-wide handle tables.
//!
//! C callers never see a pointer to a Rust object. Each open object lives
//! in one of the tables below under a `u64` handle; every call looks its
//! handle up again, so a handle that was closed, or never issued, is a miss
//! rather than a use-after-free.

use crate::types::BurrowHandle;
use burrow_core::{BurrowError, Cursor, Resource, Store, WriteBatch};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, LazyLock};

/// Shared by all tables, so a handle names one object of one kind.
static NEXT_HANDLE: AtomicU64 = AtomicU64::new(1);

pub(crate) static STORES: LazyLock<HandleTable<Store>> =
    LazyLock::new(|| HandleTable::new(Resource::Store));

pub(crate) static CURSORS: LazyLock<HandleTable<Mutex<Cursor>>> =
    LazyLock::new(|| HandleTable::new(Resource::Cursor));

pub(crate) static BATCHES: LazyLock<HandleTable<Mutex<WriteBatch>>> =
    LazyLock::new(|| HandleTable::new(Resource::WriteBatch));

/// Open objects of one kind, by handle.
pub(crate) struct HandleTable<T> {
    kind: Resource,
    entries: Mutex<HashMap<BurrowHandle, Arc<T>>>,
}

impl<T> HandleTable<T> {
    fn new(kind: Resource) -> Self {
        Self {
            kind,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Stores `value` under a fresh handle.
    pub fn insert(&self, value: T) -> BurrowHandle {
        let handle = NEXT_HANDLE.fetch_add(1, Ordering::Relaxed);
        self.entries.lock().insert(handle, Arc::new(value));
        handle
    }

    /// Looks up `handle`. A miss reads as the object being closed.
    ///
    /// The table lock is released before the caller uses the object, so a
    /// slow call on one handle never blocks lookups of another.
    pub fn get(&self, handle: BurrowHandle) -> Result<Arc<T>, BurrowError> {
        self.entries
            .lock()
            .get(&handle)
            .cloned()
            .ok_or_else(|| BurrowError::closed(self.kind))
    }

    /// Takes `handle` out of the table.
    pub fn remove(&self, handle: BurrowHandle) -> Option<Arc<T>> {
        self.entries.lock().remove(&handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handles_are_unique_across_tables() {
        let a = HandleTable::<u8>::new(Resource::Store);
        let b = HandleTable::<u8>::new(Resource::Cursor);
        let h1 = a.insert(1);
        let h2 = b.insert(2);
        assert_ne!(h1, h2);
        assert_ne!(h1, 0);

        assert!(b.get(h1).is_err());
        assert_eq!(*a.get(h1).unwrap(), 1);
    }

    #[test]
    fn removed_handle_misses_as_closed() {
        let table = HandleTable::new(Resource::WriteBatch);
        let h = table.insert("batch");
        assert!(table.remove(h).is_some());
        assert!(table.remove(h).is_none());
        assert!(matches!(
            table.get(h),
            Err(BurrowError::Closed {
                resource: Resource::WriteBatch
            })
        ));
    }
}
