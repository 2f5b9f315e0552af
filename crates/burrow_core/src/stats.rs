//! Store statistics.
//!
//! ```rust
//! use burrow_core::{Options, Store};
//!
//! let store = Store::open_in_memory(Options::default()).unwrap();
//! store.put(b"k", b"v").unwrap();
//! store.get(b"k").unwrap();
//!
//! let stats = store.stats();
//! assert_eq!(stats.writes, 1);
//! assert_eq!(stats.bytes_read, 1);
//! ```

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters kept by a store.
///
/// All counters are atomic and only ever increase.
#[derive(Debug, Default)]
pub(crate) struct StoreStats {
    reads: AtomicU64,
    writes: AtomicU64,
    deletes: AtomicU64,
    bytes_read: AtomicU64,
    bytes_written: AtomicU64,
    cursors_opened: AtomicU64,
    batches_applied: AtomicU64,
    batches_failed: AtomicU64,
    snapshots_taken: AtomicU64,
    errors: AtomicU64,
}

impl StoreStats {
    pub fn record_read(&self, bytes: u64) {
        self.reads.fetch_add(1, Ordering::Relaxed);
        self.bytes_read.fetch_add(bytes, Ordering::Relaxed);
    }

    pub fn record_write(&self, bytes: u64) {
        self.writes.fetch_add(1, Ordering::Relaxed);
        self.bytes_written.fetch_add(bytes, Ordering::Relaxed);
    }

    pub fn record_delete(&self) {
        self.deletes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cursor(&self) {
        self.cursors_opened.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_batch_applied(&self, bytes: u64) {
        self.batches_applied.fetch_add(1, Ordering::Relaxed);
        self.bytes_written.fetch_add(bytes, Ordering::Relaxed);
    }

    pub fn record_batch_failed(&self) {
        self.batches_failed.fetch_add(1, Ordering::Relaxed);
        self.record_error();
    }

    pub fn record_snapshot(&self) {
        self.snapshots_taken.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            reads: self.reads.load(Ordering::Relaxed),
            writes: self.writes.load(Ordering::Relaxed),
            deletes: self.deletes.load(Ordering::Relaxed),
            bytes_read: self.bytes_read.load(Ordering::Relaxed),
            bytes_written: self.bytes_written.load(Ordering::Relaxed),
            cursors_opened: self.cursors_opened.load(Ordering::Relaxed),
            batches_applied: self.batches_applied.load(Ordering::Relaxed),
            batches_failed: self.batches_failed.load(Ordering::Relaxed),
            snapshots_taken: self.snapshots_taken.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
        }
    }
}

/// A point-in-time copy of a store's counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatsSnapshot {
    /// Point reads.
    pub reads: u64,
    /// Point puts.
    pub writes: u64,
    /// Point deletes.
    pub deletes: u64,
    /// Value bytes returned by point reads.
    pub bytes_read: u64,
    /// Key and value bytes written by puts and applied batches.
    pub bytes_written: u64,
    /// Cursors created, including cursors over snapshots.
    pub cursors_opened: u64,
    /// Write batches applied.
    pub batches_applied: u64,
    /// Write batches whose apply failed.
    pub batches_failed: u64,
    /// Snapshots taken.
    pub snapshots_taken: u64,
    /// Engine failures seen.
    pub errors: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_stats_are_zero() {
        assert_eq!(StoreStats::default().snapshot(), StatsSnapshot::default());
    }

    #[test]
    fn failed_batch_counts_as_error() {
        let stats = StoreStats::default();
        stats.record_batch_failed();
        stats.record_batch_applied(12);

        let snap = stats.snapshot();
        assert_eq!(snap.batches_failed, 1);
        assert_eq!(snap.batches_applied, 1);
        assert_eq!(snap.errors, 1);
        assert_eq!(snap.bytes_written, 12);
    }

    #[test]
    fn concurrent_updates() {
        use std::sync::Arc;
        use std::thread;

        let stats = Arc::new(StoreStats::default());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let s = Arc::clone(&stats);
                thread::spawn(move || {
                    for _ in 0..100 {
                        s.record_read(2);
                        s.record_cursor();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        let snap = stats.snapshot();
        assert_eq!(snap.reads, 800);
        assert_eq!(snap.bytes_read, 1600);
        assert_eq!(snap.cursors_opened, 800);
    }
}
