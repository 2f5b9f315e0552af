//! Type definitions for FFI.

use burrow_core::{Options, StatsSnapshot};

/// Opaque handle to a store, cursor or write batch.
///
/// Handles are never reused within a process. Zero is never a valid handle.
pub type BurrowHandle = u64;

/// The handle value no function ever returns.
pub const BURROW_INVALID_HANDLE: BurrowHandle = 0;

/// Options for opening a store.
///
/// Zero in `bloom_filter_bits_per_key` or `cache_size_bytes` leaves that
/// setting to the engine.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct BurrowOptions {
    /// Whether to create the store if it doesn't exist.
    pub create_if_missing: bool,
    /// Whether to fail if the store already exists.
    pub error_if_exists: bool,
    /// Bits per key for the read filter (0 = disabled).
    pub bloom_filter_bits_per_key: u32,
    /// Read cache capacity in bytes (0 = engine default).
    pub cache_size_bytes: u64,
    /// Whether to compress stored data.
    pub compression: bool,
    /// Whether to refuse a store with a damaged log.
    pub paranoid_checks: bool,
}

impl Default for BurrowOptions {
    fn default() -> Self {
        Options::default().into()
    }
}

impl From<Options> for BurrowOptions {
    fn from(o: Options) -> Self {
        Self {
            create_if_missing: o.create_if_missing,
            error_if_exists: o.error_if_exists,
            bloom_filter_bits_per_key: o.bloom_filter_bits_per_key.unwrap_or(0),
            cache_size_bytes: o.cache_size_bytes.unwrap_or(0),
            compression: o.compression,
            paranoid_checks: o.paranoid_checks,
        }
    }
}

impl From<BurrowOptions> for Options {
    fn from(o: BurrowOptions) -> Self {
        Options {
            create_if_missing: o.create_if_missing,
            error_if_exists: o.error_if_exists,
            bloom_filter_bits_per_key: (o.bloom_filter_bits_per_key > 0)
                .then_some(o.bloom_filter_bits_per_key),
            cache_size_bytes: (o.cache_size_bytes > 0).then_some(o.cache_size_bytes),
            compression: o.compression,
            paranoid_checks: o.paranoid_checks,
        }
    }
}

/// Store statistics snapshot.
///
/// Use `burrow_stats()` to get the current counters.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct BurrowStats {
    /// Point reads.
    pub reads: u64,
    /// Point puts.
    pub writes: u64,
    /// Point deletes.
    pub deletes: u64,
    /// Value bytes returned by point reads.
    pub bytes_read: u64,
    /// Key and value bytes written.
    pub bytes_written: u64,
    /// Cursors created.
    pub cursors_opened: u64,
    /// Write batches applied.
    pub batches_applied: u64,
    /// Write batches whose apply failed.
    pub batches_failed: u64,
    /// Snapshots taken.
    pub snapshots_taken: u64,
    /// Number of errors recorded.
    pub errors: u64,
}

impl From<StatsSnapshot> for BurrowStats {
    fn from(s: StatsSnapshot) -> Self {
        Self {
            reads: s.reads,
            writes: s.writes,
            deletes: s.deletes,
            bytes_read: s.bytes_read,
            bytes_written: s.bytes_written,
            cursors_opened: s.cursors_opened,
            batches_applied: s.batches_applied,
            batches_failed: s.batches_failed,
            snapshots_taken: s.snapshots_taken,
            errors: s.errors,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn options_default_matches_core() {
        let options = BurrowOptions::default();
        assert!(options.create_if_missing);
        assert!(!options.error_if_exists);
        assert_eq!(options.bloom_filter_bits_per_key, 0);
        assert_eq!(Options::from(options), Options::default());
    }

    #[test]
    fn zero_means_unset() {
        let options = BurrowOptions {
            bloom_filter_bits_per_key: 10,
            ..BurrowOptions::default()
        };
        let core = Options::from(options);
        assert_eq!(core.bloom_filter_bits_per_key, Some(10));
        assert_eq!(core.cache_size_bytes, None);
    }
}
