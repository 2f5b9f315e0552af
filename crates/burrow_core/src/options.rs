//! Store options.

use burrow_engine::EngineOptions;

/// Options for opening a store.
///
/// Built once, then handed to [`crate::Store::open`] by value; the store
/// keeps its own copy.
///
/// ```rust
/// use burrow_core::Options;
///
/// let options = Options::new()
///     .create_if_missing(true)
///     .bloom_filter_bits_per_key(10)
///     .cache_size_bytes(8 << 20);
/// assert_eq!(options.bloom_filter_bits_per_key, Some(10));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
    /// Whether to create the store if it doesn't exist.
    pub create_if_missing: bool,

    /// Whether to error if the store already exists.
    pub error_if_exists: bool,

    /// Bits per key for the engine's read filter (`None` = disabled). The
    /// open fails above 255.
    pub bloom_filter_bits_per_key: Option<u32>,

    /// Engine read cache capacity (`None` = engine default).
    pub cache_size_bytes: Option<u64>,

    /// Whether the engine should compress stored data.
    pub compression: bool,

    /// Refuse to open a store whose log is damaged, instead of dropping the
    /// damaged tail.
    pub paranoid_checks: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            create_if_missing: true,
            error_if_exists: false,
            bloom_filter_bits_per_key: None,
            cache_size_bytes: None,
            compression: true,
            paranoid_checks: false,
        }
    }
}

impl Options {
    /// Creates options with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets whether to create the store if missing.
    #[must_use]
    pub const fn create_if_missing(mut self, value: bool) -> Self {
        self.create_if_missing = value;
        self
    }

    /// Sets whether to error if the store exists.
    #[must_use]
    pub const fn error_if_exists(mut self, value: bool) -> Self {
        self.error_if_exists = value;
        self
    }

    /// Sets the read filter bits per key.
    #[must_use]
    pub const fn bloom_filter_bits_per_key(mut self, bits: u32) -> Self {
        self.bloom_filter_bits_per_key = Some(bits);
        self
    }

    /// Sets the read cache capacity.
    #[must_use]
    pub const fn cache_size_bytes(mut self, bytes: u64) -> Self {
        self.cache_size_bytes = Some(bytes);
        self
    }

    /// Sets whether stored data is compressed.
    #[must_use]
    pub const fn compression(mut self, value: bool) -> Self {
        self.compression = value;
        self
    }

    /// Sets whether log damage fails the open.
    #[must_use]
    pub const fn paranoid_checks(mut self, value: bool) -> Self {
        self.paranoid_checks = value;
        self
    }

    /// Lowers the options to the engine's open parameters.
    #[must_use]
    pub fn to_engine_options(&self) -> EngineOptions {
        EngineOptions {
            create_if_missing: self.create_if_missing,
            error_if_exists: self.error_if_exists,
            bloom_filter_bits_per_key: self.bloom_filter_bits_per_key.unwrap_or(0),
            cache_size_bytes: self.cache_size_bytes.unwrap_or(0),
            compression: self.compression,
            paranoid_checks: self.paranoid_checks,
        }
    }
}
