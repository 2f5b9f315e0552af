//! Engine open parameters.

use crate::error::{EngineError, EngineResult};
use std::fmt;

/// Largest accepted `bloom_filter_bits_per_key`; the filter stores it in a byte.
pub const MAX_BLOOM_BITS_PER_KEY: u32 = u8::MAX as u32;

/// Raw parameters for opening an engine connection.
///
/// `bloom_filter_bits_per_key`, `cache_size_bytes` and `compression` are
/// tuning hints: the engine records them and reports them through
/// [`crate::Engine::property`], but no answer depends on them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineOptions {
    /// Create the store if it does not exist.
    pub create_if_missing: bool,

    /// Fail if the store already exists.
    pub error_if_exists: bool,

    /// Bits per key for the read filter (0 = disabled).
    pub bloom_filter_bits_per_key: u32,

    /// Read cache capacity in bytes (0 = engine default).
    pub cache_size_bytes: u64,

    /// Whether block compression is requested.
    pub compression: bool,

    /// Fail open on any log damage instead of truncating the damaged tail.
    pub paranoid_checks: bool,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            create_if_missing: true,
            error_if_exists: false,
            bloom_filter_bits_per_key: 0,
            cache_size_bytes: 0,
            compression: true,
            paranoid_checks: false,
        }
    }
}

impl EngineOptions {
    /// Checks the tuning hints are in range.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidArgument`] for a bloom setting above
    /// [`MAX_BLOOM_BITS_PER_KEY`].
    pub fn validate(&self) -> EngineResult<()> {
        if self.bloom_filter_bits_per_key > MAX_BLOOM_BITS_PER_KEY {
            return Err(EngineError::invalid_argument(format!(
                "bloom_filter_bits_per_key {} exceeds {MAX_BLOOM_BITS_PER_KEY}",
                self.bloom_filter_bits_per_key
            )));
        }
        Ok(())
    }
}

impl fmt::Display for EngineOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "create_if_missing={} error_if_exists={} bloom_filter_bits_per_key={} \
             cache_size_bytes={} compression={} paranoid_checks={}",
            self.create_if_missing,
            self.error_if_exists,
            self.bloom_filter_bits_per_key,
            self.cache_size_bytes,
            self.compression,
            self.paranoid_checks
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_options() {
        let options = EngineOptions::default();
        assert!(options.create_if_missing);
        assert!(!options.error_if_exists);
        assert!(options.compression);
        assert_eq!(options.bloom_filter_bits_per_key, 0);
    }

    #[test]
    fn bloom_bits_must_fit_a_byte() {
        let mut options = EngineOptions {
            bloom_filter_bits_per_key: MAX_BLOOM_BITS_PER_KEY,
            ..EngineOptions::default()
        };
        assert!(options.validate().is_ok());

        options.bloom_filter_bits_per_key = 256;
        assert!(matches!(
            options.validate(),
            Err(EngineError::InvalidArgument(_))
        ));
    }

    #[test]
    fn display_lists_every_field() {
        let text = EngineOptions::default().to_string();
        assert!(text.contains("create_if_missing=true"));
        assert!(text.contains("paranoid_checks=false"));
        assert!(text.contains("cache_size_bytes=0"));
    }
}
