//! In-memory log storage.

use super::LogStorage;
use crate::error::{EngineError, EngineResult};
use parking_lot::Mutex;
use std::sync::Arc;

/// Log storage kept in memory.
///
/// Clones share the same buffer, so a test can keep one clone, close the
/// engine that owns the other, and reopen over the same bytes.
///
/// # Example
///
/// ```rust
/// use burrow_engine::{Db, Engine, EngineOptions, MemoryLog};
///
/// let log = MemoryLog::new();
/// let db = Db::open_with_log(EngineOptions::default(), Box::new(log.clone())).unwrap();
/// db.put(b"k", b"v").unwrap();
/// db.close().unwrap();
///
/// let db = Db::open_with_log(EngineOptions::default(), Box::new(log)).unwrap();
/// assert_eq!(db.get(b"k").unwrap(), Some(b"v".to_vec()));
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryLog {
    data: Arc<Mutex<Vec<u8>>>,
}

impl MemoryLog {
    /// Creates an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a log holding `data`, for recovery scenarios.
    #[must_use]
    pub fn with_data(data: Vec<u8>) -> Self {
        Self {
            data: Arc::new(Mutex::new(data)),
        }
    }

    /// Returns a copy of the log bytes.
    #[must_use]
    pub fn data(&self) -> Vec<u8> {
        self.data.lock().clone()
    }
}

impl LogStorage for MemoryLog {
    fn read_all(&self) -> EngineResult<Vec<u8>> {
        Ok(self.data())
    }

    fn append(&mut self, new_data: &[u8]) -> EngineResult<u64> {
        let mut data = self.data.lock();
        let offset = data.len() as u64;
        data.extend_from_slice(new_data);
        Ok(offset)
    }

    fn sync(&mut self) -> EngineResult<()> {
        Ok(())
    }

    fn size(&self) -> EngineResult<u64> {
        Ok(self.data.lock().len() as u64)
    }

    fn truncate(&mut self, new_size: u64) -> EngineResult<()> {
        let mut data = self.data.lock();
        if new_size > data.len() as u64 {
            return Err(EngineError::invalid_argument(format!(
                "cannot truncate log to {new_size} bytes, it holds {}",
                data.len()
            )));
        }
        data.truncate(new_size as usize);
        Ok(())
    }

    fn rewrite(&mut self, new_data: &[u8]) -> EngineResult<()> {
        let mut data = self.data.lock();
        data.clear();
        data.extend_from_slice(new_data);
        Ok(())
    }
}
