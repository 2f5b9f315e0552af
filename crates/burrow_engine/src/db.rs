//! The bundled engine: a multi-version ordered map over a record log.

use crate::batch::WriteBatchRep;
use crate::dir::StoreDir;
use crate::error::{EngineError, EngineResult};
use crate::log::RecordLog;
use crate::options::EngineOptions;
use crate::record::LogRecord;
use crate::storage::{FileLog, LogStorage, MemoryLog};
use crate::traits::{Engine, EngineCursor, EngineSnapshot};
use crate::versions::{Pins, VersionedMap};
use crate::Sequence;
use parking_lot::{Mutex, RwLock};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Engine property: the options the connection was opened with.
pub const PROPERTY_OPTIONS: &str = "burrow.options";
/// Engine property: number of live keys.
pub const PROPERTY_NUM_ENTRIES: &str = "burrow.num-entries";
/// Engine property: last committed sequence.
pub const PROPERTY_SEQUENCE: &str = "burrow.sequence";
/// Engine property: number of pinned cursors and snapshots.
pub const PROPERTY_PINNED: &str = "burrow.pinned-snapshots";

/// State shared with cursors and snapshots.
///
/// Lock order is `map` before `pins`. `last_seq` only changes while the
/// `map` write lock is held, so a reader holding the read lock sees a
/// sequence that matches the map contents.
#[derive(Debug, Default)]
struct Shared {
    map: RwLock<VersionedMap>,
    pins: Mutex<Pins>,
    last_seq: AtomicU64,
}

impl Shared {
    /// Pins the latest committed sequence.
    fn pin_latest(self: &Arc<Self>) -> PinGuard {
        let _map = self.map.read();
        let seq = self.last_seq.load(Ordering::Acquire);
        self.pins.lock().pin(seq);
        PinGuard {
            shared: Arc::clone(self),
            seq,
        }
    }

    /// Oldest sequence a reader may still be pinned at. Caller holds `map`.
    fn floor(&self, latest: Sequence) -> Sequence {
        self.pins
            .lock()
            .oldest()
            .map_or(latest, |oldest| oldest.min(latest))
    }

    /// Releases versions that only the readers already gone could see.
    fn sweep(&self) {
        let mut map = self.map.write();
        let floor = self.floor(self.last_seq.load(Ordering::Acquire));
        let freed = map.sweep(floor);
        if freed > 0 {
            debug!(freed, floor, "released superseded versions");
        }
    }

    /// Pins `seq` again. The caller already holds a pin on it.
    fn pin_again(self: &Arc<Self>, seq: Sequence) -> PinGuard {
        self.pins.lock().pin(seq);
        PinGuard {
            shared: Arc::clone(self),
            seq,
        }
    }
}

/// Keeps one sequence pinned until dropped.
#[derive(Debug)]
struct PinGuard {
    shared: Arc<Shared>,
    seq: Sequence,
}

impl Drop for PinGuard {
    fn drop(&mut self) {
        let advanced = {
            let mut pins = self.shared.pins.lock();
            let before = pins.oldest();
            pins.unpin(self.seq);
            pins.oldest() != before
        };
        if advanced {
            self.shared.sweep();
        }
    }
}

/// Write side of an open connection.
struct Writer {
    log: RecordLog,
    /// Holds the directory lock. `None` when the log is not in a directory.
    dir: Option<StoreDir>,
}

/// An open engine connection.
///
/// Every write is appended to the record log before it becomes visible.
/// Cursors and snapshots pin the sequence they were created at and never
/// observe later writes. Closing compacts the log down to the live keys.
///
/// # Example
///
/// ```rust
/// use burrow_engine::{Db, Engine, EngineOptions};
///
/// let db = Db::open_in_memory(EngineOptions::default()).unwrap();
/// db.put(b"b", b"2").unwrap();
/// db.put(b"a", b"1").unwrap();
///
/// let mut cursor = db.cursor_open().unwrap();
/// cursor.seek_to_first();
/// assert_eq!(cursor.key(), Some(&b"a"[..]));
/// ```
pub struct Db {
    options: EngineOptions,
    path: Option<PathBuf>,
    shared: Arc<Shared>,
    /// `None` once closed.
    writer: Mutex<Option<Writer>>,
    closed: AtomicBool,
}

impl Db {
    /// Opens the store directory at `path`.
    ///
    /// # Errors
    ///
    /// - [`EngineError::NotFound`] / [`EngineError::AlreadyExists`] per the
    ///   `create_if_missing` and `error_if_exists` options
    /// - [`EngineError::Locked`] if another connection holds the store
    /// - [`EngineError::Corruption`] if the log is damaged and
    ///   `paranoid_checks` is set
    /// - [`EngineError::InvalidArgument`] if the options are out of range
    pub fn open(path: &Path, options: EngineOptions) -> EngineResult<Self> {
        options.validate()?;
        let dir = StoreDir::open(path, &options)?;
        let log = FileLog::open(&dir.log_path())?;
        let db = Self::recover(options, Box::new(log), Some(dir))?;
        info!(path = %path.display(), "opened store");
        Ok(db)
    }

    /// Opens a store that lives only as long as the connection.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidArgument`] if the options are out of
    /// range.
    pub fn open_in_memory(options: EngineOptions) -> EngineResult<Self> {
        Self::recover(options, Box::new(MemoryLog::new()), None)
    }

    /// Opens a store over an existing log storage.
    ///
    /// # Errors
    ///
    /// Returns an error if the log cannot be read, or if it is damaged and
    /// `paranoid_checks` is set.
    pub fn open_with_log(options: EngineOptions, storage: Box<dyn LogStorage>) -> EngineResult<Self> {
        Self::recover(options, storage, None)
    }

    fn recover(
        options: EngineOptions,
        storage: Box<dyn LogStorage>,
        dir: Option<StoreDir>,
    ) -> EngineResult<Self> {
        options.validate()?;
        let mut log = RecordLog::new(storage);
        let replay = log.replay()?;

        if let Some(damage) = replay.damage {
            if options.paranoid_checks {
                return Err(EngineError::corruption(damage));
            }
            warn!(
                %damage,
                valid_len = replay.valid_len,
                total_len = replay.total_len,
                "dropping damaged log tail"
            );
            log.truncate(replay.valid_len)?;
        }

        let mut map = VersionedMap::new();
        let mut last_seq = 0;
        for record in &replay.records {
            let seq = record.seq();
            match record {
                LogRecord::Put { key, value, .. } => map.insert(key, seq, Some(value.clone()), seq),
                LogRecord::Delete { key, .. } => map.insert(key, seq, None, seq),
                LogRecord::Batch { ops, .. } => map.apply(ops, seq, seq),
            }
            last_seq = last_seq.max(seq);
        }
        debug!(records = replay.records.len(), last_seq, "replayed log");

        Ok(Self {
            path: dir.as_ref().map(|d| d.path().to_path_buf()),
            options,
            shared: Arc::new(Shared {
                map: RwLock::new(map),
                pins: Mutex::new(Pins::default()),
                last_seq: AtomicU64::new(last_seq),
            }),
            writer: Mutex::new(Some(Writer { log, dir })),
            closed: AtomicBool::new(false),
        })
    }

    /// Returns the options the connection was opened with.
    #[must_use]
    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    /// Returns the store directory, or `None` for a store without one.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Returns true once [`Engine::close`] has been called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Returns the last committed sequence.
    #[must_use]
    pub fn sequence(&self) -> Sequence {
        self.shared.last_seq.load(Ordering::Acquire)
    }

    fn ensure_open(&self) -> EngineResult<()> {
        if self.is_closed() {
            Err(EngineError::Closed)
        } else {
            Ok(())
        }
    }

    /// Logs and publishes one write at the next sequence.
    fn commit(&self, record: impl FnOnce(Sequence) -> LogRecord) -> EngineResult<()> {
        let mut writer = self.writer.lock();
        let writer = writer.as_mut().ok_or(EngineError::Closed)?;

        let seq = self.shared.last_seq.load(Ordering::Acquire) + 1;
        let record = record(seq);

        let before = writer.log.size()?;
        if let Err(e) = writer.log.append(&record) {
            // Drop any partial frame so later records stay reachable.
            if let Err(cleanup) = writer.log.truncate(before) {
                warn!(error = %cleanup, "failed to drop partial log record");
            }
            return Err(e);
        }

        let mut map = self.shared.map.write();
        let floor = self.shared.floor(seq);
        match &record {
            LogRecord::Put { key, value, .. } => map.insert(key, seq, Some(value.clone()), floor),
            LogRecord::Delete { key, .. } => map.insert(key, seq, None, floor),
            LogRecord::Batch { ops, .. } => map.apply(ops, seq, floor),
        }
        self.shared.last_seq.store(seq, Ordering::Release);
        Ok(())
    }

    /// Rewrites the log as one put per live key.
    fn compact(&self, writer: &mut Writer) -> EngineResult<()> {
        let map = self.shared.map.read();
        let seq = self.shared.last_seq.load(Ordering::Acquire);
        let records: Vec<LogRecord> = map
            .live_entries(seq)
            .map(|(key, value)| LogRecord::Put {
                seq,
                key: key.to_vec(),
                value: value.to_vec(),
            })
            .collect();
        drop(map);

        debug!(live = records.len(), "compacting log");
        writer.log.rewrite(&records)?;
        writer.log.sync()
    }
}

impl Engine for Db {
    fn get(&self, key: &[u8]) -> EngineResult<Option<Vec<u8>>> {
        self.ensure_open()?;
        let map = self.shared.map.read();
        let seq = self.shared.last_seq.load(Ordering::Acquire);
        Ok(map.get(key, seq).map(<[u8]>::to_vec))
    }

    fn put(&self, key: &[u8], value: &[u8]) -> EngineResult<()> {
        self.commit(|seq| LogRecord::Put {
            seq,
            key: key.to_vec(),
            value: value.to_vec(),
        })
    }

    fn delete(&self, key: &[u8]) -> EngineResult<()> {
        self.commit(|seq| LogRecord::Delete {
            seq,
            key: key.to_vec(),
        })
    }

    fn apply(&self, batch: &WriteBatchRep) -> EngineResult<()> {
        if batch.is_empty() {
            return self.ensure_open();
        }
        self.commit(|seq| LogRecord::batch(seq, batch))
    }

    fn cursor_open(&self) -> EngineResult<Box<dyn EngineCursor>> {
        self.ensure_open()?;
        Ok(Box::new(DbCursor::new(self.shared.pin_latest())))
    }

    fn snapshot(&self) -> EngineResult<Box<dyn EngineSnapshot>> {
        self.ensure_open()?;
        Ok(Box::new(DbSnapshot {
            pin: self.shared.pin_latest(),
        }))
    }

    fn property(&self, name: &str) -> Option<String> {
        if self.is_closed() {
            return None;
        }
        match name {
            PROPERTY_OPTIONS => Some(self.options.to_string()),
            PROPERTY_NUM_ENTRIES => {
                let map = self.shared.map.read();
                let seq = self.shared.last_seq.load(Ordering::Acquire);
                Some(map.live_entries(seq).count().to_string())
            }
            PROPERTY_SEQUENCE => Some(self.sequence().to_string()),
            PROPERTY_PINNED => Some(self.shared.pins.lock().len().to_string()),
            _ => None,
        }
    }

    fn close(&self) -> EngineResult<()> {
        let Some(mut writer) = self.writer.lock().take() else {
            return Ok(());
        };
        self.closed.store(true, Ordering::Release);

        let result = self.compact(&mut writer);
        if let Err(e) = &result {
            warn!(error = %e, "log compaction failed on close");
        }
        if let Some(dir) = writer.dir.take() {
            info!(path = %dir.path().display(), "closed store");
        }
        result
    }
}

impl Drop for Db {
    fn drop(&mut self) {
        let _ = Engine::close(self);
    }
}

impl std::fmt::Debug for Db {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Db")
            .field("path", &self.path)
            .field("options", &self.options)
            .field("sequence", &self.sequence())
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// Cursor over a pinned sequence.
///
/// The current entry is copied out so the map lock is only held while
/// moving.
#[derive(Debug)]
struct DbCursor {
    pin: PinGuard,
    current: Option<(Vec<u8>, Vec<u8>)>,
}

impl DbCursor {
    fn new(pin: PinGuard) -> Self {
        Self { pin, current: None }
    }

    fn position(
        &mut self,
        find: impl for<'a> FnOnce(&'a VersionedMap, Sequence) -> Option<(&'a [u8], &'a [u8])>,
    ) {
        let map = self.pin.shared.map.read();
        self.current = find(&*map, self.pin.seq).map(|(k, v)| (k.to_vec(), v.to_vec()));
    }
}

impl EngineCursor for DbCursor {
    fn seek_to_first(&mut self) {
        self.position(VersionedMap::first);
    }

    fn seek_to_last(&mut self) {
        self.position(VersionedMap::last);
    }

    fn seek(&mut self, target: &[u8]) {
        self.position(|map, seq| map.seek(target, seq));
    }

    fn next(&mut self) {
        if let Some((key, _)) = self.current.take() {
            self.position(|map, seq| map.after(&key, seq));
        }
    }

    fn prev(&mut self) {
        if let Some((key, _)) = self.current.take() {
            self.position(|map, seq| map.before(&key, seq));
        }
    }

    fn valid(&self) -> bool {
        self.current.is_some()
    }

    fn key(&self) -> Option<&[u8]> {
        self.current.as_ref().map(|(k, _)| k.as_slice())
    }

    fn value(&self) -> Option<&[u8]> {
        self.current.as_ref().map(|(_, v)| v.as_slice())
    }
}

/// Point-in-time view over a pinned sequence.
#[derive(Debug)]
struct DbSnapshot {
    pin: PinGuard,
}

impl EngineSnapshot for DbSnapshot {
    fn sequence(&self) -> Sequence {
        self.pin.seq
    }

    fn get(&self, key: &[u8]) -> EngineResult<Option<Vec<u8>>> {
        let map = self.pin.shared.map.read();
        Ok(map.get(key, self.pin.seq).map(<[u8]>::to_vec))
    }

    fn cursor(&self) -> Box<dyn EngineCursor> {
        Box::new(DbCursor::new(self.pin.shared.pin_again(self.pin.seq)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn db() -> Db {
        Db::open_in_memory(EngineOptions::default()).unwrap()
    }

    fn scan(cursor: &mut dyn EngineCursor) -> Vec<Vec<u8>> {
        let mut keys = Vec::new();
        cursor.seek_to_first();
        while cursor.valid() {
            keys.push(cursor.key().unwrap().to_vec());
            cursor.next();
        }
        keys
    }

    #[test]
    fn put_get_delete() {
        let db = db();
        db.put(b"k", b"v").unwrap();
        assert_eq!(db.get(b"k").unwrap(), Some(b"v".to_vec()));

        db.delete(b"k").unwrap();
        assert_eq!(db.get(b"k").unwrap(), None);
        db.delete(b"never-there").unwrap();
    }

    #[test]
    fn each_write_advances_sequence() {
        let db = db();
        assert_eq!(db.sequence(), 0);
        db.put(b"a", b"1").unwrap();
        db.delete(b"a").unwrap();
        assert_eq!(db.sequence(), 2);

        let mut batch = WriteBatchRep::new();
        batch.put(b"x", b"1");
        batch.put(b"y", b"2");
        db.apply(&batch).unwrap();
        assert_eq!(db.sequence(), 3);
    }

    #[test]
    fn empty_batch_commits_nothing() {
        let db = db();
        db.apply(&WriteBatchRep::new()).unwrap();
        assert_eq!(db.sequence(), 0);
    }

    #[test]
    fn cursor_does_not_see_later_writes() {
        let db = db();
        db.put(b"a", b"1").unwrap();
        db.put(b"c", b"3").unwrap();

        let mut cursor = db.cursor_open().unwrap();
        db.put(b"b", b"2").unwrap();
        db.delete(b"c").unwrap();
        db.put(b"a", b"changed").unwrap();

        assert_eq!(scan(cursor.as_mut()), vec![b"a".to_vec(), b"c".to_vec()]);
        cursor.seek(b"a");
        assert_eq!(cursor.value(), Some(&b"1"[..]));
    }

    #[test]
    fn cursor_moves_both_ways() {
        let db = db();
        for key in [b"a", b"b", b"c"] {
            db.put(key, key).unwrap();
        }

        let mut cursor = db.cursor_open().unwrap();
        assert!(!cursor.valid());

        cursor.seek_to_last();
        assert_eq!(cursor.key(), Some(&b"c"[..]));
        cursor.prev();
        assert_eq!(cursor.key(), Some(&b"b"[..]));
        cursor.next();
        assert_eq!(cursor.key(), Some(&b"c"[..]));
        cursor.next();
        assert!(!cursor.valid());

        cursor.next();
        assert!(!cursor.valid());
        cursor.seek(b"bb");
        assert_eq!(cursor.key(), Some(&b"c"[..]));
        cursor.seek(b"d");
        assert!(!cursor.valid());
    }

    #[test]
    fn snapshot_pins_until_dropped() {
        let db = db();
        db.put(b"k", b"old").unwrap();

        let snapshot = db.snapshot().unwrap();
        db.put(b"k", b"new").unwrap();
        assert_eq!(snapshot.get(b"k").unwrap(), Some(b"old".to_vec()));
        assert_eq!(db.property(PROPERTY_PINNED).as_deref(), Some("1"));

        let mut cursor = snapshot.cursor();
        drop(snapshot);
        cursor.seek_to_first();
        assert_eq!(cursor.value(), Some(&b"old"[..]));

        drop(cursor);
        assert_eq!(db.property(PROPERTY_PINNED).as_deref(), Some("0"));
    }

    #[test]
    fn closing_last_reader_releases_deleted_versions() {
        let db = db();
        let keys: Vec<Vec<u8>> = (0..1000u32).map(|i| i.to_be_bytes().to_vec()).collect();
        for key in &keys {
            db.put(key, b"v").unwrap();
        }

        let mut cursor = db.cursor_open().unwrap();
        for key in &keys {
            db.delete(key).unwrap();
        }
        assert_eq!(scan(cursor.as_mut()).len(), 1000);
        assert_eq!(db.shared.map.read().total_versions(), 2000);

        drop(cursor);
        assert_eq!(db.property(PROPERTY_NUM_ENTRIES).as_deref(), Some("0"));
        assert_eq!(db.shared.map.read().total_versions(), 0);
    }

    #[test]
    fn sweep_waits_for_oldest_reader() {
        let db = db();
        db.put(b"k", b"one").unwrap();
        let old = db.snapshot().unwrap();
        db.put(b"k", b"two").unwrap();
        let newer = db.snapshot().unwrap();
        db.put(b"k", b"three").unwrap();

        drop(newer);
        assert_eq!(old.get(b"k").unwrap(), Some(b"one".to_vec()));

        drop(old);
        assert_eq!(db.shared.map.read().total_versions(), 1);
        assert_eq!(db.get(b"k").unwrap(), Some(b"three".to_vec()));
    }

    #[test]
    fn properties() {
        let db = db();
        db.put(b"a", b"1").unwrap();
        db.put(b"b", b"2").unwrap();
        db.delete(b"a").unwrap();

        assert_eq!(db.property(PROPERTY_NUM_ENTRIES).as_deref(), Some("1"));
        assert_eq!(db.property(PROPERTY_SEQUENCE).as_deref(), Some("3"));
        assert!(db
            .property(PROPERTY_OPTIONS)
            .unwrap()
            .contains("compression=true"));
        assert_eq!(db.property("burrow.unknown"), None);
    }

    #[test]
    fn closed_connection_rejects_operations() {
        let db = db();
        db.close().unwrap();
        db.close().unwrap();

        assert!(db.is_closed());
        assert!(matches!(db.get(b"k"), Err(EngineError::Closed)));
        assert!(matches!(db.put(b"k", b"v"), Err(EngineError::Closed)));
        assert!(matches!(db.cursor_open(), Err(EngineError::Closed)));
        assert!(matches!(db.snapshot(), Err(EngineError::Closed)));
        assert_eq!(db.property(PROPERTY_SEQUENCE), None);
    }

    #[test]
    fn close_compacts_log() {
        let log = MemoryLog::new();
        let db = Db::open_with_log(EngineOptions::default(), Box::new(log.clone())).unwrap();
        for i in 0..10u8 {
            db.put(b"hot", &[i]).unwrap();
        }
        db.delete(b"hot").unwrap();
        db.put(b"kept", b"v").unwrap();
        let before = log.data().len();
        db.close().unwrap();

        assert!(log.data().len() < before);
        let db = Db::open_with_log(EngineOptions::default(), Box::new(log)).unwrap();
        assert_eq!(db.get(b"hot").unwrap(), None);
        assert_eq!(db.get(b"kept").unwrap(), Some(b"v".to_vec()));
        assert_eq!(db.property(PROPERTY_NUM_ENTRIES).as_deref(), Some("1"));
    }
}
