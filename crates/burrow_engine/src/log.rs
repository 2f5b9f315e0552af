//! Record log: framing on top of a [`LogStorage`].

use crate::error::EngineResult;
use crate::record::{LogRecord, RecordType, CRC_SIZE, HEADER_SIZE, LOG_MAGIC, LOG_VERSION};
use crate::storage::LogStorage;

/// Outcome of reading the log back.
#[derive(Debug)]
pub(crate) struct Replay {
    /// Records that passed framing and checksum, in log order.
    pub records: Vec<LogRecord>,
    /// Byte length of the undamaged prefix.
    pub valid_len: u64,
    /// Total log length.
    pub total_len: u64,
    /// Why reading stopped early, if it did.
    pub damage: Option<String>,
}

/// Append-only log of committed writes.
pub(crate) struct RecordLog {
    storage: Box<dyn LogStorage>,
}

impl RecordLog {
    pub fn new(storage: Box<dyn LogStorage>) -> Self {
        Self { storage }
    }

    /// Appends one record.
    pub fn append(&mut self, record: &LogRecord) -> EngineResult<u64> {
        let data = record.encode()?;
        self.storage.append(&data)
    }

    pub fn sync(&mut self) -> EngineResult<()> {
        self.storage.sync()
    }

    pub fn size(&self) -> EngineResult<u64> {
        self.storage.size()
    }

    pub fn truncate(&mut self, len: u64) -> EngineResult<()> {
        self.storage.truncate(len)
    }

    /// Replaces the log with `records`.
    pub fn rewrite(&mut self, records: &[LogRecord]) -> EngineResult<()> {
        let mut data = Vec::new();
        for record in records {
            data.extend_from_slice(&record.encode()?);
        }
        self.storage.rewrite(&data)
    }

    /// Reads every intact record.
    ///
    /// Stops at the first record that is torn (shorter than its header
    /// announces), fails its checksum, or does not decode. Everything after
    /// that point is reported as damage rather than an error; the caller
    /// decides whether to truncate or refuse.
    pub fn replay(&self) -> EngineResult<Replay> {
        let data = self.storage.read_all()?;
        let total_len = data.len() as u64;
        let mut records = Vec::new();
        let mut offset = 0usize;
        let mut damage = None;

        while offset < data.len() {
            match parse_record(&data[offset..]) {
                Ok((record, consumed)) => {
                    records.push(record);
                    offset += consumed;
                }
                Err(reason) => {
                    damage = Some(format!("{reason} at offset {offset}"));
                    break;
                }
            }
        }

        Ok(Replay {
            records,
            valid_len: offset as u64,
            total_len,
            damage,
        })
    }
}

fn parse_record(data: &[u8]) -> Result<(LogRecord, usize), String> {
    if data.len() < HEADER_SIZE {
        return Err("torn record header".to_string());
    }
    if data[0..4] != LOG_MAGIC {
        return Err("bad record magic".to_string());
    }

    let version = u16::from_le_bytes([data[4], data[5]]);
    if version != LOG_VERSION {
        return Err(format!("unsupported record version {version}"));
    }

    let record_type =
        RecordType::from_byte(data[6]).ok_or_else(|| format!("unknown record type {}", data[6]))?;
    let len = u32::from_le_bytes([data[7], data[8], data[9], data[10]]) as usize;

    let body_end = HEADER_SIZE + len;
    let total = body_end + CRC_SIZE;
    if data.len() < total {
        return Err("torn record body".to_string());
    }

    let stored_crc = u32::from_le_bytes([
        data[body_end],
        data[body_end + 1],
        data[body_end + 2],
        data[body_end + 3],
    ]);
    let actual_crc = crc32fast::hash(&data[..body_end]);
    if stored_crc != actual_crc {
        return Err(format!(
            "checksum mismatch: expected {stored_crc:08x}, got {actual_crc:08x}"
        ));
    }

    let record = LogRecord::decode_payload(record_type, &data[HEADER_SIZE..body_end])
        .map_err(|e| e.to_string())?;
    Ok((record, total))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryLog;

    fn put(seq: u64, key: &[u8], value: &[u8]) -> LogRecord {
        LogRecord::Put {
            seq,
            key: key.to_vec(),
            value: value.to_vec(),
        }
    }

    #[test]
    fn replay_returns_records_in_order() {
        let storage = MemoryLog::new();
        let mut log = RecordLog::new(Box::new(storage.clone()));
        log.append(&put(1, b"a", b"1")).unwrap();
        log.append(&LogRecord::Delete {
            seq: 2,
            key: b"a".to_vec(),
        })
        .unwrap();

        let replay = log.replay().unwrap();
        assert_eq!(replay.records.len(), 2);
        assert_eq!(replay.records[1].seq(), 2);
        assert!(replay.damage.is_none());
        assert_eq!(replay.valid_len, replay.total_len);
    }

    #[test]
    fn torn_tail_is_reported() {
        let storage = MemoryLog::new();
        let mut log = RecordLog::new(Box::new(storage.clone()));
        log.append(&put(1, b"a", b"1")).unwrap();
        let intact = log.size().unwrap();

        let partial = put(2, b"b", b"2").encode().unwrap();
        let mut raw = storage.data();
        raw.extend_from_slice(&partial[..partial.len() - 3]);

        let log = RecordLog::new(Box::new(MemoryLog::with_data(raw)));
        let replay = log.replay().unwrap();
        assert_eq!(replay.records.len(), 1);
        assert_eq!(replay.valid_len, intact);
        assert!(replay.damage.unwrap().contains("torn"));
    }

    #[test]
    fn flipped_bit_fails_checksum() {
        let mut raw = put(1, b"key", b"value").encode().unwrap();
        raw[HEADER_SIZE + 9] ^= 0x01;

        let log = RecordLog::new(Box::new(MemoryLog::with_data(raw)));
        let replay = log.replay().unwrap();
        assert!(replay.records.is_empty());
        assert_eq!(replay.valid_len, 0);
        assert!(replay.damage.unwrap().contains("checksum"));
    }

    #[test]
    fn rewrite_replaces_records() {
        let storage = MemoryLog::new();
        let mut log = RecordLog::new(Box::new(storage.clone()));
        log.append(&put(1, b"a", b"1")).unwrap();
        log.append(&put(2, b"a", b"2")).unwrap();

        log.rewrite(&[put(2, b"a", b"2")]).unwrap();
        let replay = log.replay().unwrap();
        assert_eq!(replay.records, vec![put(2, b"a", b"2")]);
    }
}
