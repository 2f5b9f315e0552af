//! Log record types and serialization.
//!
//! Every record is framed as:
//!
//! ```text
//! ┌───────────┬─────────────┬──────────┬────────────┬─────────┬─────────┐
//! │ magic (4) │ version (2) │ type (1) │ length (4) │ payload │ crc (4) │
//! └───────────┴─────────────┴──────────┴────────────┴─────────┴─────────┘
//! ```
//!
//! The CRC32 covers everything before it. Integers are little-endian.

use crate::batch::{BatchOp, WriteBatchRep};
use crate::error::{EngineError, EngineResult};
use crate::Sequence;

/// Magic bytes identifying a log record.
pub const LOG_MAGIC: [u8; 4] = *b"BLOG";

/// Current log format version.
pub const LOG_VERSION: u16 = 1;

/// magic (4) + version (2) + type (1) + length (4)
pub const HEADER_SIZE: usize = 11;

/// Trailing checksum size.
pub const CRC_SIZE: usize = 4;

const OP_PUT: u8 = 1;
const OP_DELETE: u8 = 2;

/// Type tag of a log record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RecordType {
    /// Single put.
    Put = 1,
    /// Single delete.
    Delete = 2,
    /// Atomic group of puts and deletes.
    Batch = 3,
}

impl RecordType {
    /// Converts a byte to a record type.
    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            1 => Some(Self::Put),
            2 => Some(Self::Delete),
            3 => Some(Self::Batch),
            _ => None,
        }
    }
}

/// A committed write as stored in the log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogRecord {
    /// Put of one key.
    Put {
        /// Commit sequence.
        seq: Sequence,
        /// Key bytes.
        key: Vec<u8>,
        /// Value bytes.
        value: Vec<u8>,
    },
    /// Delete of one key.
    Delete {
        /// Commit sequence.
        seq: Sequence,
        /// Key bytes.
        key: Vec<u8>,
    },
    /// A batch, all operations sharing one sequence.
    Batch {
        /// Commit sequence.
        seq: Sequence,
        /// Operations in append order.
        ops: Vec<BatchOp>,
    },
}

impl LogRecord {
    /// Builds a batch record from a batch token.
    pub fn batch(seq: Sequence, batch: &WriteBatchRep) -> Self {
        Self::Batch {
            seq,
            ops: batch.ops().to_vec(),
        }
    }

    /// Returns the commit sequence.
    #[must_use]
    pub fn seq(&self) -> Sequence {
        match self {
            Self::Put { seq, .. } | Self::Delete { seq, .. } | Self::Batch { seq, .. } => *seq,
        }
    }

    /// Returns the record type.
    #[must_use]
    pub fn record_type(&self) -> RecordType {
        match self {
            Self::Put { .. } => RecordType::Put,
            Self::Delete { .. } => RecordType::Delete,
            Self::Batch { .. } => RecordType::Batch,
        }
    }

    /// Serializes the record with its envelope.
    ///
    /// # Errors
    ///
    /// Returns an error if a key, value or the payload does not fit a
    /// 4-byte length field.
    pub fn encode(&self) -> EngineResult<Vec<u8>> {
        let payload = self.encode_payload()?;
        let len = u32::try_from(payload.len())
            .map_err(|_| EngineError::invalid_argument("log record payload too large"))?;

        let mut data = Vec::with_capacity(HEADER_SIZE + payload.len() + CRC_SIZE);
        data.extend_from_slice(&LOG_MAGIC);
        data.extend_from_slice(&LOG_VERSION.to_le_bytes());
        data.push(self.record_type() as u8);
        data.extend_from_slice(&len.to_le_bytes());
        data.extend_from_slice(&payload);

        let crc = crc32fast::hash(&data);
        data.extend_from_slice(&crc.to_le_bytes());
        Ok(data)
    }

    fn encode_payload(&self) -> EngineResult<Vec<u8>> {
        let mut buf = Vec::new();
        buf.extend_from_slice(&self.seq().to_le_bytes());

        match self {
            Self::Put { key, value, .. } => {
                put_bytes(&mut buf, key)?;
                put_bytes(&mut buf, value)?;
            }
            Self::Delete { key, .. } => {
                put_bytes(&mut buf, key)?;
            }
            Self::Batch { ops, .. } => {
                let count = u32::try_from(ops.len())
                    .map_err(|_| EngineError::invalid_argument("too many batch operations"))?;
                buf.extend_from_slice(&count.to_le_bytes());
                for op in ops {
                    match op {
                        BatchOp::Put { key, value } => {
                            buf.push(OP_PUT);
                            put_bytes(&mut buf, key)?;
                            put_bytes(&mut buf, value)?;
                        }
                        BatchOp::Delete { key } => {
                            buf.push(OP_DELETE);
                            put_bytes(&mut buf, key)?;
                        }
                    }
                }
            }
        }

        Ok(buf)
    }

    /// Deserializes a record from its type and payload.
    ///
    /// # Errors
    ///
    /// Returns a corruption error if the payload is malformed.
    pub fn decode_payload(record_type: RecordType, payload: &[u8]) -> EngineResult<Self> {
        let mut reader = PayloadReader::new(payload);
        let seq = reader.u64()?;

        let record = match record_type {
            RecordType::Put => Self::Put {
                seq,
                key: reader.bytes()?,
                value: reader.bytes()?,
            },
            RecordType::Delete => Self::Delete {
                seq,
                key: reader.bytes()?,
            },
            RecordType::Batch => {
                let count = reader.u32()? as usize;
                let mut ops = Vec::with_capacity(count.min(1024));
                for _ in 0..count {
                    let op = match reader.u8()? {
                        OP_PUT => BatchOp::Put {
                            key: reader.bytes()?,
                            value: reader.bytes()?,
                        },
                        OP_DELETE => BatchOp::Delete {
                            key: reader.bytes()?,
                        },
                        other => {
                            return Err(EngineError::corruption(format!(
                                "unknown batch operation tag {other}"
                            )))
                        }
                    };
                    ops.push(op);
                }
                Self::Batch { seq, ops }
            }
        };

        reader.finish()?;
        Ok(record)
    }
}

fn put_bytes(buf: &mut Vec<u8>, bytes: &[u8]) -> EngineResult<()> {
    let len = u32::try_from(bytes.len())
        .map_err(|_| EngineError::invalid_argument("key or value exceeds 4 GiB"))?;
    buf.extend_from_slice(&len.to_le_bytes());
    buf.extend_from_slice(bytes);
    Ok(())
}

/// Bounds-checked reader over a record payload.
struct PayloadReader<'a> {
    payload: &'a [u8],
    pos: usize,
}

impl<'a> PayloadReader<'a> {
    fn new(payload: &'a [u8]) -> Self {
        Self { payload, pos: 0 }
    }

    fn take(&mut self, n: usize) -> EngineResult<&'a [u8]> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|end| *end <= self.payload.len())
            .ok_or_else(|| EngineError::corruption("unexpected end of record payload"))?;
        let slice = &self.payload[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn u8(&mut self) -> EngineResult<u8> {
        Ok(self.take(1)?[0])
    }

    fn u32(&mut self) -> EngineResult<u32> {
        let bytes: [u8; 4] = self
            .take(4)?
            .try_into()
            .map_err(|_| EngineError::corruption("invalid u32"))?;
        Ok(u32::from_le_bytes(bytes))
    }

    fn u64(&mut self) -> EngineResult<u64> {
        let bytes: [u8; 8] = self
            .take(8)?
            .try_into()
            .map_err(|_| EngineError::corruption("invalid u64"))?;
        Ok(u64::from_le_bytes(bytes))
    }

    fn bytes(&mut self) -> EngineResult<Vec<u8>> {
        let len = self.u32()? as usize;
        Ok(self.take(len)?.to_vec())
    }

    fn finish(&self) -> EngineResult<()> {
        if self.pos != self.payload.len() {
            return Err(EngineError::corruption(format!(
                "trailing bytes in record payload: used {} of {}",
                self.pos,
                self.payload.len()
            )));
        }
        Ok(())
    }
}
