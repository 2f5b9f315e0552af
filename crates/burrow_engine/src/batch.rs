//! Batch token.

/// One operation recorded in a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOp {
    /// Insert or overwrite a key.
    Put {
        /// Key bytes.
        key: Vec<u8>,
        /// Value bytes.
        value: Vec<u8>,
    },
    /// Remove a key.
    Delete {
        /// Key bytes.
        key: Vec<u8>,
    },
}

impl BatchOp {
    /// Returns the key this operation targets.
    #[must_use]
    pub fn key(&self) -> &[u8] {
        match self {
            Self::Put { key, .. } | Self::Delete { key } => key,
        }
    }
}

/// An ordered list of operations applied as one unit by
/// [`crate::Engine::apply`].
///
/// Operations are kept in append order. When a key appears more than once
/// the later operation wins, including across put/delete.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteBatchRep {
    ops: Vec<BatchOp>,
    byte_size: usize,
}

impl WriteBatchRep {
    /// Creates an empty batch.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a put.
    pub fn put(&mut self, key: &[u8], value: &[u8]) {
        self.byte_size += key.len() + value.len();
        self.ops.push(BatchOp::Put {
            key: key.to_vec(),
            value: value.to_vec(),
        });
    }

    /// Appends a delete.
    pub fn delete(&mut self, key: &[u8]) {
        self.byte_size += key.len();
        self.ops.push(BatchOp::Delete { key: key.to_vec() });
    }

    /// Returns the operations in append order.
    #[must_use]
    pub fn ops(&self) -> &[BatchOp] {
        &self.ops
    }

    /// Returns the number of recorded operations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// Returns true if no operation has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Total key and value bytes recorded.
    #[must_use]
    pub fn byte_size(&self) -> usize {
        self.byte_size
    }

    /// Drops every recorded operation.
    pub fn clear(&mut self) {
        self.ops.clear();
        self.byte_size = 0;
    }
}
