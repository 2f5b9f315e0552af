//! Error types for engine operations.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors reported by the engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// No store exists at the path and creation was not requested.
    #[error("store does not exist: {}", path.display())]
    NotFound {
        /// Store directory.
        path: PathBuf,
    },

    /// A store exists at the path and `error_if_exists` was set.
    #[error("store already exists: {}", path.display())]
    AlreadyExists {
        /// Store directory.
        path: PathBuf,
    },

    /// Another connection holds the store's lock.
    #[error("store is locked by another connection: {}", path.display())]
    Locked {
        /// Store directory.
        path: PathBuf,
    },

    /// The store's files are damaged.
    #[error("store corrupted: {0}")]
    Corruption(String),

    /// The connection has been closed.
    #[error("connection is closed")]
    Closed,

    /// An argument was rejected by the engine.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl EngineError {
    /// Creates a corruption error.
    pub fn corruption(message: impl Into<String>) -> Self {
        Self::Corruption(message.into())
    }

    /// Creates an invalid argument error.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }
}
