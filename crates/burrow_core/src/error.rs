//! Error types for Burrow operations.

use crate::cursor::CursorState;
use crate::resource::Resource;
use burrow_engine::EngineError;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for Burrow operations.
pub type BurrowResult<T> = Result<T, BurrowError>;

/// Errors that can occur in Burrow operations.
///
/// Variants fall in two groups. `OpenFailure`, `AlreadyExists`,
/// `IoFailure` and `ApplyFailure` mean the engine reported a problem.
/// `Closed`, `InvalidCursorState` and `AlreadyApplied` mean the caller used
/// a resource out of order; see [`BurrowError::is_contract_violation`].
#[derive(Debug, Error)]
pub enum BurrowError {
    /// The store could not be opened.
    #[error("failed to open store at {}: {source}", path.display())]
    OpenFailure {
        /// Store directory.
        path: PathBuf,
        /// Engine error.
        #[source]
        source: EngineError,
    },

    /// The store exists and `error_if_exists` was set.
    #[error("store already exists: {}", path.display())]
    AlreadyExists {
        /// Store directory.
        path: PathBuf,
    },

    /// The engine failed a read or write.
    #[error("engine failure: {0}")]
    IoFailure(#[source] EngineError),

    /// The engine failed to apply a write batch.
    #[error("write batch apply failed: {0}")]
    ApplyFailure(#[source] EngineError),

    /// The resource was already released.
    #[error("{resource} is closed")]
    Closed {
        /// Which resource.
        resource: Resource,
    },

    /// A cursor operation was called while the cursor was not positioned.
    #[error("cannot call {op} on a cursor that is {state}")]
    InvalidCursorState {
        /// Operation that was attempted.
        op: &'static str,
        /// Cursor state at the time.
        state: CursorState,
    },

    /// A write batch was modified after `write()` consumed it.
    #[error("write batch has already been written")]
    AlreadyApplied,
}

impl BurrowError {
    /// Creates a closed error.
    pub fn closed(resource: Resource) -> Self {
        Self::Closed { resource }
    }

    /// Wraps an engine failure on a read or write.
    ///
    /// An engine that reports itself closed means the store was closed
    /// under the caller.
    pub fn io(error: EngineError) -> Self {
        match error {
            EngineError::Closed => Self::closed(Resource::Store),
            other => Self::IoFailure(other),
        }
    }

    /// Maps an engine open error.
    pub(crate) fn open(path: PathBuf, error: EngineError) -> Self {
        match error {
            EngineError::AlreadyExists { .. } => Self::AlreadyExists { path },
            source => Self::OpenFailure { path, source },
        }
    }

    /// Returns true for errors caused by using a resource out of order,
    /// as opposed to failures reported by the engine.
    #[must_use]
    pub fn is_contract_violation(&self) -> bool {
        matches!(
            self,
            Self::Closed { .. } | Self::InvalidCursorState { .. } | Self::AlreadyApplied
        )
    }
}
