//! Status codes and the per-thread last error.

use burrow_core::{BurrowError, EngineError};
use std::cell::RefCell;
use std::ffi::{c_char, CString};
use thiserror::Error;

/// Status code returned by every FFI function.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BurrowStatus {
    /// Operation succeeded.
    Ok = 0,
    /// Generic error.
    Error = 1,
    /// Invalid argument.
    InvalidArgument = 2,
    /// Key not found.
    NotFound = 3,
    /// The handle, or the store it belongs to, is closed.
    Closed = 4,
    /// The store could not be opened.
    OpenFailure = 5,
    /// The store exists and `error_if_exists` was set.
    AlreadyExists = 6,
    /// The store directory is held by another process.
    Locked = 7,
    /// Stored data failed verification.
    Corruption = 8,
    /// A read or write failed in the engine.
    IoError = 9,
    /// The engine rejected a write batch.
    ApplyFailure = 10,
    /// Cursor movement or access without a position.
    InvalidCursorState = 11,
    /// Write batch modified after it was written.
    AlreadyApplied = 12,
    /// Null pointer.
    NullPointer = 13,
}

impl BurrowStatus {
    /// Returns true if the status indicates success.
    pub fn is_ok(self) -> bool {
        self == BurrowStatus::Ok
    }

    /// Returns true if the status indicates an error.
    pub fn is_err(self) -> bool {
        self != BurrowStatus::Ok
    }
}

/// Status code type for C compatibility.
pub type StatusCode = i32;

impl From<BurrowStatus> for StatusCode {
    fn from(status: BurrowStatus) -> Self {
        status as StatusCode
    }
}

impl From<StatusCode> for BurrowStatus {
    fn from(code: StatusCode) -> Self {
        match code {
            0 => BurrowStatus::Ok,
            2 => BurrowStatus::InvalidArgument,
            3 => BurrowStatus::NotFound,
            4 => BurrowStatus::Closed,
            5 => BurrowStatus::OpenFailure,
            6 => BurrowStatus::AlreadyExists,
            7 => BurrowStatus::Locked,
            8 => BurrowStatus::Corruption,
            9 => BurrowStatus::IoError,
            10 => BurrowStatus::ApplyFailure,
            11 => BurrowStatus::InvalidCursorState,
            12 => BurrowStatus::AlreadyApplied,
            13 => BurrowStatus::NullPointer,
            _ => BurrowStatus::Error,
        }
    }
}

impl From<&BurrowError> for BurrowStatus {
    fn from(err: &BurrowError) -> Self {
        match err {
            BurrowError::OpenFailure { source, .. } => match source {
                EngineError::Locked { .. } => BurrowStatus::Locked,
                EngineError::Corruption(_) => BurrowStatus::Corruption,
                EngineError::InvalidArgument(_) => BurrowStatus::InvalidArgument,
                _ => BurrowStatus::OpenFailure,
            },
            BurrowError::AlreadyExists { .. } => BurrowStatus::AlreadyExists,
            BurrowError::IoFailure(EngineError::Corruption(_)) => BurrowStatus::Corruption,
            BurrowError::IoFailure(_) => BurrowStatus::IoError,
            BurrowError::ApplyFailure(_) => BurrowStatus::ApplyFailure,
            BurrowError::Closed { .. } => BurrowStatus::Closed,
            BurrowError::InvalidCursorState { .. } => BurrowStatus::InvalidCursorState,
            BurrowError::AlreadyApplied => BurrowStatus::AlreadyApplied,
        }
    }
}

/// Failure of one FFI call, before it is flattened into a status code.
#[derive(Debug, Error)]
pub enum FfiError {
    /// A required pointer argument was null.
    #[error("null pointer argument: {0}")]
    NullPointer(&'static str),

    /// A string argument was not valid UTF-8.
    #[error("invalid UTF-8 in {0}")]
    InvalidUtf8(&'static str),

    /// Error reported by the store.
    #[error(transparent)]
    Burrow(#[from] BurrowError),
}

impl FfiError {
    /// Status code for this error.
    pub fn status(&self) -> BurrowStatus {
        match self {
            FfiError::NullPointer(_) => BurrowStatus::NullPointer,
            FfiError::InvalidUtf8(_) => BurrowStatus::InvalidArgument,
            FfiError::Burrow(e) => e.into(),
        }
    }
}

/// Result of the body of one FFI call.
pub type FfiResult<T> = Result<T, FfiError>;

// Thread-local storage for last error message
thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = const { RefCell::new(None) };
}

/// Sets the last error message.
pub fn set_last_error(message: impl Into<String>) {
    let msg = message.into();
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = CString::new(msg).ok();
    });
}

/// Clears the last error.
pub fn clear_last_error() {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = None;
    });
}

/// Runs the body of an FFI call.
///
/// Clears the last error first; on failure records the message and
/// returns the matching status.
pub(crate) fn run(body: impl FnOnce() -> FfiResult<BurrowStatus>) -> BurrowStatus {
    clear_last_error();
    match body() {
        Ok(status) => status,
        Err(e) => {
            set_last_error(e.to_string());
            e.status()
        }
    }
}

/// Gets the last error message as a C string.
///
/// Returns null if no error is set.
///
/// # Safety
///
/// The returned pointer is valid until the next FFI call on this thread.
#[no_mangle]
pub extern "C" fn burrow_get_last_error() -> *const c_char {
    LAST_ERROR.with(|e| match e.borrow().as_ref() {
        Some(cstr) => cstr.as_ptr(),
        None => std::ptr::null(),
    })
}

/// Clears the last error message.
#[no_mangle]
pub extern "C" fn burrow_clear_error() {
    clear_last_error();
}

#[cfg(test)]
mod tests {
    use super::*;
    use burrow_core::{CursorState, Resource};
    use std::ffi::CStr;
    use std::path::PathBuf;

    #[test]
    fn status_codes() {
        assert_eq!(BurrowStatus::Ok as i32, 0);
        assert_eq!(BurrowStatus::Closed as i32, 4);
        assert!(BurrowStatus::Ok.is_ok());
        assert!(BurrowStatus::NotFound.is_err());
    }

    #[test]
    fn status_code_conversion() {
        let code: StatusCode = BurrowStatus::AlreadyApplied.into();
        assert_eq!(code, 12);
        assert_eq!(BurrowStatus::from(code), BurrowStatus::AlreadyApplied);
        assert_eq!(BurrowStatus::from(999), BurrowStatus::Error);
    }

    #[test]
    fn burrow_errors_map_to_distinct_codes() {
        let locked = BurrowError::OpenFailure {
            path: PathBuf::from("db"),
            source: EngineError::Locked {
                path: PathBuf::from("db/LOCK"),
            },
        };
        assert_eq!(BurrowStatus::from(&locked), BurrowStatus::Locked);

        let closed = BurrowError::closed(Resource::Cursor);
        assert_eq!(BurrowStatus::from(&closed), BurrowStatus::Closed);

        let state = BurrowError::InvalidCursorState {
            op: "next",
            state: CursorState::Unset,
        };
        assert_eq!(BurrowStatus::from(&state), BurrowStatus::InvalidCursorState);
        assert_eq!(
            BurrowStatus::from(&BurrowError::AlreadyApplied),
            BurrowStatus::AlreadyApplied
        );
    }

    #[test]
    fn run_records_last_error() {
        let status = run(|| Err(FfiError::NullPointer("key")));
        assert_eq!(status, BurrowStatus::NullPointer);

        let ptr = burrow_get_last_error();
        assert!(!ptr.is_null());
        let msg = unsafe { CStr::from_ptr(ptr) }.to_str().unwrap();
        assert_eq!(msg, "null pointer argument: key");

        assert_eq!(run(|| Ok(BurrowStatus::Ok)), BurrowStatus::Ok);
        assert!(burrow_get_last_error().is_null());
    }

    #[test]
    fn clear_error() {
        set_last_error("boom");
        burrow_clear_error();
        assert!(burrow_get_last_error().is_null());
    }
}
