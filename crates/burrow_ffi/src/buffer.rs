//! Byte buffers crossing the C boundary.

use crate::error::{FfiError, FfiResult};
use std::ptr::NonNull;

/// Bytes handed to the caller.
///
/// Memory is owned by Rust. Call `burrow_free_buffer` to release.
#[repr(C)]
#[derive(Debug)]
pub struct BurrowBuffer {
    /// Pointer to data; null for an empty buffer.
    pub data: *mut u8,
    /// Length in bytes.
    pub len: usize,
    /// Capacity (for internal use).
    pub capacity: usize,
}

impl BurrowBuffer {
    /// Creates a new buffer from a Vec.
    pub fn from_vec(vec: Vec<u8>) -> Self {
        if vec.is_empty() {
            return Self::empty();
        }
        let mut boxed = vec.into_boxed_slice();
        let data = boxed.as_mut_ptr();
        let len = boxed.len();
        std::mem::forget(boxed);

        Self {
            data,
            len,
            capacity: len,
        }
    }

    /// Creates an empty buffer.
    pub fn empty() -> Self {
        Self {
            data: std::ptr::null_mut(),
            len: 0,
            capacity: 0,
        }
    }

    /// Returns true if the buffer holds no allocation.
    pub fn is_null(&self) -> bool {
        self.data.is_null()
    }

    /// Converts back to a Vec, consuming the buffer.
    ///
    /// # Safety
    ///
    /// The buffer must have been created by [`BurrowBuffer::from_vec`].
    pub unsafe fn into_vec(self) -> Vec<u8> {
        if self.data.is_null() {
            return Vec::new();
        }
        Vec::from_raw_parts(self.data, self.len, self.capacity)
    }
}

/// Frees a buffer allocated by Burrow.
///
/// Freeing an empty buffer does nothing.
///
/// # Safety
///
/// The buffer must have been returned by a Burrow FFI function and not
/// freed before.
#[no_mangle]
pub unsafe extern "C" fn burrow_free_buffer(buffer: BurrowBuffer) {
    drop(buffer.into_vec());
}

/// Borrows `len` bytes at `ptr`. A zero length accepts a null pointer.
///
/// # Safety
///
/// Unless null, `ptr` must be valid for reads of `len` bytes for `'a`.
pub(crate) unsafe fn input<'a>(
    ptr: *const u8,
    len: usize,
    name: &'static str,
) -> FfiResult<&'a [u8]> {
    if len == 0 {
        return Ok(&[]);
    }
    if ptr.is_null() {
        return Err(FfiError::NullPointer(name));
    }
    Ok(std::slice::from_raw_parts(ptr, len))
}

/// Checks an output pointer before any work is done for it.
pub(crate) fn out_param<T>(out: *mut T, name: &'static str) -> FfiResult<NonNull<T>> {
    NonNull::new(out).ok_or(FfiError::NullPointer(name))
}
