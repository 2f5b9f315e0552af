//! Store FFI functions.

use crate::buffer::{input, out_param, BurrowBuffer};
use crate::error::{run, BurrowStatus, FfiError};
use crate::handles::STORES;
use crate::types::{BurrowHandle, BurrowOptions, BurrowStats};
use burrow_core::{BurrowError, Options, Resource, Store};
use std::ffi::{c_char, CStr};

/// Reads caller options, falling back to the defaults for null.
unsafe fn read_options(options: *const BurrowOptions) -> Options {
    if options.is_null() {
        Options::default()
    } else {
        (*options).into()
    }
}

/// Opens a store directory.
///
/// # Arguments
///
/// * `path` - Store directory (null-terminated UTF-8)
/// * `options` - Open options, or null for the defaults
/// * `out_handle` - Output pointer for the store handle
///
/// # Returns
///
/// `BurrowStatus::Ok` on success. `AlreadyExists`, `Locked`, `Corruption`
/// and `OpenFailure` describe why the store could not be opened.
///
/// # Safety
///
/// - `path` must be a valid null-terminated string
/// - `options` must be null or point to a valid `BurrowOptions`
/// - `out_handle` must be a valid pointer
#[no_mangle]
pub unsafe extern "C" fn burrow_open(
    path: *const c_char,
    options: *const BurrowOptions,
    out_handle: *mut BurrowHandle,
) -> BurrowStatus {
    run(|| {
        let out = out_param(out_handle, "out_handle")?;
        if path.is_null() {
            return Err(FfiError::NullPointer("path"));
        }
        let path = CStr::from_ptr(path)
            .to_str()
            .map_err(|_| FfiError::InvalidUtf8("path"))?;

        let store = Store::open(path, read_options(options))?;
        out.write(STORES.insert(store));
        Ok(BurrowStatus::Ok)
    })
}

/// Opens a store that lives only in memory.
///
/// # Safety
///
/// - `options` must be null or point to a valid `BurrowOptions`
/// - `out_handle` must be a valid pointer
#[no_mangle]
pub unsafe extern "C" fn burrow_open_memory(
    options: *const BurrowOptions,
    out_handle: *mut BurrowHandle,
) -> BurrowStatus {
    run(|| {
        let out = out_param(out_handle, "out_handle")?;
        let store = Store::open_in_memory(read_options(options))?;
        out.write(STORES.insert(store));
        Ok(BurrowStatus::Ok)
    })
}

/// Closes a store.
///
/// Cursors and batches still open on the store are closed with it; their
/// handles report `Closed` from then on and still need their own close
/// call to be forgotten. Closing a handle that is already closed, or was
/// never issued, returns `Ok`.
#[no_mangle]
pub extern "C" fn burrow_close(handle: BurrowHandle) -> BurrowStatus {
    run(|| {
        if let Some(store) = STORES.remove(handle) {
            store.close()?;
        }
        Ok(BurrowStatus::Ok)
    })
}

/// Reads the value stored under a key.
///
/// # Returns
///
/// `BurrowStatus::Ok` with the value in `out_value`, or
/// `BurrowStatus::NotFound` with an empty buffer. Free a returned value
/// with `burrow_free_buffer`.
///
/// # Safety
///
/// - `key` must be valid for `key_len` bytes (may be null when zero)
/// - `out_value` must be a valid pointer
#[no_mangle]
pub unsafe extern "C" fn burrow_get(
    handle: BurrowHandle,
    key: *const u8,
    key_len: usize,
    out_value: *mut BurrowBuffer,
) -> BurrowStatus {
    run(|| {
        let out = out_param(out_value, "out_value")?;
        let key = input(key, key_len, "key")?;
        let store = STORES.get(handle)?;

        match store.get(key)? {
            Some(value) => {
                out.write(BurrowBuffer::from_vec(value));
                Ok(BurrowStatus::Ok)
            }
            None => {
                out.write(BurrowBuffer::empty());
                Ok(BurrowStatus::NotFound)
            }
        }
    })
}

/// Stores a value under a key, replacing any previous value.
///
/// # Safety
///
/// - `key` must be valid for `key_len` bytes (may be null when zero)
/// - `value` must be valid for `value_len` bytes (may be null when zero)
#[no_mangle]
pub unsafe extern "C" fn burrow_put(
    handle: BurrowHandle,
    key: *const u8,
    key_len: usize,
    value: *const u8,
    value_len: usize,
) -> BurrowStatus {
    run(|| {
        let key = input(key, key_len, "key")?;
        let value = input(value, value_len, "value")?;
        STORES.get(handle)?.put(key, value)?;
        Ok(BurrowStatus::Ok)
    })
}

/// Removes a key. Removing a missing key succeeds.
///
/// # Safety
///
/// - `key` must be valid for `key_len` bytes (may be null when zero)
#[no_mangle]
pub unsafe extern "C" fn burrow_delete(
    handle: BurrowHandle,
    key: *const u8,
    key_len: usize,
) -> BurrowStatus {
    run(|| {
        let key = input(key, key_len, "key")?;
        STORES.get(handle)?.delete(key)?;
        Ok(BurrowStatus::Ok)
    })
}

/// Copies the store's counters into `out_stats`.
///
/// # Safety
///
/// - `out_stats` must be a valid pointer
#[no_mangle]
pub unsafe extern "C" fn burrow_stats(
    handle: BurrowHandle,
    out_stats: *mut BurrowStats,
) -> BurrowStatus {
    run(|| {
        let out = out_param(out_stats, "out_stats")?;
        let store = STORES.get(handle)?;
        if !store.is_open() {
            return Err(BurrowError::closed(Resource::Store).into());
        }
        out.write(store.stats().into());
        Ok(BurrowStatus::Ok)
    })
}
