//! Cursor FFI functions.

use crate::buffer::{input, out_param, BurrowBuffer};
use crate::error::{run, BurrowStatus, FfiResult};
use crate::handles::{CURSORS, STORES};
use crate::types::BurrowHandle;
use burrow_core::{BurrowResult, Cursor};
use parking_lot::Mutex;

fn with_cursor<R>(
    handle: BurrowHandle,
    f: impl FnOnce(&mut Cursor) -> BurrowResult<R>,
) -> FfiResult<R> {
    let cursor = CURSORS.get(handle)?;
    let mut cursor = cursor.lock();
    Ok(f(&mut *cursor)?)
}

fn step(handle: BurrowHandle, f: impl FnOnce(&mut Cursor) -> BurrowResult<()>) -> BurrowStatus {
    run(|| {
        with_cursor(handle, f)?;
        Ok(BurrowStatus::Ok)
    })
}

/// Creates a cursor over a store.
///
/// The cursor sees the store as it was at this call. It starts unset:
/// seek before reading.
///
/// # Arguments
///
/// * `store` - Store handle
/// * `out_cursor` - Output pointer for the cursor handle
///
/// # Safety
///
/// - `out_cursor` must be a valid pointer
#[no_mangle]
pub unsafe extern "C" fn burrow_cursor_new(
    store: BurrowHandle,
    out_cursor: *mut BurrowHandle,
) -> BurrowStatus {
    run(|| {
        let out = out_param(out_cursor, "out_cursor")?;
        let cursor = STORES.get(store)?.cursor()?;
        out.write(CURSORS.insert(Mutex::new(cursor)));
        Ok(BurrowStatus::Ok)
    })
}

/// Moves the cursor to the smallest key.
#[no_mangle]
pub extern "C" fn burrow_cursor_seek_to_first(cursor: BurrowHandle) -> BurrowStatus {
    step(cursor, Cursor::seek_to_first)
}

/// Moves the cursor to the largest key.
#[no_mangle]
pub extern "C" fn burrow_cursor_seek_to_last(cursor: BurrowHandle) -> BurrowStatus {
    step(cursor, Cursor::seek_to_last)
}

/// Moves the cursor to the smallest key greater than or equal to `target`.
///
/// # Safety
///
/// - `target` must be valid for `target_len` bytes (may be null when zero)
#[no_mangle]
pub unsafe extern "C" fn burrow_cursor_seek(
    cursor: BurrowHandle,
    target: *const u8,
    target_len: usize,
) -> BurrowStatus {
    run(|| {
        let target = input(target, target_len, "target")?;
        with_cursor(cursor, |c| c.seek(target))?;
        Ok(BurrowStatus::Ok)
    })
}

/// Moves the cursor to the next larger key.
///
/// # Returns
///
/// `BurrowStatus::InvalidCursorState` unless the cursor is on an entry.
#[no_mangle]
pub extern "C" fn burrow_cursor_next(cursor: BurrowHandle) -> BurrowStatus {
    step(cursor, Cursor::next)
}

/// Moves the cursor to the next smaller key.
///
/// # Returns
///
/// `BurrowStatus::InvalidCursorState` unless the cursor is on an entry.
#[no_mangle]
pub extern "C" fn burrow_cursor_prev(cursor: BurrowHandle) -> BurrowStatus {
    step(cursor, Cursor::prev)
}

/// Reports whether the cursor is on an entry.
///
/// A closed or unknown cursor is not valid; this never fails for a
/// non-null `out_valid`.
///
/// # Safety
///
/// - `out_valid` must be a valid pointer
#[no_mangle]
pub unsafe extern "C" fn burrow_cursor_valid(
    cursor: BurrowHandle,
    out_valid: *mut bool,
) -> BurrowStatus {
    run(|| {
        let out = out_param(out_valid, "out_valid")?;
        let valid = CURSORS.get(cursor).is_ok_and(|c| c.lock().is_valid());
        out.write(valid);
        Ok(BurrowStatus::Ok)
    })
}

/// Copies the key at the cursor into `out_key`.
///
/// Free the buffer with `burrow_free_buffer`.
///
/// # Safety
///
/// - `out_key` must be a valid pointer
#[no_mangle]
pub unsafe extern "C" fn burrow_cursor_key(
    cursor: BurrowHandle,
    out_key: *mut BurrowBuffer,
) -> BurrowStatus {
    run(|| {
        let out = out_param(out_key, "out_key")?;
        let key = with_cursor(cursor, |c| c.key())?;
        out.write(BurrowBuffer::from_vec(key));
        Ok(BurrowStatus::Ok)
    })
}

/// Copies the value at the cursor into `out_value`.
///
/// Free the buffer with `burrow_free_buffer`.
///
/// # Safety
///
/// - `out_value` must be a valid pointer
#[no_mangle]
pub unsafe extern "C" fn burrow_cursor_value(
    cursor: BurrowHandle,
    out_value: *mut BurrowBuffer,
) -> BurrowStatus {
    run(|| {
        let out = out_param(out_value, "out_value")?;
        let value = with_cursor(cursor, |c| c.value())?;
        out.write(BurrowBuffer::from_vec(value));
        Ok(BurrowStatus::Ok)
    })
}

/// Closes a cursor. Closing twice, or after its store closed, returns `Ok`.
#[no_mangle]
pub extern "C" fn burrow_cursor_close(cursor: BurrowHandle) -> BurrowStatus {
    run(|| {
        if let Some(cursor) = CURSORS.remove(cursor) {
            cursor.lock().close();
        }
        Ok(BurrowStatus::Ok)
    })
}
