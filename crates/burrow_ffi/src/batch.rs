//! Write batch FFI functions.

use crate::buffer::{input, out_param};
use crate::error::{run, BurrowStatus, FfiResult};
use crate::handles::{BATCHES, STORES};
use crate::types::BurrowHandle;
use burrow_core::{BurrowError, BurrowResult, Resource, WriteBatch};
use parking_lot::Mutex;

fn with_batch<R>(
    handle: BurrowHandle,
    f: impl FnOnce(&mut WriteBatch) -> BurrowResult<R>,
) -> FfiResult<R> {
    let batch = BATCHES.get(handle)?;
    let mut batch = batch.lock();
    Ok(f(&mut *batch)?)
}

/// Creates an empty write batch for a store.
///
/// # Safety
///
/// - `out_batch` must be a valid pointer
#[no_mangle]
pub unsafe extern "C" fn burrow_batch_new(
    store: BurrowHandle,
    out_batch: *mut BurrowHandle,
) -> BurrowStatus {
    run(|| {
        let out = out_param(out_batch, "out_batch")?;
        let batch = STORES.get(store)?.write_batch()?;
        out.write(BATCHES.insert(Mutex::new(batch)));
        Ok(BurrowStatus::Ok)
    })
}

/// Adds a put to the batch.
///
/// # Returns
///
/// `BurrowStatus::AlreadyApplied` once the batch was written.
///
/// # Safety
///
/// - `key` must be valid for `key_len` bytes (may be null when zero)
/// - `value` must be valid for `value_len` bytes (may be null when zero)
#[no_mangle]
pub unsafe extern "C" fn burrow_batch_put(
    batch: BurrowHandle,
    key: *const u8,
    key_len: usize,
    value: *const u8,
    value_len: usize,
) -> BurrowStatus {
    run(|| {
        let key = input(key, key_len, "key")?;
        let value = input(value, value_len, "value")?;
        with_batch(batch, |b| b.put(key, value))?;
        Ok(BurrowStatus::Ok)
    })
}

/// Adds a delete to the batch.
///
/// # Safety
///
/// - `key` must be valid for `key_len` bytes (may be null when zero)
#[no_mangle]
pub unsafe extern "C" fn burrow_batch_delete(
    batch: BurrowHandle,
    key: *const u8,
    key_len: usize,
) -> BurrowStatus {
    run(|| {
        let key = input(key, key_len, "key")?;
        with_batch(batch, |b| b.delete(key))?;
        Ok(BurrowStatus::Ok)
    })
}

/// Applies the batch atomically.
///
/// # Arguments
///
/// * `batch` - Batch handle
/// * `out_applied` - Set to true by the first write, false by every
///   later one
///
/// # Returns
///
/// `BurrowStatus::ApplyFailure` if the engine rejected the batch. The
/// batch is consumed either way.
///
/// # Safety
///
/// - `out_applied` must be a valid pointer
#[no_mangle]
pub unsafe extern "C" fn burrow_batch_write(
    batch: BurrowHandle,
    out_applied: *mut bool,
) -> BurrowStatus {
    run(|| {
        let out = out_param(out_applied, "out_applied")?;
        let applied = with_batch(batch, WriteBatch::write)?;
        out.write(applied);
        Ok(BurrowStatus::Ok)
    })
}

/// Applies the batch, then closes it.
///
/// The handle is closed even if the write fails.
///
/// # Safety
///
/// - `out_applied` must be a valid pointer
#[no_mangle]
pub unsafe extern "C" fn burrow_batch_write_and_close(
    batch: BurrowHandle,
    out_applied: *mut bool,
) -> BurrowStatus {
    run(|| {
        let out = out_param(out_applied, "out_applied")?;
        let batch = BATCHES
            .remove(batch)
            .ok_or_else(|| BurrowError::closed(Resource::WriteBatch))?;
        let mut batch = batch.lock();
        let result = batch.write();
        batch.close();
        out.write(result?);
        Ok(BurrowStatus::Ok)
    })
}

/// Closes a batch, discarding it if unwritten. Closing twice returns `Ok`.
#[no_mangle]
pub extern "C" fn burrow_batch_close(batch: BurrowHandle) -> BurrowStatus {
    run(|| {
        if let Some(batch) = BATCHES.remove(batch) {
            batch.lock().close();
        }
        Ok(BurrowStatus::Ok)
    })
}
