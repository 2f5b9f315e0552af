//! # Burrow FFI
//!
//! Stable C ABI for Burrow bindings.
//!
//! This crate provides:
//! - C-compatible function exports for stores, cursors and write batches
//! - Opaque `u64` handles instead of raw pointers
//! - Status code mapping with a per-thread last error message
//! - Buffer management for bytes handed back to the caller
//!
//! ## Handles
//!
//! Every store, cursor and batch is identified by a non-zero `u64` taken
//! from one process-wide table. Closing a handle removes it from the table,
//! so closing it again returns `Ok` and any other call returns
//! [`BurrowStatus::Closed`]. Closing a store closes its cursors and batches
//! too; their handles stay in the table until closed and report `Closed`.
//!
//! ## Memory
//!
//! Bytes returned through a [`BurrowBuffer`] are owned by the caller and
//! must be released with [`burrow_free_buffer`]. Input pointers are only
//! read for the duration of the call.

#![warn(missing_docs)]

mod batch;
mod buffer;
mod cursor;
mod error;
mod handles;
mod store;
mod types;

pub use batch::*;
pub use buffer::*;
pub use cursor::*;
pub use error::*;
pub use store::*;
pub use types::*;
