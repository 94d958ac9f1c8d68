//! C FFI bindings for the Tessera array runtime.
//!
//! Runtimes are owned by a process-wide handle table and addressed by
//! `u64` handles. Types cross the boundary as their `u32` type ids and
//! arrays as their heap addresses. Every entry point returns a
//! [`TesseraStatus`] code and catches panics, so contract violations
//! surface as [`TesseraStatus::Panicked`] with the message available
//! from [`tessera_last_panic_message`].

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(unsafe_code)]

use std::any::Any;
use std::cell::RefCell;
use std::ffi::c_char;

/// Run `$body` under `catch_unwind`, mapping a panic to `$fallback`.
macro_rules! ffi_guard_or {
    ($fallback:expr, $body:block) => {
        match std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| $body)) {
            Ok(value) => value,
            Err(payload) => {
                $crate::record_panic(payload.as_ref());
                $fallback
            }
        }
    };
}

/// Run `$body` under `catch_unwind`, mapping a panic to `Panicked`.
macro_rules! ffi_guard {
    ($body:block) => {
        ffi_guard_or!($crate::status::TesseraStatus::Panicked as i32, $body)
    };
}

/// Lock a mutex, returning `InternalError` from the enclosing closure if
/// it is poisoned.
macro_rules! ffi_lock {
    ($mutex:expr) => {
        match $mutex.lock() {
            Ok(guard) => guard,
            Err(_) => return $crate::status::TesseraStatus::InternalError as i32,
        }
    };
}

pub mod array;
mod handle;
pub mod runtime;
pub mod status;

pub use status::TesseraStatus;

thread_local! {
    static LAST_PANIC: RefCell<Option<String>> = const { RefCell::new(None) };
}

pub(crate) fn record_panic(payload: &(dyn Any + Send)) {
    let message = payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_owned())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic payload".to_owned());
    tracing::error!(message = %message, "panic caught at FFI boundary");
    LAST_PANIC.with(|slot| *slot.borrow_mut() = Some(message));
}

/// Copy the calling thread's most recent panic message into `buf`.
///
/// Writes at most `cap - 1` bytes followed by a NUL terminator and returns
/// the full message length in bytes, which may exceed `cap - 1`. Returns 0
/// and writes nothing if no panic has been caught on this thread. `buf`
/// may be null when `cap` is 0, to query the length.
#[no_mangle]
#[allow(unsafe_code)]
pub extern "C" fn tessera_last_panic_message(buf: *mut c_char, cap: usize) -> usize {
    LAST_PANIC.with(|slot| {
        let slot = slot.borrow();
        let Some(message) = slot.as_deref() else {
            return 0;
        };
        if !buf.is_null() && cap > 0 {
            let n = message.len().min(cap - 1);
            // SAFETY: caller guarantees `buf` points to `cap` writable bytes.
            unsafe {
                std::ptr::copy_nonoverlapping(message.as_ptr().cast::<c_char>(), buf, n);
                *buf.add(n) = 0;
            }
        }
        message.len()
    })
}
