//! Main C API interface

use std::cell::RefCell;
use std::ffi::CString;
use std::os::raw::c_char;
use std::ptr;

use super::CResult;
use crate::error::DualsemError;
use crate::semaphore::Semaphore;

/// Opaque semaphore handle for C callers
#[repr(C)]
pub struct CSemaphore {
    _private: [u8; 0],
}

thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = const { RefCell::new(None) };
}

fn set_last_error(err: &DualsemError) -> CResult {
    let message = err.to_string();
    log::debug!("ffi call failed: {}", message);
    LAST_ERROR.with(|slot| {
        *slot.borrow_mut() = CString::new(message).ok();
    });
    CResult::from(err)
}

fn null_handle() -> CResult {
    set_last_error(&DualsemError::invalid_argument("sem"))
}

/// Borrow the semaphore behind a handle
///
/// # Safety
///
/// `sem` must be null or a live pointer returned by `dualsem_create`.
unsafe fn handle<'a>(sem: *const CSemaphore) -> Option<&'a Semaphore> {
    unsafe { (sem as *const Semaphore).as_ref() }
}

/// Get library version string
///
/// The returned pointer is static and must not be freed.
#[unsafe(no_mangle)]
pub extern "C" fn dualsem_version() -> *const c_char {
    concat!(env!("CARGO_PKG_VERSION"), "\0").as_ptr() as *const c_char
}

/// Create a semaphore holding `initial_value` slots
///
/// Returns null on failure; see `dualsem_last_error`. The handle must be
/// released with `dualsem_destroy`.
#[unsafe(no_mangle)]
pub extern "C" fn dualsem_create(initial_value: u32) -> *mut CSemaphore {
    match Semaphore::new(initial_value) {
        Ok(sem) => Box::into_raw(Box::new(sem)) as *mut CSemaphore,
        Err(err) => {
            set_last_error(&err);
            ptr::null_mut()
        }
    }
}

/// Destroy a semaphore. Null is ignored.
///
/// # Safety
///
/// `sem` must be null or a pointer returned by `dualsem_create` that has not
/// been destroyed; no other thread may be using it.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn dualsem_destroy(sem: *mut CSemaphore) {
    if !sem.is_null() {
        drop(unsafe { Box::from_raw(sem as *mut Semaphore) });
    }
}

/// Claim one slot: negative waits forever, zero polls, positive bounds the wait
///
/// Returns `Success`, `TimedOut`, or an error code.
///
/// # Safety
///
/// `sem` must be null or a live handle from `dualsem_create`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn dualsem_wait_timeout_ns(sem: *const CSemaphore, timeout_ns: i64) -> CResult {
    let Some(sem) = (unsafe { handle(sem) }) else {
        return null_handle();
    };
    match sem.wait_timeout_ns(timeout_ns) {
        Ok(status) => status.into(),
        Err(err) => set_last_error(&err),
    }
}

/// Claim one slot, blocking until one is posted
///
/// # Safety
///
/// `sem` must be null or a live handle from `dualsem_create`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn dualsem_wait(sem: *const CSemaphore) -> CResult {
    unsafe { dualsem_wait_timeout_ns(sem, -1) }
}

/// Claim one slot only if available now
///
/// # Safety
///
/// `sem` must be null or a live handle from `dualsem_create`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn dualsem_try_wait(sem: *const CSemaphore) -> CResult {
    unsafe { dualsem_wait_timeout_ns(sem, 0) }
}

/// Advisory count of available slots; 0 for a null handle
///
/// # Safety
///
/// `sem` must be null or a live handle from `dualsem_create`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn dualsem_get_value(sem: *const CSemaphore) -> u32 {
    match unsafe { handle(sem) } {
        Some(sem) => sem.value(),
        None => {
            null_handle();
            0
        }
    }
}

/// Release one slot
///
/// # Safety
///
/// `sem` must be null or a live handle from `dualsem_create`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn dualsem_post(sem: *const CSemaphore) -> CResult {
    let Some(sem) = (unsafe { handle(sem) }) else {
        return null_handle();
    };
    match sem.post() {
        Ok(()) => CResult::Success,
        Err(err) => set_last_error(&err),
    }
}

/// Message of the last failed call on this thread, or null if none
///
/// The pointer stays valid until the next failing call on the same thread.
#[unsafe(no_mangle)]
pub extern "C" fn dualsem_last_error() -> *const c_char {
    LAST_ERROR.with(|slot| match slot.borrow().as_ref() {
        Some(message) => message.as_ptr(),
        None => ptr::null(),
    })
}
