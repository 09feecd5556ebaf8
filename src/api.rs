//! Free-function semaphore API
//!
//! Mirrors the handle-based surface of C semaphore libraries: a missing handle
//! (`None`) is an [`InvalidArgument`](crate::DualsemError::InvalidArgument)
//! error rather than a crash, and destroying `None` is a no-op.

use std::time::Duration;

use crate::error::{DualsemError, Result};
use crate::semaphore::{registry, Semaphore, WaitStatus};

fn require(sem: Option<&Semaphore>) -> Result<&Semaphore> {
    sem.ok_or_else(|| DualsemError::invalid_argument("sem"))
}

/// Create a semaphore holding `initial_value` slots
pub fn create_semaphore(initial_value: u32) -> Result<Semaphore> {
    registry::global().create(initial_value)
}

/// Destroy a semaphore; `None` is ignored
pub fn destroy_semaphore(sem: Option<Semaphore>) {
    drop(sem);
}

/// Claim one slot: `timeout_ns < 0` waits forever, `0` polls, `> 0` bounds the wait
pub fn wait_semaphore_timeout_ns(sem: Option<&Semaphore>, timeout_ns: i64) -> Result<WaitStatus> {
    require(sem)?.wait_timeout_ns(timeout_ns)
}

/// Claim one slot with a millisecond budget (negative waits forever)
pub fn wait_semaphore_timeout_ms(sem: Option<&Semaphore>, timeout_ms: i32) -> Result<WaitStatus> {
    let timeout_ns = if timeout_ms < 0 {
        -1
    } else {
        Duration::from_millis(timeout_ms as u64).as_nanos() as i64
    };
    wait_semaphore_timeout_ns(sem, timeout_ns)
}

/// Claim one slot, blocking until one is posted
pub fn wait_semaphore(sem: Option<&Semaphore>) -> Result<()> {
    wait_semaphore_timeout_ns(sem, -1).map(|_| ())
}

/// Claim one slot only if one is available now
pub fn try_wait_semaphore(sem: Option<&Semaphore>) -> Result<WaitStatus> {
    wait_semaphore_timeout_ns(sem, 0)
}

/// Advisory count of available slots
pub fn get_semaphore_value(sem: Option<&Semaphore>) -> Result<u32> {
    Ok(require(sem)?.value())
}

/// Release one slot
pub fn post_semaphore(sem: Option<&Semaphore>) -> Result<()> {
    require(sem)?.post()
}
