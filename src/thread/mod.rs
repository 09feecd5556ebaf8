//! Platform synchronization facilities
//!
//! This module provides the two OS seams the semaphore algorithms are built on:
//! - [`AddressWait`]: block on / wake an address holding a 32-bit value
//!   (Linux futex, Windows `WaitOnAddress`)
//! - [`KernelWaitObject`]: a kernel-managed counting wait object
//!   (Windows semaphore, unnamed POSIX semaphore, or a condvar stand-in)

#[cfg(dualsem_futex)]
pub mod linux_futex;

#[cfg(windows)]
pub mod windows_sync;

#[cfg(dualsem_posix_sem)]
pub mod posix_sem;

pub mod condvar_sem;

#[cfg(dualsem_futex)]
pub use linux_futex::LinuxFutex;
#[cfg(windows)]
pub use windows_sync::{WindowsAddressWait, WindowsSemaphore};
#[cfg(dualsem_posix_sem)]
pub use posix_sem::PosixSemaphore;
pub use condvar_sem::CondvarSemaphore;

use crate::error::{DualsemError, Result};
use std::sync::atomic::AtomicU32;
use std::time::Duration;

/// Outcome of a single address wait
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WakeStatus {
    /// Returned before the timeout: a wake, a value mismatch, a signal or a spurious wakeup.
    /// The caller must re-read the address.
    Woken,
    /// The timeout elapsed
    TimedOut,
}

/// Outcome of a kernel wait object acquire
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquireStatus {
    /// One unit was taken from the object
    Acquired,
    /// The budget elapsed without a unit becoming available
    TimedOut,
}

/// Address-keyed wait/wake facility
pub trait AddressWait: Send + Sync + 'static {
    /// Whether the facility can be used in this process.
    ///
    /// May resolve and cache entry points process-wide; must be safe to call
    /// concurrently.
    fn is_available() -> bool;

    /// Block while `*addr == expected`, for at most `timeout` (`None` = forever)
    fn wait(addr: &AtomicU32, expected: u32, timeout: Option<Duration>) -> Result<WakeStatus>;

    /// Wake one thread blocked on `addr`
    fn wake_one(addr: &AtomicU32) -> Result<()>;
}

/// Kernel-managed counting wait object
pub trait KernelWaitObject: Send + Sync + Sized + 'static {
    /// Create an object holding `initial` units with capacity `max_count`
    fn create(initial: u32, max_count: u32) -> Result<Self>;

    /// Take one unit, waiting up to `timeout_ms` (`None` = forever, `Some(0)` = poll)
    fn acquire(&self, timeout_ms: Option<u32>) -> Result<AcquireStatus>;

    /// Return one unit to the object
    fn release(&self) -> Result<()>;

    /// Release the OS resource. Calling it again is a no-op.
    fn close(&mut self);
}

/// Address wait stand-in for targets without one; never available
#[derive(Debug)]
pub struct UnsupportedAddressWait;

impl AddressWait for UnsupportedAddressWait {
    fn is_available() -> bool {
        false
    }

    fn wait(_addr: &AtomicU32, _expected: u32, _timeout: Option<Duration>) -> Result<WakeStatus> {
        Err(DualsemError::not_supported("address wait"))
    }

    fn wake_one(_addr: &AtomicU32) -> Result<()> {
        Err(DualsemError::not_supported("address wake"))
    }
}

/// Address wait facility of the build target
#[cfg(dualsem_futex)]
pub type DefaultAddressWait = LinuxFutex;

/// Address wait facility of the build target
#[cfg(all(windows, not(dualsem_futex)))]
pub type DefaultAddressWait = WindowsAddressWait;

/// Address wait facility of the build target
#[cfg(not(any(dualsem_futex, windows)))]
pub type DefaultAddressWait = UnsupportedAddressWait;

/// Kernel wait object of the build target
#[cfg(windows)]
pub type OsSemaphore = WindowsSemaphore;

/// Kernel wait object of the build target
#[cfg(all(dualsem_posix_sem, not(windows)))]
pub type OsSemaphore = PosixSemaphore;

/// Kernel wait object of the build target
#[cfg(not(any(windows, dualsem_posix_sem)))]
pub type OsSemaphore = CondvarSemaphore;

/// Convert a wait budget to whole milliseconds, rounding any remainder up
///
/// Saturates below `u32::MAX`, which several kernels reserve for "infinite".
#[cfg(windows)]
pub(crate) fn duration_to_ms_ceil(timeout: Duration) -> u32 {
    let mut ms = timeout.as_millis();
    if timeout.subsec_nanos() % 1_000_000 != 0 {
        ms += 1;
    }
    ms.min(u128::from(u32::MAX - 1)) as u32
}
