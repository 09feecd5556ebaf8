//! Linux Futex Integration
//!
//! Address wait/wake using direct futex syscalls. Only process-private
//! operations are issued; semaphores never cross process boundaries.

use std::sync::atomic::AtomicU32;
use std::sync::OnceLock;
use std::time::Duration;

use super::{AddressWait, WakeStatus};
use crate::error::{DualsemError, Result};

mod sys {
    use libc::{syscall, timespec, SYS_futex};
    use std::ffi::c_int;
    use std::ptr;
    use std::time::Duration;

    pub const FUTEX_WAIT_PRIVATE: c_int = libc::FUTEX_WAIT | libc::FUTEX_PRIVATE_FLAG;
    pub const FUTEX_WAKE_PRIVATE: c_int = libc::FUTEX_WAKE | libc::FUTEX_PRIVATE_FLAG;

    /// Direct futex syscall wrapper
    ///
    /// # Safety
    ///
    /// `uaddr` must point to a live, aligned `u32` for the duration of the call.
    #[inline]
    unsafe fn futex(uaddr: *const u32, op: c_int, val: u32, timeout: *const timespec) -> libc::c_long {
        unsafe {
            syscall(
                SYS_futex,
                uaddr,
                op,
                val,
                timeout,
                ptr::null::<u32>(),
                0u32,
            )
        }
    }

    /// Wait on futex with optional relative timeout
    ///
    /// # Safety
    ///
    /// See [`futex`].
    #[inline]
    pub unsafe fn futex_wait(uaddr: *const u32, val: u32, timeout: Option<Duration>) -> libc::c_long {
        let ts = timeout.map(|d| timespec {
            tv_sec: d.as_secs().min(libc::time_t::MAX as u64) as libc::time_t,
            tv_nsec: d.subsec_nanos() as libc::c_long,
        });
        let timeout_ptr = match ts.as_ref() {
            Some(ts) => ts as *const timespec,
            None => ptr::null(),
        };

        unsafe { futex(uaddr, FUTEX_WAIT_PRIVATE, val, timeout_ptr) }
    }

    /// Wake up to `count` waiters on futex
    ///
    /// # Safety
    ///
    /// See [`futex`].
    #[inline]
    pub unsafe fn futex_wake(uaddr: *const u32, count: u32) -> libc::c_long {
        unsafe { futex(uaddr, FUTEX_WAKE_PRIVATE, count, ptr::null()) }
    }
}

fn last_errno() -> i32 {
    std::io::Error::last_os_error().raw_os_error().unwrap_or(0)
}

static FUTEX_AVAILABLE: OnceLock<bool> = OnceLock::new();

/// Linux-specific futex implementation
#[derive(Debug)]
pub struct LinuxFutex;

impl LinuxFutex {
    /// Issue a no-op wake on a private word; kernels without futex answer ENOSYS
    fn probe() -> bool {
        let word = AtomicU32::new(0);
        let result = unsafe { sys::futex_wake(word.as_ptr(), 0) };
        if result == -1 {
            let errno = last_errno();
            log::trace!("futex probe failed: errno {}", errno);
            errno != libc::ENOSYS
        } else {
            true
        }
    }
}

impl AddressWait for LinuxFutex {
    fn is_available() -> bool {
        *FUTEX_AVAILABLE.get_or_init(Self::probe)
    }

    fn wait(addr: &AtomicU32, expected: u32, timeout: Option<Duration>) -> Result<WakeStatus> {
        let result = unsafe { sys::futex_wait(addr.as_ptr(), expected, timeout) };
        if result == -1 {
            match last_errno() {
                libc::EAGAIN => Ok(WakeStatus::Woken), // Value changed before wait
                libc::EINTR => Ok(WakeStatus::Woken),  // Interrupted by signal
                libc::ETIMEDOUT => Ok(WakeStatus::TimedOut),
                errno => Err(DualsemError::os_failure("futex wait", errno)),
            }
        } else {
            Ok(WakeStatus::Woken)
        }
    }

    fn wake_one(addr: &AtomicU32) -> Result<()> {
        let result = unsafe { sys::futex_wake(addr.as_ptr(), 1) };
        if result == -1 {
            Err(DualsemError::last_os_error("futex wake"))
        } else {
            Ok(())
        }
    }
}
