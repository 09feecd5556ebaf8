//! Lock-free semaphore on an address wait/wake facility
//!
//! The count lives in a single `AtomicU32` whose address doubles as the wait
//! key. A slot is consumed only by a successful compare-and-swap; a thread that
//! was woken but lost the race re-reads the count and goes around again.

use std::fmt;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{Duration, Instant};

use super::{try_box, BackendKind, SemaphoreOps, WaitStatus};
use crate::error::{DualsemError, Result};
use crate::thread::{AddressWait, DefaultAddressWait, WakeStatus};

/// Errno reported when a post would overflow the counter
#[cfg(unix)]
const POST_OVERFLOW_CODE: i32 = libc::EOVERFLOW;
/// `ERROR_TOO_MANY_POSTS`, reported when a post would overflow the counter
#[cfg(not(unix))]
const POST_OVERFLOW_CODE: i32 = 298;

/// Atomic counter semaphore, blocking through `W`
pub struct FastSemaphore<W: AddressWait = DefaultAddressWait> {
    count: AtomicU32,
    _wait: PhantomData<fn() -> W>,
}

impl<W: AddressWait> FastSemaphore<W> {
    /// Semaphore holding `initial_value` slots
    pub const fn new(initial_value: u32) -> Self {
        Self {
            count: AtomicU32::new(initial_value),
            _wait: PhantomData,
        }
    }

    /// Heap-allocate a semaphore, reporting allocation failure as `OutOfMemory`
    pub fn create(initial_value: u32) -> Result<Box<Self>> {
        try_box(Self::new(initial_value))
    }

    #[inline]
    fn try_claim(&self, observed: u32) -> bool {
        self.count
            .compare_exchange(observed, observed - 1, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
    }

    fn poll(&self) -> WaitStatus {
        let count = self.count.load(Ordering::Acquire);
        if count != 0 && self.try_claim(count) {
            WaitStatus::Acquired
        } else {
            WaitStatus::TimedOut
        }
    }

    fn wait_forever(&self) -> Result<WaitStatus> {
        loop {
            let mut count = self.count.load(Ordering::Acquire);
            while count == 0 {
                W::wait(&self.count, 0, None)?;
                count = self.count.load(Ordering::Acquire);
            }

            if self.try_claim(count) {
                return Ok(WaitStatus::Acquired);
            }
        }
    }

    fn wait_until(&self, deadline: Instant) -> Result<WaitStatus> {
        loop {
            let mut count = self.count.load(Ordering::Acquire);
            while count == 0 {
                // Spurious and stolen wakeups: the budget always comes from the deadline
                let now = Instant::now();
                if now >= deadline {
                    return Ok(WaitStatus::TimedOut);
                }
                if W::wait(&self.count, 0, Some(deadline - now))? == WakeStatus::TimedOut {
                    return Ok(WaitStatus::TimedOut);
                }
                count = self.count.load(Ordering::Acquire);
            }

            if self.try_claim(count) {
                return Ok(WaitStatus::Acquired);
            }
        }
    }
}

impl<W: AddressWait> SemaphoreOps for FastSemaphore<W> {
    fn kind(&self) -> BackendKind {
        BackendKind::Fast
    }

    fn wait_timeout_ns(&self, timeout_ns: i64) -> Result<WaitStatus> {
        if timeout_ns == 0 {
            return Ok(self.poll());
        }
        if timeout_ns < 0 {
            return self.wait_forever();
        }

        match Instant::now().checked_add(Duration::from_nanos(timeout_ns as u64)) {
            Some(deadline) => self.wait_until(deadline),
            None => self.wait_forever(),
        }
    }

    fn value(&self) -> u32 {
        self.count.load(Ordering::Acquire)
    }

    fn post(&self) -> Result<()> {
        // The increment must be visible before the wake so a woken thread
        // never re-reads a stale zero.
        self.count
            .fetch_update(Ordering::Release, Ordering::Relaxed, |count| count.checked_add(1))
            .map_err(|_| DualsemError::os_failure("semaphore post", POST_OVERFLOW_CODE))?;
        W::wake_one(&self.count)
    }
}

impl<W: AddressWait> fmt::Debug for FastSemaphore<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FastSemaphore")
            .field("count", &self.count.load(Ordering::Relaxed))
            .finish()
    }
}
