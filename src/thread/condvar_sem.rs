//! Mutex/condvar counting wait object
//!
//! Stands in for the kernel semaphore on targets that have no usable unnamed
//! semaphore (Apple platforms declare `sem_init` but fail it). Enforces the
//! capacity ceiling the same way a Win32 semaphore does.

use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use super::{AcquireStatus, KernelWaitObject};
use crate::error::{DualsemError, Result};

/// Counting wait object built on `parking_lot`
#[derive(Debug)]
pub struct CondvarSemaphore {
    count: Mutex<u32>,
    available: Condvar,
    max_count: u32,
    closed: bool,
}

impl KernelWaitObject for CondvarSemaphore {
    fn create(initial: u32, max_count: u32) -> Result<Self> {
        if initial > max_count {
            return Err(DualsemError::invalid_argument("initial_value"));
        }
        Ok(Self {
            count: Mutex::new(initial),
            available: Condvar::new(),
            max_count,
            closed: false,
        })
    }

    fn acquire(&self, timeout_ms: Option<u32>) -> Result<AcquireStatus> {
        if self.closed {
            return Err(DualsemError::invalid_argument("sem"));
        }
        let mut count = self.count.lock();
        match timeout_ms {
            None => {
                while *count == 0 {
                    self.available.wait(&mut count);
                }
            }
            Some(ms) => {
                let deadline = Instant::now() + Duration::from_millis(u64::from(ms));
                while *count == 0 {
                    if self.available.wait_until(&mut count, deadline).timed_out() && *count == 0 {
                        return Ok(AcquireStatus::TimedOut);
                    }
                }
            }
        }
        *count -= 1;
        Ok(AcquireStatus::Acquired)
    }

    fn release(&self) -> Result<()> {
        if self.closed {
            return Err(DualsemError::invalid_argument("sem"));
        }
        let mut count = self.count.lock();
        if *count >= self.max_count {
            // Same condition Win32 reports as ERROR_TOO_MANY_POSTS
            return Err(DualsemError::os_failure("condvar semaphore release", 298));
        }
        *count += 1;
        drop(count);
        self.available.notify_one();
        Ok(())
    }

    fn close(&mut self) {
        self.closed = true;
    }
}
