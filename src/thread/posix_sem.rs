//! Unnamed POSIX semaphores
//!
//! The `sem_t` lives in its own heap cell so its address stays fixed for the
//! lifetime of the object, as `sem_init` requires.

use std::cell::UnsafeCell;
use std::mem::MaybeUninit;

use parking_lot::Mutex;

use super::{AcquireStatus, KernelWaitObject};
use crate::error::{DualsemError, Result};

fn last_errno() -> i32 {
    std::io::Error::last_os_error().raw_os_error().unwrap_or(0)
}

/// Absolute `CLOCK_REALTIME` deadline `timeout_ms` from now, as `sem_timedwait` expects
fn realtime_deadline(timeout_ms: u32) -> Result<libc::timespec> {
    let mut now = MaybeUninit::<libc::timespec>::uninit();
    if unsafe { libc::clock_gettime(libc::CLOCK_REALTIME, now.as_mut_ptr()) } != 0 {
        return Err(DualsemError::last_os_error("clock_gettime"));
    }
    let now = unsafe { now.assume_init() };

    let mut sec = now.tv_sec as i64 + i64::from(timeout_ms / 1000);
    let mut nsec = now.tv_nsec as i64 + i64::from(timeout_ms % 1000) * 1_000_000;
    if nsec >= 1_000_000_000 {
        sec += 1;
        nsec -= 1_000_000_000;
    }

    Ok(libc::timespec {
        tv_sec: sec.min(libc::time_t::MAX as i64) as libc::time_t,
        tv_nsec: nsec as libc::c_long,
    })
}

/// Process-private unnamed POSIX semaphore
pub struct PosixSemaphore {
    sem: Box<UnsafeCell<libc::sem_t>>,
    max_count: u32,
    // Serializes the capacity check with the post; waits only lower the value
    post_lock: Mutex<()>,
    initialized: bool,
}

// SAFETY: PosixSemaphore is Send because:
// 1. `sem` is heap-allocated and owned; sem_t carries no thread affinity.
unsafe impl Send for PosixSemaphore {}

// SAFETY: PosixSemaphore is Sync because:
// 1. All shared access goes through sem_wait/sem_trywait/sem_timedwait/sem_post,
//    which POSIX requires to be thread-safe.
// 2. The capacity check and sem_post run under `post_lock`.
// 3. sem_destroy only runs from `close`, which takes `&mut self`.
unsafe impl Sync for PosixSemaphore {}

impl PosixSemaphore {
    fn as_ptr(&self) -> *mut libc::sem_t {
        self.sem.get()
    }
}

impl std::fmt::Debug for PosixSemaphore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PosixSemaphore")
            .field("max_count", &self.max_count)
            .field("initialized", &self.initialized)
            .finish()
    }
}

impl KernelWaitObject for PosixSemaphore {
    /// POSIX semaphores have no native ceiling; `release` enforces `max_count`
    /// and reports `EOVERFLOW` past it, as `sem_post` does at `SEM_VALUE_MAX`.
    fn create(initial: u32, max_count: u32) -> Result<Self> {
        if initial > max_count {
            return Err(DualsemError::invalid_argument("initial_value"));
        }

        // SAFETY: sem_t is plain data; sem_init overwrites it before first use.
        let sem = Box::new(UnsafeCell::new(unsafe { MaybeUninit::<libc::sem_t>::zeroed().assume_init() }));
        let mut object = Self {
            sem,
            max_count,
            post_lock: Mutex::new(()),
            initialized: false,
        };

        if unsafe { libc::sem_init(object.as_ptr(), 0, initial as libc::c_uint) } != 0 {
            return Err(DualsemError::last_os_error("sem_init"));
        }
        object.initialized = true;
        Ok(object)
    }

    fn acquire(&self, timeout_ms: Option<u32>) -> Result<AcquireStatus> {
        match timeout_ms {
            None => loop {
                if unsafe { libc::sem_wait(self.as_ptr()) } == 0 {
                    return Ok(AcquireStatus::Acquired);
                }
                match last_errno() {
                    libc::EINTR => continue,
                    errno => return Err(DualsemError::os_failure("sem_wait", errno)),
                }
            },
            Some(0) => loop {
                if unsafe { libc::sem_trywait(self.as_ptr()) } == 0 {
                    return Ok(AcquireStatus::Acquired);
                }
                match last_errno() {
                    libc::EAGAIN => return Ok(AcquireStatus::TimedOut),
                    libc::EINTR => continue,
                    errno => return Err(DualsemError::os_failure("sem_trywait", errno)),
                }
            },
            Some(ms) => {
                // Signals restart the wait against the same absolute deadline
                let deadline = realtime_deadline(ms)?;
                loop {
                    if unsafe { libc::sem_timedwait(self.as_ptr(), &deadline) } == 0 {
                        return Ok(AcquireStatus::Acquired);
                    }
                    match last_errno() {
                        libc::ETIMEDOUT => return Ok(AcquireStatus::TimedOut),
                        libc::EINTR => continue,
                        errno => return Err(DualsemError::os_failure("sem_timedwait", errno)),
                    }
                }
            }
        }
    }

    fn release(&self) -> Result<()> {
        let _guard = self.post_lock.lock();

        let mut value: libc::c_int = 0;
        if unsafe { libc::sem_getvalue(self.as_ptr(), &mut value) } != 0 {
            return Err(DualsemError::last_os_error("sem_getvalue"));
        }
        // Linux reports 0 rather than a negative count while threads wait
        if i64::from(value) >= i64::from(self.max_count) {
            return Err(DualsemError::os_failure("sem_post", libc::EOVERFLOW));
        }

        if unsafe { libc::sem_post(self.as_ptr()) } != 0 {
            return Err(DualsemError::last_os_error("sem_post"));
        }
        Ok(())
    }

    fn close(&mut self) {
        if self.initialized {
            unsafe { libc::sem_destroy(self.as_ptr()) };
            self.initialized = false;
        }
    }
}

impl Drop for PosixSemaphore {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::{Duration, Instant};

    #[test]
    fn test_trywait_on_empty() {
        let sem = PosixSemaphore::create(0, 32 * 1024).unwrap();
        assert_eq!(sem.acquire(Some(0)).unwrap(), AcquireStatus::TimedOut);
    }

    #[test]
    fn test_timedwait_expires() {
        let sem = PosixSemaphore::create(0, 32 * 1024).unwrap();
        let start = Instant::now();
        assert_eq!(sem.acquire(Some(30)).unwrap(), AcquireStatus::TimedOut);
        assert!(start.elapsed() >= Duration::from_millis(25));
    }

    #[test]
    fn test_release_wakes_blocked_acquire() {
        let sem = Arc::new(PosixSemaphore::create(0, 32 * 1024).unwrap());
        let waiter = {
            let sem = Arc::clone(&sem);
            thread::spawn(move || sem.acquire(None).unwrap())
        };
        thread::sleep(Duration::from_millis(10));
        sem.release().unwrap();
        assert_eq!(waiter.join().unwrap(), AcquireStatus::Acquired);
    }

    #[test]
    fn test_release_past_capacity_fails() {
        let sem = PosixSemaphore::create(2, 2).unwrap();
        assert!(matches!(
            sem.release(),
            Err(DualsemError::OsFailure { operation: "sem_post", code: libc::EOVERFLOW })
        ));

        assert_eq!(sem.acquire(Some(0)).unwrap(), AcquireStatus::Acquired);
        sem.release().unwrap();
        assert!(sem.release().is_err());
    }

    #[test]
    fn test_racing_releases_respect_capacity() {
        let sem = Arc::new(PosixSemaphore::create(0, 4).unwrap());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let sem = Arc::clone(&sem);
                thread::spawn(move || sem.release().is_ok())
            })
            .collect();

        let released = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|ok| *ok)
            .count();
        assert_eq!(released, 4);
        for _ in 0..4 {
            assert_eq!(sem.acquire(Some(0)).unwrap(), AcquireStatus::Acquired);
        }
        assert_eq!(sem.acquire(Some(0)).unwrap(), AcquireStatus::TimedOut);
    }

    #[test]
    fn test_initial_above_capacity_rejected() {
        assert!(PosixSemaphore::create(10, 5).is_err());
    }

    #[test]
    fn test_close_is_idempotent() {
        let mut sem = PosixSemaphore::create(1, 8).unwrap();
        sem.close();
        sem.close();
    }

    #[test]
    fn test_realtime_deadline_normalized() {
        let deadline = realtime_deadline(1999).unwrap();
        assert!(deadline.tv_nsec >= 0);
        assert!((deadline.tv_nsec as i64) < 1_000_000_000);
    }
}
