//! Kernel wait object semaphore
//!
//! Kernel semaphores cannot portably report their count, so a shadow counter
//! mirrors it for [`SemaphoreOps::value`].

use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};

use super::{try_box, BackendKind, SemaphoreOps, WaitStatus};
use crate::config::semaphore::DEFAULT_KERNEL_MAX_COUNT;
use crate::error::Result;
use crate::thread::{AcquireStatus, KernelWaitObject, OsSemaphore};

/// Semaphore delegating blocking to the kernel object `K`
pub struct FallbackSemaphore<K: KernelWaitObject = OsSemaphore> {
    object: K,
    count: AtomicU32,
}

/// Millisecond budget for a kernel wait: `None` is infinite, `Some(0)` polls.
/// Positive budgets are truncated to whole milliseconds.
pub(crate) fn ns_to_ms_budget(timeout_ns: i64) -> Option<u32> {
    if timeout_ns < 0 {
        None
    } else {
        Some((timeout_ns / 1_000_000).min(i64::from(u32::MAX - 1)) as u32)
    }
}

impl<K: KernelWaitObject> FallbackSemaphore<K> {
    /// Heap-allocate a semaphore with the default kernel capacity ceiling
    pub fn create(initial_value: u32) -> Result<Box<Self>> {
        Self::with_capacity(initial_value, DEFAULT_KERNEL_MAX_COUNT)
    }

    /// Heap-allocate a semaphore whose kernel object holds at most `max_count` slots
    pub fn with_capacity(initial_value: u32, max_count: u32) -> Result<Box<Self>> {
        let object = K::create(initial_value, max_count)?;
        // On allocation failure `object` is dropped here, closing it
        try_box(Self {
            object,
            count: AtomicU32::new(initial_value),
        })
    }

    /// The kernel object behind this semaphore
    pub fn kernel_object(&self) -> &K {
        &self.object
    }
}

impl<K: KernelWaitObject> SemaphoreOps for FallbackSemaphore<K> {
    fn kind(&self) -> BackendKind {
        BackendKind::Fallback
    }

    fn wait_timeout_ns(&self, timeout_ns: i64) -> Result<WaitStatus> {
        match self.object.acquire(ns_to_ms_budget(timeout_ns))? {
            AcquireStatus::Acquired => {
                self.count.fetch_sub(1, Ordering::AcqRel);
                Ok(WaitStatus::Acquired)
            }
            AcquireStatus::TimedOut => Ok(WaitStatus::TimedOut),
        }
    }

    fn value(&self) -> u32 {
        self.count.load(Ordering::Acquire)
    }

    fn post(&self) -> Result<()> {
        // Increment first: once the release lands, the woken thread may be the
        // last user and destroy the semaphore before this call returns.
        self.count.fetch_add(1, Ordering::AcqRel);
        if let Err(err) = self.object.release() {
            self.count.fetch_sub(1, Ordering::AcqRel);
            log::warn!("kernel semaphore release failed: {}", err);
            return Err(err);
        }
        Ok(())
    }
}

impl<K: KernelWaitObject> Drop for FallbackSemaphore<K> {
    fn drop(&mut self) {
        self.object.close();
    }
}

impl<K: KernelWaitObject> fmt::Debug for FallbackSemaphore<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FallbackSemaphore")
            .field("count", &self.count.load(Ordering::Relaxed))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DualsemError;
    use crate::thread::CondvarSemaphore;
    use std::sync::atomic::AtomicBool;
    use std::sync::Arc;
    use std::thread;
    use std::time::{Duration, Instant};

    /// Kernel object whose release can be switched to fail
    struct FlakyObject {
        inner: CondvarSemaphore,
        fail_release: AtomicBool,
    }

    impl KernelWaitObject for FlakyObject {
        fn create(initial: u32, max_count: u32) -> Result<Self> {
            Ok(Self {
                inner: CondvarSemaphore::create(initial, max_count)?,
                fail_release: AtomicBool::new(false),
            })
        }

        fn acquire(&self, timeout_ms: Option<u32>) -> Result<AcquireStatus> {
            self.inner.acquire(timeout_ms)
        }

        fn release(&self) -> Result<()> {
            if self.fail_release.load(Ordering::SeqCst) {
                return Err(DualsemError::os_failure("flaky release", 6));
            }
            self.inner.release()
        }

        fn close(&mut self) {
            self.inner.close();
        }
    }

    /// Kernel object that cannot be created
    struct UncreatableObject;

    impl KernelWaitObject for UncreatableObject {
        fn create(_initial: u32, _max_count: u32) -> Result<Self> {
            Err(DualsemError::os_failure("create", 8))
        }

        fn acquire(&self, _timeout_ms: Option<u32>) -> Result<AcquireStatus> {
            unreachable!()
        }

        fn release(&self) -> Result<()> {
            unreachable!()
        }

        fn close(&mut self) {}
    }

    #[test]
    fn test_ns_to_ms_budget() {
        assert_eq!(ns_to_ms_budget(-1), None);
        assert_eq!(ns_to_ms_budget(i64::MIN), None);
        assert_eq!(ns_to_ms_budget(0), Some(0));
        assert_eq!(ns_to_ms_budget(999_999), Some(0));
        assert_eq!(ns_to_ms_budget(50_000_000), Some(50));
        assert_eq!(ns_to_ms_budget(i64::MAX), Some(u32::MAX - 1));
    }

    #[test]
    fn test_create_failure_reported() {
        let result = FallbackSemaphore::<UncreatableObject>::create(1);
        assert!(matches!(result, Err(DualsemError::OsFailure { operation: "create", .. })));
    }

    #[test]
    fn test_shadow_tracks_waits_and_posts() {
        let sem = FallbackSemaphore::<CondvarSemaphore>::create(2).unwrap();
        assert_eq!(sem.value(), 2);
        assert_eq!(sem.wait_timeout_ns(0).unwrap(), WaitStatus::Acquired);
        assert_eq!(sem.value(), 1);
        sem.post().unwrap();
        sem.post().unwrap();
        assert_eq!(sem.value(), 3);
    }

    #[test]
    fn test_failed_release_rolls_back_shadow() {
        let sem = FallbackSemaphore::<FlakyObject>::create(1).unwrap();
        sem.kernel_object().fail_release.store(true, Ordering::SeqCst);

        assert!(matches!(sem.post(), Err(DualsemError::OsFailure { .. })));
        assert_eq!(sem.value(), 1);

        sem.kernel_object().fail_release.store(false, Ordering::SeqCst);
        sem.post().unwrap();
        assert_eq!(sem.value(), 2);
    }

    #[test]
    fn test_capacity_overflow_rolls_back() {
        let sem = FallbackSemaphore::<CondvarSemaphore>::with_capacity(1, 1).unwrap();
        assert!(sem.post().is_err());
        assert_eq!(sem.value(), 1);
    }

    #[test]
    fn test_os_semaphore_ceiling_rolls_back() {
        let sem = FallbackSemaphore::<OsSemaphore>::with_capacity(1, 1).unwrap();
        assert!(matches!(sem.post(), Err(DualsemError::OsFailure { .. })));
        assert_eq!(sem.value(), 1);

        assert_eq!(sem.wait_timeout_ns(0).unwrap(), WaitStatus::Acquired);
        sem.post().unwrap();
        assert_eq!(sem.value(), 1);
        assert_eq!(sem.wait_timeout_ns(0).unwrap(), WaitStatus::Acquired);
        assert_eq!(sem.wait_timeout_ns(0).unwrap(), WaitStatus::TimedOut);
    }

    #[test]
    fn test_initial_above_capacity_rejected() {
        assert!(FallbackSemaphore::<CondvarSemaphore>::with_capacity(3, 2).is_err());
    }

    #[test]
    fn test_timed_wait_expires() {
        let sem = FallbackSemaphore::<OsSemaphore>::create(0).unwrap();
        let start = Instant::now();
        assert_eq!(sem.wait_timeout_ns(30_000_000).unwrap(), WaitStatus::TimedOut);
        assert!(start.elapsed() >= Duration::from_millis(25));
        assert_eq!(sem.value(), 0);
    }

    #[test]
    fn test_sub_millisecond_budget_polls() {
        let sem = FallbackSemaphore::<OsSemaphore>::create(0).unwrap();
        assert_eq!(sem.wait_timeout_ns(500_000).unwrap(), WaitStatus::TimedOut);
    }

    #[test]
    fn test_post_wakes_infinite_waiter() {
        let sem: Arc<FallbackSemaphore> = Arc::new(*FallbackSemaphore::create(0).unwrap());
        let waiter = {
            let sem = Arc::clone(&sem);
            thread::spawn(move || sem.wait_timeout_ns(-1).unwrap())
        };
        thread::sleep(Duration::from_millis(10));
        sem.post().unwrap();
        assert_eq!(waiter.join().unwrap(), WaitStatus::Acquired);
        assert_eq!(sem.value(), 0);
    }
}
