//! Counting semaphores with a runtime-selected backend
//!
//! Two interchangeable algorithms implement [`SemaphoreOps`]:
//!
//! - [`FastSemaphore`]: a lock-free counter claimed by compare-and-swap, with
//!   blocking delegated to an address wait/wake facility (futex, `WaitOnAddress`).
//! - [`FallbackSemaphore`]: a kernel wait object plus a shadow counter for
//!   [`SemaphoreOps::value`].
//!
//! The [`ImplementationRegistry`] picks one of them the first time a
//! [`Semaphore`] is created and every semaphore of the process uses it from then
//! on.
//!
//! ```rust
//! use dualsem::{Semaphore, WaitStatus};
//! # fn main() -> dualsem::Result<()> {
//! let sem = Semaphore::new(1)?;
//! assert_eq!(sem.try_wait()?, WaitStatus::Acquired);
//! assert_eq!(sem.try_wait()?, WaitStatus::TimedOut);
//! sem.post()?;
//! assert_eq!(sem.value(), 1);
//! # Ok(())
//! # }
//! ```

pub mod fallback;
pub mod fast;
pub mod probe;
pub mod registry;

pub use fallback::FallbackSemaphore;
pub use fast::FastSemaphore;
pub use probe::{select_backend, CapabilityProbe};
pub use registry::{ImplementationRegistry, ImplementationTable};

use crate::error::{DualsemError, Result};
use std::alloc::{alloc, Layout};
use std::fmt;
use std::ptr::NonNull;
use std::time::Duration;

/// Result of a bounded wait
///
/// A timeout is an expected outcome, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitStatus {
    /// One slot was claimed
    Acquired,
    /// No slot became available within the budget
    TimedOut,
}

impl WaitStatus {
    /// Whether a slot was claimed
    #[inline]
    pub fn is_acquired(self) -> bool {
        matches!(self, Self::Acquired)
    }
}

/// Which algorithm backs a semaphore
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendKind {
    /// Atomic counter + address wait/wake
    Fast,
    /// Kernel wait object + shadow counter
    Fallback,
}

impl BackendKind {
    /// Short name for logs
    pub fn name(self) -> &'static str {
        match self {
            Self::Fast => "atomic+address-wait",
            Self::Fallback => "kernel-semaphore",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Operations every semaphore backend provides.
///
/// Creation is a per-backend factory (see [`ImplementationTable`]) and
/// destruction is `Drop`.
pub trait SemaphoreOps: Send + Sync + fmt::Debug {
    /// Backend identity
    fn kind(&self) -> BackendKind;

    /// Claim one slot.
    ///
    /// `timeout_ns < 0` waits forever, `0` polls without blocking, `> 0` waits up
    /// to that many nanoseconds (rounded to the host timer granularity).
    fn wait_timeout_ns(&self, timeout_ns: i64) -> Result<WaitStatus>;

    /// Advisory snapshot of the available slots
    fn value(&self) -> u32;

    /// Release one slot and wake one waiter
    fn post(&self) -> Result<()>;
}

/// Heap-allocate `value`, reporting allocation failure instead of aborting
pub(crate) fn try_box<T>(value: T) -> Result<Box<T>> {
    let layout = Layout::new::<T>();
    if layout.size() == 0 {
        return Ok(Box::new(value));
    }

    // SAFETY: layout has non-zero size.
    let ptr = NonNull::new(unsafe { alloc(layout) } as *mut T)
        .ok_or_else(|| DualsemError::out_of_memory(layout.size()))?;

    // SAFETY: ptr is freshly allocated with the layout of T, so it is valid
    // for writes and owned exclusively by the Box built from it.
    unsafe {
        ptr.as_ptr().write(value);
        Ok(Box::from_raw(ptr.as_ptr()))
    }
}

/// Counting semaphore backed by the process-wide implementation
///
/// The handle exclusively owns its backend state; dropping it destroys the
/// semaphore. Share it between threads with `Arc` or scoped borrows.
pub struct Semaphore {
    inner: Box<dyn SemaphoreOps>,
}

impl Semaphore {
    /// Create a semaphore holding `initial_value` slots.
    ///
    /// The first call in the process selects and installs the backend.
    pub fn new(initial_value: u32) -> Result<Self> {
        registry::global().create(initial_value)
    }

    pub(crate) fn from_backend(inner: Box<dyn SemaphoreOps>) -> Self {
        Self { inner }
    }

    /// Backend serving this semaphore
    pub fn backend(&self) -> BackendKind {
        self.inner.kind()
    }

    /// Claim one slot with a nanosecond budget; see [`SemaphoreOps::wait_timeout_ns`]
    pub fn wait_timeout_ns(&self, timeout_ns: i64) -> Result<WaitStatus> {
        self.inner.wait_timeout_ns(timeout_ns)
    }

    /// Claim one slot, blocking until one is posted
    pub fn wait(&self) -> Result<()> {
        self.inner.wait_timeout_ns(-1).map(|_| ())
    }

    /// Claim one slot only if one is available right now
    pub fn try_wait(&self) -> Result<WaitStatus> {
        self.inner.wait_timeout_ns(0)
    }

    /// Claim one slot, waiting at most `timeout`
    pub fn wait_timeout(&self, timeout: Duration) -> Result<WaitStatus> {
        let timeout_ns = i64::try_from(timeout.as_nanos()).unwrap_or(i64::MAX);
        self.inner.wait_timeout_ns(timeout_ns)
    }

    /// Advisory snapshot of the available slots
    pub fn value(&self) -> u32 {
        self.inner.value()
    }

    /// Release one slot
    pub fn post(&self) -> Result<()> {
        self.inner.post()
    }
}

impl fmt::Debug for Semaphore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Semaphore")
            .field("backend", &self.backend())
            .field("value", &self.value())
            .finish()
    }
}
