//! # Dualsem: Counting Semaphores with Runtime Backend Selection
//!
//! This crate provides a counting semaphore that picks the best blocking
//! strategy the running system offers, once, the first time a semaphore is
//! created:
//!
//! - **Fast path**: a lock-free atomic counter claimed by compare-and-swap, with
//!   blocking through an address wait/wake facility (`futex` on Linux,
//!   `WaitOnAddress` on Windows 8+)
//! - **Fallback path**: a kernel semaphore (Win32 semaphore, unnamed POSIX
//!   semaphore) plus a shadow counter
//!
//! Set `DUALSEM_FORCE_KERNEL_SEMAPHORE=1` (or call [`install`] with
//! [`SemaphoreConfig::force_kernel`]) to force the fallback.
//!
//! ## Quick Start
//!
//! ```rust
//! use dualsem::{Semaphore, WaitStatus};
//! use std::sync::Arc;
//! use std::thread;
//!
//! let sem = Arc::new(Semaphore::new(0).unwrap());
//!
//! let worker = {
//!     let sem = Arc::clone(&sem);
//!     thread::spawn(move || sem.wait().unwrap())
//! };
//!
//! sem.post().unwrap();
//! worker.join().unwrap();
//!
//! // Bounded waits report a timeout as a normal outcome
//! assert_eq!(sem.wait_timeout_ns(1_000_000).unwrap(), WaitStatus::TimedOut);
//! ```

#![warn(missing_docs)]
#![deny(unsafe_op_in_unsafe_fn)]

pub mod api;
pub mod config;
pub mod error;
pub mod ffi;
pub mod semaphore;
pub mod thread;

pub use config::{Config, SemaphoreConfig};
pub use error::{DualsemError, Result};
pub use semaphore::{
    BackendKind, FallbackSemaphore, FastSemaphore, ImplementationRegistry, Semaphore,
    SemaphoreOps, WaitStatus,
};

/// Library version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Select and install the process-wide backend from the environment.
///
/// Optional: the first [`Semaphore::new`] does the same. Returns the active backend.
pub fn init() -> BackendKind {
    log::debug!("Initializing dualsem v{}", VERSION);
    semaphore::registry::global().table().kind()
}

/// Install the process-wide backend under `config`.
///
/// Has no effect once a backend is installed; the returned kind is the one in use.
pub fn install(config: SemaphoreConfig) -> Result<BackendKind> {
    semaphore::registry::global().install(config)
}

/// The process-wide backend, if one has been installed
pub fn active_backend() -> Option<BackendKind> {
    semaphore::registry::global().active()
}
