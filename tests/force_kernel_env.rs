//! The force-kernel environment switch is read when the registry installs.
//!
//! Kept in its own test binary so no other test has installed a backend first.

use std::env;

use dualsem::{BackendKind, Semaphore, WaitStatus};

#[test]
fn test_env_forces_kernel_semaphore() {
    // Only test in this process, nothing else reads the environment concurrently
    unsafe {
        env::set_var("DUALSEM_FORCE_KERNEL_SEMAPHORE", "1");
    }

    assert_eq!(dualsem::active_backend(), None);

    let sem = Semaphore::new(1).unwrap();
    assert_eq!(sem.backend(), BackendKind::Fallback);
    assert_eq!(dualsem::active_backend(), Some(BackendKind::Fallback));

    assert_eq!(sem.try_wait().unwrap(), WaitStatus::Acquired);
    assert_eq!(sem.try_wait().unwrap(), WaitStatus::TimedOut);
    sem.post().unwrap();
    assert_eq!(sem.value(), 1);

    unsafe {
        env::remove_var("DUALSEM_FORCE_KERNEL_SEMAPHORE");
    }
    // Installed once per process
    assert_eq!(Semaphore::new(0).unwrap().backend(), BackendKind::Fallback);
}
