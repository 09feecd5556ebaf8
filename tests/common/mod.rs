//! Shared helpers for the integration tests

#![allow(dead_code)]

use std::sync::Arc;

use dualsem::thread::{AddressWait, DefaultAddressWait, OsSemaphore};
use dualsem::{FallbackSemaphore, FastSemaphore, SemaphoreOps};

/// Factory producing a shareable semaphore of one backend
pub type Factory = fn(u32) -> Arc<dyn SemaphoreOps>;

fn fast(initial: u32) -> Arc<dyn SemaphoreOps> {
    let sem: Box<dyn SemaphoreOps> = FastSemaphore::<DefaultAddressWait>::create(initial).unwrap();
    Arc::from(sem)
}

fn fallback(initial: u32) -> Arc<dyn SemaphoreOps> {
    let sem: Box<dyn SemaphoreOps> = FallbackSemaphore::<OsSemaphore>::create(initial).unwrap();
    Arc::from(sem)
}

/// Every backend usable on this machine, with a label for assertion messages
pub fn backends() -> Vec<(&'static str, Factory)> {
    let mut list: Vec<(&'static str, Factory)> = vec![("fallback", fallback as Factory)];
    if DefaultAddressWait::is_available() {
        list.push(("fast", fast as Factory));
    }
    list
}
