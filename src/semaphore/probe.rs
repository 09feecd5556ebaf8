//! Capability probe deciding which backend the process uses

use std::marker::PhantomData;

use super::BackendKind;
use crate::config::SemaphoreConfig;
use crate::thread::{AddressWait, DefaultAddressWait};

/// Pick the backend: the fast path unless it is unavailable or overridden
#[inline]
pub fn select_backend(fast_available: bool, force_fallback: bool) -> BackendKind {
    if fast_available && !force_fallback {
        BackendKind::Fast
    } else {
        BackendKind::Fallback
    }
}

/// One-shot query of the address wait facility `W`
///
/// Probing is idempotent; concurrent probes may duplicate the OS query but
/// always agree on the answer.
pub struct CapabilityProbe<W: AddressWait = DefaultAddressWait> {
    _wait: PhantomData<fn() -> W>,
}

impl<W: AddressWait> CapabilityProbe<W> {
    /// Whether the fast facility can be used in this process
    pub fn fast_path_available() -> bool {
        W::is_available()
    }

    /// Backend to install under `config`
    ///
    /// A forced fallback never queries the facility.
    pub fn run(config: &SemaphoreConfig) -> BackendKind {
        if config.force_kernel_semaphore {
            log::debug!("kernel semaphore forced by configuration");
            return BackendKind::Fallback;
        }

        let available = Self::fast_path_available();
        log::trace!("address wait facility available: {}", available);
        select_backend(available, false)
    }
}
