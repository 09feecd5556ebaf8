//! Windows synchronization facilities
//!
//! `WaitOnAddress`/`WakeByAddressSingle` only exist on Windows 8 and newer, so
//! they are resolved at runtime from the `api-ms-win-core-synch-l1-2-0` API set
//! instead of being linked. Kernel semaphores are available everywhere.

use std::ffi::c_void;
use std::mem;
use std::ptr;
use std::sync::atomic::AtomicU32;
use std::sync::OnceLock;
use std::time::Duration;

use winapi::shared::minwindef::{BOOL, DWORD, FALSE, FARPROC};
use winapi::shared::winerror::{ERROR_TIMEOUT, WAIT_TIMEOUT};
use winapi::um::errhandlingapi::GetLastError;
use winapi::um::handleapi::CloseHandle;
use winapi::um::libloaderapi::{GetModuleHandleW, GetProcAddress};
use winapi::um::synchapi::{CreateSemaphoreW, ReleaseSemaphore, WaitForSingleObjectEx};
use winapi::um::winbase::{INFINITE, WAIT_OBJECT_0};
use winapi::um::winnt::HANDLE;

use super::{duration_to_ms_ceil, AcquireStatus, AddressWait, KernelWaitObject, WakeStatus};
use crate::error::{DualsemError, Result};

type WaitOnAddressFn = unsafe extern "system" fn(*mut c_void, *mut c_void, usize, DWORD) -> BOOL;
type WakeByAddressSingleFn = unsafe extern "system" fn(*mut c_void);

#[derive(Clone, Copy)]
struct AddressWaitFns {
    wait_on_address: WaitOnAddressFn,
    wake_by_address_single: WakeByAddressSingleFn,
}

static ADDRESS_WAIT_FNS: OnceLock<Option<AddressWaitFns>> = OnceLock::new();

fn resolve_address_wait() -> Option<AddressWaitFns> {
    // The API set is already loaded because kernel32 forwards to it; a plain
    // module lookup is enough and never loads a new DLL.
    let module_name: Vec<u16> = "api-ms-win-core-synch-l1-2-0.dll"
        .encode_utf16()
        .chain(std::iter::once(0))
        .collect();

    let module = unsafe { GetModuleHandleW(module_name.as_ptr()) };
    if module.is_null() {
        log::trace!("synch API set not present, WaitOnAddress unavailable");
        return None;
    }

    let wait: FARPROC = unsafe { GetProcAddress(module, c"WaitOnAddress".as_ptr()) };
    let wake: FARPROC = unsafe { GetProcAddress(module, c"WakeByAddressSingle".as_ptr()) };
    if wait.is_null() || wake.is_null() {
        log::trace!("WaitOnAddress/WakeByAddressSingle not exported");
        return None;
    }

    // SAFETY: both exports have exactly these documented signatures.
    unsafe {
        Some(AddressWaitFns {
            wait_on_address: mem::transmute::<FARPROC, WaitOnAddressFn>(wait),
            wake_by_address_single: mem::transmute::<FARPROC, WakeByAddressSingleFn>(wake),
        })
    }
}

fn address_wait_fns() -> Option<AddressWaitFns> {
    *ADDRESS_WAIT_FNS.get_or_init(resolve_address_wait)
}

/// `WaitOnAddress` based address wait
#[derive(Debug)]
pub struct WindowsAddressWait;

impl AddressWait for WindowsAddressWait {
    fn is_available() -> bool {
        address_wait_fns().is_some()
    }

    fn wait(addr: &AtomicU32, expected: u32, timeout: Option<Duration>) -> Result<WakeStatus> {
        let fns = address_wait_fns().ok_or_else(|| DualsemError::not_supported("WaitOnAddress"))?;
        let mut compare = expected;
        let millis = match timeout {
            Some(d) => duration_to_ms_ceil(d),
            None => INFINITE,
        };

        let ok = unsafe {
            (fns.wait_on_address)(
                addr.as_ptr().cast(),
                (&mut compare as *mut u32).cast(),
                mem::size_of::<u32>(),
                millis,
            )
        };
        if ok != FALSE {
            return Ok(WakeStatus::Woken);
        }
        match unsafe { GetLastError() } {
            ERROR_TIMEOUT => Ok(WakeStatus::TimedOut),
            code => Err(DualsemError::os_failure("WaitOnAddress", code as i32)),
        }
    }

    fn wake_one(addr: &AtomicU32) -> Result<()> {
        let fns = address_wait_fns().ok_or_else(|| DualsemError::not_supported("WakeByAddressSingle"))?;
        unsafe { (fns.wake_by_address_single)(addr.as_ptr().cast()) };
        Ok(())
    }
}

/// Win32 kernel semaphore
#[derive(Debug)]
pub struct WindowsSemaphore {
    handle: HANDLE,
}

// SAFETY: WindowsSemaphore is Send because:
// 1. `handle: HANDLE` - a kernel handle value, valid from any thread of the process.
unsafe impl Send for WindowsSemaphore {}

// SAFETY: WindowsSemaphore is Sync because:
// 1. WaitForSingleObjectEx and ReleaseSemaphore are thread-safe kernel calls.
// 2. The handle is only mutated by `close`, which takes `&mut self`.
unsafe impl Sync for WindowsSemaphore {}

impl KernelWaitObject for WindowsSemaphore {
    fn create(initial: u32, max_count: u32) -> Result<Self> {
        if initial > max_count || max_count > i32::MAX as u32 {
            return Err(DualsemError::invalid_argument("initial_value"));
        }
        let handle = unsafe {
            CreateSemaphoreW(ptr::null_mut(), initial as i32, max_count as i32, ptr::null())
        };
        if handle.is_null() {
            return Err(DualsemError::os_failure("CreateSemaphore", unsafe { GetLastError() } as i32));
        }
        Ok(Self { handle })
    }

    fn acquire(&self, timeout_ms: Option<u32>) -> Result<AcquireStatus> {
        let millis = timeout_ms.unwrap_or(INFINITE);
        match unsafe { WaitForSingleObjectEx(self.handle, millis, FALSE) } {
            WAIT_OBJECT_0 => Ok(AcquireStatus::Acquired),
            WAIT_TIMEOUT => Ok(AcquireStatus::TimedOut),
            _ => Err(DualsemError::os_failure("WaitForSingleObject", unsafe { GetLastError() } as i32)),
        }
    }

    fn release(&self) -> Result<()> {
        if unsafe { ReleaseSemaphore(self.handle, 1, ptr::null_mut()) } == FALSE {
            return Err(DualsemError::os_failure("ReleaseSemaphore", unsafe { GetLastError() } as i32));
        }
        Ok(())
    }

    fn close(&mut self) {
        if !self.handle.is_null() {
            unsafe { CloseHandle(self.handle) };
            self.handle = ptr::null_mut();
        }
    }
}

impl Drop for WindowsSemaphore {
    fn drop(&mut self) {
        self.close();
    }
}
