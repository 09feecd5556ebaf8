//! C FFI compatibility layer
//!
//! Exposes the semaphore API with C calling conventions and integer status
//! codes. The error message of the last failing call is kept per thread.

#[cfg(feature = "ffi")]
pub mod c_api;

#[cfg(feature = "ffi")]
pub use c_api::*;

use crate::error::DualsemError;
use crate::semaphore::WaitStatus;

/// Status codes returned across the C boundary
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CResult {
    /// The operation succeeded (for waits: a slot was claimed)
    Success = 0,
    /// A bounded wait elapsed without claiming a slot
    TimedOut = 1,
    /// Null handle or invalid parameter
    InvalidInput = -1,
    /// Allocation failure
    MemoryError = -2,
    /// The OS synchronization facility failed
    OsError = -3,
    /// Facility not available on this platform
    UnsupportedOperation = -4,
    /// Anything else
    InternalError = -5,
}

impl From<&DualsemError> for CResult {
    fn from(err: &DualsemError) -> Self {
        match err {
            DualsemError::InvalidArgument { .. } => CResult::InvalidInput,
            DualsemError::OutOfMemory { .. } => CResult::MemoryError,
            DualsemError::OsFailure { .. } => CResult::OsError,
            DualsemError::NotSupported { .. } => CResult::UnsupportedOperation,
            DualsemError::Io(_) | DualsemError::Configuration { .. } => CResult::InternalError,
        }
    }
}

impl From<WaitStatus> for CResult {
    fn from(status: WaitStatus) -> Self {
        match status {
            WaitStatus::Acquired => CResult::Success,
            WaitStatus::TimedOut => CResult::TimedOut,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_mapping() {
        assert_eq!(CResult::from(&DualsemError::invalid_argument("sem")), CResult::InvalidInput);
        assert_eq!(CResult::from(&DualsemError::out_of_memory(8)), CResult::MemoryError);
        assert_eq!(CResult::from(&DualsemError::os_failure("sem_post", 75)), CResult::OsError);
        assert_eq!(CResult::from(&DualsemError::not_supported("futex")), CResult::UnsupportedOperation);
        assert_eq!(CResult::from(&DualsemError::configuration("x")), CResult::InternalError);
    }

    #[test]
    fn test_wait_status_mapping() {
        assert_eq!(CResult::from(WaitStatus::Acquired), CResult::Success);
        assert_eq!(CResult::from(WaitStatus::TimedOut), CResult::TimedOut);
        assert_eq!(CResult::TimedOut as i32, 1);
    }
}
