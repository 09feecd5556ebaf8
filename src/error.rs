//! Error handling for the dualsem library
//!
//! A timed-out wait is not an error and never appears here; waits report it
//! through [`crate::WaitStatus`].

use thiserror::Error;

/// Main error type for the dualsem library
#[derive(Error, Debug)]
pub enum DualsemError {
    /// I/O related errors (configuration files)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Null or otherwise invalid handle / parameter
    #[error("Invalid argument: {name}")]
    InvalidArgument {
        /// Name of the offending parameter
        name: String,
    },

    /// Memory allocation failures
    #[error("Memory allocation failed: requested {size} bytes")]
    OutOfMemory {
        /// Number of bytes requested
        size: usize,
    },

    /// The underlying wait/wake/release facility reported an unexpected error
    #[error("{operation} failed (os error {code})")]
    OsFailure {
        /// The OS call that failed
        operation: &'static str,
        /// Raw OS error code (errno or GetLastError)
        code: i32,
    },

    /// Feature not available on this platform
    #[error("Not supported: {feature}")]
    NotSupported {
        /// Description of the unsupported feature
        feature: String,
    },

    /// Configuration or parameter errors
    #[error("Invalid configuration: {message}")]
    Configuration {
        /// Configuration error message
        message: String,
    },
}

impl DualsemError {
    /// Create an invalid argument error
    pub fn invalid_argument<S: Into<String>>(name: S) -> Self {
        Self::InvalidArgument { name: name.into() }
    }

    /// Create an out of memory error
    pub fn out_of_memory(size: usize) -> Self {
        Self::OutOfMemory { size }
    }

    /// Create an OS failure error with an explicit code
    pub fn os_failure(operation: &'static str, code: i32) -> Self {
        Self::OsFailure { operation, code }
    }

    /// Create an OS failure error from the calling thread's last OS error
    pub fn last_os_error(operation: &'static str) -> Self {
        let code = std::io::Error::last_os_error().raw_os_error().unwrap_or(0);
        Self::OsFailure { operation, code }
    }

    /// Create a not supported error
    pub fn not_supported<S: Into<String>>(feature: S) -> Self {
        Self::NotSupported { feature: feature.into() }
    }

    /// Create a configuration error
    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Self::Configuration { message: message.into() }
    }

    /// Check if this is a recoverable error
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Io(_) => true,
            Self::OutOfMemory { .. } => true,
            Self::OsFailure { .. } => true,
            Self::InvalidArgument { .. } => false,
            Self::NotSupported { .. } => false,
            Self::Configuration { .. } => false,
        }
    }

    /// Get the error category for logging/metrics
    pub fn category(&self) -> &'static str {
        match self {
            Self::Io(_) => "io",
            Self::InvalidArgument { .. } => "argument",
            Self::OutOfMemory { .. } => "memory",
            Self::OsFailure { .. } => "os",
            Self::NotSupported { .. } => "unsupported",
            Self::Configuration { .. } => "config",
        }
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, DualsemError>;
