//! Configuration for dualsem
//!
//! The only runtime knobs are the ones consulted while selecting the semaphore
//! backend: whether to force the kernel-object fallback, and the capacity
//! ceiling handed to kernel semaphores.
//!
//! # Environment Initialization
//!
//! ```rust
//! use dualsem::config::{Config, SemaphoreConfig};
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Reads DUALSEM_FORCE_KERNEL_SEMAPHORE and DUALSEM_KERNEL_MAX_COUNT
//! let config = SemaphoreConfig::from_env()?;
//!
//! // Same variables under another prefix
//! let config = SemaphoreConfig::from_env_with_prefix("MYAPP_")?;
//! # Ok(())
//! # }
//! ```

use crate::error::Result;
use std::env;
use std::fmt;
use std::path::Path;

pub mod semaphore;


pub use semaphore::SemaphoreConfig;

/// Common configuration trait providing validation, environment initialization,
/// and preset management functionality.
pub trait Config: Clone + fmt::Debug {
    /// Validate the configuration for correctness and consistency.
    fn validate(&self) -> Result<()>;

    /// Initialize configuration from environment variables.
    ///
    /// Environment variables use the format `DUALSEM_{FIELD}`, for example
    /// `DUALSEM_FORCE_KERNEL_SEMAPHORE=1`.
    fn from_env() -> Result<Self>
    where
        Self: Default,
    {
        Self::from_env_with_prefix("DUALSEM_")
    }

    /// Initialize configuration from environment variables with a custom prefix.
    fn from_env_with_prefix(prefix: &str) -> Result<Self>
    where
        Self: Default;

    /// Get a performance-optimized preset configuration.
    fn performance_preset() -> Self;

    /// Get a compatibility preset that avoids optional OS facilities.
    fn compatibility_preset() -> Self;

    /// Get a balanced preset configuration.
    fn balanced_preset() -> Self
    where
        Self: Default,
    {
        Self::default()
    }

    /// Save configuration to a JSON file.
    fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()>;

    /// Load configuration from a JSON file.
    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self>;
}

/// Parse an environment variable, falling back to `default` when it is unset
/// or does not parse.
pub fn parse_env_var<T>(var_name: &str, default: T) -> T
where
    T: std::str::FromStr + Clone,
{
    env::var(var_name)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

/// Parse a boolean environment variable.
///
/// Accepts "true", "1", "yes", "on" (case-insensitive) as true,
/// everything else as false.
pub fn parse_env_bool(var_name: &str, default: bool) -> bool {
    env::var(var_name)
        .ok()
        .map(|s| {
            let s = s.trim().to_lowercase();
            matches!(s.as_str(), "true" | "1" | "yes" | "on")
        })
        .unwrap_or(default)
}
