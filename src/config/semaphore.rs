//! Backend selection configuration.

use super::{parse_env_bool, parse_env_var, Config};
use crate::error::{DualsemError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Capacity ceiling of kernel semaphores created by the fallback backend
pub const DEFAULT_KERNEL_MAX_COUNT: u32 = 32 * 1024;

/// Settings read once when the process-wide backend is selected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SemaphoreConfig {
    /// Use the kernel wait object even when the address wait facility is available
    pub force_kernel_semaphore: bool,
    /// Maximum count of fallback kernel semaphores
    pub kernel_max_count: u32,
}

impl Default for SemaphoreConfig {
    fn default() -> Self {
        Self {
            force_kernel_semaphore: false,
            kernel_max_count: DEFAULT_KERNEL_MAX_COUNT,
        }
    }
}

impl SemaphoreConfig {
    /// Default configuration with the fallback forced
    pub fn force_kernel() -> Self {
        Self {
            force_kernel_semaphore: true,
            ..Self::default()
        }
    }
}

impl Config for SemaphoreConfig {
    fn validate(&self) -> Result<()> {
        if self.kernel_max_count == 0 {
            return Err(DualsemError::configuration("kernel_max_count must be at least 1"));
        }
        if self.kernel_max_count > i32::MAX as u32 {
            return Err(DualsemError::configuration(format!(
                "kernel_max_count {} exceeds {}",
                self.kernel_max_count,
                i32::MAX
            )));
        }
        Ok(())
    }

    fn from_env_with_prefix(prefix: &str) -> Result<Self> {
        let mut config = Self::default();
        config.force_kernel_semaphore = parse_env_bool(
            &format!("{}FORCE_KERNEL_SEMAPHORE", prefix),
            config.force_kernel_semaphore,
        );
        config.kernel_max_count =
            parse_env_var(&format!("{}KERNEL_MAX_COUNT", prefix), config.kernel_max_count);
        config.validate()?;
        Ok(config)
    }

    fn performance_preset() -> Self {
        Self::default()
    }

    fn compatibility_preset() -> Self {
        Self::force_kernel()
    }

    fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let serialized = serde_json::to_string_pretty(self).map_err(|e| {
            DualsemError::configuration(format!("Failed to serialize semaphore config: {}", e))
        })?;
        std::fs::write(path, serialized)?;
        Ok(())
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content).map_err(|e| {
            DualsemError::configuration(format!("Failed to parse semaphore config file: {}", e))
        })?;
        config.validate()?;
        Ok(config)
    }
}
