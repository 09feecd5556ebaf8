//! Process-wide backend registry
//!
//! The first semaphore creation probes the platform, picks a backend and
//! publishes its [`ImplementationTable`]. The table is written once through a
//! `OnceLock`, so every thread sees either nothing or the complete table, and
//! it never changes afterwards.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::OnceLock;

use super::{BackendKind, CapabilityProbe, FallbackSemaphore, FastSemaphore, Semaphore, SemaphoreOps};
use crate::config::{Config, SemaphoreConfig};
use crate::error::Result;
use crate::thread::{AddressWait, DefaultAddressWait, OsSemaphore};

/// Factory entry point of a backend
pub type CreateFn = fn(initial_value: u32, kernel_max_count: u32) -> Result<Box<dyn SemaphoreOps>>;

fn create_fast<W: AddressWait>(initial_value: u32, _kernel_max_count: u32) -> Result<Box<dyn SemaphoreOps>> {
    Ok(FastSemaphore::<W>::create(initial_value)?)
}

fn create_fallback(initial_value: u32, kernel_max_count: u32) -> Result<Box<dyn SemaphoreOps>> {
    Ok(FallbackSemaphore::<OsSemaphore>::with_capacity(initial_value, kernel_max_count)?)
}

/// Selected backend and its factory
///
/// Wait, value, post and destroy dispatch through the vtable of the
/// [`SemaphoreOps`] object the factory returns.
#[derive(Clone)]
pub struct ImplementationTable {
    kind: BackendKind,
    create: CreateFn,
    kernel_max_count: u32,
}

impl ImplementationTable {
    /// Table for `kind` using the platform's default facilities
    pub fn for_kind(kind: BackendKind, config: &SemaphoreConfig) -> Self {
        Self::with_address_wait::<DefaultAddressWait>(kind, config)
    }

    /// Table for `kind` whose fast path blocks through `W`
    pub fn with_address_wait<W: AddressWait>(kind: BackendKind, config: &SemaphoreConfig) -> Self {
        let create: CreateFn = match kind {
            BackendKind::Fast => create_fast::<W>,
            BackendKind::Fallback => create_fallback,
        };
        Self {
            kind,
            create,
            kernel_max_count: config.kernel_max_count,
        }
    }

    /// Backend served by this table
    pub fn kind(&self) -> BackendKind {
        self.kind
    }

    /// Create a semaphore holding `initial_value` slots
    pub fn create(&self, initial_value: u32) -> Result<Semaphore> {
        let backend = (self.create)(initial_value, self.kernel_max_count)?;
        Ok(Semaphore::from_backend(backend))
    }
}

impl fmt::Debug for ImplementationTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImplementationTable")
            .field("kind", &self.kind)
            .field("kernel_max_count", &self.kernel_max_count)
            .finish()
    }
}

/// Write-once holder of the active [`ImplementationTable`]
#[derive(Debug)]
pub struct ImplementationRegistry {
    table: OnceLock<ImplementationTable>,
    probes: AtomicUsize,
}

impl ImplementationRegistry {
    /// Empty registry; nothing is probed until first use
    pub const fn new() -> Self {
        Self {
            table: OnceLock::new(),
            probes: AtomicUsize::new(0),
        }
    }

    fn env_config() -> SemaphoreConfig {
        SemaphoreConfig::from_env().unwrap_or_else(|err| {
            log::warn!("ignoring semaphore environment configuration: {}", err);
            SemaphoreConfig::default()
        })
    }

    fn build<W: AddressWait>(&self, config: &SemaphoreConfig) -> ImplementationTable {
        self.probes.fetch_add(1, Ordering::Relaxed);
        let kind = CapabilityProbe::<W>::run(config);
        log::debug!("installing {} semaphore implementation", kind);
        ImplementationTable::with_address_wait::<W>(kind, config)
    }

    /// The installed table, installing it from the environment if needed
    pub fn table(&self) -> &ImplementationTable {
        self.table
            .get_or_init(|| self.build::<DefaultAddressWait>(&Self::env_config()))
    }

    /// Install the table selected under `config`, unless one is already installed.
    ///
    /// Returns the backend actually active; a previously installed table is kept.
    pub fn install(&self, config: SemaphoreConfig) -> Result<BackendKind> {
        self.install_with::<DefaultAddressWait>(config)
    }

    /// [`install`](Self::install) probing and blocking through `W`
    pub fn install_with<W: AddressWait>(&self, config: SemaphoreConfig) -> Result<BackendKind> {
        config.validate()?;

        let mut installed_here = false;
        let table = self.table.get_or_init(|| {
            installed_here = true;
            self.build::<W>(&config)
        });

        if !installed_here {
            let requested = CapabilityProbe::<W>::run(&config);
            if requested != table.kind {
                log::warn!(
                    "semaphore implementation already installed as {}, requested {} ignored",
                    table.kind,
                    requested
                );
            }
        }
        Ok(table.kind)
    }

    /// Installed backend, if any
    pub fn active(&self) -> Option<BackendKind> {
        self.table.get().map(ImplementationTable::kind)
    }

    /// How many times a table was built; at most one per registry
    pub fn probe_count(&self) -> usize {
        self.probes.load(Ordering::Relaxed)
    }

    /// Create a semaphore through the installed table
    pub fn create(&self, initial_value: u32) -> Result<Semaphore> {
        self.table().create(initial_value)
    }
}

impl Default for ImplementationRegistry {
    fn default() -> Self {
        Self::new()
    }
}

static GLOBAL_REGISTRY: ImplementationRegistry = ImplementationRegistry::new();

/// Registry backing [`Semaphore::new`] and the [`crate::api`] functions
pub fn global() -> &'static ImplementationRegistry {
    &GLOBAL_REGISTRY
}
