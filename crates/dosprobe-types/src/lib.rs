//! Core types shared across all dosprobe crates.
//!
//! Defines the harness configuration, the boot configuration handed to an
//! emulator factory, the layered configuration loader, and the shared error
//! type used by the persistent store and configuration code.

pub mod config;
pub mod config_loader;
pub mod error;

pub use config::{
    BootConfig, HarnessConfig, CONFIG_FILENAME, DEFAULT_MOUNT_PATH, DEFAULT_POLL_INTERVAL_MS,
    DEFAULT_SETTLE_DELAY_MS,
};
pub use config_loader::{ConfigLoader, ConfigSource, EffectiveConfig};
pub use error::ProbeError;
