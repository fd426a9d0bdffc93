//! Configuration types for a dosprobe harness session.
//!
//! [`HarnessConfig`] is the top-level configuration loaded from
//! `dosprobe.toml`, controlling input timing, image polling, the virtual
//! filesystem layout, and where the emulator persists its filesystem.
//! [`BootConfig`] is the subset handed to an emulator factory at startup.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::ProbeError;

/// File name of the workspace-level configuration file.
pub const CONFIG_FILENAME: &str = "dosprobe.toml";

/// Default pause between the halves of a key press, in milliseconds.
pub const DEFAULT_SETTLE_DELAY_MS: u64 = 100;

/// Default image watch poll interval, in milliseconds.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 64;

/// Default mount point of the program bundle inside the virtual filesystem.
pub const DEFAULT_MOUNT_PATH: &str = "/game";

/// Harness-wide settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct HarnessConfig {
    /// Pause after each key-down and each key-up event.
    pub settle_delay_ms: u64,
    /// Interval between image watch polls when the caller does not pass one.
    pub poll_interval_ms: u64,
    /// Location of the persistent store the virtual filesystem syncs to.
    pub store_path: PathBuf,
    /// Where the program bundle is extracted in the virtual filesystem.
    pub mount_path: String,
    /// Directory to change into after extraction; defaults to `mount_path`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub working_dir: Option<String>,
    /// URL of the emulator module to load.
    pub module_url: String,
    /// Element (or surface) the emulator listens on for key events.
    pub key_target: String,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            settle_delay_ms: DEFAULT_SETTLE_DELAY_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            store_path: PathBuf::from("dosprobe-fs.sqlite"),
            mount_path: DEFAULT_MOUNT_PATH.to_string(),
            working_dir: None,
            module_url: "wdosbox.js".to_string(),
            key_target: "canvas".to_string(),
        }
    }
}

impl HarnessConfig {
    /// The settle delay as a [`Duration`].
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    /// The default poll interval as a [`Duration`].
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// The directory the emulated program starts in.
    pub fn effective_working_dir(&self) -> &str {
        self.working_dir.as_deref().unwrap_or(&self.mount_path)
    }

    /// Check that the configuration describes a usable session.
    pub fn validate(&self) -> Result<(), ProbeError> {
        if self.settle_delay_ms == 0 {
            return Err(ProbeError::ConfigError(
                "settle_delay_ms must be greater than zero".into(),
            ));
        }
        if self.poll_interval_ms == 0 {
            return Err(ProbeError::ConfigError(
                "poll_interval_ms must be greater than zero".into(),
            ));
        }
        validate_virtual_path("mount_path", &self.mount_path)?;
        if let Some(dir) = &self.working_dir {
            validate_virtual_path("working_dir", dir)?;
        }
        if self.store_path.as_os_str().is_empty() {
            return Err(ProbeError::ConfigError("store_path must not be empty".into()));
        }
        Ok(())
    }

    /// Build the boot configuration for an emulator factory.
    pub fn boot_config(&self, bundle: Option<Vec<u8>>) -> BootConfig {
        BootConfig {
            module_url: self.module_url.clone(),
            key_target: self.key_target.clone(),
            store_path: self.store_path.clone(),
            mount_path: self.mount_path.clone(),
            working_dir: self.effective_working_dir().to_string(),
            bundle,
        }
    }
}

/// Everything an emulator factory needs to start an instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootConfig {
    pub module_url: String,
    pub key_target: String,
    /// The emulator syncs its filesystem here; the harness reads it back.
    pub store_path: PathBuf,
    pub mount_path: String,
    pub working_dir: String,
    /// Archive extracted into `mount_path` after start, if any.
    pub bundle: Option<Vec<u8>>,
}

/// Virtual filesystem paths are absolute and free of control characters.
fn validate_virtual_path(field: &str, path: &str) -> Result<(), ProbeError> {
    if !path.starts_with('/') {
        return Err(ProbeError::ConfigError(format!(
            "{field} must be an absolute path, got {path:?}"
        )));
    }
    if path.chars().any(char::is_control) {
        return Err(ProbeError::ConfigError(format!(
            "{field} contains control characters"
        )));
    }
    Ok(())
}
