//! Layered configuration loading.
//!
//! The priority chain (later overrides earlier):
//! 1. Built-in defaults ([`HarnessConfig::default()`])
//! 2. User-level: `~/.dosprobe/config.toml`
//! 3. Workspace-level: `./dosprobe.toml`
//! 4. `DOSPROBE_*` environment variables
//!
//! Each top-level field in the final [`EffectiveConfig`] is annotated with
//! the [`ConfigSource`] that determined its value.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::config::{HarnessConfig, CONFIG_FILENAME};
use crate::ProbeError;

/// Files larger than this are rejected.
const MAX_CONFIG_FILE_SIZE: u64 = 256 * 1024;

/// Where a configuration value came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    BuiltinDefault,
    UserFile(PathBuf),
    WorkspaceFile(PathBuf),
    EnvVar(String),
}

impl fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigSource::BuiltinDefault => write!(f, "built-in default"),
            ConfigSource::UserFile(p) => write!(f, "user file: {}", p.display()),
            ConfigSource::WorkspaceFile(p) => write!(f, "workspace file: {}", p.display()),
            ConfigSource::EnvVar(name) => write!(f, "env var: {name}"),
        }
    }
}

/// The merged config plus provenance for each field.
#[derive(Debug, Clone)]
pub struct EffectiveConfig {
    pub config: HarnessConfig,
    /// Field name -> the source that determined its value.
    pub sources: HashMap<String, ConfigSource>,
    /// Config files that were found and loaded, in priority order.
    pub source_files: Vec<PathBuf>,
}

/// Environment variable to config field mapping.
struct EnvMapping {
    env_var: &'static str,
    field: &'static str,
    numeric: bool,
}

const ENV_MAPPINGS: &[EnvMapping] = &[
    EnvMapping {
        env_var: "DOSPROBE_SETTLE_DELAY_MS",
        field: "settle_delay_ms",
        numeric: true,
    },
    EnvMapping {
        env_var: "DOSPROBE_POLL_INTERVAL_MS",
        field: "poll_interval_ms",
        numeric: true,
    },
    EnvMapping {
        env_var: "DOSPROBE_STORE_PATH",
        field: "store_path",
        numeric: false,
    },
    EnvMapping {
        env_var: "DOSPROBE_MOUNT_PATH",
        field: "mount_path",
        numeric: false,
    },
    EnvMapping {
        env_var: "DOSPROBE_WORKING_DIR",
        field: "working_dir",
        numeric: false,
    },
    EnvMapping {
        env_var: "DOSPROBE_MODULE_URL",
        field: "module_url",
        numeric: false,
    },
    EnvMapping {
        env_var: "DOSPROBE_KEY_TARGET",
        field: "key_target",
        numeric: false,
    },
];

/// Layered configuration loader.
pub struct ConfigLoader {
    user_config_path: Option<PathBuf>,
    workspace_config_path: Option<PathBuf>,
    /// Environment lookup, replaceable so tests never touch process state.
    env: fn(&str) -> Option<String>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self {
            user_config_path: None,
            workspace_config_path: None,
            env: |name| std::env::var(name).ok(),
        }
    }

    #[must_use]
    pub fn with_user_path(mut self, path: PathBuf) -> Self {
        self.user_config_path = Some(path);
        self
    }

    #[must_use]
    pub fn with_workspace_path(mut self, path: PathBuf) -> Self {
        self.workspace_config_path = Some(path);
        self
    }

    #[must_use]
    pub fn with_env(mut self, env: fn(&str) -> Option<String>) -> Self {
        self.env = env;
        self
    }

    /// Load, merge, and validate configuration from all layers.
    pub fn load(&self) -> Result<EffectiveConfig, ProbeError> {
        let mut sources = HashMap::new();
        let mut source_files = Vec::new();

        let mut merged = toml::Value::try_from(HarnessConfig::default())
            .map_err(|e| ProbeError::ConfigError(format!("failed to serialize defaults: {e}")))?;
        if let toml::Value::Table(table) = &merged {
            for key in table.keys() {
                sources.insert(key.clone(), ConfigSource::BuiltinDefault);
            }
        }

        let user_path = self.user_config_path.clone().unwrap_or_else(|| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".into());
            PathBuf::from(home).join(".dosprobe").join("config.toml")
        });
        if user_path.exists() {
            let layer = read_layer(&user_path)?;
            deep_merge(&mut merged, &layer);
            record_sources(&layer, &mut sources, &ConfigSource::UserFile(user_path.clone()));
            source_files.push(user_path);
        }

        let workspace_path = self
            .workspace_config_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(CONFIG_FILENAME));
        if workspace_path.exists() {
            let layer = read_layer(&workspace_path)?;
            deep_merge(&mut merged, &layer);
            record_sources(
                &layer,
                &mut sources,
                &ConfigSource::WorkspaceFile(workspace_path.clone()),
            );
            source_files.push(workspace_path);
        }

        self.apply_env_overrides(&mut merged, &mut sources)?;

        let config: HarnessConfig = merged
            .try_into()
            .map_err(|e| ProbeError::ConfigError(format!("failed to parse merged config: {e}")))?;
        config.validate()?;

        Ok(EffectiveConfig {
            config,
            sources,
            source_files,
        })
    }

    fn apply_env_overrides(
        &self,
        merged: &mut toml::Value,
        sources: &mut HashMap<String, ConfigSource>,
    ) -> Result<(), ProbeError> {
        let toml::Value::Table(table) = merged else {
            return Ok(());
        };
        for mapping in ENV_MAPPINGS {
            let Some(raw) = (self.env)(mapping.env_var) else {
                continue;
            };
            if raw.chars().any(char::is_control) {
                return Err(ProbeError::ConfigError(format!(
                    "environment variable {} contains control characters",
                    mapping.env_var
                )));
            }
            let value = if mapping.numeric {
                let n: i64 = raw.trim().parse().map_err(|_| {
                    ProbeError::ConfigError(format!(
                        "{} must be an integer, got {raw:?}",
                        mapping.env_var
                    ))
                })?;
                toml::Value::Integer(n)
            } else {
                toml::Value::String(raw)
            };
            table.insert(mapping.field.to_string(), value);
            sources.insert(
                mapping.field.to_string(),
                ConfigSource::EnvVar(mapping.env_var.to_string()),
            );
        }
        Ok(())
    }
}

/// Read one config layer with a size limit and null-byte check.
fn read_layer(path: &Path) -> Result<toml::Value, ProbeError> {
    let metadata = std::fs::metadata(path).map_err(|e| {
        ProbeError::ConfigError(format!("cannot read config file {}: {e}", path.display()))
    })?;
    if metadata.len() > MAX_CONFIG_FILE_SIZE {
        return Err(ProbeError::ConfigError(format!(
            "config file {} exceeds maximum size of {MAX_CONFIG_FILE_SIZE} bytes",
            path.display()
        )));
    }
    let content = std::fs::read_to_string(path).map_err(|e| {
        ProbeError::ConfigError(format!("cannot read config file {}: {e}", path.display()))
    })?;
    if content.contains('\0') {
        return Err(ProbeError::ConfigError(format!(
            "config file {} contains null bytes",
            path.display()
        )));
    }
    toml::from_str(&content)
        .map_err(|e| ProbeError::ConfigError(format!("invalid config {}: {e}", path.display())))
}

/// Tables merge field-by-field; anything else is replaced by the overlay.
fn deep_merge(base: &mut toml::Value, overlay: &toml::Value) {
    match (base, overlay) {
        (toml::Value::Table(base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                if let Some(base_val) = base_table.get_mut(key) {
                    deep_merge(base_val, overlay_val);
                } else {
                    base_table.insert(key.clone(), overlay_val.clone());
                }
            }
        }
        (base, overlay) => {
            *base = overlay.clone();
        }
    }
}

fn record_sources(
    layer: &toml::Value,
    sources: &mut HashMap<String, ConfigSource>,
    source: &ConfigSource,
) {
    if let toml::Value::Table(table) = layer {
        for key in table.keys() {
            sources.insert(key.clone(), source.clone());
        }
    }
}
