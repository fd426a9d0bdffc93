//! `dosprobe config show` -- display the effective configuration.

use std::fmt::Write as _;

use anyhow::{Context, Result};

use dosprobe_types::{ConfigLoader, ConfigSource, EffectiveConfig};

/// Run `dosprobe config show`.
pub fn show() -> Result<()> {
    let effective = ConfigLoader::new()
        .load()
        .context("failed to load configuration")?;
    print!("{}", render(&effective)?);
    Ok(())
}

fn render(effective: &EffectiveConfig) -> Result<String> {
    let table = toml::Value::try_from(&effective.config)
        .context("failed to serialize configuration")?;
    let mut out = String::new();

    if let toml::Value::Table(fields) = &table {
        let width = fields.keys().map(String::len).max().unwrap_or(0);
        for (name, value) in fields {
            let source = effective
                .sources
                .get(name)
                .cloned()
                .unwrap_or(ConfigSource::BuiltinDefault);
            let _ = writeln!(out, "{name:<width$}  {value}  ({source})");
        }
    }

    if effective.source_files.is_empty() {
        let _ = writeln!(out, "\nNo config files found.");
    } else {
        let _ = writeln!(out, "\nLoaded from:");
        for file in &effective.source_files {
            let _ = writeln!(out, "  {}", file.display());
        }
    }
    Ok(out)
}
