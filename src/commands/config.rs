//! Config command handler.

use field_snapshots::{Result, SnapshotsConfig};

/// Prints the effective configuration as TOML.
pub fn cmd_config_show(config: &SnapshotsConfig) -> Result<()> {
    match &config.source {
        Some(path) => println!("# Loaded from {}", path.display()),
        None => println!("# No config file found, using defaults"),
    }
    print!("{}", config.to_toml()?);
    Ok(())
}
