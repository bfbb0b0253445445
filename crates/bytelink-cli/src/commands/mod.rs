//! Subcommand implementations

pub mod cat;
pub mod imports;
pub mod run;

use anyhow::Context;
use bytelink_runtime::BridgeConfig;
use std::path::Path;

/// Load the configuration file, or the defaults when none is given
pub fn load_config(path: Option<&Path>) -> anyhow::Result<BridgeConfig> {
    match path {
        Some(path) => BridgeConfig::from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display())),
        None => Ok(BridgeConfig::default()),
    }
}
