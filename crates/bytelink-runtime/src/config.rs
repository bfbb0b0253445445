//! Bridge configuration (bytelink.toml)
//!
//! ```toml
//! mode = "exported"
//!
//! [files]
//! source = "http"
//! base_url = "http://localhost:8080/assets/"
//! timeout_ms = 5000
//!
//! [console]
//! stdout_target = "guest::stdout"
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur while loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read config file
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    /// Failed to parse TOML
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Validation error
    #[error("Invalid config: {0}")]
    ValidationError(String),
}

/// How guest code is hosted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMode {
    /// Translated guest code runs against host glue; guest objects live in the host heap
    #[default]
    Direct,
    /// Guest code is a compiled binary module reached through its exported symbols
    Exported,
}

/// Where `openForRead` gets its bytes from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "lowercase")]
pub enum FileSourceConfig {
    /// Blocking HTTP/1.1 GET relative to `base_url`
    Http {
        /// Base URL paths are resolved against
        base_url: String,
        /// Connect/read timeout in milliseconds
        #[serde(default = "default_timeout_ms")]
        timeout_ms: u64,
    },
    /// Files below a local directory
    Directory {
        /// Root directory
        root: PathBuf,
    },
    /// Buffers staged in memory by the embedder
    Memory,
}

fn default_timeout_ms() -> u64 {
    5000
}

impl Default for FileSourceConfig {
    fn default() -> Self {
        FileSourceConfig::Memory
    }
}

/// Log targets for the console handles
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsoleConfig {
    /// Target for handle 1
    #[serde(default = "default_stdout_target")]
    pub stdout_target: String,

    /// Target for handle 2
    #[serde(default = "default_stderr_target")]
    pub stderr_target: String,
}

fn default_stdout_target() -> String {
    "guest::stdout".to_string()
}

fn default_stderr_target() -> String {
    "guest::stderr".to_string()
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            stdout_target: default_stdout_target(),
            stderr_target: default_stderr_target(),
        }
    }
}

/// Top-level bridge configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// Execution mode
    #[serde(default)]
    pub mode: ExecutionMode,

    /// File source
    #[serde(default)]
    pub files: FileSourceConfig,

    /// Console log targets
    #[serde(default)]
    pub console: ConsoleConfig,
}

impl BridgeConfig {
    /// Load a config from a file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Parse a config from a string
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        let config: BridgeConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the config
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let FileSourceConfig::Http {
            base_url,
            timeout_ms,
        } = &self.files
        {
            let url = url::Url::parse(base_url).map_err(|e| {
                ConfigError::ValidationError(format!("Invalid base_url {}: {}", base_url, e))
            })?;
            if url.scheme() != "http" {
                return Err(ConfigError::ValidationError(format!(
                    "Unsupported scheme {} (use http)",
                    url.scheme()
                )));
            }
            if *timeout_ms == 0 {
                return Err(ConfigError::ValidationError(
                    "timeout_ms must be greater than zero".to_string(),
                ));
            }
        }

        if self.console.stdout_target.is_empty() || self.console.stderr_target.is_empty() {
            return Err(ConfigError::ValidationError(
                "Console targets cannot be empty".to_string(),
            ));
        }

        Ok(())
    }
}
