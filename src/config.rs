//! Economy configuration, loaded from TOML.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::domain::Cents;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("config file not found: {0}")]
    NotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("validation error: {0}")]
    Validation(String),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct EconomyConfig {
    /// SQLite database file
    pub database_path: PathBuf,

    /// Starting balance for newly registered players, in cents
    pub default_balance: Cents,

    /// Whether `/economy set` is available. Off unless an operator opts in.
    pub enable_set_command: bool,

    /// Deadline for a single player command
    pub command_timeout_ms: u64,

    /// Commands allowed to run at the same time
    pub max_concurrent_commands: usize,

    /// SQLite pool size
    pub max_connections: u32,

    /// Fallback log filter when RUST_LOG is unset
    pub log_level: String,
}

impl Default for EconomyConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("economy.db"),
            default_balance: 10_000,
            enable_set_command: false,
            command_timeout_ms: 5_000,
            max_concurrent_commands: 16,
            max_connections: 8,
            log_level: "info".to_string(),
        }
    }
}

impl EconomyConfig {
    /// Load configuration from a file.
    pub fn load_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::NotFound(path.display().to_string()));
        }
        let content = std::fs::read_to_string(path)?;
        Self::load_str(&content)
    }

    /// Load configuration from a TOML string.
    pub fn load_str(content: &str) -> Result<Self, ConfigError> {
        let config: EconomyConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_balance < 0 {
            return Err(ConfigError::Validation(
                "default_balance must be non-negative".to_string(),
            ));
        }
        if self.command_timeout_ms == 0 {
            return Err(ConfigError::Validation(
                "command_timeout_ms must be at least 1".to_string(),
            ));
        }
        if self.max_concurrent_commands == 0 {
            return Err(ConfigError::Validation(
                "max_concurrent_commands must be at least 1".to_string(),
            ));
        }
        if self.max_connections == 0 {
            return Err(ConfigError::Validation(
                "max_connections must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_millis(self.command_timeout_ms)
    }
}
