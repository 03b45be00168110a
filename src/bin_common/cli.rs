//! CLI utilities for binaries
//!
//! Resolves configuration paths from environment variables.

use std::path::PathBuf;

/// Type of configuration to load
#[derive(Debug, Clone)]
pub enum ConfigType {
    /// Feeds configuration (config/sportsbook.yaml)
    Sportsbook,
    /// Replay configuration (config/replay.yaml)
    Replay,
    /// Custom path
    Custom(String),
}

impl ConfigType {
    /// Get the default path for this config type
    pub fn default_path(&self) -> &str {
        match self {
            ConfigType::Sportsbook => "config/sportsbook.yaml",
            ConfigType::Replay => "config/replay.yaml",
            ConfigType::Custom(path) => path,
        }
    }

    /// Get the environment variable name for this config type
    pub fn env_var_name(&self) -> &str {
        match self {
            ConfigType::Sportsbook => "SPORTSBOOK_CONFIG_PATH",
            ConfigType::Replay => "REPLAY_CONFIG_PATH",
            ConfigType::Custom(_) => "SPORTSBOOK_CONFIG_PATH",
        }
    }
}

/// Configuration path from the environment, or the type's default
///
/// A custom path always wins over the environment.
pub fn load_config_from_env(config_type: ConfigType) -> PathBuf {
    if let ConfigType::Custom(path) = &config_type {
        return PathBuf::from(path);
    }
    std::env::var(config_type.env_var_name())
        .unwrap_or_else(|_| config_type.default_path().to_string())
        .into()
}

/// Command line arguments, without the program name
pub fn parse_args() -> Vec<String> {
    std::env::args().skip(1).collect()
}
