use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load config file: {0}")]
    FileError(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("Environment variable not found: {0}")]
    EnvVarMissing(String),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Sportsbook feeds configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SportsbookConfig {
    /// Operator ID used to build EveryMatrix routes
    pub operator_id: String,
    #[serde(default = "default_language")]
    pub language: String,
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Market type order used until the feed supplies its own
    #[serde(default)]
    pub main_markets_order: Vec<String>,
    #[serde(default)]
    pub channel: ChannelSettings,
    #[serde(default)]
    pub sportradar: SportRadarSettings,
    #[serde(default)]
    pub replay: ReplaySettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelSettings {
    /// Give up on an initial dump request after this many seconds
    #[serde(default = "default_initial_dump_timeout")]
    pub initial_dump_timeout_secs: u64,
}

impl Default for ChannelSettings {
    fn default() -> Self {
        Self {
            initial_dump_timeout_secs: default_initial_dump_timeout(),
        }
    }
}

impl ChannelSettings {
    pub fn initial_dump_timeout(&self) -> Duration {
        Duration::from_secs(self.initial_dump_timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SportRadarSettings {
    /// Session token appended to socket-rest routes (from .env when unset)
    #[serde(default)]
    pub session_token: Option<String>,
    #[serde(default = "default_all_sports_route")]
    pub all_sports_route: String,
    #[serde(default = "default_live_sports_route")]
    pub live_sports_route: String,
}

impl Default for SportRadarSettings {
    fn default() -> Self {
        Self {
            session_token: None,
            all_sports_route: default_all_sports_route(),
            live_sports_route: default_live_sports_route(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReplaySettings {
    /// JSON-lines recording replayed by `feed_replay`
    #[serde(default)]
    pub path: Option<String>,
    /// Match assembled after the replay finishes
    #[serde(default)]
    pub match_id: Option<String>,
    /// Match list assembled after the replay finishes
    #[serde(default)]
    pub list: Option<String>,
    /// Topic whose initial dump fills `list`
    #[serde(default)]
    pub list_route: Option<String>,
    /// Seconds to keep running after the recording is applied; 0 waits for Ctrl+C
    #[serde(default)]
    pub linger_secs: u64,
}

fn default_language() -> String {
    "en".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_initial_dump_timeout() -> u64 {
    10
}

fn default_all_sports_route() -> String {
    "/sports/allSports".to_string()
}

fn default_live_sports_route() -> String {
    "/sports/liveSports".to_string()
}

impl SportsbookConfig {
    /// Load configuration from YAML file and .env
    pub fn load(config_path: impl AsRef<Path>) -> Result<Self> {
        let yaml_content = std::fs::read_to_string(config_path)?;
        let mut config: SportsbookConfig = serde_yaml::from_str(&yaml_content)?;

        // Don't fail if .env doesn't exist
        dotenv::dotenv().ok();
        config.apply_env_overrides();

        config.validate()?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(operator_id) = std::env::var("SPORTSBOOK_OPERATOR_ID") {
            info!("Overriding operator id from environment variable");
            self.operator_id = operator_id;
        }
        if let Ok(token) = std::env::var("SPORTRADAR_SESSION_TOKEN") {
            info!("Overriding SportRadar session token from environment variable");
            self.sportradar.session_token = Some(token);
        }
        if let Ok(level) = std::env::var("SPORTSBOOK_LOG_LEVEL") {
            self.log_level = level;
        }
    }

    /// SportRadar session token, required by binaries that open SportRadar feeds
    pub fn session_token(&self) -> Result<&str> {
        self.sportradar
            .session_token
            .as_deref()
            .filter(|token| !token.is_empty())
            .ok_or_else(|| ConfigError::EnvVarMissing("SPORTRADAR_SESSION_TOKEN".to_string()))
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.operator_id.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "operator_id cannot be empty".to_string(),
            ));
        }

        if self.language.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "language cannot be empty".to_string(),
            ));
        }

        if self.channel.initial_dump_timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "channel.initial_dump_timeout_secs must be greater than 0".to_string(),
            ));
        }

        if self.replay.list.is_some() != self.replay.list_route.is_some() {
            return Err(ConfigError::ValidationError(
                "replay.list and replay.list_route must be set together".to_string(),
            ));
        }

        if self.main_markets_order.iter().any(|t| t.trim().is_empty()) {
            return Err(ConfigError::ValidationError(
                "main_markets_order cannot contain empty market types".to_string(),
            ));
        }

        let valid_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_levels.contains(&self.log_level.to_lowercase().as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "log_level must be one of: {}",
                valid_levels.join(", ")
            )));
        }

        Ok(())
    }

    /// Log configuration summary
    pub fn log(&self) {
        info!("Configuration loaded:");
        info!("  Operator: {}", self.operator_id);
        info!("  Language: {}", self.language);
        info!("  Log level: {}", self.log_level);
        info!("  Main markets order: {:?}", self.main_markets_order);
        info!(
            "  Initial dump timeout: {} seconds",
            self.channel.initial_dump_timeout_secs
        );
        info!(
            "  SportRadar session token: {}",
            if self.sportradar.session_token.is_some() { "set" } else { "not set" }
        );
        if let Some(path) = &self.replay.path {
            info!("  Replay file: {}", path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> SportsbookConfig {
        serde_yaml::from_str("operator_id: \"4093\"\n").unwrap()
    }

    #[test]
    fn test_defaults() {
        let config = config();
        assert_eq!(config.language, "en");
        assert_eq!(config.log_level, "info");
        assert_eq!(config.channel.initial_dump_timeout(), Duration::from_secs(10));
        assert!(config.main_markets_order.is_empty());
        assert_eq!(config.sportradar.all_sports_route, "/sports/allSports");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = config();

        config.operator_id = " ".to_string();
        assert!(config.validate().is_err());
        config.operator_id = "4093".to_string();

        config.log_level = "verbose".to_string();
        assert!(config.validate().is_err());
        config.log_level = "DEBUG".to_string();
        assert!(config.validate().is_ok());

        config.channel.initial_dump_timeout_secs = 0;
        assert!(config.validate().is_err());
        config.channel.initial_dump_timeout_secs = 5;

        config.main_markets_order = vec!["1X2".to_string(), String::new()];
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_file() {
        use std::io::Write;

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "operator_id: \"4093\"\nlanguage: pt\nmain_markets_order: [\"1X2\", \"OU25\"]\nreplay:\n  path: feed.jsonl\n  match_id: \"123\""
        )
        .unwrap();

        let config = SportsbookConfig::load(file.path()).unwrap();
        assert_eq!(config.language, "pt");
        assert_eq!(config.main_markets_order, vec!["1X2", "OU25"]);
        assert_eq!(config.replay.path.as_deref(), Some("feed.jsonl"));
        assert_eq!(config.replay.match_id.as_deref(), Some("123"));
    }

    #[test]
    fn test_replay_list_needs_route() {
        let mut config = config();
        config.replay.list = Some("popular".to_string());
        assert!(config.validate().is_err());
        config.replay.list_route = Some("/sports/4093/en/popular-matches-aggregator-main/1/10/3".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_session_token() {
        let mut config = config();
        assert!(matches!(
            config.session_token(),
            Err(ConfigError::EnvVarMissing(_))
        ));

        config.sportradar.session_token = Some("abc".to_string());
        assert_eq!(config.session_token().unwrap(), "abc");
    }
}
