use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::core::models::settings::AppSettings;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    ReadError(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Failed to serialize config: {0}")]
    SerializeError(#[from] toml::ser::Error),
}

/// Where usage data comes from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Program and arguments that print ccusage daily JSON on stdout
    #[serde(default = "default_command")]
    pub command: Vec<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_command() -> Vec<String> {
    vec!["bunx".into(), "ccusage".into(), "--json".into()]
}
fn default_timeout_secs() -> u64 {
    60
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            command: default_command(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl SourceConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub settings: AppSettings,
    #[serde(default)]
    pub source: SourceConfig,
}

impl AppConfig {
    /// Get the config file path, respecting XDG_CONFIG_HOME
    pub fn config_path() -> PathBuf {
        let config_dir = std::env::var("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                dirs::home_dir()
                    .unwrap_or_else(|| PathBuf::from("~"))
                    .join(".config")
            });
        config_dir.join("umon").join("config.toml")
    }

    /// Load config from the default path, falling back to defaults if not found
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::config_path())
    }

    pub fn load_from(path: &std::path::Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Serialize and write this config to the config file path.
    pub fn save(&self) -> Result<PathBuf, ConfigError> {
        let path = Self::config_path();
        self.save_to(&path)?;
        Ok(path)
    }

    pub fn save_to(&self, path: &std::path::Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Validate the config
    pub fn validate(&self) -> Vec<String> {
        let mut issues = self.settings.validate();
        if self.source.command.is_empty() {
            issues.push("source.command must name a program".to_string());
        }
        if self.source.timeout_secs == 0 {
            issues.push("source.timeout_secs must be greater than 0".to_string());
        }
        issues
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        let issues = config.validate();
        assert!(issues.is_empty(), "Default config should be valid, got: {:?}", issues);
    }

    #[test]
    fn default_source_runs_ccusage() {
        let source = SourceConfig::default();
        assert_eq!(source.command, vec!["bunx", "ccusage", "--json"]);
        assert_eq!(source.timeout(), Duration::from_secs(60));
    }

    #[test]
    fn validate_catches_invalid_frequency() {
        let mut config = AppConfig::default();
        config.settings.polling_frequency = "2min".to_string();
        let issues = config.validate();
        assert!(issues.iter().any(|i| i.contains("polling_frequency")));
    }

    #[test]
    fn validate_catches_empty_command() {
        let mut config = AppConfig::default();
        config.source.command.clear();
        let issues = config.validate();
        assert!(issues.iter().any(|i| i.contains("source.command")));
    }

    #[test]
    fn validate_catches_zero_timeout() {
        let mut config = AppConfig::default();
        config.source.timeout_secs = 0;
        assert!(config.validate().iter().any(|i| i.contains("timeout_secs")));
    }

    #[test]
    fn parse_minimal_toml() {
        let toml = r#"
[settings]
polling_frequency = "1min"
auto_start = false
"#;
        let config: AppConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.settings.polling_frequency, "1min");
        assert!(!config.settings.auto_start);
        assert_eq!(config.source, SourceConfig::default());
    }

    #[test]
    fn parse_source_toml() {
        let toml = r#"
[source]
command = ["npx", "ccusage@latest", "daily", "--json"]
timeout_secs = 20
"#;
        let config: AppConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.source.command[0], "npx");
        assert_eq!(config.source.timeout_secs, 20);
        assert_eq!(config.settings, AppSettings::default());
    }

    #[test]
    fn parse_empty_toml_gives_defaults() {
        let config: AppConfig = toml::from_str("").unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn save_then_load_round_trip() {
        let path = std::env::temp_dir()
            .join(format!("umon-config-test-{}", std::process::id()))
            .join("config.toml");
        let mut config = AppConfig::default();
        config.settings.polling_frequency = "10min".to_string();
        config.settings.auto_start = false;
        config.save_to(&path).unwrap();

        let loaded = AppConfig::load_from(&path).unwrap();
        assert_eq!(loaded, config);
        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn load_missing_file_gives_defaults() {
        let path = std::env::temp_dir().join("umon-definitely-missing").join("config.toml");
        assert_eq!(AppConfig::load_from(&path).unwrap(), AppConfig::default());
    }

    #[test]
    fn config_path_uses_xdg_when_set() {
        std::env::set_var("XDG_CONFIG_HOME", "/tmp/test_xdg_config");
        let path = AppConfig::config_path();
        std::env::remove_var("XDG_CONFIG_HOME");
        assert_eq!(path, PathBuf::from("/tmp/test_xdg_config/umon/config.toml"));
    }
}
