//! Configuration management for the LCD status agent.
//!
//! Loads YAML configuration with sensible defaults from platform-specific
//! paths:
//! - Linux: `/etc/lcd-status/agent.yaml`
//! - Windows: `C:\ProgramData\LcdStatus\agent.yaml`
//!
//! A missing or unparseable file falls back to the defaults with a
//! warning, so the agent always starts.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{info, warn};

use crate::store::DEFAULT_STORE_ADDR;

/// Default configuration file paths
#[cfg(unix)]
pub const DEFAULT_CONFIG_PATH: &str = "/etc/lcd-status/agent.yaml";

#[cfg(windows)]
pub const DEFAULT_CONFIG_PATH: &str = r"C:\ProgramData\LcdStatus\agent.yaml";

/// Agent configuration loaded from YAML file
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Key-value store endpoint (`host:port`)
    pub store_addr: String,

    /// Timeout for the initial store connection in seconds
    pub connect_timeout_secs: u64,

    /// Publish loop period in seconds
    pub publish_interval_secs: u64,

    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,

    /// Log format (json, pretty)
    pub log_format: LogFormat,

    /// Path to log file (empty = stdout only)
    pub log_file: String,
}

/// Log format options
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Pretty,
}

impl Default for LogFormat {
    fn default() -> Self {
        Self::Json
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            store_addr: DEFAULT_STORE_ADDR.to_string(),
            connect_timeout_secs: 10,
            publish_interval_secs: 1,
            log_level: "info".to_string(),
            log_format: LogFormat::Json,
            log_file: String::new(), // Empty = stdout only
        }
    }
}

impl AgentConfig {
    /// Load configuration from the default path or fall back to defaults
    pub fn load() -> Self {
        Self::load_from_path(DEFAULT_CONFIG_PATH)
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: &str) -> Self {
        let path = PathBuf::from(path);

        if !path.exists() {
            info!(
                path = %path.display(),
                "Config file not found, using defaults"
            );
            return Self::default();
        }

        match std::fs::read_to_string(&path) {
            Ok(contents) => match serde_yaml::from_str(&contents) {
                Ok(config) => {
                    info!(path = %path.display(), "Loaded configuration");
                    config
                }
                Err(e) => {
                    warn!(
                        path = %path.display(),
                        error = %e,
                        "Failed to parse config file, using defaults"
                    );
                    Self::default()
                }
            },
            Err(e) => {
                warn!(
                    path = %path.display(),
                    error = %e,
                    "Failed to read config file, using defaults"
                );
                Self::default()
            }
        }
    }

    /// Save configuration to a file (useful for generating default config)
    pub fn save_to_path(&self, path: &str) -> Result<(), std::io::Error> {
        let path = PathBuf::from(path);

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let yaml = serde_yaml::to_string(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;

        std::fs::write(&path, yaml)?;
        info!(path = %path.display(), "Saved configuration");
        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.publish_interval_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "publish_interval_secs".to_string(),
                message: "must be greater than 0".to_string(),
            });
        }

        if self.connect_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "connect_timeout_secs".to_string(),
                message: "must be greater than 0".to_string(),
            });
        }

        // host:port with a numeric port; the host part may be a DNS name
        let port_ok = self
            .store_addr
            .rsplit_once(':')
            .map(|(host, port)| !host.is_empty() && port.parse::<u16>().is_ok())
            .unwrap_or(false);
        if !port_ok {
            return Err(ConfigError::InvalidValue {
                field: "store_addr".to_string(),
                message: "must be in host:port form".to_string(),
            });
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.log_level.to_lowercase().as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "log_level".to_string(),
                message: format!("must be one of: {:?}", valid_levels),
            });
        }

        Ok(())
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AgentConfig::default();
        assert_eq!(config.store_addr, "127.0.0.1:6379");
        assert_eq!(config.publish_interval_secs, 1);
        assert_eq!(config.connect_timeout_secs, 10);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = AgentConfig::default();

        // Invalid publish interval
        config.publish_interval_secs = 0;
        assert!(config.validate().is_err());
        config.publish_interval_secs = 1;

        // Invalid store address
        config.store_addr = "no-port".to_string();
        assert!(config.validate().is_err());
        config.store_addr = ":6379".to_string();
        assert!(config.validate().is_err());
        config.store_addr = "redis.local:6379".to_string();
        assert!(config.validate().is_ok());

        // Invalid log level
        config.log_level = "noisy".to_string();
        assert!(config.validate().is_err());
        config.log_level = "debug".to_string();

        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_yaml_serialization() {
        let config = AgentConfig::default();
        let yaml = serde_yaml::to_string(&config).unwrap();
        let parsed: AgentConfig = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(config.store_addr, parsed.store_addr);
        assert_eq!(config.publish_interval_secs, parsed.publish_interval_secs);
        assert_eq!(config.log_format, parsed.log_format);
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let config = AgentConfig::load_from_path("/nonexistent/lcd-status/agent.yaml");
        assert_eq!(config.store_addr, DEFAULT_STORE_ADDR);
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("agent.yaml");
        let path_str = path.to_str().unwrap();

        let mut config = AgentConfig::default();
        config.store_addr = "10.0.0.5:6380".to_string();
        config.log_format = LogFormat::Pretty;
        config.save_to_path(path_str).unwrap();

        let reloaded = AgentConfig::load_from_path(path_str);
        assert_eq!(reloaded.store_addr, "10.0.0.5:6380");
        assert_eq!(reloaded.log_format, LogFormat::Pretty);
    }
}
