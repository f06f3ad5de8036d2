//! Configuration management for cm-provision
//!
//! Settings are loaded from:
//! 1. Environment variables (highest priority)
//! 2. Configuration file (TOML format)
//! 3. Default values (lowest priority)

use crate::logging::{LogRotation, LoggingConfig};
use crate::poll::TimeoutOption;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Main configuration struct
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AdapterConfig {
    /// Manager connection settings
    pub manager: ManagerConfig,
    /// Agent registration wait settings
    pub agents: AgentsConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Manager connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ManagerConfig {
    /// Port of the manager web console and API
    pub port: u16,
    /// Pinned API version
    pub api_version: u32,
    /// Built-in administrative user
    pub default_username: String,
    /// Factory password of the administrative user
    pub default_password: String,
    /// Per-request HTTP timeout
    pub request_timeout_secs: u64,
    /// Delay between command status polls
    pub command_poll_interval_ms: u64,
}

/// Agent registration wait settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentsConfig {
    /// Cluster option target holding the timeout
    pub timeout_target: String,
    /// Cluster option name holding the timeout
    pub timeout_option: String,
    /// Timeout used when the cluster does not set one
    pub default_timeout_secs: u64,
    /// Delay between host inventory checks
    pub poll_interval_secs: u64,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            port: 7180,
            api_version: 6,
            default_username: "admin".to_string(),
            default_password: "admin".to_string(),
            request_timeout_secs: 30,
            command_poll_interval_ms: 5000,
        }
    }
}

impl Default for AgentsConfig {
    fn default() -> Self {
        Self {
            timeout_target: "general".to_string(),
            timeout_option: "Await Cloudera agents timeout".to_string(),
            default_timeout_secs: 300,
            poll_interval_secs: 5,
        }
    }
}

impl ManagerConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn command_poll_interval(&self) -> Duration {
        Duration::from_millis(self.command_poll_interval_ms)
    }
}

impl AgentsConfig {
    pub fn timeout_option(&self) -> TimeoutOption {
        TimeoutOption::new(
            &self.timeout_target,
            &self.timeout_option,
            self.default_timeout_secs,
        )
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}

impl AdapterConfig {
    /// Load configuration from environment variables and optional config file
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(Self::find_config_file().as_deref())
    }

    /// Load `path` (or defaults when absent), then apply environment
    /// overrides and validate
    pub fn load_from(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::load_from_file(path)?,
            None => Self::default(),
        };

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Load configuration from a specific file path
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::FileRead(path.to_path_buf(), e.to_string()))?;

        toml::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Find configuration file in standard locations
    fn find_config_file() -> Option<PathBuf> {
        let paths = [
            std::env::var("CM_PROVISION_CONFIG").ok().map(PathBuf::from),
            Some(PathBuf::from("/etc/cm-provision/config.toml")),
            Some(PathBuf::from("./cm-provision.toml")),
        ];

        paths.into_iter().flatten().find(|p| p.exists())
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides<F>(&mut self, var: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        // Manager
        if let Some(port) = var("CM_PROVISION_MANAGER_PORT").and_then(|v| v.parse().ok()) {
            self.manager.port = port;
        }
        if let Some(version) = var("CM_PROVISION_API_VERSION").and_then(|v| v.parse().ok()) {
            self.manager.api_version = version;
        }
        if let Some(user) = var("CM_PROVISION_DEFAULT_USERNAME") {
            self.manager.default_username = user;
        }
        if let Some(password) = var("CM_PROVISION_DEFAULT_PASSWORD") {
            self.manager.default_password = password;
        }
        if let Some(secs) = var("CM_PROVISION_REQUEST_TIMEOUT").and_then(|v| v.parse().ok()) {
            self.manager.request_timeout_secs = secs;
        }
        if let Some(ms) = var("CM_PROVISION_COMMAND_POLL_MS").and_then(|v| v.parse().ok()) {
            self.manager.command_poll_interval_ms = ms;
        }

        // Agents
        if let Some(secs) = var("CM_PROVISION_AGENTS_TIMEOUT").and_then(|v| v.parse().ok()) {
            self.agents.default_timeout_secs = secs;
        }

        // Logging
        if let Some(level) = var("CM_PROVISION_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(path) = var("CM_PROVISION_LOG_DIR") {
            self.logging.file_path = Some(path);
        }
        if let Some(json) = var("CM_PROVISION_LOG_JSON").and_then(|v| v.parse().ok()) {
            self.logging.json_format = json;
        }
        if let Some(rotation) = var("CM_PROVISION_LOG_ROTATION") {
            self.logging.rotation = match rotation.to_lowercase().as_str() {
                "hourly" => LogRotation::Hourly,
                "never" => LogRotation::Never,
                _ => LogRotation::Daily,
            };
        }
    }

    /// Generate a sample configuration file
    pub fn generate_sample() -> String {
        toml::to_string_pretty(&Self::default()).unwrap_or_default()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.manager.port == 0 {
            return Err(ConfigError::Validation("Manager port cannot be 0".to_string()));
        }
        if self.manager.api_version == 0 {
            return Err(ConfigError::Validation("API version cannot be 0".to_string()));
        }
        if self.manager.default_username.is_empty() {
            return Err(ConfigError::Validation(
                "Default username cannot be empty".to_string(),
            ));
        }
        if self.manager.command_poll_interval_ms == 0 {
            return Err(ConfigError::Validation(
                "Command poll interval cannot be 0".to_string(),
            ));
        }
        if self.agents.poll_interval_secs == 0 {
            return Err(ConfigError::Validation(
                "Agent poll interval cannot be 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Configuration errors
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {0:?}: {1}")]
    FileRead(PathBuf, String),
    #[error("Failed to parse config: {0}")]
    Parse(String),
    #[error("Config validation failed: {0}")]
    Validation(String),
}
