use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load config file: {0}")]
    FileError(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Analytics backend settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub base_url: String,
    /// Upper bound for every forecast / analysis request
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl ApiConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Where persisted records live
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// JSON file path. Without one the storage area is in-memory only.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

/// Dashboard sync configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardConfig {
    pub api: ApiConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_heartbeat_interval")]
    pub heartbeat_interval_secs: u64,
}

fn default_request_timeout() -> u64 {
    30
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_heartbeat_interval() -> u64 {
    300
}

impl DashboardConfig {
    /// Load configuration from a YAML file, then apply `.env` / environment overrides
    pub fn load(config_path: impl AsRef<Path>) -> Result<Self> {
        let yaml_content = std::fs::read_to_string(config_path)?;
        Self::from_yaml(&yaml_content)
    }

    /// Parse configuration from YAML text, then apply environment overrides
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let mut config: DashboardConfig = serde_yaml::from_str(yaml)?;

        // Don't fail if .env doesn't exist
        dotenv::dotenv().ok();
        config.apply_env_overrides();

        config.validate()?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("DASHBOARD_API_URL") {
            info!("Overriding API base URL from environment variable");
            self.api.base_url = url;
        }
        if let Ok(path) = std::env::var("DASHBOARD_STORAGE_PATH") {
            info!("Overriding storage path from environment variable");
            self.storage.path = Some(PathBuf::from(path));
        }
        if let Ok(level) = std::env::var("DASHBOARD_LOG_LEVEL") {
            self.log_level = level;
        }
    }

    fn validate(&self) -> Result<()> {
        if self.api.base_url.is_empty() {
            return Err(ConfigError::ValidationError(
                "api.base_url cannot be empty".to_string(),
            ));
        }
        if !self.api.base_url.starts_with("http://") && !self.api.base_url.starts_with("https://") {
            return Err(ConfigError::ValidationError(
                "api.base_url must start with http:// or https://".to_string(),
            ));
        }
        if self.api.request_timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "api.request_timeout_secs must be greater than 0".to_string(),
            ));
        }
        if self.heartbeat_interval_secs == 0 {
            return Err(ConfigError::ValidationError(
                "heartbeat_interval_secs must be greater than 0".to_string(),
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
        info!("  API base URL: {}", self.api.base_url);
        info!("  Request timeout: {} seconds", self.api.request_timeout_secs);
        match &self.storage.path {
            Some(path) => info!("  Storage: file {}", path.display()),
            None => info!("  Storage: in-memory"),
        }
        info!("  Log level: {}", self.log_level);
        info!("  Heartbeat: every {} seconds", self.heartbeat_interval_secs);
    }
}
