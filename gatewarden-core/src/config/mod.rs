//! Configuration management for Gatewarden
//!
//! This module provides environment-based configuration management with
//! support for defaults, file loading, and validation.

use crate::core_registry::{DEFAULT_ADMISSION_LIMIT, MAX_ADMISSION_LIMIT};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

mod error;

pub use error::ConfigError;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Storage configuration
    pub storage: StorageConfig,

    /// Moderation defaults applied to newly registered groups
    pub moderation: ModerationConfig,

    /// Administrative surface configuration
    pub admin: AdminConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Data directory for persistent storage
    pub data_dir: PathBuf,

    /// Database file name inside the data directory
    pub db_file: String,
}

impl StorageConfig {
    /// Full path to the SQLite database file
    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(&self.db_file)
    }
}

/// Moderation defaults for newly registered groups
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModerationConfig {
    /// Daily admission limit assigned at registration
    pub default_admission_limit: u32,

    /// Whether the restricted-script filter starts enabled
    pub default_filter_enabled: bool,
}

/// Administrative surface configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminConfig {
    /// Groups per page when listing
    pub page_size: u32,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Enable JSON formatting
    pub json_format: bool,

    /// Include timestamps
    pub with_timestamp: bool,

    /// Include target module
    pub with_target: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            storage: StorageConfig::default(),
            moderation: ModerationConfig::default(),
            admin: AdminConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            db_file: "gatewarden.db".to_string(),
        }
    }
}

impl Default for ModerationConfig {
    fn default() -> Self {
        Self {
            default_admission_limit: DEFAULT_ADMISSION_LIMIT,
            default_filter_enabled: true,
        }
    }
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self { page_size: 20 }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
            with_timestamp: true,
            with_target: true,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    ///
    /// Environment variables follow the pattern: GATEWARDEN_<SECTION>_<KEY>
    /// Example: GATEWARDEN_STORAGE_DATA_DIR=/var/lib/gatewarden
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        // Storage config
        if let Ok(data_dir) = env::var("GATEWARDEN_STORAGE_DATA_DIR") {
            config.storage.data_dir = PathBuf::from(data_dir);
        }
        if let Ok(db_file) = env::var("GATEWARDEN_STORAGE_DB_FILE") {
            config.storage.db_file = db_file;
        }

        // Moderation config
        if let Ok(limit) = env::var("GATEWARDEN_MODERATION_DEFAULT_ADMISSION_LIMIT") {
            config.moderation.default_admission_limit = limit.parse().map_err(|e| {
                ConfigError::InvalidValue(format!("Invalid admission limit: {}", e))
            })?;
        }
        if let Ok(filter) = env::var("GATEWARDEN_MODERATION_DEFAULT_FILTER_ENABLED") {
            config.moderation.default_filter_enabled = filter
                .parse()
                .map_err(|e| ConfigError::InvalidValue(format!("Invalid filter flag: {}", e)))?;
        }

        // Admin config
        if let Ok(page_size) = env::var("GATEWARDEN_ADMIN_PAGE_SIZE") {
            config.admin.page_size = page_size
                .parse()
                .map_err(|e| ConfigError::InvalidValue(format!("Invalid page size: {}", e)))?;
        }

        // Logging config
        if let Ok(level) = env::var("GATEWARDEN_LOG_LEVEL") {
            config.logging.level = level;
        }
        if let Ok(json) = env::var("GATEWARDEN_LOG_JSON") {
            config.logging.json_format = json
                .parse()
                .map_err(|e| ConfigError::InvalidValue(format!("Invalid JSON flag: {}", e)))?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self, ConfigError> {
        let contents =
            std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead(e.to_string()))?;

        let config: Self =
            toml::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        // Validate storage config
        if self.storage.db_file.is_empty() {
            return Err(ConfigError::Validation(
                "db_file must not be empty".to_string(),
            ));
        }

        // Validate moderation config
        if self.moderation.default_admission_limit > MAX_ADMISSION_LIMIT {
            return Err(ConfigError::Validation(format!(
                "default_admission_limit must not exceed {}",
                MAX_ADMISSION_LIMIT
            )));
        }

        // Validate admin config
        if self.admin.page_size == 0 {
            return Err(ConfigError::Validation(
                "page_size must be greater than 0".to_string(),
            ));
        }

        // Validate logging config
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(ConfigError::Validation(format!(
                "Invalid log level: {}",
                self.logging.level
            )));
        }

        Ok(())
    }

    /// Save configuration to file
    pub fn save_to_file(&self, path: impl AsRef<std::path::Path>) -> Result<(), ConfigError> {
        let contents =
            toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))?;

        std::fs::write(path, contents).map_err(|e| ConfigError::FileWrite(e.to_string()))?;

        Ok(())
    }
}
