//! Configuration for the order vault
//!
//! Configuration is loaded from a TOML file and then overridden from
//! `ORDER_VAULT_*` environment variables.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// How satellite rows are written when the same hub is loaded again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SatelliteMode {
    /// Insert-if-absent keyed on (owning hub key, hash-diff)
    #[default]
    Idempotent,
    /// Additionally skip the insert when the owner's latest hash-diff is unchanged
    ChangeOnly,
}

impl std::str::FromStr for SatelliteMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "idempotent" => Ok(Self::Idempotent),
            "change_only" => Ok(Self::ChangeOnly),
            other => Err(ConfigError::invalid(
                "satellite_mode",
                format!("unknown satellite mode '{}'", other),
            )),
        }
    }
}

/// Configuration for an order vault instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VaultConfig {
    /// Path where the sled database is stored
    pub storage_path: PathBuf,
    /// Key-derivation namespace: a UUID literal or a name hashed under the DNS namespace
    pub namespace: String,
    /// Load-source tag stamped on every record
    pub load_source: String,
    /// Maximum number of events pulled per batch pass
    pub batch_size: usize,
    /// Pause between batch passes
    pub poll_interval_secs: u64,
    /// Satellite write behaviour
    pub satellite_mode: SatelliteMode,
    /// Reject links and satellites whose hubs are not stored yet
    pub enforce_references: bool,
    /// Default log level
    pub log_level: String,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            storage_path: PathBuf::from("data/order_vault"),
            namespace: "order_data".to_string(),
            load_source: "OrderSource".to_string(),
            batch_size: 30,
            poll_interval_secs: 25,
            satellite_mode: SatelliteMode::Idempotent,
            enforce_references: true,
            log_level: "INFO".to_string(),
        }
    }
}

const VALID_LEVELS: [&str; 5] = ["TRACE", "DEBUG", "INFO", "WARN", "ERROR"];

impl VaultConfig {
    /// Load configuration from a TOML file and apply environment overrides
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let mut config: VaultConfig =
            toml::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from environment variables only
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `ORDER_VAULT_*` environment variable overrides
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Ok(path) = std::env::var("ORDER_VAULT_STORAGE_PATH") {
            self.storage_path = PathBuf::from(path);
        }
        if let Ok(namespace) = std::env::var("ORDER_VAULT_NAMESPACE") {
            self.namespace = namespace;
        }
        if let Ok(source) = std::env::var("ORDER_VAULT_LOAD_SOURCE") {
            self.load_source = source;
        }
        if let Ok(size) = std::env::var("ORDER_VAULT_BATCH_SIZE") {
            self.batch_size = size.parse().map_err(|_| {
                ConfigError::invalid("batch_size", format!("'{}' is not a number", size))
            })?;
        }
        if let Ok(secs) = std::env::var("ORDER_VAULT_POLL_INTERVAL_SECS") {
            self.poll_interval_secs = secs.parse().map_err(|_| {
                ConfigError::invalid("poll_interval_secs", format!("'{}' is not a number", secs))
            })?;
        }
        if let Ok(mode) = std::env::var("ORDER_VAULT_SATELLITE_MODE") {
            self.satellite_mode = mode.parse()?;
        }
        if let Ok(enforce) = std::env::var("ORDER_VAULT_ENFORCE_REFERENCES") {
            self.enforce_references = parse_flag("enforce_references", &enforce)?;
        }
        if let Ok(level) = std::env::var("ORDER_VAULT_LOG_LEVEL") {
            self.log_level = level.to_uppercase();
        }
        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.namespace.trim().is_empty() {
            return Err(ConfigError::invalid("namespace", "namespace is required"));
        }
        if self.load_source.trim().is_empty() {
            return Err(ConfigError::invalid("load_source", "load source is required"));
        }
        if self.batch_size == 0 {
            return Err(ConfigError::invalid(
                "batch_size",
                "batch size must be greater than 0",
            ));
        }
        if self.poll_interval_secs == 0 {
            return Err(ConfigError::invalid(
                "poll_interval_secs",
                "poll interval must be greater than 0",
            ));
        }
        if !VALID_LEVELS.contains(&self.log_level.as_str()) {
            return Err(ConfigError::invalid(
                "log_level",
                format!("invalid log level '{}'", self.log_level),
            ));
        }
        Ok(())
    }

    /// Parsed log level filter
    pub fn level_filter(&self) -> log::LevelFilter {
        match self.log_level.as_str() {
            "TRACE" => log::LevelFilter::Trace,
            "DEBUG" => log::LevelFilter::Debug,
            "WARN" => log::LevelFilter::Warn,
            "ERROR" => log::LevelFilter::Error,
            _ => log::LevelFilter::Info,
        }
    }
}

fn parse_flag(field: &str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        other => Err(ConfigError::invalid(
            field,
            format!("'{}' is not a boolean", other),
        )),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse configuration: {0}")]
    Parse(String),
    #[error("Invalid value for '{field}': {message}")]
    Invalid { field: String, message: String },
}

impl ConfigError {
    pub fn invalid(field: &str, message: impl Into<String>) -> Self {
        Self::Invalid {
            field: field.to_string(),
            message: message.into(),
        }
    }
}
