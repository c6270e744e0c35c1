//! Configuration management for crm-export
//!
//! Configuration is one immutable value built at startup and threaded into
//! the connector and the export driver. Sources, highest precedence first:
//! 1. Command-line arguments
//! 2. Configuration file (TOML format)
//! 3. Default values
//!
//! No environment variables are consulted.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{ConfigError, Result};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Record store connection
    #[serde(default)]
    pub connection: ConnectionConfig,

    /// Export behaviour
    #[serde(default)]
    pub export: ExportConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Connection and credential settings for the remote record store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Base URL of the store, e.g. `http://localhost:8069`
    #[serde(default = "default_url")]
    pub url: String,

    /// Database (namespace) to authenticate against
    #[serde(default = "default_database")]
    pub database: String,

    /// Login name
    #[serde(default = "default_username")]
    pub username: String,

    /// Password or API key
    #[serde(default = "default_password")]
    pub password: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

/// Export pipeline settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Primary model to export
    #[serde(default = "default_model")]
    pub model: String,

    /// Records fetched per round-trip
    #[serde(default = "default_batch_size")]
    pub batch_size: u32,

    /// Also export archived (inactive) records
    #[serde(default)]
    pub include_archived: bool,

    /// Row terminator for the output file
    #[serde(default)]
    pub line_ending: LineEnding,

    /// Show a progress bar while exporting
    #[serde(default = "default_progress")]
    pub progress: bool,
}

/// Row terminator written after every output row
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LineEnding {
    #[default]
    Crlf,
    Lf,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub level: LogLevel,

    /// Enable timestamps in logs
    #[serde(default = "default_log_timestamps")]
    pub timestamps: bool,
}

/// Log level options
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

// Default value functions
fn default_url() -> String {
    "http://localhost:8069".to_string()
}

fn default_database() -> String {
    "odoo".to_string()
}

fn default_username() -> String {
    "admin".to_string()
}

fn default_password() -> String {
    "admin".to_string()
}

fn default_timeout() -> u64 {
    60
}

fn default_model() -> String {
    "crm.lead".to_string()
}

fn default_batch_size() -> u32 {
    500
}

fn default_progress() -> bool {
    true
}

fn default_log_level() -> LogLevel {
    LogLevel::Warn
}

fn default_log_timestamps() -> bool {
    true
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            database: default_database(),
            username: default_username(),
            password: default_password(),
            timeout: default_timeout(),
        }
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            batch_size: default_batch_size(),
            include_archived: false,
            line_ending: LineEnding::default(),
            progress: default_progress(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            timestamps: default_log_timestamps(),
        }
    }
}

impl Config {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from a file
    ///
    /// An explicit `path` must exist. Without one, the default location is
    /// used when present and built-in defaults otherwise.
    ///
    /// # Arguments
    /// * `path` - Optional path to a TOML configuration file
    ///
    /// # Returns
    /// * `Result<Config>` - Loaded configuration or error
    pub fn load_from_file(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) if !p.exists() => {
                return Err(ConfigError::FileNotFound(p.display().to_string()).into());
            }
            Some(p) => p.to_path_buf(),
            None => {
                let default = Self::default_path();
                if !default.exists() {
                    return Ok(Self::default());
                }
                default
            }
        };

        let content = fs::read_to_string(&path)
            .map_err(|e| ConfigError::InvalidFormat(format!("{}: {e}", path.display())))?;
        Self::from_toml(&content)
    }

    /// Parse configuration from TOML text
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| ConfigError::InvalidFormat(e.to_string()).into())
    }

    /// Get the default configuration file path
    ///
    /// # Returns
    /// * `PathBuf` - Path to default configuration file
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("crm-export")
            .join("config.toml")
    }

    /// Validate the configuration
    ///
    /// # Returns
    /// * `Result<()>` - Ok if valid, error otherwise
    pub fn validate(&self) -> Result<()> {
        self.connection.validate()?;

        if self.export.batch_size == 0 {
            return Err(ConfigError::InvalidValue {
                field: "export.batch_size".to_string(),
                value: "0".to_string(),
            }
            .into());
        }

        if self.export.model.trim().is_empty() {
            return Err(invalid("export.model", &self.export.model));
        }

        Ok(())
    }

    /// Serialize the configuration for display with the password masked
    pub fn to_masked_toml(&self) -> Result<String> {
        let mut masked = self.clone();
        masked.connection.password = "***".to_string();
        toml::to_string_pretty(&masked)
            .map_err(|e| ConfigError::InvalidFormat(e.to_string()).into())
    }
}

impl ConnectionConfig {
    /// Check URL scheme and required identity fields
    pub fn validate(&self) -> Result<()> {
        if !(self.url.starts_with("http://") || self.url.starts_with("https://")) {
            return Err(invalid("connection.url", &self.url));
        }
        if self.database.trim().is_empty() {
            return Err(invalid("connection.database", &self.database));
        }
        if self.username.trim().is_empty() {
            return Err(invalid("connection.username", &self.username));
        }
        Ok(())
    }

    /// Get request timeout as Duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }
}

impl LineEnding {
    /// Terminator written after each row
    pub fn as_str(&self) -> &'static str {
        match self {
            LineEnding::Crlf => "\r\n",
            LineEnding::Lf => "\n",
        }
    }
}

impl LogLevel {
    /// Convert to tracing::Level
    pub fn to_tracing_level(&self) -> tracing::Level {
        match self {
            LogLevel::Error => tracing::Level::ERROR,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Trace => tracing::Level::TRACE,
        }
    }
}

fn invalid(field: &str, value: &str) -> crate::error::ExportError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
    }
    .into()
}
