//! Configuration management for the ShareGate daemon.
//!
//! This module provides TOML-based configuration file loading and saving.
//! The default configuration path is `~/.config/sharegate/config.toml`.
//! The file only seeds the live [`ShareSettings`]; changes made through the
//! admin API are not written back.

use std::fs;
use std::net::IpAddr;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::state::ShareSettings;

/// Configuration validation errors.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("log_level must be one of: trace, debug, info, warn, error; got {0}")]
    InvalidLogLevel(String),

    #[error("approval_timeout must be between 0 and 86400 seconds, got {0}")]
    InvalidApprovalTimeout(u64),

    #[error("sweep_interval_secs must be between 1 and 3600, got {0}")]
    InvalidSweepInterval(u64),

    #[error("{field} is not a valid IP address: {value}")]
    InvalidHost { field: &'static str, value: String },

    #[error("admin_host must be a loopback address, got {0}")]
    AdminHostNotLoopback(String),

    #[error("client_port and admin_port must differ, both are {0}")]
    PortConflict(u16),

    #[error("share password must not be empty")]
    EmptyPassword,
}

/// Valid log level values for tracing configuration.
const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Main configuration structure for the ShareGate daemon.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    /// General daemon configuration.
    pub daemon: DaemonConfig,

    /// Listener addresses.
    pub server: ServerConfig,

    /// What is shared and how.
    pub share: ShareConfig,

    /// Security settings.
    pub security: SecurityConfig,
}

/// General daemon configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DaemonConfig {
    /// Logging level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Also write logs to this file.
    pub log_file: Option<PathBuf>,
}

/// Listener configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    /// Address of the client listener.
    pub client_host: String,

    /// Port of the client listener.
    pub client_port: u16,

    /// Address of the admin listener; must be loopback.
    pub admin_host: String,

    /// Port of the admin listener (0 = pick a free port).
    pub admin_port: u16,
}

/// Initial share settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ShareConfig {
    /// Directory to share.
    pub root: PathBuf,

    /// Password clients log in with.
    pub password: String,

    /// Downloads need per-file approval.
    pub require_approval: bool,

    /// Offer previews.
    pub enable_previews: bool,

    /// Keep previews available while approval is required.
    pub preview_bypasses_approval: bool,

    /// Start with downloads paused.
    pub start_paused: bool,

    /// List dot-files.
    pub show_hidden: bool,
}

/// Security settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SecurityConfig {
    /// Seconds before a download request expires (0 = never).
    pub approval_timeout: u64,

    /// Seconds between expiry sweeps.
    pub sweep_interval_secs: u64,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_file: None,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            client_host: "0.0.0.0".to_string(),
            client_port: 5000,
            admin_host: "127.0.0.1".to_string(),
            admin_port: 0,
        }
    }
}

impl Default for ShareConfig {
    fn default() -> Self {
        Self {
            root: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            password: "admin".to_string(),
            require_approval: false,
            enable_previews: true,
            preview_bypasses_approval: false,
            start_paused: false,
            show_hidden: true,
        }
    }
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            approval_timeout: 300, // 5 minutes
            sweep_interval_secs: 60,
        }
    }
}

/// Returns the default configuration file path.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("sharegate")
        .join("config.toml")
}

impl Config {
    /// Apply environment variable overrides to the configuration.
    ///
    /// Environment variables take precedence over config file values.
    /// Supported variables:
    /// - SHAREGATE_ROOT: Override the shared directory
    /// - SHAREGATE_PASSWORD: Override the share password
    /// - SHAREGATE_LOG_LEVEL: Override log level (trace, debug, info, warn, error)
    pub fn apply_env_overrides(&mut self) {
        if let Ok(root) = std::env::var("SHAREGATE_ROOT") {
            if !root.is_empty() {
                tracing::info!("Overriding share root from environment: {}", root);
                self.share.root = PathBuf::from(root);
            }
        }

        if let Ok(password) = std::env::var("SHAREGATE_PASSWORD") {
            if !password.is_empty() {
                tracing::info!("Overriding share password from environment");
                self.share.password = password;
            }
        }

        if let Ok(level) = std::env::var("SHAREGATE_LOG_LEVEL") {
            if !level.is_empty() {
                tracing::info!("Overriding log_level from environment: {}", level);
                self.daemon.log_level = level;
            }
        }
    }

    /// Validate the configuration values.
    ///
    /// The share root is not checked here; it is resolved when the daemon
    /// starts.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let level = self.daemon.log_level.to_lowercase();
        if !VALID_LOG_LEVELS.contains(&level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(self.daemon.log_level.clone()));
        }

        if self.security.approval_timeout > 86_400 {
            return Err(ConfigError::InvalidApprovalTimeout(
                self.security.approval_timeout,
            ));
        }

        let interval = self.security.sweep_interval_secs;
        if !(1..=3600).contains(&interval) {
            return Err(ConfigError::InvalidSweepInterval(interval));
        }

        parse_host("client_host", &self.server.client_host)?;
        let admin = parse_host("admin_host", &self.server.admin_host)?;
        if !admin.is_loopback() {
            return Err(ConfigError::AdminHostNotLoopback(
                self.server.admin_host.clone(),
            ));
        }

        if self.server.client_port != 0 && self.server.client_port == self.server.admin_port {
            return Err(ConfigError::PortConflict(self.server.client_port));
        }

        if self.share.password.is_empty() {
            return Err(ConfigError::EmptyPassword);
        }

        Ok(())
    }

    /// Build the initial live settings from the `[share]` section.
    pub fn share_settings(&self) -> Result<ShareSettings> {
        let mut settings = ShareSettings::new(&self.share.root, self.share.password.clone())
            .with_context(|| format!("Cannot share {}", self.share.root.display()))?;

        settings.require_approval = self.share.require_approval;
        settings.enable_previews = self.share.enable_previews;
        settings.preview_bypasses_approval = self.share.preview_bypasses_approval;
        settings.is_paused = self.share.start_paused;

        Ok(settings)
    }

    /// Load configuration from a file.
    ///
    /// If the file does not exist, returns the default configuration.
    /// If the file exists but is invalid TOML, returns an error with
    /// a helpful message.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            tracing::debug!("Config file not found at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::from_toml(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Load configuration from the default path.
    pub fn load_default() -> Result<Self> {
        Self::load(default_config_path())
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        toml::from_str(toml_str)
            .map_err(|e| anyhow::anyhow!("Invalid TOML configuration: {}", format_toml_error(&e)))
    }

    /// Save configuration to a file.
    ///
    /// Creates parent directories if they don't exist.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let contents = self.to_toml()?;
        fs::write(path, contents)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        tracing::debug!("Configuration saved to {:?}", path);
        Ok(())
    }

    /// Serialize configuration to a TOML string.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")
    }
}

fn parse_host(field: &'static str, value: &str) -> Result<IpAddr, ConfigError> {
    if value.eq_ignore_ascii_case("localhost") {
        return Ok(IpAddr::from([127, 0, 0, 1]));
    }
    value.parse().map_err(|_| ConfigError::InvalidHost {
        field,
        value: value.to_string(),
    })
}

/// Format a TOML deserialization error for user-friendly display.
fn format_toml_error(error: &toml::de::Error) -> String {
    let mut msg = error.message().to_string();

    if let Some(span) = error.span() {
        msg.push_str(&format!(" (at position {}..{})", span.start, span.end));
    }

    msg
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::TempDir;

    fn clear_env() {
        std::env::remove_var("SHAREGATE_ROOT");
        std::env::remove_var("SHAREGATE_PASSWORD");
        std::env::remove_var("SHAREGATE_LOG_LEVEL");
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.daemon.log_level, "info");
        assert!(config.daemon.log_file.is_none());
        assert_eq!(config.server.client_host, "0.0.0.0");
        assert_eq!(config.server.client_port, 5000);
        assert_eq!(config.server.admin_host, "127.0.0.1");
        assert_eq!(config.server.admin_port, 0);
        assert_eq!(config.share.password, "admin");
        assert!(!config.share.require_approval);
        assert!(config.share.enable_previews);
        assert!(!config.share.preview_bypasses_approval);
        assert!(!config.share.start_paused);
        assert_eq!(config.security.approval_timeout, 300);
        assert_eq!(config.security.sweep_interval_secs, 60);
    }

    #[test]
    fn test_validate_default_config() {
        assert_eq!(Config::default().validate(), Ok(()));
    }

    #[test]
    fn test_from_toml_empty() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_from_toml_partial() {
        let toml = r#"
[share]
root = "/srv/share"
require_approval = true

[server]
client_port = 8080
"#;
        let config = Config::from_toml(toml).unwrap();

        assert_eq!(config.share.root, PathBuf::from("/srv/share"));
        assert!(config.share.require_approval);
        assert_eq!(config.share.password, "admin");
        assert_eq!(config.server.client_port, 8080);
        assert_eq!(config.server.admin_host, "127.0.0.1");
        assert_eq!(config.security.approval_timeout, 300);
    }

    #[test]
    fn test_from_toml_invalid_syntax() {
        let result = Config::from_toml("invalid [ toml");
        assert!(result.is_err());
    }

    #[test]
    fn test_helpful_error_messages() {
        let toml = r#"
[server]
client_port = "eighty"
"#;
        let err = Config::from_toml(toml).unwrap_err().to_string();
        assert!(err.contains("Invalid TOML"));
    }

    #[test]
    fn test_roundtrip_custom() {
        let mut config = Config::default();
        config.share.root = PathBuf::from("/data");
        config.share.password = "s3cret".to_string();
        config.daemon.log_file = Some(PathBuf::from("/var/log/sharegate.log"));
        config.security.approval_timeout = 0;

        let parsed = Config::from_toml(&config.to_toml().unwrap()).unwrap();
        assert_eq!(config, parsed);
    }

    #[test]
    fn test_load_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let config = Config::load(temp_dir.path().join("nope.toml")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_save_creates_directories() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("dir").join("config.toml");

        let mut config = Config::default();
        config.server.client_port = 6000;
        config.save(&path).unwrap();

        assert!(path.exists());
        assert_eq!(Config::load(&path).unwrap().server.client_port, 6000);
    }

    #[test]
    fn test_load_invalid_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        fs::write(&path, "invalid [ toml").unwrap();

        let err = Config::load(&path).unwrap_err().to_string();
        assert!(err.contains("Failed to parse config file"));
    }

    #[test]
    fn test_default_config_path() {
        let path = default_config_path();
        assert!(path.to_string_lossy().contains("sharegate"));
        assert!(path.to_string_lossy().contains("config.toml"));
    }

    #[test]
    fn test_validate_log_level() {
        let mut config = Config::default();
        config.daemon.log_level = "DEBUG".to_string();
        assert!(config.validate().is_ok());

        config.daemon.log_level = "verbose".to_string();
        assert_eq!(
            config.validate(),
            Err(ConfigError::InvalidLogLevel("verbose".to_string()))
        );
    }

    #[test]
    fn test_validate_approval_timeout_bounds() {
        let mut config = Config::default();
        config.security.approval_timeout = 0;
        assert!(config.validate().is_ok());
        config.security.approval_timeout = 86_400;
        assert!(config.validate().is_ok());
        config.security.approval_timeout = 86_401;
        assert_eq!(
            config.validate(),
            Err(ConfigError::InvalidApprovalTimeout(86_401))
        );
    }

    #[test]
    fn test_validate_sweep_interval() {
        let mut config = Config::default();
        config.security.sweep_interval_secs = 0;
        assert_eq!(config.validate(), Err(ConfigError::InvalidSweepInterval(0)));
        config.security.sweep_interval_secs = 3601;
        assert_eq!(
            config.validate(),
            Err(ConfigError::InvalidSweepInterval(3601))
        );
    }

    #[test]
    fn test_validate_admin_host_must_be_loopback() {
        let mut config = Config::default();
        config.server.admin_host = "0.0.0.0".to_string();
        assert_eq!(
            config.validate(),
            Err(ConfigError::AdminHostNotLoopback("0.0.0.0".to_string()))
        );

        config.server.admin_host = "localhost".to_string();
        assert!(config.validate().is_ok());

        config.server.admin_host = "::1".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_invalid_host() {
        let mut config = Config::default();
        config.server.client_host = "not-an-ip".to_string();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidHost {
                field: "client_host",
                ..
            })
        ));
    }

    #[test]
    fn test_validate_port_conflict() {
        let mut config = Config::default();
        config.server.admin_port = config.server.client_port;
        assert_eq!(config.validate(), Err(ConfigError::PortConflict(5000)));

        config.server.client_port = 0;
        config.server.admin_port = 0;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_empty_password() {
        let mut config = Config::default();
        config.share.password.clear();
        assert_eq!(config.validate(), Err(ConfigError::EmptyPassword));
    }

    #[test]
    fn test_share_settings() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.share.root = temp_dir.path().to_path_buf();
        config.share.require_approval = true;
        config.share.start_paused = true;

        let settings = config.share_settings().unwrap();
        assert_eq!(settings.root, temp_dir.path().canonicalize().unwrap());
        assert!(settings.require_approval);
        assert!(settings.is_paused);
        assert!(settings.is_running);
    }

    #[test]
    fn test_share_settings_missing_root() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.share.root = temp_dir.path().join("missing");

        let err = config.share_settings().unwrap_err().to_string();
        assert!(err.contains("Cannot share"));
    }

    #[test]
    #[serial]
    fn test_env_overrides() {
        clear_env();
        std::env::set_var("SHAREGATE_ROOT", "/tmp/shared");
        std::env::set_var("SHAREGATE_PASSWORD", "from-env");
        std::env::set_var("SHAREGATE_LOG_LEVEL", "debug");

        let mut config = Config::default();
        config.apply_env_overrides();

        assert_eq!(config.share.root, PathBuf::from("/tmp/shared"));
        assert_eq!(config.share.password, "from-env");
        assert_eq!(config.daemon.log_level, "debug");

        clear_env();
    }

    #[test]
    #[serial]
    fn test_env_override_empty_does_not_override() {
        clear_env();
        std::env::set_var("SHAREGATE_PASSWORD", "");

        let mut config = Config::default();
        config.apply_env_overrides();
        assert_eq!(config.share.password, "admin");

        clear_env();
    }

    #[test]
    #[serial]
    fn test_env_override_unset_does_not_override() {
        clear_env();

        let mut config = Config::default();
        config.apply_env_overrides();
        assert_eq!(config, Config::default());
    }
}
