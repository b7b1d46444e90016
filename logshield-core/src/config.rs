//! Configuration loading and management
//!
//! Configuration is loaded from `~/.config/logshield/config.toml`
//!
//! This module follows the XDG Base Directory Specification:
//! - Config: `$XDG_CONFIG_HOME/logshield/` (~/.config/logshield/)
//! - Data: `$XDG_DATA_HOME/logshield/` (~/.local/share/logshield/)
//! - State/Logs: `$XDG_STATE_HOME/logshield/` (~/.local/state/logshield/)

use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::PathBuf;

/// Returns a best-effort home directory path.
fn home_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Returns XDG_CONFIG_HOME or ~/.config
fn xdg_config_home() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".config"))
}

/// Returns XDG_DATA_HOME or ~/.local/share
fn xdg_data_home() -> PathBuf {
    std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/share"))
}

/// Returns XDG_STATE_HOME or ~/.local/state
fn xdg_state_home() -> PathBuf {
    std::env::var("XDG_STATE_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/state"))
}

/// Main configuration struct
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    /// Agent behavior
    #[serde(default)]
    pub agent: AgentConfig,

    /// UDP transport tuning
    #[serde(default)]
    pub transport: TransportConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Agent behavior configuration
#[derive(Debug, Deserialize, Clone)]
pub struct AgentConfig {
    /// Default poll interval in seconds, used until the settings store carries
    /// a live value
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,

    /// Hostname field placed in forwarded syslog records
    #[serde(default = "default_device_tag")]
    pub device_tag: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            device_tag: default_device_tag(),
        }
    }
}

fn default_interval_secs() -> u64 {
    30
}

fn default_device_tag() -> String {
    "mobile-device".to_string()
}

/// UDP transport configuration
#[derive(Debug, Deserialize, Clone, Copy)]
pub struct TransportConfig {
    /// Bound on a single datagram send, in seconds
    #[serde(default = "default_send_timeout")]
    pub send_timeout_secs: u64,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            send_timeout_secs: default_send_timeout(),
        }
    }
}

fn default_send_timeout() -> u64 {
    5
}

/// Logging configuration
#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Maximum number of log files to keep
    #[serde(default = "default_max_log_files")]
    pub max_files: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            max_files: default_max_log_files(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_log_files() -> usize {
    5
}

impl Config {
    /// Load configuration from the default path
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        if !config_path.exists() {
            tracing::info!("No config file found at {:?}, using defaults", config_path);
            return Ok(Config::default());
        }

        Self::load_from(&config_path)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &PathBuf) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read config file {:?}: {}", path, e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("failed to parse config: {}", e)))?;

        Ok(config)
    }

    /// Returns the default config file path
    ///
    /// `$XDG_CONFIG_HOME/logshield/config.toml` (~/.config/logshield/config.toml)
    pub fn config_path() -> PathBuf {
        xdg_config_home().join("logshield").join("config.toml")
    }

    /// Returns the data directory path (for the SQLite database)
    ///
    /// `$XDG_DATA_HOME/logshield/` (~/.local/share/logshield/)
    pub fn data_dir() -> PathBuf {
        xdg_data_home().join("logshield")
    }

    /// Returns the state directory path (for logs)
    ///
    /// `$XDG_STATE_HOME/logshield/` (~/.local/state/logshield/)
    pub fn state_dir() -> PathBuf {
        xdg_state_home().join("logshield")
    }

    /// Returns the database file path
    ///
    /// `$XDG_DATA_HOME/logshield/agent.db` (~/.local/share/logshield/agent.db)
    pub fn database_path() -> PathBuf {
        Self::data_dir().join("agent.db")
    }

    /// Returns the log file path
    ///
    /// `$XDG_STATE_HOME/logshield/logshield.log` (~/.local/state/logshield/logshield.log)
    pub fn log_path() -> PathBuf {
        Self::state_dir().join("logshield.log")
    }

    /// Ensure XDG base directory environment variables are set.
    ///
    /// This is mainly for CLI binaries that want explicit, stable path behavior
    /// before invoking other components that read these env vars.
    pub fn ensure_xdg_env() {
        let home = home_dir();

        if std::env::var("XDG_DATA_HOME").is_err() {
            std::env::set_var("XDG_DATA_HOME", home.join(".local/share"));
        }

        if std::env::var("XDG_STATE_HOME").is_err() {
            std::env::set_var("XDG_STATE_HOME", home.join(".local/state"));
        }

        if std::env::var("XDG_CONFIG_HOME").is_err() {
            std::env::set_var("XDG_CONFIG_HOME", home.join(".config"));
        }
    }
}
