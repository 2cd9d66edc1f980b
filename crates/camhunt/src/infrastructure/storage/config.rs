//! TOML-based configuration for camhunt.
//!
//! Reads `AppConfig` from the platform-appropriate config file:
//! - Windows:  `%APPDATA%\CamHunt\config.toml`
//! - Linux:    `~/.config/camhunt/config.toml`
//! - macOS:    `~/Library/Application Support/CamHunt/config.toml`
//!
//! Every field is optional.  A complete file with the built-in defaults
//! looks like this:
//!
//! ```toml
//! [general]
//! log_level = "info"
//!
//! [network]
//! port = 34569
//! broadcast_address = "255.255.255.255"
//! interfaces = ["eth0", "eno1"]
//!
//! [discovery]
//! receive_timeout_ms = 3000
//! max_duration_secs = 30
//!
//! [configure]
//! reply_timeout_ms = 1000
//! max_attempts = 4
//! username = "admin"
//! ```
//!
//! # Serde default values
//!
//! Fields annotated with `#[serde(default = "some_fn")]` use the return value
//! of `some_fn()` when the field is absent from the TOML file, so a missing
//! or partial file still yields a working configuration.

use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use camhunt_core::protocol::messages::DISCOVERY_PORT;
use serde::Deserialize;
use thiserror::Error;

use crate::application::configure_device::ConfigureOptions;
use crate::application::discover_devices::DiscoveryOptions;

/// Failure to load the configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Neither the platform variable nor `HOME` is set.
    #[error("no config directory on this platform (HOME/APPDATA unset)")]
    NoPlatformConfigDir,

    /// Reading the file failed for a reason other than "not found".
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid TOML or a field has the wrong type.
    #[error("invalid config file: {0}")]
    Parse(#[from] toml::de::Error),
}

// ── Config schema types ───────────────────────────────────────────────────────

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct AppConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub discovery: DiscoveryConfig,
    #[serde(default)]
    pub configure: ConfigureConfig,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct GeneralConfig {
    /// `tracing` log level: `"error"`, `"warn"`, `"info"`, `"debug"`, `"trace"`.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// Port, broadcast address and interface allow-list shared by both services.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct NetworkConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_broadcast_address")]
    pub broadcast_address: Ipv4Addr,
    /// Interfaces discovery may use, in no particular order.  The first
    /// detected interface on this list wins.  Empty means all interfaces.
    #[serde(default = "default_interfaces")]
    pub interfaces: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct DiscoveryConfig {
    #[serde(default = "default_receive_timeout_ms")]
    pub receive_timeout_ms: u64,
    #[serde(default = "default_max_duration_secs")]
    pub max_duration_secs: u64,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ConfigureConfig {
    #[serde(default = "default_reply_timeout_ms")]
    pub reply_timeout_ms: u64,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_username")]
    pub username: String,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_log_level() -> String {
    "info".to_string()
}
fn default_port() -> u16 {
    DISCOVERY_PORT
}
fn default_broadcast_address() -> Ipv4Addr {
    Ipv4Addr::BROADCAST
}
fn default_interfaces() -> Vec<String> {
    vec!["eth0".to_string(), "eno1".to_string()]
}
fn default_receive_timeout_ms() -> u64 {
    3000
}
fn default_max_duration_secs() -> u64 {
    30
}
fn default_reply_timeout_ms() -> u64 {
    1000
}
fn default_max_attempts() -> u32 {
    4
}
fn default_username() -> String {
    "admin".to_string()
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            broadcast_address: default_broadcast_address(),
            interfaces: default_interfaces(),
        }
    }
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            receive_timeout_ms: default_receive_timeout_ms(),
            max_duration_secs: default_max_duration_secs(),
        }
    }
}

impl Default for ConfigureConfig {
    fn default() -> Self {
        Self {
            reply_timeout_ms: default_reply_timeout_ms(),
            max_attempts: default_max_attempts(),
            username: default_username(),
        }
    }
}

// ── Conversion to service options ─────────────────────────────────────────────

impl AppConfig {
    pub fn discovery_options(&self) -> DiscoveryOptions {
        DiscoveryOptions {
            port: self.network.port,
            broadcast: self.network.broadcast_address,
            interfaces: self.network.interfaces.clone(),
            receive_timeout: Duration::from_millis(self.discovery.receive_timeout_ms),
            max_duration: Duration::from_secs(self.discovery.max_duration_secs),
        }
    }

    pub fn configure_options(&self) -> ConfigureOptions {
        ConfigureOptions {
            port: self.network.port,
            broadcast: self.network.broadcast_address,
            reply_timeout: Duration::from_millis(self.configure.reply_timeout_ms),
            max_attempts: self.configure.max_attempts,
            username: self.configure.username.clone(),
        }
    }
}

// ── Loading ──────────────────────────────────────────────────────────────────

/// Directory holding `config.toml` on this platform.
///
/// # Errors
///
/// Returns [`ConfigError::NoPlatformConfigDir`] when the platform config base
/// directory cannot be determined from the environment.
pub fn config_dir() -> Result<PathBuf, ConfigError> {
    platform_config_dir().ok_or(ConfigError::NoPlatformConfigDir)
}

/// Resolves the full path to the default config file.
///
/// # Errors
///
/// Returns [`ConfigError::NoPlatformConfigDir`] if the base directory cannot be
/// determined.
pub fn config_file_path() -> Result<PathBuf, ConfigError> {
    Ok(config_dir()?.join("config.toml"))
}

/// Loads `AppConfig` from the default location, returning
/// `AppConfig::default()` if the file does not exist or no config directory
/// can be determined.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system errors other than "not found",
/// and [`ConfigError::Parse`] if the TOML is malformed.
pub fn load_config() -> Result<AppConfig, ConfigError> {
    match config_file_path() {
        Ok(path) => load_config_from(&path),
        Err(ConfigError::NoPlatformConfigDir) => Ok(AppConfig::default()),
        Err(e) => Err(e),
    }
}

/// Loads `AppConfig` from `path`, returning `AppConfig::default()` if the
/// file does not exist.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system errors other than "not found",
/// and [`ConfigError::Parse`] if the TOML is malformed.
pub fn load_config_from(path: &Path) -> Result<AppConfig, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(content) => {
            let cfg: AppConfig = toml::from_str(&content)?;
            Ok(cfg)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(AppConfig::default()),
        Err(e) => Err(ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}

/// Resolves the platform config base directory including the `CamHunt` subdirectory.
fn platform_config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA").map(|p| PathBuf::from(p).join("CamHunt"))
    }

    #[cfg(target_os = "macos")]
    {
        std::env::var_os("HOME").map(|h| {
            PathBuf::from(h)
                .join("Library")
                .join("Application Support")
                .join("CamHunt")
        })
    }

    #[cfg(all(unix, not(target_os = "macos")))]
    {
        // XDG_CONFIG_HOME or ~/.config
        let base = std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))?;
        Some(base.join("camhunt"))
    }

    #[cfg(not(any(target_os = "windows", unix)))]
    {
        None
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
