//! Client Configuration
//!
//! Configuration is read from a TOML file at
//! `$XDG_CONFIG_HOME/smartchat/config.toml` and can be overridden through
//! environment variables.
//!
//! # Configuration Priority
//!
//! Highest first:
//! 1. Environment variables
//! 2. TOML configuration file
//! 3. Default values
//!
//! # Example Configuration
//!
//! ```toml
//! [api]
//! base_url = "http://localhost:5000"
//! timeout_secs = 60
//!
//! [ui]
//! typing_tick_ms = 12
//! default_mode = "text"
//! ```
//!
//! # Environment Variables
//!
//! - `SMARTCHAT_API_URL` - chat server base URL
//! - `SMARTCHAT_TIMEOUT_SECS` - overall request timeout
//! - `SMARTCHAT_TYPING_TICK_MS` - delay between revealed characters
//! - `SMARTCHAT_MODE` - initial mode (`text` or `image`)

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::animation::DEFAULT_TICK;
use crate::messages::ChatMode;

/// Default chat server
pub const DEFAULT_BASE_URL: &str = "http://localhost:5000";

const ENV_API_URL: &str = "SMARTCHAT_API_URL";
const ENV_TIMEOUT_SECS: &str = "SMARTCHAT_TIMEOUT_SECS";
const ENV_TYPING_TICK_MS: &str = "SMARTCHAT_TYPING_TICK_MS";
const ENV_MODE: &str = "SMARTCHAT_MODE";

/// Errors that can occur when loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read config file
    #[error("Failed to read config file at {path}: {source}")]
    Read {
        /// The path that was attempted
        path: PathBuf,
        /// The underlying IO error
        source: std::io::Error,
    },

    /// Failed to parse TOML
    #[error("Failed to parse TOML config: {0}")]
    Parse(#[from] toml::de::Error),

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Where the configuration was last overridden from
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigSource {
    /// Environment variable
    Env,
    /// TOML configuration file
    File,
    /// Built-in defaults
    Default,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Env => write!(f, "environment"),
            Self::File => write!(f, "config file"),
            Self::Default => write!(f, "default"),
        }
    }
}

/// `[api]` section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiToml {
    /// Chat server base URL
    pub base_url: Option<String>,
    /// Overall request timeout in seconds
    pub timeout_secs: Option<u64>,
}

/// `[ui]` section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UiToml {
    /// Delay between revealed characters
    pub typing_tick_ms: Option<u64>,
    /// Initial generation mode
    pub default_mode: Option<String>,
}

/// Top-level TOML configuration structure
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientToml {
    /// Chat server section
    pub api: ApiToml,
    /// Surface section
    pub ui: UiToml,
}

/// Chat server connection settings
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ApiConfig {
    /// Base URL, e.g. `http://localhost:5000`
    pub base_url: String,
    /// Overall request timeout; `None` keeps the transport default
    pub timeout: Option<Duration>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: None,
        }
    }
}

/// Complete client configuration
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// Chat server settings
    pub api: ApiConfig,
    /// Delay between revealed characters
    pub typing_tick: Duration,
    /// Mode the conversation starts in
    pub default_mode: ChatMode,
    /// Path to the config file that was loaded (if any)
    pub config_file_path: Option<PathBuf>,
    source: ConfigSource,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            typing_tick: DEFAULT_TICK,
            default_mode: ChatMode::Text,
            config_file_path: None,
            source: ConfigSource::Default,
        }
    }
}

impl ClientConfig {
    /// Get the source of the last applied override
    #[must_use]
    pub fn source(&self) -> ConfigSource {
        self.source
    }

    /// Apply a parsed TOML file
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for an unknown mode.
    pub fn apply_toml(&mut self, toml: &ClientToml) -> Result<(), ConfigError> {
        if let Some(ref url) = toml.api.base_url {
            self.api.base_url.clone_from(url);
        }
        if let Some(secs) = toml.api.timeout_secs {
            self.api.timeout = Some(Duration::from_secs(secs));
        }
        if let Some(ms) = toml.ui.typing_tick_ms {
            self.typing_tick = Duration::from_millis(ms);
        }
        if let Some(ref mode) = toml.ui.default_mode {
            self.default_mode = mode.parse().map_err(ConfigError::Invalid)?;
        }
        self.source = ConfigSource::File;
        Ok(())
    }

    /// Apply overrides from a variable lookup
    ///
    /// Values that fail to parse are logged and skipped.
    pub fn apply_env_with<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_API_URL) {
            self.api.base_url = url;
            self.source = ConfigSource::Env;
        }
        if let Some(value) = lookup(ENV_TIMEOUT_SECS) {
            match value.parse::<u64>() {
                Ok(secs) => {
                    self.api.timeout = Some(Duration::from_secs(secs));
                    self.source = ConfigSource::Env;
                }
                Err(e) => tracing::warn!(var = ENV_TIMEOUT_SECS, %value, error = %e, "Ignoring invalid value"),
            }
        }
        if let Some(value) = lookup(ENV_TYPING_TICK_MS) {
            match value.parse::<u64>() {
                Ok(ms) => {
                    self.typing_tick = Duration::from_millis(ms);
                    self.source = ConfigSource::Env;
                }
                Err(e) => tracing::warn!(var = ENV_TYPING_TICK_MS, %value, error = %e, "Ignoring invalid value"),
            }
        }
        if let Some(value) = lookup(ENV_MODE) {
            match value.parse::<ChatMode>() {
                Ok(mode) => {
                    self.default_mode = mode;
                    self.source = ConfigSource::Env;
                }
                Err(e) => tracing::warn!(var = ENV_MODE, error = %e, "Ignoring invalid value"),
            }
        }
    }

    /// Check the values are usable
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for a non-HTTP base URL or a zero tick.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = self.api.base_url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ConfigError::Invalid(format!(
                "api.base_url must start with http:// or https://, got {url:?}"
            )));
        }
        if self.typing_tick.is_zero() {
            return Err(ConfigError::Invalid(
                "ui.typing_tick_ms must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Get the default configuration file path
///
/// Returns `$XDG_CONFIG_HOME/smartchat/config.toml` or
/// `~/.config/smartchat/config.toml` if `XDG_CONFIG_HOME` is not set.
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("smartchat").join("config.toml"))
}

/// Load configuration from the default path and the process environment
///
/// # Errors
///
/// Returns an error if the config file exists but cannot be parsed, or if
/// the resulting values are invalid. A missing file is not an error.
pub fn load_config() -> Result<ClientConfig, ConfigError> {
    load_config_from_path(default_config_path())
}

/// Load configuration from a specific path and the process environment
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, or if the
/// resulting values are invalid.
pub fn load_config_from_path(path: Option<PathBuf>) -> Result<ClientConfig, ConfigError> {
    load_config_with(path.as_deref(), |key| std::env::var(key).ok())
}

/// Load configuration from a path and an explicit variable lookup
///
/// # Errors
///
/// Same as [`load_config_from_path`].
pub fn load_config_with<F>(path: Option<&Path>, lookup: F) -> Result<ClientConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = ClientConfig::default();

    if let Some(config_path) = path {
        if config_path.exists() {
            let content = std::fs::read_to_string(config_path).map_err(|e| ConfigError::Read {
                path: config_path.to_path_buf(),
                source: e,
            })?;

            let toml_config: ClientToml = toml::from_str(&content)?;
            config.apply_toml(&toml_config)?;
            config.config_file_path = Some(config_path.to_path_buf());

            tracing::info!(path = %config_path.display(), "Loaded configuration from file");
        } else {
            tracing::debug!(
                path = %config_path.display(),
                "Config file not found, using defaults"
            );
        }
    }

    config.apply_env_with(lookup);
    config.validate()?;

    Ok(config)
}
