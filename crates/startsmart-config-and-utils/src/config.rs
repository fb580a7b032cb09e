//! Configuration management.

use crate::{CoreError, CoreResult, Paths};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use url::Url;

/// Default catalog/profile backend.
pub const DEFAULT_API_BASE_URL: &str = "https://start-smart-backend.vercel.app";

/// Default Identity Toolkit endpoint used for email and federated sign-in.
pub const DEFAULT_IDENTITY_TOOLKIT_URL: &str = "https://identitytoolkit.googleapis.com/v1";

/// Firebase web API key (can be baked in at compile time via STARTSMART_FIREBASE_API_KEY).
pub const DEFAULT_FIREBASE_API_KEY: &str = match option_env!("STARTSMART_FIREBASE_API_KEY") {
    Some(key) => key,
    None => "",
};

/// Default log level.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Default HTTP request timeout.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Base URL of the catalog and profile REST API.
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    /// Identity Toolkit base URL.
    #[serde(default = "default_identity_toolkit_url")]
    pub identity_toolkit_url: String,
    /// Firebase web API key.
    #[serde(default = "default_firebase_api_key")]
    pub firebase_api_key: String,
    /// Timeout applied to every HTTP request.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_api_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}

fn default_identity_toolkit_url() -> String {
    DEFAULT_IDENTITY_TOOLKIT_URL.to_string()
}

fn default_firebase_api_key() -> String {
    DEFAULT_FIREBASE_API_KEY.to_string()
}

fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            api_base_url: default_api_base_url(),
            identity_toolkit_url: default_identity_toolkit_url(),
            firebase_api_key: default_firebase_api_key(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

impl Config {
    /// Create a new Config with default values, then override from environment.
    pub fn new() -> Self {
        let mut config = Self::default();
        config.load_from_env();
        config
    }

    /// Load configuration from the config file under `paths`, falling back to
    /// defaults when the file does not exist. Environment variables win over
    /// both.
    pub fn load(paths: &Paths) -> CoreResult<Self> {
        let config_path = paths.config_file();

        let mut config = if config_path.exists() {
            Self::load_from_file(&config_path)?
        } else {
            Self::default()
        };

        config.load_from_env();
        config.validate()?;

        Ok(config)
    }

    /// Load configuration from a specific file.
    pub fn load_from_file(path: &Path) -> CoreResult<Self> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|source| CoreError::ConfigFile {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Save configuration to a file.
    pub fn save(&self, paths: &Paths) -> CoreResult<()> {
        paths.ensure_dirs()?;
        let path = paths.config_file();
        let content = serde_json::to_string_pretty(self).map_err(|source| CoreError::ConfigFile {
            path: path.clone(),
            source,
        })?;
        std::fs::write(path, content)?;
        Ok(())
    }

    fn load_from_env(&mut self) {
        if let Some(level) = env_override("STARTSMART_LOG_LEVEL") {
            self.log_level = level;
        }
        if let Some(url) = env_override("STARTSMART_API_URL") {
            self.api_base_url = url;
        }
        if let Some(key) = env_override("STARTSMART_FIREBASE_API_KEY") {
            self.firebase_api_key = key;
        }
    }

    fn validate(&self) -> CoreResult<()> {
        self.api_base_url()?;
        Url::parse(&self.identity_toolkit_url).map_err(|source| CoreError::InvalidUrl {
            field: "identity_toolkit_url",
            source,
        })?;
        if self.request_timeout_secs == 0 {
            return Err(CoreError::InvalidSetting {
                field: "request_timeout_secs",
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }

    /// Get the API base URL as a parsed URL.
    pub fn api_base_url(&self) -> CoreResult<Url> {
        Url::parse(&self.api_base_url).map_err(|source| CoreError::InvalidUrl {
            field: "api_base_url",
            source,
        })
    }

    /// HTTP timeout as a `Duration`.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn env_override(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|raw| raw.trim().to_string())
        .filter(|value| !value.is_empty())
}
