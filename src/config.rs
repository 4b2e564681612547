//! Configuration file parser for ~/.config/offnews/config.toml.
//!
//! The config file is optional: a missing file yields `Config::default()`.
//! Unknown keys are accepted but logged as warnings since they are usually
//! typos.
use secrecy::SecretString;
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

use crate::api::DEFAULT_BASE_URL;

/// Environment variable that overrides `api_key` from the file.
pub const API_KEY_ENV: &str = "NEWS_API_KEY";

const KNOWN_KEYS: &[&str] = &[
    "api_key",
    "base_url",
    "default_category",
    "request_timeout_secs",
    "date_format",
    "connectivity_probe",
    "probe_interval_secs",
];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Config file too large: {0}")]
    TooLarge(String),
}

/// Application configuration.
///
/// Every key is optional; missing keys take the values from `Default`.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// News API key. `NEWS_API_KEY` takes precedence.
    pub api_key: Option<String>,

    /// Base URL of the news API, including the version segment.
    pub base_url: String,

    /// Category fetched on startup and whenever the network comes back.
    pub default_category: String,

    /// Per-request timeout.
    pub request_timeout_secs: u64,

    /// strftime pattern for displayed dates. ISO-8601 when unset.
    pub date_format: Option<String>,

    /// `host:port` probed to decide whether we are online.
    pub connectivity_probe: String,

    pub probe_interval_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            default_category: "general".to_string(),
            request_timeout_secs: 20,
            date_format: None,
            connectivity_probe: "newsapi.org:443".to_string(),
            probe_interval_secs: 10,
        }
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("base_url", &self.base_url)
            .field("default_category", &self.default_category)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("date_format", &self.date_format)
            .field("connectivity_probe", &self.connectivity_probe)
            .field("probe_interval_secs", &self.probe_interval_secs)
            .finish()
    }
}

impl Config {
    const MAX_FILE_SIZE: u64 = 1_048_576;

    /// Load configuration from a TOML file.
    ///
    /// - Missing or empty file → `Ok(Config::default())`
    /// - Invalid TOML → `Err(ConfigError::Parse)`
    /// - Unknown keys → accepted, logged as warning
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::metadata(path) {
            Ok(meta) if meta.len() > Self::MAX_FILE_SIZE => {
                return Err(ConfigError::TooLarge(format!(
                    "Config file is {} bytes (max {} bytes)",
                    meta.len(),
                    Self::MAX_FILE_SIZE
                )));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No config file found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
            Ok(_) => {}
        }

        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "Config file disappeared, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
        };

        Self::parse(&content, path)
    }

    fn parse(content: &str, path: &Path) -> Result<Self, ConfigError> {
        if content.trim().is_empty() {
            tracing::debug!(path = %path.display(), "Config file is empty, using defaults");
            return Ok(Self::default());
        }

        if let Ok(raw) = content.parse::<toml::Table>() {
            for key in raw.keys() {
                if !KNOWN_KEYS.contains(&key.as_str()) {
                    tracing::warn!(key = %key, "Unknown key in config file, ignoring");
                }
            }
        }

        let config: Config = toml::from_str(content)?;
        tracing::info!(
            path = %path.display(),
            base_url = %config.base_url,
            category = %config.default_category,
            "Loaded configuration"
        );
        Ok(config)
    }

    /// The API key to use, preferring `NEWS_API_KEY` over the file.
    pub fn api_key(&self) -> Option<SecretString> {
        self.resolve_api_key(std::env::var(API_KEY_ENV).ok())
    }

    fn resolve_api_key(&self, from_env: Option<String>) -> Option<SecretString> {
        from_env
            .filter(|k| !k.trim().is_empty())
            .or_else(|| self.api_key.clone().filter(|k| !k.trim().is_empty()))
            .map(SecretString::from)
    }
}
