//! Client configuration from the environment.
//!
//! | variable                      | default                   |
//! |-------------------------------|---------------------------|
//! | `SHOPFRONT_API_URL`           | `http://localhost:8080`   |
//! | `SHOPFRONT_DATA_DIR`          | OS data dir + `shopfront` |
//! | `SHOPFRONT_REDIRECT_DELAY_MS` | `2000`                    |
//! | `SHOPFRONT_LOG_JSON`          | unset (compact output)    |

use std::path::PathBuf;
use std::time::Duration;

use reqwest::Url;
use thiserror::Error;

use shopfront_observability::LogFormat;

pub const API_URL_VAR: &str = "SHOPFRONT_API_URL";
pub const DATA_DIR_VAR: &str = "SHOPFRONT_DATA_DIR";
pub const REDIRECT_DELAY_VAR: &str = "SHOPFRONT_REDIRECT_DELAY_MS";
pub const LOG_JSON_VAR: &str = "SHOPFRONT_LOG_JSON";

pub const DEFAULT_API_URL: &str = "http://localhost:8080";
pub const DEFAULT_REDIRECT_DELAY: Duration = Duration::from_secs(2);

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} is not a valid URL: {value}")]
    InvalidUrl { var: &'static str, value: String },

    #[error("{var} must be a whole number of milliseconds, got {value:?}")]
    InvalidDelay { var: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Base URL of the catalog API, without a trailing slash.
    pub api_url: String,
    /// Where the session database lives. `None` means the OS default.
    pub data_dir: Option<PathBuf>,
    /// Pause between a successful product save and the return to the listing.
    pub redirect_delay: Duration,
    pub log_format: LogFormat,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            data_dir: None,
            redirect_delay: DEFAULT_REDIRECT_DELAY,
            log_format: LogFormat::Pretty,
        }
    }
}

impl ClientConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build from any variable source. Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        if let Some(url) = get(API_URL_VAR) {
            config.api_url = normalize_api_url(API_URL_VAR, &url)?;
        }
        if let Some(dir) = get(DATA_DIR_VAR) {
            config.data_dir = Some(PathBuf::from(dir));
        }
        if let Some(raw) = get(REDIRECT_DELAY_VAR) {
            let ms = raw.trim().parse::<u64>().map_err(|_| ConfigError::InvalidDelay {
                var: REDIRECT_DELAY_VAR,
                value: raw.clone(),
            })?;
            config.redirect_delay = Duration::from_millis(ms);
        }
        if let Some(flag) = get(LOG_JSON_VAR) {
            if matches!(flag.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes") {
                config.log_format = LogFormat::Json;
            }
        }

        Ok(config)
    }

    /// Replace the API URL, e.g. from a command-line flag.
    pub fn with_api_url(mut self, url: &str) -> Result<Self, ConfigError> {
        self.api_url = normalize_api_url("--api-url", url)?;
        Ok(self)
    }
}

fn normalize_api_url(var: &'static str, raw: &str) -> Result<String, ConfigError> {
    let raw = raw.trim();
    match Url::parse(raw) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => {
            Ok(raw.trim_end_matches('/').to_string())
        }
        _ => Err(ConfigError::InvalidUrl {
            var,
            value: raw.to_string(),
        }),
    }
}
