//! Client configuration
//!
//! Read from `<config_dir>/codress/config.toml`. Every key is optional; a
//! missing file yields the defaults. `CODRESS_BACKEND_ORIGIN` overrides the
//! backend origin after the file has been applied.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use url::Url;

use crate::error::ConfigError;

pub const DEFAULT_BACKEND_ORIGIN: &str = "http://localhost:5000";
pub const ORIGIN_ENV_VAR: &str = "CODRESS_BACKEND_ORIGIN";

const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_LOG_FILTER: &str = "codress=info";

/// Resolved configuration used by the client
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Origin every API path and relative image URL is resolved against
    pub backend_origin: Url,
    /// Per-request timeout enforced by the HTTP client
    pub request_timeout_secs: u64,
    /// Default `tracing` filter when `RUST_LOG` is unset
    pub log_filter: String,
    /// Session database location; `None` means the platform data directory
    pub session_db: Option<PathBuf>,
}

/// On-disk shape of `config.toml`
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigToml {
    backend_origin: Option<String>,
    request_timeout_secs: Option<u64>,
    log_filter: Option<String>,
    session_db: Option<PathBuf>,
}

impl Config {
    /// Built-in configuration used when no file is present
    pub fn defaults() -> Result<Self, ConfigError> {
        Ok(Self {
            backend_origin: parse_origin(DEFAULT_BACKEND_ORIGIN)?,
            request_timeout_secs: DEFAULT_TIMEOUT_SECS,
            log_filter: DEFAULT_LOG_FILTER.to_string(),
            session_db: None,
        })
    }

    /// Load the configuration from the platform config directory and the
    /// environment
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match Self::config_path() {
            Some(path) if path.exists() => Self::from_file(&path)?,
            _ => Self::defaults()?,
        };
        if let Ok(origin) = std::env::var(ORIGIN_ENV_VAR) {
            config.backend_origin = parse_origin(&origin)?;
        }
        Ok(config)
    }

    /// Path of the config file, if the platform exposes a config directory
    pub fn config_path() -> Option<PathBuf> {
        let mut path = dirs::config_dir()?;
        path.push("codress");
        path.push("config.toml");
        Some(path)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let raw: ConfigToml = toml::from_str(contents)?;
        let origin = raw.backend_origin.as_deref().unwrap_or(DEFAULT_BACKEND_ORIGIN);
        Ok(Self {
            backend_origin: parse_origin(origin)?,
            request_timeout_secs: raw.request_timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS),
            log_filter: raw
                .log_filter
                .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string()),
            session_db: raw.session_db,
        })
    }

    /// Where the session database lives
    ///
    /// Linux: ~/.local/share/codress/session.db
    pub fn session_db_path(&self) -> Option<PathBuf> {
        if let Some(path) = &self.session_db {
            return Some(path.clone());
        }
        let mut path = dirs::data_dir().or_else(dirs::home_dir)?;
        path.push("codress");
        path.push("session.db");
        Some(path)
    }
}

/// Parse and check a backend origin; only absolute http(s) URLs are accepted
pub fn parse_origin(origin: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(origin.trim()).map_err(|err| ConfigError::Origin {
        origin: origin.to_string(),
        reason: err.to_string(),
    })?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(ConfigError::Origin {
            origin: origin.to_string(),
            reason: format!("unsupported scheme {other:?}"),
        }),
    }
}
