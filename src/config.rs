//! Configuration handling for the docsql shell
//!
//! Settings are read from an optional `docsql.toml`, then overridden by
//! environment variables, then by command-line flags.
//!
//! ## Environment Variables
//!
//! - `DOCSQL_DATA` - Path of the JSON dataset to load
//! - `DOCSQL_TIMEZONE` - IANA zone used by `toDate` (local time when unset)
//! - `DOCSQL_BASE_PATH` - Document root for relative FROM paths
//! - `DOCSQL_INCLUDE_ID` - Merge document ids into `SELECT *` rows
//!
//! These can be set in a `.env` file next to the configuration file.

use chrono_tz::Tz;
use docsql_core::Settings;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult};

/// Configuration file name
pub const CONFIG_FILE_NAME: &str = "docsql.toml";

/// Environment file name
pub const ENV_FILE_NAME: &str = ".env";

/// Environment variable names
pub const ENV_DATA: &str = "DOCSQL_DATA";
pub const ENV_TIMEZONE: &str = "DOCSQL_TIMEZONE";
pub const ENV_BASE_PATH: &str = "DOCSQL_BASE_PATH";
pub const ENV_INCLUDE_ID: &str = "DOCSQL_INCLUDE_ID";

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// JSON dataset loaded into the in-memory store
    pub data: Option<PathBuf>,
    /// IANA time zone name for `toDate`
    pub timezone: Option<String>,
    /// Active document root
    pub base_path: Option<String>,
    /// Include the document id in `SELECT *` rows
    pub include_id: bool,
}

impl Config {
    /// Load configuration.
    ///
    /// An explicit path must exist. Without one, `docsql.toml` in the
    /// working directory is read when present and defaults apply otherwise.
    /// Any `.env` file beside the configuration is loaded before the
    /// environment overrides are applied.
    pub fn load(path: Option<&Path>) -> AppResult<Self> {
        let config_path = match path {
            Some(path) if !path.exists() => {
                return Err(AppError::ConfigNotFound(path.display().to_string()));
            }
            Some(path) => Some(path.to_path_buf()),
            None => Some(PathBuf::from(CONFIG_FILE_NAME)).filter(|p| p.exists()),
        };

        let dir = config_path
            .as_deref()
            .and_then(Path::parent)
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let env_path = dir.join(ENV_FILE_NAME);
        if env_path.exists() {
            let _ = dotenvy::from_path(&env_path);
        }

        let mut config = match config_path {
            Some(path) => {
                tracing::debug!(path = %path.display(), "reading configuration");
                Self::from_file(&path)?
            }
            None => Self::default(),
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Parse a TOML configuration file.
    pub fn from_file(path: &Path) -> AppResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Apply environment variable overrides to the configuration
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|name| std::env::var(name).ok());
    }

    /// Apply overrides from any variable lookup. Empty values are ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |name: &str| lookup(name).filter(|v| !v.is_empty());

        if let Some(data) = lookup(ENV_DATA) {
            self.data = Some(PathBuf::from(data));
        }

        if let Some(timezone) = lookup(ENV_TIMEZONE) {
            self.timezone = Some(timezone);
        }

        if let Some(base_path) = lookup(ENV_BASE_PATH) {
            self.base_path = Some(base_path);
        }

        if let Some(flag) = lookup(ENV_INCLUDE_ID) {
            match parse_flag(&flag) {
                Some(include_id) => self.include_id = include_id,
                None => tracing::warn!("Ignoring {}={}: expected a boolean", ENV_INCLUDE_ID, flag),
            }
        }
    }

    /// Session settings for the query executor.
    pub fn settings(&self) -> AppResult<Settings> {
        let timezone = match &self.timezone {
            Some(name) => Some(
                name.parse::<Tz>()
                    .map_err(|_| AppError::InvalidTimezone(name.clone()))?,
            ),
            None => None,
        };

        Ok(Settings {
            base_path: self
                .base_path
                .as_ref()
                .map(|p| p.trim_matches('/').to_string())
                .filter(|p| !p.is_empty()),
            timezone,
            include_id: self.include_id,
        })
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
