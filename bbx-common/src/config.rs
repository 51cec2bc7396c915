//! Configuration loading and config file resolution
//!
//! Bootstrap configuration lives in a TOML file:
//!
//! ```toml
//! [database]
//! path = "warehouse.db"
//!
//! [lists]
//! transcript_list_ids = ["12345", "12346"]
//! transcript_comments_id = "23456"
//! parents_list_id = "34567"
//! enrollment_list_id = "45678"
//!
//! [attendance]
//! level_ids = ["1", "2"]
//!
//! [logging]
//! level = "info"
//! ```

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Environment variable consulted when no `--config` argument is given
pub const CONFIG_ENV_VAR: &str = "BBX_CONFIG";

const LOCAL_CONFIG_FILE: &str = "bbextract.toml";

/// Complete TOML configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomlConfig {
    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub lists: ListConfig,

    #[serde(default)]
    pub attendance: AttendanceConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite warehouse file
    #[serde(default = "default_database_path")]
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
        }
    }
}

/// Vendor advanced-list identifiers
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListConfig {
    #[serde(default)]
    pub transcript_list_ids: Vec<String>,
    #[serde(default)]
    pub transcript_comments_id: Option<String>,
    #[serde(default)]
    pub parents_list_id: Option<String>,
    #[serde(default)]
    pub enrollment_list_id: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AttendanceConfig {
    #[serde(default)]
    pub level_ids: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_database_path() -> PathBuf {
    PathBuf::from("warehouse.db")
}

fn default_log_level() -> String {
    "info".to_string()
}

impl TomlConfig {
    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))
    }

    /// Read and parse a configuration file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read config file {}: {}", path.display(), e))
        })?;
        let config = Self::from_toml_str(&content)?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    pub fn transcript_list_ids(&self) -> Result<&[String]> {
        if self.lists.transcript_list_ids.is_empty() {
            return Err(Error::Config(
                "lists.transcript_list_ids is empty".to_string(),
            ));
        }
        Ok(&self.lists.transcript_list_ids)
    }

    pub fn transcript_comments_id(&self) -> Result<&str> {
        required(&self.lists.transcript_comments_id, "lists.transcript_comments_id")
    }

    pub fn parents_list_id(&self) -> Result<&str> {
        required(&self.lists.parents_list_id, "lists.parents_list_id")
    }

    pub fn enrollment_list_id(&self) -> Result<&str> {
        required(&self.lists.enrollment_list_id, "lists.enrollment_list_id")
    }

    pub fn attendance_level_ids(&self) -> Result<&[String]> {
        if self.attendance.level_ids.is_empty() {
            return Err(Error::Config("attendance.level_ids is empty".to_string()));
        }
        Ok(&self.attendance.level_ids)
    }
}

fn required<'a>(value: &'a Option<String>, key: &str) -> Result<&'a str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| Error::Config(format!("{} is not configured", key)))
}

/// Config file resolution, highest priority first:
/// 1. Command-line argument
/// 2. `BBX_CONFIG` environment variable
/// 3. `./bbextract.toml`
/// 4. `<config dir>/bbextract/config.toml`
pub fn resolve_config_path(cli_arg: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = cli_arg {
        return Ok(path.to_path_buf());
    }

    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        if !path.trim().is_empty() {
            return Ok(PathBuf::from(path));
        }
    }

    let local = PathBuf::from(LOCAL_CONFIG_FILE);
    if local.exists() {
        return Ok(local);
    }

    let user = dirs::config_dir().map(|d| d.join("bbextract").join("config.toml"));
    if let Some(path) = user {
        debug!("Checking user config path {}", path.display());
        if path.exists() {
            return Ok(path);
        }
    }

    Err(Error::Config(format!(
        "No config file found. Pass --config, set {} or create ./{}",
        CONFIG_ENV_VAR, LOCAL_CONFIG_FILE
    )))
}
