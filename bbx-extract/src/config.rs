//! Vendor auth file handling
//!
//! The auth file is a JSON document managed alongside the vendor's OAuth
//! application. Tokens are rewritten in place after a refresh; keys this
//! crate does not know about are preserved.

use bbx_common::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Environment variable consulted when no `--auth` argument is given
pub const AUTH_ENV_VAR: &str = "BBX_AUTH";

pub const DEFAULT_AUTH_FILE: &str = "bb_auth.json";

#[derive(Clone, Default, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(default)]
    pub other: OtherSettings,
    #[serde(default)]
    pub tokens: Tokens,
    #[serde(default)]
    pub sky_app_information: AppInformation,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OtherSettings {
    #[serde(default)]
    pub api_subscription_key: String,
    #[serde(default)]
    pub test_api_endpoint: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redirect_uri: Option<String>,
}

#[derive(Clone, Default, Serialize, Deserialize)]
pub struct Tokens {
    #[serde(default)]
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: String,
}

#[derive(Clone, Default, Serialize, Deserialize)]
pub struct AppInformation {
    #[serde(default)]
    pub app_id: String,
    #[serde(default)]
    pub app_secret: String,
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("test_api_endpoint", &self.other.test_api_endpoint)
            .field("app_id", &self.sky_app_information.app_id)
            .field("tokens", &"<redacted>")
            .finish()
    }
}

impl AuthConfig {
    pub fn from_json_str(content: &str) -> Result<Self> {
        serde_json::from_str(content)
            .map_err(|e| Error::Config(format!("Parse auth file failed: {}", e)))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read auth file {}: {}", path.display(), e))
        })?;
        let auth = Self::from_json_str(&content)?;
        auth.validate()?;
        debug!("Loaded auth file {}", path.display());
        Ok(auth)
    }

    /// Fields required before any request can be made
    pub fn validate(&self) -> Result<()> {
        if self.other.api_subscription_key.trim().is_empty() {
            return Err(Error::Config(
                "auth file is missing other.api_subscription_key".to_string(),
            ));
        }
        if self.tokens.refresh_token.trim().is_empty() {
            return Err(Error::Config(
                "auth file is missing tokens.refresh_token".to_string(),
            ));
        }
        Ok(())
    }

    /// Write the file back through a temporary sibling and rename
    pub fn save(&self, path: &Path) -> Result<()> {
        let data = serde_json::to_string_pretty(self)
            .map_err(|e| Error::Internal(format!("Serialize auth file failed: {}", e)))?;

        let mut tmp = path.as_os_str().to_owned();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        std::fs::write(&tmp, data)?;
        std::fs::rename(&tmp, path)?;
        info!("Saved refreshed tokens to {}", path.display());
        Ok(())
    }
}

/// Auth file resolution: CLI argument, then `BBX_AUTH`, then `./bb_auth.json`
pub fn resolve_auth_path(cli_arg: Option<&Path>) -> PathBuf {
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }
    match std::env::var(AUTH_ENV_VAR) {
        Ok(path) if !path.trim().is_empty() => PathBuf::from(path),
        _ => PathBuf::from(DEFAULT_AUTH_FILE),
    }
}
