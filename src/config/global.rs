//! Global configuration management for packport.
//!
//! The global configuration file (`~/.packport/config.toml`) stores named connection
//! profiles: the base URL of an environment and the API token used to talk to it.
//! It holds credentials, so it is written with owner-only permissions on Unix and
//! must never be committed anywhere.
//!
//! # Configuration File Location
//!
//! - **Unix/macOS**: `~/.packport/config.toml`
//! - **Windows**: `%LOCALAPPDATA%\packport\config.toml`
//!
//! The location can be overridden using the `PACKPORT_CONFIG_PATH` environment variable.
//!
//! # File Format
//!
//! ```toml
//! default_profile = "source"
//!
//! [profiles.source]
//! url = "https://source.example.com"
//! token = "..."
//!
//! [profiles.target]
//! url = "https://target.example.com"
//! token = "..."
//! ```
//!
//! # Profile Resolution
//!
//! 1. `PACKPORT_URL` and `PACKPORT_TOKEN`, when both are set
//! 2. The profile named with `--profile`
//! 3. The default profile

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::core::PackportError;

/// Environment variable overriding the configuration file location.
pub const CONFIG_PATH_ENV: &str = "PACKPORT_CONFIG_PATH";
/// Environment variables providing an ad-hoc profile.
pub const URL_ENV: &str = "PACKPORT_URL";
pub const TOKEN_ENV: &str = "PACKPORT_TOKEN";

/// Connection settings of one environment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    /// Base URL of the environment, e.g. `https://team.example.com`
    pub url: String,
    /// API token sent as bearer token
    pub token: String,
}

impl Profile {
    /// Profile built from `PACKPORT_URL` and `PACKPORT_TOKEN`, if both are set.
    #[must_use]
    pub fn from_env() -> Option<Self> {
        let url = std::env::var(URL_ENV).ok().filter(|v| !v.is_empty())?;
        let token = std::env::var(TOKEN_ENV).ok().filter(|v| !v.is_empty())?;
        Some(Self {
            url,
            token,
        })
    }

    /// Token with all but the last four characters hidden.
    #[must_use]
    pub fn masked_token(&self) -> String {
        let visible: String = self.token.chars().rev().take(4).collect::<Vec<_>>().into_iter().rev().collect();
        if self.token.chars().count() <= 4 {
            "****".to_string()
        } else {
            format!("****{visible}")
        }
    }
}

/// Global configuration structure for packport.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalConfig {
    /// Profile used when no `--profile` is given.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_profile: Option<String>,

    /// Named profiles.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub profiles: BTreeMap<String, Profile>,
}

impl GlobalConfig {
    /// Load global configuration from `path`, or from the default location.
    ///
    /// A missing file yields an empty configuration.
    pub async fn load_with_optional(path: Option<PathBuf>) -> Result<Self> {
        let path = match path {
            Some(path) => path,
            None => Self::default_path()?,
        };
        if path.exists() {
            Self::load_from(&path).await
        } else {
            Ok(Self::default())
        }
    }

    pub async fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read global config from {}", path.display()))?;

        toml::from_str(&content)
            .with_context(|| format!("Failed to parse global config from {}", path.display()))
    }

    pub async fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await.with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize global config")?;

        fs::write(path, content)
            .await
            .with_context(|| format!("Failed to write global config to {}", path.display()))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;

            let mut perms = fs::metadata(path)
                .await
                .with_context(|| format!("Failed to read permissions for {}", path.display()))?
                .permissions();
            perms.set_mode(0o600);
            fs::set_permissions(path, perms).await.with_context(|| {
                format!("Failed to set secure permissions on {}", path.display())
            })?;
        }

        Ok(())
    }

    /// Path of the global configuration file, honoring `PACKPORT_CONFIG_PATH`.
    pub fn default_path() -> Result<PathBuf> {
        if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
            if !path.is_empty() {
                return Ok(PathBuf::from(path));
            }
        }

        let config_dir = if cfg!(target_os = "windows") {
            dirs::data_local_dir()
                .ok_or_else(|| anyhow::anyhow!("Unable to determine local data directory"))?
                .join("packport")
        } else {
            dirs::home_dir()
                .ok_or_else(|| anyhow::anyhow!("Unable to determine home directory"))?
                .join(".packport")
        };

        Ok(config_dir.join("config.toml"))
    }

    /// Adds or replaces a profile. The first profile added becomes the default.
    pub fn add_profile(&mut self, name: impl Into<String>, profile: Profile) {
        let name = name.into();
        if self.default_profile.is_none() {
            self.default_profile = Some(name.clone());
        }
        self.profiles.insert(name, profile);
    }

    /// Removes a profile, clearing the default when it pointed at it.
    pub fn remove_profile(&mut self, name: &str) -> bool {
        let removed = self.profiles.remove(name).is_some();
        if removed && self.default_profile.as_deref() == Some(name) {
            self.default_profile = None;
        }
        removed
    }

    pub fn set_default_profile(&mut self, name: &str) -> Result<(), PackportError> {
        if !self.profiles.contains_key(name) {
            return Err(PackportError::ProfileNotFound {
                name: name.to_string(),
            });
        }
        self.default_profile = Some(name.to_string());
        Ok(())
    }

    /// Looks up `name`, or the default profile when `name` is `None`.
    pub fn select_profile(&self, name: Option<&str>) -> Result<&Profile, PackportError> {
        let name = match name.or(self.default_profile.as_deref()) {
            Some(name) => name,
            None => {
                return Err(PackportError::ConfigError {
                    message: "No profile selected and no default profile configured".to_string(),
                });
            }
        };
        self.profiles.get(name).ok_or_else(|| PackportError::ProfileNotFound {
            name: name.to_string(),
        })
    }

    /// Profile a command connects with: the environment override, else
    /// [`select_profile`](Self::select_profile).
    pub fn resolve_profile(&self, name: Option<&str>) -> Result<Profile, PackportError> {
        if let Some(profile) = Profile::from_env() {
            tracing::debug!("Using profile from {} and {}", URL_ENV, TOKEN_ENV);
            return Ok(profile);
        }
        self.select_profile(name).cloned()
    }
}
