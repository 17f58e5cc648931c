//! Helpers shared by CLI commands.

use std::path::PathBuf;

use anyhow::{Context, Result};

use super::CliConfig;
use crate::api::HttpPlatformClient;
use crate::config::GlobalConfig;

/// Connects to the environment of the selected profile.
pub async fn connect(config: &CliConfig) -> Result<HttpPlatformClient> {
    let global = GlobalConfig::load_with_optional(config.config_path.clone()).await?;
    let profile = global.resolve_profile(config.profile.as_deref())?;
    tracing::debug!("Connecting to {}", profile.url);

    let client = HttpPlatformClient::new(&profile.url, profile.token)
        .with_context(|| format!("Invalid URL '{}' in profile", profile.url))?;
    Ok(client)
}

/// `{prefix}_{uuid}.{extension}` in the current directory.
pub fn unique_output_path(prefix: &str, extension: &str) -> PathBuf {
    PathBuf::from(format!("{prefix}_{}.{extension}", uuid::Uuid::new_v4()))
}
