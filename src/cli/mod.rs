//! Command-line interface for packport.
//!
//! # Commands
//!
//! - `config export` - export packages (and optionally their dependencies) to an archive
//! - `config import` - import an archive into the target environment
//! - `config diff` - compare an archive with the target environment
//! - `config variables list` - list reconciled variables of package versions
//! - `profile` - manage connection profiles
//!
//! # Global Options
//!
//! - `--verbose` / `--quiet` - log level (overridden by `RUST_LOG`)
//! - `--profile` - connection profile to use instead of the default one
//! - `--config` - path of the global configuration file
//! - `--no-progress` - hide spinners
//!
//! Every command exits with code 0 on success and 1 on any fatal error.

pub mod common;
mod config;
mod profile;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

/// Settings shared by all commands, derived from the global flags.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    /// Log filter directive used when `RUST_LOG` is unset.
    pub log_level: String,
    pub no_progress: bool,
    /// Global configuration file override.
    pub config_path: Option<PathBuf>,
    /// Profile selected with `--profile`.
    pub profile: Option<String>,
}

impl CliConfig {
    /// Applies process-wide settings once, before any command runs.
    pub fn apply(&self) {
        if self.no_progress {
            crate::utils::disable_progress();
        }
    }

    /// Installs the tracing subscriber. `RUST_LOG` wins over the command-line level.
    pub fn init_logging(&self) {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(format!("packport={}", self.log_level)));

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .try_init();
    }
}

#[derive(Parser)]
#[command(
    name = "packport",
    about = "Batch export and import of content packages between environments",
    version,
    long_about = "packport exports packages together with their dependencies, variables and \
                  spaces into a self-describing archive, and imports such archives into \
                  another environment."
)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Only log errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Connection profile to use
    #[arg(short, long, global = true, env = "PACKPORT_PROFILE")]
    profile: Option<String>,

    /// Path of the global configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Disable progress spinners
    #[arg(long, global = true)]
    no_progress: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Export, import and compare package configurations
    Config(config::ConfigCommand),

    /// Manage connection profiles
    Profile(profile::ProfileCommand),
}

impl Cli {
    #[must_use]
    pub fn build_config(&self) -> CliConfig {
        let log_level = if self.verbose {
            "debug"
        } else if self.quiet {
            "error"
        } else {
            "warn"
        };

        CliConfig {
            log_level: log_level.to_string(),
            no_progress: self.no_progress,
            config_path: self.config.clone(),
            profile: self.profile.clone(),
        }
    }

    pub async fn execute_with_config(self, config: CliConfig) -> Result<()> {
        config.apply();
        match self.command {
            Commands::Config(cmd) => cmd.execute(&config).await,
            Commands::Profile(cmd) => cmd.execute(&config).await,
        }
    }
}
