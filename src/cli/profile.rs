//! `profile` subcommands.

use std::path::Path;

use anyhow::Result;
use clap::{Args, Subcommand};
use colored::Colorize;

use super::CliConfig;
use crate::config::{GlobalConfig, Profile};

#[derive(Args)]
pub struct ProfileCommand {
    #[command(subcommand)]
    command: ProfileSubcommands,
}

#[derive(Subcommand)]
enum ProfileSubcommands {
    /// Add or replace a profile
    Add {
        name: String,

        /// Base URL of the environment
        #[arg(long)]
        url: String,

        /// API token
        #[arg(long)]
        token: String,

        /// Make this the default profile
        #[arg(long)]
        default: bool,
    },

    /// List profiles
    List,

    /// Remove a profile
    Remove { name: String },

    /// Set the default profile
    Default { name: String },
}

impl ProfileCommand {
    pub async fn execute(self, config: &CliConfig) -> Result<()> {
        let path = match &config.config_path {
            Some(path) => path.clone(),
            None => GlobalConfig::default_path()?,
        };
        let mut global = GlobalConfig::load_with_optional(Some(path.clone())).await?;

        match self.command {
            ProfileSubcommands::Add {
                name,
                url,
                token,
                default,
            } => {
                global.add_profile(
                    &name,
                    Profile {
                        url,
                        token,
                    },
                );
                if default {
                    global.set_default_profile(&name)?;
                }
                global.save_to(&path).await?;
                println!("✅ Saved profile '{}'", name.bold());
            }
            ProfileSubcommands::List => list(&global, &path),
            ProfileSubcommands::Remove {
                name,
            } => {
                if global.remove_profile(&name) {
                    global.save_to(&path).await?;
                    println!("✅ Removed profile '{}'", name.bold());
                } else {
                    println!("❌ Profile '{name}' not found");
                }
            }
            ProfileSubcommands::Default {
                name,
            } => {
                global.set_default_profile(&name)?;
                global.save_to(&path).await?;
                println!("✅ Default profile is now '{}'", name.bold());
            }
        }
        Ok(())
    }
}

fn list(global: &GlobalConfig, path: &Path) {
    println!("{}", "Profiles".bold());
    println!("Location: {}\n", path.display());

    if global.profiles.is_empty() {
        println!("No profiles configured.");
        println!("\n{}", "Tip:".yellow());
        println!("  Run 'packport profile add <NAME> --url <URL> --token <TOKEN>'");
        return;
    }

    for (name, profile) in &global.profiles {
        let marker = if global.default_profile.as_deref() == Some(name) {
            "*".green().to_string()
        } else {
            " ".to_string()
        };
        println!("{marker} {} {} ({})", name.cyan(), profile.url, profile.masked_token());
    }
}
