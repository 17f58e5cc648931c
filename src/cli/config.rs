//! `config` subcommands: export, import, diff and variables.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use colored::Colorize;

use super::CliConfig;
use super::common::{connect, unique_output_path};
use crate::archive::ExtractedArchive;
use crate::batch::{
    ExportOptions, ImportOptions, PackageDiffService, PackageExportService, PackageImportService,
    parse_key_versions, parse_space_mappings,
};
use crate::models::{PackageDiff, VariableManifestEntry};
use crate::utils::{atomic_write, spinner_with_message, write_json_report};
use crate::variables::{VariableReconciler, fix_connection_metadata};

#[derive(Args)]
pub struct ConfigCommand {
    #[command(subcommand)]
    command: ConfigSubcommands,
}

#[derive(Subcommand)]
enum ConfigSubcommands {
    /// Export packages to an archive
    Export(ExportArgs),

    /// Import an archive into the target environment
    Import(ImportArgs),

    /// Compare the packages of an archive with the target environment
    Diff(DiffArgs),

    /// Inspect package variables
    Variables {
        #[command(subcommand)]
        command: VariablesSubcommands,
    },
}

#[derive(Args)]
struct ExportArgs {
    /// Keys of the packages to export
    #[arg(long = "packageKeys", num_args = 1.., required = true)]
    package_keys: Vec<String>,

    /// Also export every package the requested packages depend on
    #[arg(long = "withDependencies")]
    with_dependencies: bool,

    /// Keep manifest edges that point at action-flow packages
    #[arg(long = "keepActionFlowEdges")]
    keep_action_flow_edges: bool,

    /// Archive path (default: export_<uuid>.zip in the current directory)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Args)]
struct ImportArgs {
    /// Archive produced by `config export`
    #[arg(short = 'f', long = "file")]
    file: PathBuf,

    /// Replace packages that already exist in the target
    #[arg(long)]
    overwrite: bool,

    /// Target space per package, as <packageKey>:<spaceName>
    #[arg(long = "spaceMappings", num_args = 1..)]
    space_mappings: Vec<String>,
}

#[derive(Args)]
struct DiffArgs {
    /// Archive produced by `config export`
    #[arg(short = 'f', long = "file")]
    file: PathBuf,

    /// Only report whether each package changed
    #[arg(long = "hasChanges")]
    has_changes: bool,

    /// Write the result to config_diff_report_<uuid>.json
    #[arg(long)]
    json: bool,
}

#[derive(Subcommand)]
enum VariablesSubcommands {
    /// List the variables of package versions
    List {
        /// Package versions, as <packageKey>:<version>
        #[arg(long = "keysByVersion", num_args = 1.., required = true)]
        keys_by_version: Vec<String>,

        /// Write the result to variables_report_<uuid>.json
        #[arg(long)]
        json: bool,
    },
}

impl ConfigCommand {
    pub async fn execute(self, config: &CliConfig) -> Result<()> {
        match self.command {
            ConfigSubcommands::Export(args) => export(args, config).await,
            ConfigSubcommands::Import(args) => import(args, config).await,
            ConfigSubcommands::Diff(args) => diff(args, config).await,
            ConfigSubcommands::Variables {
                command:
                    VariablesSubcommands::List {
                        keys_by_version,
                        json,
                    },
            } => list_variables(&keys_by_version, json, config).await,
        }
    }
}

async fn export(args: ExportArgs, config: &CliConfig) -> Result<()> {
    let client = connect(config).await?;
    let options = ExportOptions {
        include_dependencies: args.with_dependencies,
        prune_excluded_edges: !args.keep_action_flow_edges,
    };

    let spinner = spinner_with_message("Exporting packages...");
    let archive = PackageExportService::new(&client).export(&args.package_keys, options).await;
    spinner.finish_and_clear();
    let archive = archive?;

    let output = args.output.unwrap_or_else(|| unique_output_path("export", "zip"));
    atomic_write(&output, &archive)
        .with_context(|| format!("Failed to write archive to {}", output.display()))?;

    println!("✅ Exported packages to {}", output.display().to_string().bold());
    Ok(())
}

async fn import(args: ImportArgs, config: &CliConfig) -> Result<()> {
    // File and argument problems are reported before anything touches the network.
    let archive = ExtractedArchive::open(&args.file)?;
    let options = ImportOptions {
        overwrite: args.overwrite,
        space_mappings: parse_space_mappings(&args.space_mappings)?,
    };
    let client = connect(config).await?;

    let spinner = spinner_with_message(format!("Importing {}...", args.file.display()));
    let report = PackageImportService::new(&client).import(&archive, &options).await;
    spinner.finish_and_clear();
    let report = report?;

    let path = unique_output_path("config_import_report", "json");
    write_json_report(&path, &report)?;

    for mapping in &report.mappings {
        println!(
            "  {} {} → {}",
            mapping.package_key.cyan(),
            mapping.old_version,
            mapping.new_version.green()
        );
    }
    println!(
        "✅ Imported {} package version(s); report written to {}",
        report.mappings.len(),
        path.display().to_string().bold()
    );
    Ok(())
}

async fn diff(args: DiffArgs, config: &CliConfig) -> Result<()> {
    let archive = ExtractedArchive::open(&args.file)?;
    let client = connect(config).await?;

    let spinner = spinner_with_message("Comparing packages...");
    let diffs = PackageDiffService::new(&client).diff(&archive, args.has_changes).await;
    spinner.finish_and_clear();
    let diffs = diffs?;

    if args.json {
        let path = unique_output_path("config_diff_report", "json");
        write_json_report(&path, &diffs)?;
        println!("✅ Diff report written to {}", path.display().to_string().bold());
    } else {
        print_diffs(&diffs);
    }
    Ok(())
}

fn print_diffs(diffs: &[PackageDiff]) {
    if diffs.is_empty() {
        println!("No packages in archive.");
        return;
    }
    for diff in diffs {
        let status = if diff.has_changes {
            "changed".yellow()
        } else {
            "unchanged".green()
        };
        println!("  {} {}", diff.package_key.cyan(), status);
    }
    let changed = diffs.iter().filter(|diff| diff.has_changes).count();
    println!("\n{changed} of {} package version(s) differ from the target", diffs.len());
}

async fn list_variables(raw_pairs: &[String], json: bool, config: &CliConfig) -> Result<()> {
    let pairs = parse_key_versions(raw_pairs)?;
    let client = connect(config).await?;

    let entries =
        fix_connection_metadata(VariableReconciler::new(&client).fetch_for_versions(&pairs).await?);

    if json {
        let path = unique_output_path("variables_report", "json");
        write_json_report(&path, &entries)?;
        println!("✅ Variables written to {}", path.display().to_string().bold());
    } else {
        print_variables(&entries);
    }
    Ok(())
}

fn print_variables(entries: &[VariableManifestEntry]) {
    if entries.is_empty() {
        println!("No variables found.");
        return;
    }
    for entry in entries {
        println!("{}", format!("{}@{}", entry.package_key, entry.version).bold());
        if entry.variables.is_empty() {
            println!("  (none)");
        }
        for variable in &entry.variables {
            let kind = serde_json::to_value(&variable.variable_type)
                .ok()
                .and_then(|v| v.as_str().map(str::to_string))
                .unwrap_or_default();
            println!("  {} [{}] = {}", variable.key.cyan(), kind, variable.value);
        }
    }
}
