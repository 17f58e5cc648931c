//! packport - batch package export and import
//!
//! Migrates content packages between environments of the same platform. An export
//! computes the version-aware dependency closure of the requested packages,
//! reconciles their variables and spaces, and writes everything into a
//! self-describing nested-zip archive. An import reads such an archive, resolves or
//! creates the target spaces and imports every package version, dependencies first.
//!
//! # Architecture Overview
//!
//! ```text
//! export: cli → batch::PackageExportService → resolver::DependencyResolver
//!                                           → variables::VariableReconciler
//!                                           → archive::ArchiveCodec::write
//!
//! import: cli → archive::ArchiveCodec::read → batch::PackageImportService
//!                                           → spaces::SpaceMapper
//!                                           → api::PlatformApi::import_package
//! ```
//!
//! Every backend interaction goes through the [`api::PlatformApi`] trait, implemented
//! over HTTP by [`api::HttpPlatformClient`] and in memory by
//! `test_utils::MockPlatform`.
//!
//! # Core Modules
//!
//! ## Pipeline
//! - [`resolver`] - breadth-first dependency closure with `key@version` deduplication
//! - [`variables`] - variable fetching and normalization
//! - [`spaces`] - target space resolution and creation
//! - [`archive`] - nested-zip archive reading and writing
//! - [`batch`] - export, import and diff orchestration
//!
//! ## Supporting Modules
//! - [`api`] - backend trait and HTTP client
//! - [`cli`] - command-line interface
//! - [`config`] - connection profiles (`~/.packport/config.toml`)
//! - [`core`] - error types and user-facing error formatting
//! - [`models`] - wire and archive data models
//! - [`utils`] - atomic file writes and progress spinners
//!
//! # Command-Line Usage
//!
//! ```bash
//! # Store credentials for two environments
//! packport profile add source --url https://source.example.com --token ...
//! packport profile add target --url https://target.example.com --token ...
//!
//! # Export two packages and everything they depend on
//! packport --profile source config export --packageKeys key-1 key-2 --withDependencies
//!
//! # Compare, then import into the target
//! packport --profile target config diff -f export_<uuid>.zip --hasChanges
//! packport --profile target config import -f export_<uuid>.zip --spaceMappings key-1:Finance
//! ```

// Pipeline
pub mod archive;
pub mod batch;
pub mod resolver;
pub mod spaces;
pub mod variables;

// Supporting modules
pub mod api;
pub mod cli;
pub mod config;
pub mod constants;
pub mod core;
pub mod models;
pub mod utils;

// test_utils module is available for both unit tests and integration tests
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
