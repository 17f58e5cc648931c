//! Batch export, import and diff of packages between environments.
//!
//! The services here orchestrate the lower layers:
//!
//! - [`PackageExportService`] resolves dependencies, reconciles variables and spaces,
//!   downloads every package version and writes the archive
//! - [`PackageImportService`] reads an archive, resolves target spaces and imports
//!   every package version, returning a [`VersionMappingReport`]
//! - [`PackageDiffService`] compares the packages of an archive with the target
//!
//! Each service borrows a `&dyn PlatformApi` for the duration of one command.
//!
//! [`VersionMappingReport`]: crate::models::VersionMappingReport

mod diff;
mod export;
mod import;
pub mod ordering;

pub use diff::PackageDiffService;
pub use export::{ExportOptions, PackageExportService};
pub use import::{ImportOptions, PackageImportService};

use std::collections::HashMap;

use crate::core::PackportError;
use crate::models::PackageKeyAndVersion;

/// Parses `packageKey:spaceName` space mapping overrides.
///
/// Space names may themselves contain `:`; only the first one separates the key.
pub fn parse_space_mappings(raw: &[String]) -> Result<HashMap<String, String>, PackportError> {
    raw.iter()
        .map(|mapping| {
            split_pair(mapping)
                .map(|(key, name)| (key.to_string(), name.to_string()))
                .ok_or_else(|| PackportError::ValidationError {
                    reason: format!(
                        "Invalid space mapping '{mapping}', expected <packageKey>:<spaceName>"
                    ),
                })
        })
        .collect()
}

/// Parses `packageKey:version` pairs.
pub fn parse_key_versions(raw: &[String]) -> Result<Vec<PackageKeyAndVersion>, PackportError> {
    raw.iter()
        .map(|pair| {
            split_pair(pair).map(|(key, version)| PackageKeyAndVersion::new(key, version)).ok_or_else(
                || PackportError::ValidationError {
                    reason: format!("Invalid package version '{pair}', expected <packageKey>:<version>"),
                },
            )
        })
        .collect()
}

fn split_pair(raw: &str) -> Option<(&str, &str)> {
    let (left, right) = raw.split_once(':')?;
    let (left, right) = (left.trim(), right.trim());
    (!left.is_empty() && !right.is_empty()).then_some((left, right))
}
