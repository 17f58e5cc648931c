use std::collections::HashMap;

use anyhow::{Context, Result};

use super::ordering::{import_order, sorted_versions};
use crate::api::PlatformApi;
use crate::archive::ExtractedArchive;
use crate::core::PackportError;
use crate::models::{
    ManifestEntry, PackageKeyAndVersion, PackageNode, SpaceDescriptor, VariableAssignment,
    VersionMapping, VersionMappingReport,
};
use crate::spaces::SpaceMapper;

/// Import settings.
#[derive(Debug, Clone, Default)]
pub struct ImportOptions {
    /// Replace packages that already exist in the target.
    pub overwrite: bool,
    /// Package key → target space name. Takes precedence over the archived space.
    pub space_mappings: HashMap<String, String>,
}

/// Imports the packages of an extracted archive into the target environment.
///
/// Packages are imported one at a time, dependencies first. A failure stops the
/// import; packages imported before it stay in place.
pub struct PackageImportService<'a> {
    api: &'a dyn PlatformApi,
}

impl<'a> PackageImportService<'a> {
    pub fn new(api: &'a dyn PlatformApi) -> Self {
        Self {
            api,
        }
    }

    pub async fn import(
        &self,
        archive: &ExtractedArchive,
        options: &ImportOptions,
    ) -> Result<VersionMappingReport> {
        let existing = self.api.list_packages().await.context("Failed to list target packages")?;
        let spaces = self.api.list_spaces().await.context("Failed to list target spaces")?;
        let existing: HashMap<&str, &PackageNode> =
            existing.iter().map(|node| (node.key.as_str(), node)).collect();

        check_importable(archive, &existing, options.overwrite)?;

        let mut mapper = SpaceMapper::new(self.api, spaces);
        let mut report = VersionMappingReport::default();

        for entry in import_order(&archive.manifest) {
            let space = match target_space(archive, entry, &options.space_mappings) {
                Some(descriptor) => Some(
                    mapper
                        .resolve(&descriptor)
                        .await
                        .with_context(|| format!("Failed to resolve space of '{}'", entry.package_key))?,
                ),
                None => None,
            };
            let space_id = space.as_ref().and_then(|space| space.id.as_deref());

            if let (Some(node), Some(space_id)) = (existing.get(entry.package_key.as_str()), space_id) {
                self.move_if_needed(node, space_id).await?;
            }

            for version in sorted_versions(entry) {
                let identity = PackageKeyAndVersion::new(&entry.package_key, version);
                report.mappings.push(self.import_version(archive, &identity, space_id, options.overwrite).await?);
            }

            let assignments = runtime_assignments(archive, entry);
            if !assignments.is_empty() {
                self.api
                    .assign_runtime_variables(&entry.package_key, assignments)
                    .await
                    .with_context(|| {
                        format!("Failed to assign runtime variables of '{}'", entry.package_key)
                    })?;
            }
        }

        tracing::info!("Imported {} package version(s)", report.mappings.len());
        Ok(report)
    }

    async fn move_if_needed(&self, node: &PackageNode, space_id: &str) -> Result<()> {
        if node.space_id.as_deref() == Some(space_id) {
            return Ok(());
        }
        tracing::info!("Moving existing package '{}' to space '{}'", node.key, space_id);
        self.api
            .move_package(&node.id, space_id)
            .await
            .with_context(|| format!("Failed to move package '{}'", node.key))?;
        Ok(())
    }

    async fn import_version(
        &self,
        archive: &ExtractedArchive,
        identity: &PackageKeyAndVersion,
        space_id: Option<&str>,
        overwrite: bool,
    ) -> Result<VersionMapping> {
        let payload = archive.load_package(identity)?;
        let result = self
            .api
            .import_package(&identity.archive_file_name(), payload, space_id, overwrite)
            .await
            .with_context(|| format!("Failed to import {identity}"))?;
        tracing::debug!("Imported {} as version {}", identity, result.version);

        Ok(VersionMapping {
            package_key: identity.package_key.clone(),
            old_version: identity.version.clone(),
            new_version: result.version,
        })
    }
}

/// Validates the whole archive against the target before anything is imported.
fn check_importable(
    archive: &ExtractedArchive,
    existing: &HashMap<&str, &PackageNode>,
    overwrite: bool,
) -> Result<(), PackportError> {
    for entry in &archive.manifest {
        if !overwrite && existing.contains_key(entry.package_key.as_str()) {
            return Err(PackportError::PackageAlreadyExists {
                key: entry.package_key.clone(),
            });
        }
        for version in entry.versions() {
            let identity = PackageKeyAndVersion::new(&entry.package_key, version);
            if !archive.has_package(&identity) {
                return Err(PackportError::ArchiveEntryMissing {
                    name: identity.archive_file_name(),
                });
            }
        }
    }
    Ok(())
}

/// Space requested for `entry`: a mapping override, else the studio record's space,
/// else the manifest entry's own space.
fn target_space(
    archive: &ExtractedArchive,
    entry: &ManifestEntry,
    space_mappings: &HashMap<String, String>,
) -> Option<SpaceDescriptor> {
    if let Some(name) = space_mappings.get(&entry.package_key) {
        return Some(SpaceDescriptor::named(name.clone()));
    }
    archive
        .studio_entry(&entry.package_key)
        .and_then(|studio| studio.space.clone())
        .or_else(|| entry.space.clone())
}

fn runtime_assignments<'e>(archive: &'e ExtractedArchive, entry: &'e ManifestEntry) -> &'e [VariableAssignment] {
    match archive.studio_entry(&entry.package_key) {
        Some(studio) if !studio.runtime_variable_assignments.is_empty() => {
            &studio.runtime_variable_assignments
        }
        _ => entry.runtime_variable_assignments.as_deref().unwrap_or_default(),
    }
}
