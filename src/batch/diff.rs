use anyhow::{Context, Result};

use super::ordering::sorted_versions;
use crate::api::PlatformApi;
use crate::archive::ExtractedArchive;
use crate::models::{PackageDiff, PackageKeyAndVersion};

/// Compares every package version of an archive with the target environment.
pub struct PackageDiffService<'a> {
    api: &'a dyn PlatformApi,
}

impl<'a> PackageDiffService<'a> {
    pub fn new(api: &'a dyn PlatformApi) -> Self {
        Self {
            api,
        }
    }

    /// Returns one diff per archived package version, in manifest order.
    ///
    /// With `has_changes_only` the backend returns a summary without the change details
    /// and unchanged versions are left out of the result.
    pub async fn diff(&self, archive: &ExtractedArchive, has_changes_only: bool) -> Result<Vec<PackageDiff>> {
        let mut diffs = Vec::new();
        for entry in &archive.manifest {
            for version in sorted_versions(entry) {
                let identity = PackageKeyAndVersion::new(&entry.package_key, version);
                let payload = archive.load_package(&identity)?;
                let diff = self
                    .api
                    .diff_package(&identity.archive_file_name(), payload, has_changes_only)
                    .await
                    .with_context(|| format!("Failed to diff {identity}"))?;
                diffs.push(diff);
            }
        }

        let total = diffs.len();
        let changed = diffs.iter().filter(|diff| diff.has_changes).count();
        if has_changes_only {
            diffs.retain(|diff| diff.has_changes);
        }

        tracing::info!(
            "{} of {} package version(s) differ from the target",
            changed,
            total
        );
        Ok(diffs)
    }
}
