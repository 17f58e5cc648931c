use std::collections::{BTreeSet, HashMap, HashSet};

use anyhow::{Context, Result};
use futures::future::try_join_all;
use strsim::levenshtein;

use crate::api::PlatformApi;
use crate::archive::{ArchiveCodec, ArchiveContents, PackageArchive, PackagePayload};
use crate::core::PackportError;
use crate::models::{
    ManifestEntry, PackageKeyAndVersion, PackageNode, SpaceDescriptor, StudioManifestEntry,
    VariableManifestEntry, VariableType, VersionRequirementSet,
};
use crate::resolver::DependencyResolver;
use crate::variables::{
    VariableReconciler, data_model_refs, fix_connection_metadata, resolve_data_model_names,
};

/// Maximum edit distance for "did you mean" suggestions on unknown keys.
const SUGGESTION_DISTANCE: usize = 3;

/// Export settings.
#[derive(Debug, Clone, Copy)]
pub struct ExportOptions {
    /// Export the transitive dependency closure of the requested packages.
    pub include_dependencies: bool,
    /// Drop manifest edges that point at excluded (action-flow) packages, which are
    /// never part of the archive.
    pub prune_excluded_edges: bool,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            include_dependencies: false,
            prune_excluded_edges: true,
        }
    }
}

/// Builds an export archive for a set of package keys.
pub struct PackageExportService<'a> {
    api: &'a dyn PlatformApi,
}

impl<'a> PackageExportService<'a> {
    pub fn new(api: &'a dyn PlatformApi) -> Self {
        Self {
            api,
        }
    }

    /// Exports `package_keys` and returns the archive bytes.
    ///
    /// Everything is collected before the archive is assembled, so any failure leaves
    /// nothing behind.
    pub async fn export(&self, package_keys: &[String], options: ExportOptions) -> Result<Vec<u8>> {
        let catalog = self.api.list_packages().await.context("Failed to list packages")?;
        let requested = validate_keys(package_keys, &catalog)?;

        let excluded_keys: HashSet<String> =
            catalog.iter().filter(|node| node.is_action_flow()).map(|node| node.key.clone()).collect();

        let roots: Vec<&PackageNode> = requested
            .into_iter()
            .filter(|node| {
                if node.is_action_flow() {
                    tracing::info!("Skipping action-flow package '{}'", node.key);
                }
                !node.is_action_flow()
            })
            .collect();
        if roots.is_empty() {
            tracing::warn!("No exportable packages remain after filtering action-flow packages");
        }

        let roots = self.pin_to_active_versions(&roots).await?;

        let resolver = DependencyResolver::new(self.api);
        let resolution = if options.include_dependencies {
            resolver.resolve(roots, &catalog, &excluded_keys).await?
        } else {
            resolver.resolve_direct(roots, &excluded_keys).await?
        };
        let versions_by_key = resolution.versions_by_key.clone();
        let mut nodes = resolution.into_nodes();

        let variables = self.collect_variables(&mut nodes).await?;
        let spaces = self.api.list_spaces().await.context("Failed to list spaces")?;

        let mut manifest = build_manifest(&nodes, &spaces, &excluded_keys, options.prune_excluded_edges);
        if options.include_dependencies {
            merge_required_versions(&mut manifest, &versions_by_key);
        }

        let packages = self.download_packages(&nodes).await?;
        let studio = self.build_studio_manifest(&nodes, &spaces).await?;

        let contents = ArchiveContents {
            manifest,
            studio: (!studio.is_empty()).then_some(studio),
            variables: (!variables.is_empty()).then_some(variables),
            packages,
        };
        let archive = ArchiveCodec::write(&contents).context("Failed to write export archive")?;

        tracing::info!(
            "Exported {} package version(s) of {} package(s)",
            contents.packages.len(),
            contents.manifest.len()
        );
        Ok(archive)
    }

    async fn pin_to_active_versions(&self, roots: &[&PackageNode]) -> Result<Vec<PackageNode>> {
        let versions = try_join_all(roots.iter().map(|node| self.api.find_active_version(&node.key)))
            .await
            .context("Failed to look up active package versions")?;

        roots
            .iter()
            .zip(versions)
            .map(|(node, version)| match version {
                Some(version) => Ok(node.pinned(version, None)),
                None => Err(PackportError::NoActiveVersion {
                    key: node.key.clone(),
                }
                .into()),
            })
            .collect()
    }

    /// Fetches and reconciles variables for every node, attaching them to the nodes.
    async fn collect_variables(&self, nodes: &mut [PackageNode]) -> Result<Vec<VariableManifestEntry>> {
        let reconciler = VariableReconciler::new(self.api);
        let pairs: Vec<PackageKeyAndVersion> = nodes.iter().filter_map(PackageNode::key_and_version).collect();

        let mut entries = fix_connection_metadata(reconciler.fetch_for_versions(&pairs).await?);

        let references_data_models = entries
            .iter()
            .flat_map(|entry| &entry.variables)
            .any(|assignment| assignment.variable_type == VariableType::DataModel);
        if references_data_models {
            let catalog = reconciler.data_model_catalog().await?;
            resolve_data_model_names(&mut entries, &catalog);
        }

        let by_identity: HashMap<PackageKeyAndVersion, &VariableManifestEntry> = entries
            .iter()
            .map(|entry| (PackageKeyAndVersion::new(&entry.package_key, &entry.version), entry))
            .collect();
        for node in nodes.iter_mut() {
            let Some(entry) = node.key_and_version().and_then(|kv| by_identity.get(&kv).copied()) else {
                continue;
            };
            node.variables = entry.variables.clone();
            node.data_models = data_model_refs(entry);
        }

        Ok(entries)
    }

    async fn download_packages(&self, nodes: &[PackageNode]) -> Result<Vec<PackageArchive>> {
        let mut packages = Vec::with_capacity(nodes.len());
        for node in nodes {
            let Some(identity) = node.key_and_version() else {
                continue;
            };
            tracing::debug!("Downloading {}", identity);

            let bytes = self
                .api
                .export_package(&identity.package_key, &identity.version)
                .await
                .with_context(|| format!("Failed to export package {identity}"))?;
            let payload = PackagePayload::from_zip(&bytes)
                .with_context(|| format!("Invalid package payload for {identity}"))?
                .without_action_flows();

            packages.push(PackageArchive {
                identity,
                payload,
            });
        }
        Ok(packages)
    }

    async fn build_studio_manifest(
        &self,
        nodes: &[PackageNode],
        spaces: &[SpaceDescriptor],
    ) -> Result<Vec<StudioManifestEntry>> {
        let mut seen = HashSet::new();
        let mut studio = Vec::new();

        for node in nodes.iter().filter(|node| node.is_studio()) {
            if !seen.insert(node.key.as_str()) {
                continue;
            }
            let runtime_variable_assignments = self
                .api
                .find_runtime_variables(&node.key)
                .await
                .with_context(|| format!("Failed to fetch runtime variables of '{}'", node.key))?;

            studio.push(StudioManifestEntry {
                package_key: node.key.clone(),
                space: space_of(node, spaces),
                runtime_variable_assignments,
            });
        }
        Ok(studio)
    }
}

/// Returns the catalog nodes of the requested keys, without duplicates, in request order.
fn validate_keys<'c>(package_keys: &[String], catalog: &'c [PackageNode]) -> Result<Vec<&'c PackageNode>> {
    let by_key: HashMap<&str, &PackageNode> = catalog.iter().map(|node| (node.key.as_str(), node)).collect();
    let mut seen = HashSet::new();
    let mut requested = Vec::new();

    for key in package_keys {
        if !seen.insert(key.as_str()) {
            continue;
        }
        match by_key.get(key.as_str()) {
            Some(node) => requested.push(*node),
            None => {
                let error = anyhow::Error::new(PackportError::PackageNotFound {
                    key: key.clone(),
                });
                return Err(match closest_key(key, catalog) {
                    Some(candidate) => error.context(format!("Unknown package key '{key}'. Did you mean '{candidate}'?")),
                    None => error,
                });
            }
        }
    }
    Ok(requested)
}

fn closest_key<'c>(key: &str, catalog: &'c [PackageNode]) -> Option<&'c str> {
    catalog
        .iter()
        .map(|node| (node.key.as_str(), levenshtein(key, &node.key)))
        .filter(|(_, distance)| *distance <= SUGGESTION_DISTANCE)
        .min_by_key(|(_, distance)| *distance)
        .map(|(candidate, _)| candidate)
}

/// The space a package lives in, by name only. Space ids are local to one
/// deployment, so the importer matches or creates the space by name.
fn space_of(node: &PackageNode, spaces: &[SpaceDescriptor]) -> Option<SpaceDescriptor> {
    let id = node.space_id.as_deref()?;
    let Some(space) = spaces.iter().find(|space| space.id.as_deref() == Some(id)) else {
        tracing::warn!("Space '{}' of package '{}' is not listed; exporting it without a space", id, node.key);
        return None;
    };
    Some(SpaceDescriptor {
        id: None,
        name: space.name.clone(),
        icon_reference: space.icon_reference.clone(),
    })
}

/// One entry per package key, in first-seen order, with one `dependenciesByVersion`
/// slot per exported version.
fn build_manifest(
    nodes: &[PackageNode],
    spaces: &[SpaceDescriptor],
    excluded_keys: &HashSet<String>,
    prune_excluded_edges: bool,
) -> Vec<ManifestEntry> {
    let mut manifest: Vec<ManifestEntry> = Vec::new();
    let mut position: HashMap<&str, usize> = HashMap::new();

    for node in nodes {
        let Some(version) = node.version.clone() else {
            continue;
        };
        let index = *position.entry(node.key.as_str()).or_insert_with(|| {
            manifest.push(ManifestEntry {
                package_key: node.key.clone(),
                flavor: node.flavor.clone(),
                space: space_of(node, spaces),
                ..Default::default()
            });
            manifest.len() - 1
        });

        let edges = node
            .dependencies
            .iter()
            .filter(|edge| !(prune_excluded_edges && excluded_keys.contains(&edge.key)))
            .cloned()
            .collect();
        manifest[index].dependencies_by_version.insert(version, edges);
    }

    manifest
}

/// Makes sure every version required of an exported key has a manifest slot.
fn merge_required_versions(manifest: &mut [ManifestEntry], versions_by_key: &VersionRequirementSet) {
    for entry in manifest.iter_mut() {
        let Some(versions) = versions_by_key.versions(&entry.package_key) else {
            continue;
        };
        let before: BTreeSet<String> = entry.versions().cloned().collect();
        for version in versions {
            entry.dependencies_by_version.entry(version.clone()).or_default();
        }
        if entry.dependencies_by_version.len() != before.len() {
            tracing::warn!(
                "Manifest entry '{}' gained versions without resolved nodes",
                entry.package_key
            );
        }
    }
}
