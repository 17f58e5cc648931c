//! Shared data models for package export and import.
//!
//! Everything here travels over the wire or into an archive, so all types serialize
//! with camelCase field names to stay compatible with the backend and with archives
//! written by earlier releases.
//!
//! - [`PackageNode`] - a package as listed by the backend, optionally pinned to a version
//! - [`DependencyEdge`] - a requirement on another package at a specific version
//! - [`VersionRequirementSet`] - every version required per package key
//! - [`ManifestEntry`] / [`StudioManifestEntry`] - archive index records
//! - [`SpaceDescriptor`] - the grouping a package lives in
//! - [`VersionMappingReport`] - result of an import

mod variables;

pub use variables::{
    DataModelRef, VariableAssignment, VariableManifestEntry, VariableType,
};

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::constants::{ACTION_FLOW_FLAVOR, STUDIO_FLAVOR};

/// Identity of one package version: the unit of deduplication during resolution and
/// the unit of archiving.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageKeyAndVersion {
    /// Package key
    pub package_key: String,
    /// Version string, e.g. `1.2.0`
    pub version: String,
}

impl PackageKeyAndVersion {
    pub fn new(package_key: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            package_key: package_key.into(),
            version: version.into(),
        }
    }

    /// File name of the nested archive holding this package version.
    #[must_use]
    pub fn archive_file_name(&self) -> String {
        format!("{}_{}.zip", self.package_key, self.version)
    }
}

impl fmt::Display for PackageKeyAndVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.package_key, self.version)
    }
}

/// A package as returned by the backend package listing.
///
/// `version` and `root_node_id` are empty in the listing and filled in when the node
/// is pinned to a concrete version (a root pinned to its active version, or a
/// dependency stamped from the edge that required it).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageNode {
    pub id: String,
    pub key: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flavor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub working_draft_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activated_draft_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub space_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Draft id the pinned version corresponds to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root_node_id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<DependencyEdge>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub variables: Vec<VariableAssignment>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub data_models: Vec<DataModelRef>,
}

impl PackageNode {
    /// Whether this package is backed by action flows and migrated elsewhere.
    #[must_use]
    pub fn is_action_flow(&self) -> bool {
        self.flavor.as_deref() == Some(ACTION_FLOW_FLAVOR)
    }

    #[must_use]
    pub fn is_studio(&self) -> bool {
        self.flavor.as_deref() == Some(STUDIO_FLAVOR)
    }

    /// Returns a snapshot of this node pinned to `version` at draft `root_node_id`.
    ///
    /// Per-run data (edges, variables, data models) is never carried over: two
    /// versions of the same key are independent nodes.
    #[must_use]
    pub fn pinned(&self, version: impl Into<String>, root_node_id: Option<String>) -> Self {
        Self {
            version: Some(version.into()),
            root_node_id,
            dependencies: Vec::new(),
            variables: Vec::new(),
            data_models: Vec::new(),
            ..self.clone()
        }
    }

    /// Draft whose dependency edges describe this node's pinned version.
    #[must_use]
    pub fn draft_id(&self) -> Option<&str> {
        self.root_node_id.as_deref().or(self.activated_draft_id.as_deref())
    }

    /// `key@version` identity, available once the node is pinned.
    #[must_use]
    pub fn key_and_version(&self) -> Option<PackageKeyAndVersion> {
        self.version.as_ref().map(|v| PackageKeyAndVersion::new(&self.key, v))
    }
}

/// Directed edge from a resolved node to a required package at a specific version.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DependencyEdge {
    pub key: String,
    pub version: String,
    /// Draft id the required version corresponds to. Different versions of the same
    /// key usually have different draft ids.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root_node_id: Option<String>,
}

impl DependencyEdge {
    #[must_use]
    pub fn target(&self) -> PackageKeyAndVersion {
        PackageKeyAndVersion::new(&self.key, &self.version)
    }
}

/// Package key → every distinct version required anywhere in a dependency walk.
///
/// Ordered collections keep manifests byte-stable across runs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VersionRequirementSet(BTreeMap<String, BTreeSet<String>>);

impl VersionRequirementSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that `version` of `key` is required. Returns `true` if it was new.
    pub fn record(&mut self, key: &str, version: &str) -> bool {
        self.0.entry(key.to_string()).or_default().insert(version.to_string())
    }

    #[must_use]
    pub fn versions(&self, key: &str) -> Option<&BTreeSet<String>> {
        self.0.get(key)
    }

    #[must_use]
    pub fn contains(&self, key: &str, version: &str) -> bool {
        self.0.get(key).is_some_and(|versions| versions.contains(version))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &BTreeSet<String>)> {
        self.0.iter()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// A space (named grouping) in an environment.
///
/// In a manifest the id may be absent: the importer then resolves the space by
/// name, creating it when needed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpaceDescriptor {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon_reference: Option<String>,
}

impl SpaceDescriptor {
    /// A descriptor that only names a space.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            icon_reference: None,
        }
    }
}

/// Archive index record: one per distinct package key, covering every exported
/// version of that key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestEntry {
    pub package_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flavor: Option<String>,
    /// Exported version → edges declared by that version.
    #[serde(default)]
    pub dependencies_by_version: BTreeMap<String, Vec<DependencyEdge>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub space: Option<SpaceDescriptor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runtime_variable_assignments: Option<Vec<VariableAssignment>>,
}

impl ManifestEntry {
    /// Versions of this key bundled in the archive.
    pub fn versions(&self) -> impl Iterator<Item = &String> {
        self.dependencies_by_version.keys()
    }
}

/// Per-studio-package record of the optional `studio` archive entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudioManifestEntry {
    pub package_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub space: Option<SpaceDescriptor>,
    #[serde(default)]
    pub runtime_variable_assignments: Vec<VariableAssignment>,
}

/// Old → new version of one imported package version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionMapping {
    pub package_key: String,
    pub old_version: String,
    pub new_version: String,
}

/// Result of an import: one mapping per imported package version, in import order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VersionMappingReport {
    pub mappings: Vec<VersionMapping>,
}

/// Response of the backend import endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageImportResult {
    pub package_key: String,
    /// Version assigned by the target environment.
    pub version: String,
}

/// Response of the backend diff endpoint for one package.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageDiff {
    pub package_key: String,
    pub has_changes: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub changes: Option<serde_json::Value>,
}
