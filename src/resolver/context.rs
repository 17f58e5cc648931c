//! Mutable state of one dependency resolution run.

use std::collections::{HashMap, HashSet};

use crate::core::PackportError;
use crate::models::{DependencyEdge, PackageKeyAndVersion, PackageNode, VersionRequirementSet};

use super::Resolution;

/// Resolution state passed explicitly through the walk.
///
/// Nodes live in a single arena: the first `root_count` entries are the roots, every
/// later entry is a dependency discovered by the walk. Levels of the breadth-first
/// walk are lists of arena indices.
pub(crate) struct ResolutionContext<'c> {
    catalog: HashMap<&'c str, &'c PackageNode>,
    excluded_keys: &'c HashSet<String>,
    visited: HashSet<PackageKeyAndVersion>,
    versions_by_key: VersionRequirementSet,
    pub(crate) nodes: Vec<PackageNode>,
    root_count: usize,
    pub(crate) fetches: usize,
}

impl<'c> ResolutionContext<'c> {
    pub(crate) fn new(catalog: &'c [PackageNode], excluded_keys: &'c HashSet<String>) -> Self {
        Self {
            catalog: catalog.iter().map(|node| (node.key.as_str(), node)).collect(),
            excluded_keys,
            visited: HashSet::new(),
            versions_by_key: VersionRequirementSet::new(),
            nodes: Vec::new(),
            root_count: 0,
            fetches: 0,
        }
    }

    /// Adds the pinned roots and returns the first level. Duplicate roots are dropped.
    pub(crate) fn seed(&mut self, roots: Vec<PackageNode>) -> Result<Vec<usize>, PackportError> {
        for root in roots {
            let Some(identity) = root.key_and_version() else {
                return Err(PackportError::NoActiveVersion {
                    key: root.key,
                });
            };
            if self.visited.insert(identity) {
                self.nodes.push(root);
            } else {
                tracing::debug!("Ignoring duplicate root '{}'", root.key);
            }
        }
        self.root_count = self.nodes.len();
        Ok((0..self.root_count).collect())
    }

    /// Attaches the fetched edges to `parent` and returns the arena indices of every
    /// `(key, version)` seen for the first time.
    ///
    /// Targets are marked visited here, before the next level is fetched, so siblings
    /// in the same level never enqueue the same package version twice.
    pub(crate) fn record_edges(
        &mut self,
        parent: usize,
        edges: Vec<DependencyEdge>,
    ) -> Result<Vec<usize>, PackportError> {
        let mut discovered = Vec::new();

        for edge in &edges {
            self.versions_by_key.record(&edge.key, &edge.version);

            if self.excluded_keys.contains(&edge.key) {
                tracing::debug!(
                    "Not expanding excluded dependency {}@{} of '{}'",
                    edge.key,
                    edge.version,
                    self.nodes[parent].key
                );
                continue;
            }

            if !self.visited.insert(edge.target()) {
                continue;
            }

            let base = self.catalog.get(edge.key.as_str()).ok_or_else(|| {
                PackportError::DependencyNotInCatalog {
                    parent: self.nodes[parent].key.clone(),
                    key: edge.key.clone(),
                    version: edge.version.clone(),
                }
            })?;

            self.nodes.push(base.pinned(&edge.version, edge.root_node_id.clone()));
            discovered.push(self.nodes.len() - 1);
        }

        self.nodes[parent].dependencies = edges;
        Ok(discovered)
    }

    /// Attaches edges to `parent` and records their versions without discovering
    /// new nodes.
    pub(crate) fn attach_edges(&mut self, parent: usize, edges: Vec<DependencyEdge>) {
        for edge in &edges {
            self.versions_by_key.record(&edge.key, &edge.version);
        }
        self.nodes[parent].dependencies = edges;
    }

    pub(crate) fn into_resolution(mut self) -> Resolution {
        let closure = self.nodes.split_off(self.root_count);
        Resolution {
            roots: self.nodes,
            closure,
            versions_by_key: self.versions_by_key,
            fetches: self.fetches,
        }
    }
}
