//! Import ordering over manifest entries.

use std::cmp::Ordering;
use std::collections::HashMap;

use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};

use crate::models::ManifestEntry;

/// Returns `manifest` ordered so that every package key comes after the keys its
/// versions depend on.
///
/// Edges are added from dependent to dependency; the topological order is reversed so
/// dependencies come first. Edges to keys outside the manifest are ignored. When the
/// graph has a cycle the manifest order is kept.
pub fn import_order(manifest: &[ManifestEntry]) -> Vec<&ManifestEntry> {
    let mut graph: DiGraph<usize, ()> = DiGraph::new();
    let mut index_by_key: HashMap<&str, NodeIndex> = HashMap::new();

    // Reverse insertion keeps independent entries in manifest order after the
    // final reversal.
    for (position, entry) in manifest.iter().enumerate().rev() {
        let index = graph.add_node(position);
        index_by_key.entry(entry.package_key.as_str()).or_insert(index);
    }

    for entry in manifest.iter().rev() {
        let from = index_by_key[entry.package_key.as_str()];
        for edge in entry.dependencies_by_version.values().flatten() {
            if edge.key == entry.package_key {
                continue;
            }
            let Some(&to) = index_by_key.get(edge.key.as_str()) else {
                continue;
            };
            if !graph.contains_edge(from, to) {
                graph.add_edge(from, to, ());
            }
        }
    }

    match toposort(&graph, None) {
        Ok(indices) => indices.into_iter().rev().map(|idx| &manifest[graph[idx]]).collect(),
        Err(cycle) => {
            tracing::warn!(
                "Dependency cycle involving '{}'; importing in manifest order",
                manifest[graph[cycle.node_id()]].package_key
            );
            manifest.iter().collect()
        }
    }
}

/// Orders version strings by semantic version, falling back to string order for
/// versions that do not parse.
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    match (semver::Version::parse(a), semver::Version::parse(b)) {
        (Ok(a), Ok(b)) => a.cmp(&b),
        (Ok(_), Err(_)) => Ordering::Less,
        (Err(_), Ok(_)) => Ordering::Greater,
        (Err(_), Err(_)) => a.cmp(b),
    }
}

/// Versions of `entry`, oldest first.
pub fn sorted_versions(entry: &ManifestEntry) -> Vec<&str> {
    let mut versions: Vec<&str> = entry.versions().map(String::as_str).collect();
    versions.sort_by(|a, b| compare_versions(a, b));
    versions
}
