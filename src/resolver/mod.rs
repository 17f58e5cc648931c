//! Dependency resolution for package export.
//!
//! Given a set of root packages pinned to concrete versions, the resolver computes the
//! transitive closure of their dependencies across the package catalog. Dependencies
//! are version-aware: the same package key may be required at several versions by
//! different parents, and every one of those versions becomes its own node.
//!
//! # Algorithm
//!
//! The walk is breadth-first and advances one level at a time:
//!
//! 1. The frontier starts with the roots; each root is marked visited as `key@version`.
//! 2. Dependency edges of every node in the frontier are fetched from the backend.
//!    Lookups within one level run concurrently; results are processed in frontier
//!    order so the closure is deterministic.
//! 3. Every edge's version is recorded in the [`VersionRequirementSet`], including
//!    edges to excluded keys (action-flow packages), which are never expanded.
//! 4. Edges to unvisited `key@version` pairs are marked visited immediately, pinned
//!    from the catalog snapshot and form the next level.
//!
//! Because deduplication is keyed on `key@version` and not on discovery order, the
//! resulting closure does not depend on the order in which responses arrive, and no
//! package version is ever fetched twice. Any backend failure aborts the whole walk:
//! a partial closure would produce an inconsistent archive.

mod context;


use std::collections::HashSet;

use anyhow::{Context, Result};
use futures::future::try_join_all;

use crate::api::PlatformApi;
use crate::core::PackportError;
use crate::models::{DependencyEdge, PackageNode, VersionRequirementSet};

use context::ResolutionContext;

/// Outcome of a dependency walk.
#[derive(Debug, Clone, Default)]
pub struct Resolution {
    /// The roots, with their dependency edges attached.
    pub roots: Vec<PackageNode>,
    /// Dependencies discovered by the walk, one node per distinct `key@version`,
    /// each with its own edges attached.
    pub closure: Vec<PackageNode>,
    /// Every version required per key by any edge of the walk.
    pub versions_by_key: VersionRequirementSet,
    /// Number of dependency-edge lookups issued.
    pub fetches: usize,
}

impl Resolution {
    /// Roots followed by the closure.
    pub fn nodes(&self) -> impl Iterator<Item = &PackageNode> {
        self.roots.iter().chain(self.closure.iter())
    }

    pub fn into_nodes(self) -> Vec<PackageNode> {
        let mut nodes = self.roots;
        nodes.extend(self.closure);
        nodes
    }
}

/// Walks the package dependency graph through a [`PlatformApi`].
pub struct DependencyResolver<'a> {
    api: &'a dyn PlatformApi,
}

impl<'a> DependencyResolver<'a> {
    pub fn new(api: &'a dyn PlatformApi) -> Self {
        Self {
            api,
        }
    }

    /// Computes the transitive dependency closure of `roots` against `catalog`.
    ///
    /// Roots must be pinned (`version` set). Keys in `excluded_keys` are recorded in
    /// [`Resolution::versions_by_key`] but never expanded nor added to the closure.
    pub async fn resolve(
        &self,
        roots: Vec<PackageNode>,
        catalog: &[PackageNode],
        excluded_keys: &HashSet<String>,
    ) -> Result<Resolution> {
        self.walk(roots, catalog, excluded_keys, true).await
    }

    /// Attaches the direct dependency edges of `roots` without expanding them.
    pub async fn resolve_direct(
        &self,
        roots: Vec<PackageNode>,
        excluded_keys: &HashSet<String>,
    ) -> Result<Resolution> {
        self.walk(roots, &[], excluded_keys, false).await
    }

    async fn walk(
        &self,
        roots: Vec<PackageNode>,
        catalog: &[PackageNode],
        excluded_keys: &HashSet<String>,
        transitive: bool,
    ) -> Result<Resolution> {
        let mut ctx = ResolutionContext::new(catalog, excluded_keys);
        let mut level = ctx.seed(roots)?;
        let mut depth = 0usize;

        while !level.is_empty() {
            tracing::debug!("Resolving dependency level {} ({} packages)", depth, level.len());

            let edges = try_join_all(level.iter().map(|&idx| self.fetch_edges(&ctx.nodes[idx])))
                .await
                .with_context(|| format!("Failed to resolve dependency level {depth}"))?;
            ctx.fetches += level.len();

            let mut next = Vec::new();
            for (&idx, edges) in level.iter().zip(edges) {
                if transitive {
                    next.extend(ctx.record_edges(idx, edges)?);
                } else {
                    ctx.attach_edges(idx, edges);
                }
            }

            level = next;
            depth += 1;
        }

        let resolution = ctx.into_resolution();
        tracing::info!(
            "Resolved {} root(s) and {} dependency version(s) with {} lookup(s)",
            resolution.roots.len(),
            resolution.closure.len(),
            resolution.fetches
        );
        Ok(resolution)
    }

    async fn fetch_edges(&self, node: &PackageNode) -> Result<Vec<DependencyEdge>> {
        let draft_id = node.draft_id().ok_or_else(|| PackportError::ValidationError {
            reason: format!(
                "Package '{}@{}' has no draft to read dependencies from",
                node.key,
                node.version.as_deref().unwrap_or("?")
            ),
        })?;

        let edges = self.api.find_dependencies(&node.id, draft_id).await.with_context(|| {
            format!(
                "Failed to fetch dependencies of '{}@{}'",
                node.key,
                node.version.as_deref().unwrap_or("?")
            )
        })?;
        Ok(edges)
    }
}
