//! Test utilities for packport
//!
//! This module provides helpers shared by unit and integration tests:
//!
//! - [`init_test_logging`] - one-time tracing setup for tests
//! - [`MockPlatform`] - an in-memory [`PlatformApi`] with call recording
//! - [`fixtures`] - builders for catalog nodes, edges and package zips
//!
//! # Example
//!
//! ```rust,no_run
//! use packport::test_utils::{MockPlatform, fixtures};
//!
//! let mock = MockPlatform::new()
//!     .with_package(fixtures::package("key-1", "node-1"))
//!     .with_active_version("key-1", "1.0.0");
//! ```

pub mod fixtures;

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, Once};

use async_trait::async_trait;
use tracing::Level;
use tracing_subscriber::EnvFilter;

use crate::api::{ApiResult, PlatformApi};
use crate::core::PackportError;
use crate::models::{
    DataModelRef, DependencyEdge, PackageDiff, PackageImportResult, PackageKeyAndVersion,
    PackageNode, SpaceDescriptor, VariableAssignment, VariableManifestEntry,
};

/// Global flag to ensure logging is only initialized once in tests
static INIT_LOGGING: Once = Once::new();

/// Initialize logging for tests.
///
/// Uses `level` when given, otherwise `RUST_LOG`; without either, tests run silent.
///
/// ```bash
/// RUST_LOG=debug cargo test
/// ```
pub fn init_test_logging(level: Option<Level>) {
    INIT_LOGGING.call_once(|| {
        let filter = if let Some(level) = level {
            EnvFilter::new(level.to_string())
        } else if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            return;
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .with_thread_ids(false)
            .try_init();
    });
}

/// One backend call observed by [`MockPlatform`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockCall {
    ListPackages,
    FindActiveVersion(String),
    FindDependencies {
        node_id: String,
        draft_id: String,
    },
    ExportPackage(PackageKeyAndVersion),
    FindVariables(usize),
    FindRuntimeVariables(String),
    AssignRuntimeVariables(String),
    ListDataModels,
    ListSpaces,
    CreateSpace(String),
    MovePackage {
        node_id: String,
        space_id: String,
    },
    ImportPackage(String),
    DiffPackage(String),
}

/// A package submitted to the import endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedImport {
    pub file_name: String,
    pub payload: Vec<u8>,
    pub space_id: Option<String>,
    pub overwrite: bool,
}

#[derive(Default)]
struct MockState {
    packages: Vec<PackageNode>,
    active_versions: HashMap<String, String>,
    dependencies: HashMap<(String, String), Vec<DependencyEdge>>,
    exports: HashMap<PackageKeyAndVersion, Vec<u8>>,
    variables: Vec<VariableManifestEntry>,
    runtime_variables: HashMap<String, Vec<VariableAssignment>>,
    data_models: Vec<DataModelRef>,
    spaces: Vec<SpaceDescriptor>,
    import_versions: HashMap<String, String>,
    diffs: HashMap<String, bool>,
    failures: HashMap<&'static str, u16>,

    calls: Vec<MockCall>,
    variable_requests: Vec<Vec<PackageKeyAndVersion>>,
    imports: Vec<RecordedImport>,
    moves: Vec<(String, String)>,
    assignments: Vec<(String, Vec<VariableAssignment>)>,
    created_spaces: Vec<String>,
}

/// In-memory backend for tests.
///
/// Configure it with the `with_*` builders, run the code under test against
/// `&mock`, then inspect what was called. Unconfigured lookups return empty results;
/// unconfigured exports return a minimal package zip for the requested version.
/// `with_failure` makes one operation (named after the trait method) fail with the
/// given status code.
#[derive(Default)]
pub struct MockPlatform {
    state: Mutex<MockState>,
}

impl MockPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn update(self, f: impl FnOnce(&mut MockState)) -> Self {
        f(&mut self.state());
        self
    }

    pub fn with_package(self, node: PackageNode) -> Self {
        self.update(|s| s.packages.push(node))
    }

    pub fn with_active_version(self, key: &str, version: &str) -> Self {
        self.update(|s| {
            s.active_versions.insert(key.to_string(), version.to_string());
        })
    }

    pub fn with_dependencies(self, node_id: &str, draft_id: &str, edges: Vec<DependencyEdge>) -> Self {
        self.update(|s| {
            s.dependencies.insert((node_id.to_string(), draft_id.to_string()), edges);
        })
    }

    pub fn with_export(self, key: &str, version: &str, zip: Vec<u8>) -> Self {
        self.update(|s| {
            s.exports.insert(PackageKeyAndVersion::new(key, version), zip);
        })
    }

    pub fn with_variables(self, entry: VariableManifestEntry) -> Self {
        self.update(|s| s.variables.push(entry))
    }

    pub fn with_runtime_variables(self, key: &str, assignments: Vec<VariableAssignment>) -> Self {
        self.update(|s| {
            s.runtime_variables.insert(key.to_string(), assignments);
        })
    }

    pub fn with_data_model(self, model: DataModelRef) -> Self {
        self.update(|s| s.data_models.push(model))
    }

    pub fn with_space(self, id: &str, name: &str) -> Self {
        self.update(|s| {
            s.spaces.push(SpaceDescriptor {
                id: Some(id.to_string()),
                name: name.to_string(),
                icon_reference: None,
            });
        })
    }

    /// Version the import endpoint reports for `key`. Defaults to the archived version.
    pub fn with_import_version(self, key: &str, version: &str) -> Self {
        self.update(|s| {
            s.import_versions.insert(key.to_string(), version.to_string());
        })
    }

    pub fn with_diff(self, key: &str, has_changes: bool) -> Self {
        self.update(|s| {
            s.diffs.insert(key.to_string(), has_changes);
        })
    }

    pub fn with_failure(self, operation: &'static str, status: u16) -> Self {
        self.update(|s| {
            s.failures.insert(operation, status);
        })
    }

    pub fn calls(&self) -> Vec<MockCall> {
        self.state().calls.clone()
    }

    /// Number of recorded calls matching `predicate`.
    pub fn count_calls(&self, predicate: impl Fn(&MockCall) -> bool) -> usize {
        self.state().calls.iter().filter(|call| predicate(call)).count()
    }

    pub fn variable_requests(&self) -> Vec<Vec<PackageKeyAndVersion>> {
        self.state().variable_requests.clone()
    }

    pub fn imports(&self) -> Vec<RecordedImport> {
        self.state().imports.clone()
    }

    pub fn moves(&self) -> Vec<(String, String)> {
        self.state().moves.clone()
    }

    pub fn assignments(&self) -> Vec<(String, Vec<VariableAssignment>)> {
        self.state().assignments.clone()
    }

    pub fn created_spaces(&self) -> Vec<String> {
        self.state().created_spaces.clone()
    }

    fn record(&self, operation: &'static str, call: MockCall) -> ApiResult<MutexGuard<'_, MockState>> {
        let mut state = self.state();
        state.calls.push(call);
        match state.failures.get(operation) {
            Some(&status) => Err(PackportError::transport(operation, status, None)),
            None => Ok(state),
        }
    }
}

/// Splits `{key}_{version}.zip` at the last underscore.
fn split_file_name(file_name: &str) -> (String, String) {
    let stem = file_name.strip_suffix(".zip").unwrap_or(file_name);
    match stem.rsplit_once('_') {
        Some((key, version)) => (key.to_string(), version.to_string()),
        None => (stem.to_string(), String::new()),
    }
}

#[async_trait]
impl PlatformApi for MockPlatform {
    async fn list_packages(&self) -> ApiResult<Vec<PackageNode>> {
        let state = self.record("list_packages", MockCall::ListPackages)?;
        Ok(state.packages.clone())
    }

    async fn find_active_version(&self, package_key: &str) -> ApiResult<Option<String>> {
        let state = self.record(
            "find_active_version",
            MockCall::FindActiveVersion(package_key.to_string()),
        )?;
        Ok(state.active_versions.get(package_key).cloned())
    }

    async fn find_dependencies(
        &self,
        node_id: &str,
        draft_id: &str,
    ) -> ApiResult<Vec<DependencyEdge>> {
        let state = self.record(
            "find_dependencies",
            MockCall::FindDependencies {
                node_id: node_id.to_string(),
                draft_id: draft_id.to_string(),
            },
        )?;
        Ok(state
            .dependencies
            .get(&(node_id.to_string(), draft_id.to_string()))
            .cloned()
            .unwrap_or_default())
    }

    async fn export_package(&self, package_key: &str, version: &str) -> ApiResult<Vec<u8>> {
        let identity = PackageKeyAndVersion::new(package_key, version);
        let state = self.record("export_package", MockCall::ExportPackage(identity.clone()))?;
        Ok(state
            .exports
            .get(&identity)
            .cloned()
            .unwrap_or_else(|| fixtures::package_zip(package_key, version, &[])))
    }

    async fn find_variables(
        &self,
        pairs: &[PackageKeyAndVersion],
    ) -> ApiResult<Vec<VariableManifestEntry>> {
        let mut state = self.record("find_variables", MockCall::FindVariables(pairs.len()))?;
        state.variable_requests.push(pairs.to_vec());
        Ok(state
            .variables
            .iter()
            .filter(|entry| {
                pairs.iter().any(|pair| {
                    pair.package_key == entry.package_key && pair.version == entry.version
                })
            })
            .cloned()
            .collect())
    }

    async fn find_runtime_variables(
        &self,
        package_key: &str,
    ) -> ApiResult<Vec<VariableAssignment>> {
        let state = self.record(
            "find_runtime_variables",
            MockCall::FindRuntimeVariables(package_key.to_string()),
        )?;
        Ok(state.runtime_variables.get(package_key).cloned().unwrap_or_default())
    }

    async fn assign_runtime_variables(
        &self,
        package_key: &str,
        assignments: &[VariableAssignment],
    ) -> ApiResult<()> {
        let mut state = self.record(
            "assign_runtime_variables",
            MockCall::AssignRuntimeVariables(package_key.to_string()),
        )?;
        state.assignments.push((package_key.to_string(), assignments.to_vec()));
        Ok(())
    }

    async fn list_data_models(&self) -> ApiResult<Vec<DataModelRef>> {
        let state = self.record("list_data_models", MockCall::ListDataModels)?;
        Ok(state.data_models.clone())
    }

    async fn list_spaces(&self) -> ApiResult<Vec<SpaceDescriptor>> {
        let state = self.record("list_spaces", MockCall::ListSpaces)?;
        Ok(state.spaces.clone())
    }

    async fn create_space(&self, name: &str, icon_reference: &str) -> ApiResult<SpaceDescriptor> {
        let mut state = self.record("create_space", MockCall::CreateSpace(name.to_string()))?;
        let space = SpaceDescriptor {
            id: Some(format!("space-{}", state.spaces.len() + 1)),
            name: name.to_string(),
            icon_reference: Some(icon_reference.to_string()),
        };
        state.spaces.push(space.clone());
        state.created_spaces.push(name.to_string());
        Ok(space)
    }

    async fn move_package(&self, node_id: &str, space_id: &str) -> ApiResult<()> {
        let mut state = self.record(
            "move_package",
            MockCall::MovePackage {
                node_id: node_id.to_string(),
                space_id: space_id.to_string(),
            },
        )?;
        state.moves.push((node_id.to_string(), space_id.to_string()));
        Ok(())
    }

    async fn import_package(
        &self,
        file_name: &str,
        payload: Vec<u8>,
        space_id: Option<&str>,
        overwrite: bool,
    ) -> ApiResult<PackageImportResult> {
        let mut state =
            self.record("import_package", MockCall::ImportPackage(file_name.to_string()))?;
        state.imports.push(RecordedImport {
            file_name: file_name.to_string(),
            payload,
            space_id: space_id.map(str::to_string),
            overwrite,
        });

        let (package_key, version) = split_file_name(file_name);
        let version = state.import_versions.get(&package_key).cloned().unwrap_or(version);
        Ok(PackageImportResult {
            package_key,
            version,
        })
    }

    async fn diff_package(
        &self,
        file_name: &str,
        _payload: Vec<u8>,
        _has_changes_only: bool,
    ) -> ApiResult<PackageDiff> {
        let state = self.record("diff_package", MockCall::DiffPackage(file_name.to_string()))?;
        let (package_key, _) = split_file_name(file_name);
        let has_changes = state.diffs.get(&package_key).copied().unwrap_or(false);
        Ok(PackageDiff {
            package_key,
            has_changes,
            changes: None,
        })
    }
}
