//! Backend collaborator for package export and import.
//!
//! [`PlatformApi`] is the seam between the orchestration services and the platform's
//! package-manager REST API. Services only ever talk to `&dyn PlatformApi`, which lets
//! tests substitute the in-memory `MockPlatform` from [`crate::test_utils`] for the
//! [`HttpPlatformClient`] used by the CLI.
//!
//! Every method fails with a [`PackportError`]: non-2xx responses become
//! [`PackportError::TransportError`] carrying the upstream message (or `status code N`),
//! connection failures become [`PackportError::NetworkError`]. Nothing here retries.

mod client;

pub use client::HttpPlatformClient;

use async_trait::async_trait;

use crate::core::PackportError;
use crate::models::{
    DataModelRef, DependencyEdge, PackageDiff, PackageImportResult, PackageKeyAndVersion,
    PackageNode, SpaceDescriptor, VariableAssignment, VariableManifestEntry,
};

/// Result type of backend calls.
pub type ApiResult<T> = Result<T, PackportError>;

/// Package-manager operations the export/import pipeline consumes.
#[async_trait]
pub trait PlatformApi: Send + Sync {
    /// Lists every package of the environment (the catalog).
    async fn list_packages(&self) -> ApiResult<Vec<PackageNode>>;

    /// Returns the currently activated version of a package, if any.
    async fn find_active_version(&self, package_key: &str) -> ApiResult<Option<String>>;

    /// Returns the dependency edges declared by draft `draft_id` of node `node_id`.
    async fn find_dependencies(
        &self,
        node_id: &str,
        draft_id: &str,
    ) -> ApiResult<Vec<DependencyEdge>>;

    /// Downloads the export zip of one package version.
    async fn export_package(&self, package_key: &str, version: &str) -> ApiResult<Vec<u8>>;

    /// Batched variable lookup for a set of package versions.
    async fn find_variables(
        &self,
        pairs: &[PackageKeyAndVersion],
    ) -> ApiResult<Vec<VariableManifestEntry>>;

    /// Runtime variable values currently assigned to a package.
    async fn find_runtime_variables(&self, package_key: &str)
    -> ApiResult<Vec<VariableAssignment>>;

    /// Assigns runtime variable values to a package.
    async fn assign_runtime_variables(
        &self,
        package_key: &str,
        assignments: &[VariableAssignment],
    ) -> ApiResult<()>;

    /// Lists data models with their pool names.
    async fn list_data_models(&self) -> ApiResult<Vec<DataModelRef>>;

    async fn list_spaces(&self) -> ApiResult<Vec<SpaceDescriptor>>;

    async fn create_space(&self, name: &str, icon_reference: &str) -> ApiResult<SpaceDescriptor>;

    /// Moves an existing package node into another space.
    async fn move_package(&self, node_id: &str, space_id: &str) -> ApiResult<()>;

    /// Imports one nested package archive.
    async fn import_package(
        &self,
        file_name: &str,
        payload: Vec<u8>,
        space_id: Option<&str>,
        overwrite: bool,
    ) -> ApiResult<PackageImportResult>;

    /// Compares one nested package archive with the environment's current state.
    async fn diff_package(
        &self,
        file_name: &str,
        payload: Vec<u8>,
        has_changes_only: bool,
    ) -> ApiResult<PackageDiff>;
}
