//! `reqwest` implementation of [`PlatformApi`].

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, Response, Url};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use super::{ApiResult, PlatformApi};
use crate::constants::API_BASE_PATH;
use crate::core::PackportError;
use crate::models::{
    DataModelRef, DependencyEdge, PackageDiff, PackageImportResult, PackageKeyAndVersion,
    PackageNode, SpaceDescriptor, VariableAssignment, VariableManifestEntry,
};

#[derive(Debug, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct ActiveVersion {
    version: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct NewSpace<'a> {
    name: &'a str,
    icon_reference: &'a str,
}

/// Authenticated HTTP client for one environment.
#[derive(Debug, Clone)]
pub struct HttpPlatformClient {
    client: Client,
    base_url: Url,
    token: String,
}

impl HttpPlatformClient {
    /// Creates a client for the environment at `base_url` using bearer `token`.
    pub fn new(base_url: &str, token: impl Into<String>) -> ApiResult<Self> {
        let base_url = Url::parse(base_url).map_err(|e| PackportError::ConfigError {
            message: format!("Invalid environment URL '{base_url}': {e}"),
        })?;
        if base_url.cannot_be_a_base() {
            return Err(PackportError::ConfigError {
                message: format!("Environment URL '{base_url}' cannot be used as a base URL"),
            });
        }

        let client = Client::builder()
            .user_agent(concat!("packport/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| PackportError::ConfigError {
                message: format!("Failed to build HTTP client: {e}"),
            })?;

        Ok(Self {
            client,
            base_url,
            token: token.into(),
        })
    }

    /// Builds an endpoint URL from path segments below the API base path.
    ///
    /// Segments are percent-encoded individually, so package keys never alter the path.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty();
            path.extend(API_BASE_PATH.split('/').filter(|s| !s.is_empty()));
            path.extend(segments);
        }
        url
    }

    async fn send(&self, operation: &str, request: RequestBuilder) -> ApiResult<Response> {
        let response = request.bearer_auth(&self.token).send().await.map_err(|e| {
            PackportError::NetworkError {
                operation: operation.to_string(),
                reason: e.to_string(),
            }
        })?;

        let status = response.status();
        debug!("{operation}: HTTP {status}");
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(PackportError::transport(operation, status.as_u16(), error_message(&body)))
    }

    async fn read_json<T: DeserializeOwned>(operation: &str, response: Response) -> ApiResult<T> {
        response.json::<T>().await.map_err(|e| PackportError::NetworkError {
            operation: operation.to_string(),
            reason: format!("invalid response body: {e}"),
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, operation: &str, url: Url) -> ApiResult<T> {
        let response = self.send(operation, self.client.get(url)).await?;
        Self::read_json(operation, response).await
    }

    async fn post_json<B, T>(&self, operation: &str, url: Url, body: &B) -> ApiResult<T>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        let response = self.send(operation, self.client.post(url).json(body)).await?;
        Self::read_json(operation, response).await
    }

    async fn post_file<T: DeserializeOwned>(
        &self,
        operation: &str,
        url: Url,
        file_name: &str,
        payload: Vec<u8>,
    ) -> ApiResult<T> {
        let part = Part::bytes(payload)
            .file_name(file_name.to_string())
            .mime_str("application/zip")
            .map_err(|e| PackportError::Other {
                message: format!("Invalid multipart content type: {e}"),
            })?;
        let form = Form::new().part("package", part);
        let response = self.send(operation, self.client.post(url).multipart(form)).await?;
        Self::read_json(operation, response).await
    }
}

/// Extracts a human-readable message from an error response body.
fn error_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    for field in ["message", "errorMessage", "error", "detail"] {
        if let Some(message) = value.get(field).and_then(|v| v.as_str()) {
            return Some(message.to_string());
        }
    }
    Some(value.to_string())
}

#[async_trait]
impl PlatformApi for HttpPlatformClient {
    async fn list_packages(&self) -> ApiResult<Vec<PackageNode>> {
        self.get_json("List packages", self.endpoint(&["packages"])).await
    }

    async fn find_active_version(&self, package_key: &str) -> ApiResult<Option<String>> {
        let url = self.endpoint(&["packages", package_key, "versions", "active"]);
        match self.get_json::<ActiveVersion>("Find active version", url).await {
            Ok(active) => Ok(active.version),
            Err(PackportError::TransportError {
                status: Some(404),
                ..
            }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn find_dependencies(
        &self,
        node_id: &str,
        draft_id: &str,
    ) -> ApiResult<Vec<DependencyEdge>> {
        let url =
            self.endpoint(&["package-dependencies", node_id, "by-root-draft-id", draft_id]);
        self.get_json("Find package dependencies", url).await
    }

    async fn export_package(&self, package_key: &str, version: &str) -> ApiResult<Vec<u8>> {
        let mut url = self.endpoint(&["packages", package_key, "export"]);
        url.query_pairs_mut().append_pair("version", version);
        let response = self.send("Export package", self.client.get(url)).await?;
        let bytes = response.bytes().await.map_err(|e| PackportError::NetworkError {
            operation: "Export package".to_string(),
            reason: e.to_string(),
        })?;
        Ok(bytes.to_vec())
    }

    async fn find_variables(
        &self,
        pairs: &[PackageKeyAndVersion],
    ) -> ApiResult<Vec<VariableManifestEntry>> {
        let url = self.endpoint(&["nodes", "by-package-keys", "variables", "values"]);
        self.post_json("Find variables", url, pairs).await
    }

    async fn find_runtime_variables(
        &self,
        package_key: &str,
    ) -> ApiResult<Vec<VariableAssignment>> {
        let url = self.endpoint(&[
            "nodes",
            "by-package-key",
            package_key,
            "variables",
            "runtime-values",
        ]);
        self.get_json("Find runtime variables", url).await
    }

    async fn assign_runtime_variables(
        &self,
        package_key: &str,
        assignments: &[VariableAssignment],
    ) -> ApiResult<()> {
        let url = self.endpoint(&["nodes", "by-package-key", package_key, "variables", "values"]);
        self.send("Assign runtime variables", self.client.post(url).json(assignments)).await?;
        Ok(())
    }

    async fn list_data_models(&self) -> ApiResult<Vec<DataModelRef>> {
        let url = self.endpoint(&["compute-pools", "data-models", "details"]);
        self.get_json("List data models", url).await
    }

    async fn list_spaces(&self) -> ApiResult<Vec<SpaceDescriptor>> {
        self.get_json("List spaces", self.endpoint(&["spaces"])).await
    }

    async fn create_space(&self, name: &str, icon_reference: &str) -> ApiResult<SpaceDescriptor> {
        let body = NewSpace {
            name,
            icon_reference,
        };
        self.post_json("Create space", self.endpoint(&["spaces"]), &body).await
    }

    async fn move_package(&self, node_id: &str, space_id: &str) -> ApiResult<()> {
        let url = self.endpoint(&["packages", node_id, "move", space_id]);
        self.send("Move package", self.client.put(url)).await?;
        Ok(())
    }

    async fn import_package(
        &self,
        file_name: &str,
        payload: Vec<u8>,
        space_id: Option<&str>,
        overwrite: bool,
    ) -> ApiResult<PackageImportResult> {
        let mut url = self.endpoint(&["packages", "import"]);
        {
            let mut query = url.query_pairs_mut();
            if let Some(space_id) = space_id {
                query.append_pair("spaceId", space_id);
            }
            query.append_pair("overwrite", if overwrite { "true" } else { "false" });
        }
        self.post_file("Import package", url, file_name, payload).await
    }

    async fn diff_package(
        &self,
        file_name: &str,
        payload: Vec<u8>,
        has_changes_only: bool,
    ) -> ApiResult<PackageDiff> {
        let mut url = self.endpoint(&["core", "packages", "diff", "configuration"]);
        url.query_pairs_mut()
            .append_pair("hasChanges", if has_changes_only { "true" } else { "false" });
        self.post_file("Diff package", url, file_name, payload).await
    }
}
