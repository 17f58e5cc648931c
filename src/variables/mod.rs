//! Variable reconciliation for package versions.
//!
//! Variables are fetched for a set of `(packageKey, version)` pairs in a single batched
//! backend call and normalized before they are archived:
//!
//! - CONNECTION assignments always carry `metadata.appName`, backfilled from
//!   `value.appName` when the backend omitted it.
//! - DATA_MODEL assignments are annotated with the data model and pool display names.
//!   The raw id in `value` stays authoritative; names are informational only.

use std::collections::{BTreeSet, HashMap};

use anyhow::{Context, Result};
use serde_json::Value;

use crate::api::PlatformApi;
use crate::models::{DataModelRef, PackageKeyAndVersion, VariableManifestEntry, VariableType};

pub const APP_NAME_FIELD: &str = "appName";
pub const DATA_MODEL_NAME_FIELD: &str = "dataModelName";
pub const POOL_NAME_FIELD: &str = "poolName";

/// Fetches and normalizes variable assignments through a [`PlatformApi`].
pub struct VariableReconciler<'a> {
    api: &'a dyn PlatformApi,
}

impl<'a> VariableReconciler<'a> {
    pub fn new(api: &'a dyn PlatformApi) -> Self {
        Self {
            api,
        }
    }

    /// Fetches variables for every distinct pair in `pairs` with one backend call.
    ///
    /// Returns an empty list without calling the backend when `pairs` is empty.
    pub async fn fetch_for_versions(
        &self,
        pairs: &[PackageKeyAndVersion],
    ) -> Result<Vec<VariableManifestEntry>> {
        let unique: Vec<PackageKeyAndVersion> =
            pairs.iter().cloned().collect::<BTreeSet<_>>().into_iter().collect();
        if unique.is_empty() {
            return Ok(Vec::new());
        }

        tracing::debug!("Fetching variables for {} package version(s)", unique.len());
        let entries = self
            .api
            .find_variables(&unique)
            .await
            .context("Failed to fetch package variables")?;
        Ok(entries)
    }

    /// Fetches the data-model catalog used by [`resolve_data_model_names`].
    pub async fn data_model_catalog(&self) -> Result<Vec<DataModelRef>> {
        let catalog = self.api.list_data_models().await.context("Failed to list data models")?;
        Ok(catalog)
    }
}

/// Backfills `metadata.appName` on CONNECTION assignments from `value.appName`.
///
/// Assignments that already carry an app name, and every other variable type, are
/// left untouched.
#[must_use]
pub fn fix_connection_metadata(mut entries: Vec<VariableManifestEntry>) -> Vec<VariableManifestEntry> {
    for assignment in entries.iter_mut().flat_map(|entry| entry.variables.iter_mut()) {
        if assignment.variable_type != VariableType::Connection
            || assignment.metadata_str(APP_NAME_FIELD).is_some()
        {
            continue;
        }
        let app_name = assignment.value.get(APP_NAME_FIELD).and_then(Value::as_str).map(str::to_string);
        match app_name {
            Some(app_name) => assignment.set_metadata(APP_NAME_FIELD, app_name),
            None => tracing::warn!(
                "Connection variable '{}' has no app name to record",
                assignment.key
            ),
        }
    }
    entries
}

/// Annotates DATA_MODEL assignments with `metadata.dataModelName` and
/// `metadata.poolName` from `catalog`.
///
/// References to data models missing from the catalog keep their metadata as is.
pub fn resolve_data_model_names(entries: &mut [VariableManifestEntry], catalog: &[DataModelRef]) {
    let by_id: HashMap<&str, &DataModelRef> =
        catalog.iter().map(|model| (model.id.as_str(), model)).collect();

    for assignment in entries.iter_mut().flat_map(|entry| entry.variables.iter_mut()) {
        let Some(model) = assignment.data_model_id().and_then(|id| by_id.get(id)).copied() else {
            continue;
        };
        if let Some(name) = &model.name {
            assignment.set_metadata(DATA_MODEL_NAME_FIELD, name.clone());
        }
        if let Some(pool_name) = &model.pool_name {
            assignment.set_metadata(POOL_NAME_FIELD, pool_name.clone());
        }
    }
}

/// Data models referenced by the DATA_MODEL assignments of `entry`, deduplicated by id.
#[must_use]
pub fn data_model_refs(entry: &VariableManifestEntry) -> Vec<DataModelRef> {
    let mut seen = BTreeSet::new();
    entry
        .variables
        .iter()
        .filter_map(|assignment| {
            let id = assignment.data_model_id()?;
            seen.insert(id.to_string()).then(|| DataModelRef {
                id: id.to_string(),
                name: assignment.metadata_str(DATA_MODEL_NAME_FIELD).map(str::to_string),
                pool_id: assignment
                    .value
                    .get("poolId")
                    .and_then(Value::as_str)
                    .map(str::to_string),
                pool_name: assignment.metadata_str(POOL_NAME_FIELD).map(str::to_string),
            })
        })
        .collect()
}
