//! Export pipeline tests.

use packport::archive::{ArchiveCodec, ExtractedArchive};
use packport::batch::{ExportOptions, PackageExportService};
use packport::core::PackportError;
use packport::models::{PackageKeyAndVersion, VariableAssignment, VariableManifestEntry, VariableType};
use packport::test_utils::fixtures::{
    action_flow_package, active_draft, edge, package, package_zip, studio_package,
};
use packport::test_utils::{MockCall, MockPlatform, init_test_logging};
use serde_json::json;

fn keys(keys: &[&str]) -> Vec<String> {
    keys.iter().map(|k| k.to_string()).collect()
}

fn with_dependencies() -> ExportOptions {
    ExportOptions {
        include_dependencies: true,
        ..Default::default()
    }
}

fn packport_error(err: &anyhow::Error) -> Option<&PackportError> {
    err.chain().find_map(|cause| cause.downcast_ref::<PackportError>())
}

/// key-1@1.0.0 depends on key-2@1.0.0 and key-2@1.1.1; key-2 is active at 1.1.1.
fn scenario() -> MockPlatform {
    MockPlatform::new()
        .with_package(package("key-1", "node-1"))
        .with_package(package("key-2", "node-2"))
        .with_active_version("key-1", "1.0.0")
        .with_active_version("key-2", "1.1.1")
        .with_dependencies(
            "node-1",
            &active_draft("node-1"),
            vec![edge("key-2", "1.0.0", "d-2a"), edge("key-2", "1.1.1", "d-2b")],
        )
}

async fn export(mock: &MockPlatform, package_keys: &[&str], options: ExportOptions) -> ExtractedArchive {
    let bytes = PackageExportService::new(mock).export(&keys(package_keys), options).await.unwrap();
    ArchiveCodec::read(&bytes).unwrap()
}

#[tokio::test]
async fn test_export_with_multiple_versions_of_dependency() {
    init_test_logging(None);
    let mock = scenario();

    let archive = export(&mock, &["key-1", "key-2"], with_dependencies()).await;

    let key2 = archive.manifest.iter().find(|e| e.package_key == "key-2").unwrap();
    assert_eq!(key2.versions().collect::<Vec<_>>(), vec!["1.0.0", "1.1.1"]);
    assert!(archive.has_package(&PackageKeyAndVersion::new("key-2", "1.0.0")));
    assert!(archive.has_package(&PackageKeyAndVersion::new("key-2", "1.1.1")));
    assert_eq!(archive.package_names().count(), 3);

    let key1 = archive.manifest.iter().find(|e| e.package_key == "key-1").unwrap();
    assert_eq!(key1.dependencies_by_version["1.0.0"].len(), 2);
}

#[tokio::test]
async fn test_each_package_version_downloaded_once() {
    let mock = scenario();
    export(&mock, &["key-1", "key-2", "key-1"], with_dependencies()).await;

    let downloads = mock.count_calls(|call| matches!(call, MockCall::ExportPackage(_)));
    assert_eq!(downloads, 3);
    assert_eq!(mock.variable_requests().len(), 1);
    assert_eq!(mock.variable_requests()[0].len(), 3);
}

#[tokio::test]
async fn test_export_without_dependencies_keeps_roots_only() {
    let mock = scenario();
    let archive = export(&mock, &["key-1"], ExportOptions::default()).await;

    assert_eq!(archive.manifest.len(), 1);
    assert_eq!(archive.package_names().collect::<Vec<_>>(), vec!["key-1_1.0.0"]);
    // Direct edges are still described in the manifest.
    assert_eq!(archive.manifest[0].dependencies_by_version["1.0.0"].len(), 2);
}

#[tokio::test]
async fn test_action_flows_never_archived() {
    let mock = MockPlatform::new()
        .with_package(package("key-1", "node-1"))
        .with_package(action_flow_package("flows", "node-flows"))
        .with_active_version("key-1", "1.0.0")
        .with_active_version("flows", "2.0.0")
        .with_dependencies("node-1", &active_draft("node-1"), vec![edge("flows", "2.0.0", "d-f")])
        .with_export(
            "key-1",
            "1.0.0",
            package_zip("key-1", "1.0.0", &[("view.yml", "VIEW"), ("automation.yml", "SCENARIO")]),
        );

    let archive = export(&mock, &["key-1", "flows"], with_dependencies()).await;

    assert_eq!(archive.manifest.len(), 1);
    assert!(archive.manifest[0].dependencies_by_version["1.0.0"].is_empty());

    let payload = archive.load_payload(&PackageKeyAndVersion::new("key-1", "1.0.0")).unwrap();
    assert_eq!(payload.nodes.len(), 1);
    assert!(payload.nodes.iter().all(|node| !node.is_action_flow()));
    assert_eq!(mock.count_calls(|call| *call == MockCall::FindActiveVersion("flows".into())), 0);
}

#[tokio::test]
async fn test_excluded_edges_kept_when_pruning_disabled() {
    let mock = MockPlatform::new()
        .with_package(package("key-1", "node-1"))
        .with_package(action_flow_package("flows", "node-flows"))
        .with_active_version("key-1", "1.0.0")
        .with_dependencies("node-1", &active_draft("node-1"), vec![edge("flows", "2.0.0", "d-f")]);

    let options = ExportOptions {
        include_dependencies: true,
        prune_excluded_edges: false,
    };
    let archive = export(&mock, &["key-1"], options).await;

    assert_eq!(archive.manifest.len(), 1);
    assert_eq!(archive.manifest[0].dependencies_by_version["1.0.0"][0].key, "flows");
}

#[tokio::test]
async fn test_unknown_key_fails_before_any_download() {
    let mock = scenario();
    let err = PackageExportService::new(&mock)
        .export(&keys(&["key-1", "key-9"]), with_dependencies())
        .await
        .unwrap_err();

    assert!(matches!(packport_error(&err), Some(PackportError::PackageNotFound { key }) if key == "key-9"));
    assert_eq!(mock.calls(), vec![MockCall::ListPackages]);
}

#[tokio::test]
async fn test_package_without_active_version_rejected() {
    let mock = MockPlatform::new().with_package(package("key-1", "node-1"));
    let err = PackageExportService::new(&mock)
        .export(&keys(&["key-1"]), ExportOptions::default())
        .await
        .unwrap_err();

    assert!(matches!(packport_error(&err), Some(PackportError::NoActiveVersion { .. })));
}

#[tokio::test]
async fn test_download_failure_aborts_export() {
    let mock = scenario().with_failure("export_package", 502);
    let err = PackageExportService::new(&mock)
        .export(&keys(&["key-1"]), with_dependencies())
        .await
        .unwrap_err();

    assert!(matches!(
        packport_error(&err),
        Some(PackportError::TransportError { status: Some(502), .. })
    ));
}

#[tokio::test]
async fn test_variables_reconciled_into_archive() {
    let mock = scenario()
        .with_variables(VariableManifestEntry {
            package_key: "key-1".into(),
            version: "1.0.0".into(),
            variables: vec![
                VariableAssignment {
                    key: "crm".into(),
                    variable_type: VariableType::Connection,
                    value: json!({"appName": "salesforce", "id": "c-1"}),
                    metadata: None,
                },
                VariableAssignment {
                    key: "model".into(),
                    variable_type: VariableType::DataModel,
                    value: json!("dm-1"),
                    metadata: None,
                },
            ],
        })
        .with_data_model(packport::models::DataModelRef {
            id: "dm-1".into(),
            name: Some("Orders".into()),
            pool_id: Some("pool-1".into()),
            pool_name: Some("Sales Pool".into()),
        });

    let archive = export(&mock, &["key-1"], ExportOptions::default()).await;

    let variables = archive.variables.as_ref().unwrap();
    assert_eq!(variables.len(), 1);
    let crm = &variables[0].variables[0];
    assert_eq!(crm.metadata_str("appName"), Some("salesforce"));
    let model = &variables[0].variables[1];
    assert_eq!(model.metadata_str("dataModelName"), Some("Orders"));
    assert_eq!(model.metadata_str("poolName"), Some("Sales Pool"));
}

#[tokio::test]
async fn test_no_data_model_lookup_without_data_model_variables() {
    let mock = scenario();
    let archive = export(&mock, &["key-1"], ExportOptions::default()).await;

    assert!(archive.variables.is_none());
    assert_eq!(mock.count_calls(|call| *call == MockCall::ListDataModels), 0);
}

#[tokio::test]
async fn test_studio_packages_get_studio_manifest() {
    let runtime = vec![VariableAssignment {
        key: "threshold".into(),
        variable_type: VariableType::PlainText,
        value: json!("42"),
        metadata: None,
    }];
    let mock = MockPlatform::new()
        .with_package(studio_package("studio-app", "node-s", "s-1"))
        .with_active_version("studio-app", "3.0.0")
        .with_space("s-1", "Finance")
        .with_runtime_variables("studio-app", runtime.clone());

    let archive = export(&mock, &["studio-app"], ExportOptions::default()).await;

    let studio = archive.studio_entry("studio-app").unwrap();
    assert_eq!(studio.space.as_ref().unwrap().name, "Finance");
    assert_eq!(studio.runtime_variable_assignments, runtime);
    assert_eq!(archive.manifest[0].flavor.as_deref(), Some("STUDIO"));
    // Space ids do not travel between deployments.
    let space = archive.manifest[0].space.as_ref().unwrap();
    assert_eq!((space.id.as_deref(), space.name.as_str()), (None, "Finance"));
    assert_eq!(studio.space.as_ref().unwrap().id, None);
}
