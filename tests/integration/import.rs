//! Import pipeline tests.

use std::collections::HashMap;
use std::io::{Cursor, Write};

use packport::archive::{ArchiveCodec, ArchiveContents, ExtractedArchive, PackageArchive, PackagePayload};
use packport::batch::{ImportOptions, PackageImportService};
use packport::core::PackportError;
use packport::models::{
    ManifestEntry, PackageKeyAndVersion, SpaceDescriptor, StudioManifestEntry, VariableAssignment,
    VariableType, VersionMapping,
};
use packport::test_utils::fixtures::{edge, package, package_zip, studio_package};
use packport::test_utils::{MockCall, MockPlatform, init_test_logging};
use serde_json::json;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

fn entry(key: &str, versions: &[&str], space: Option<SpaceDescriptor>) -> ManifestEntry {
    ManifestEntry {
        package_key: key.to_string(),
        dependencies_by_version: versions.iter().map(|v| (v.to_string(), Vec::new())).collect(),
        space,
        ..Default::default()
    }
}

fn space_with_id(id: &str) -> SpaceDescriptor {
    SpaceDescriptor {
        id: Some(id.to_string()),
        ..Default::default()
    }
}

/// Writes and re-reads an archive holding one package zip per manifest version.
fn archive(manifest: Vec<ManifestEntry>, studio: Option<Vec<StudioManifestEntry>>) -> ExtractedArchive {
    let packages = manifest
        .iter()
        .flat_map(|entry| {
            entry.versions().map(|version| PackageArchive {
                identity: PackageKeyAndVersion::new(&entry.package_key, version),
                payload: PackagePayload::from_zip(&package_zip(&entry.package_key, version, &[("view.yml", "VIEW")]))
                    .unwrap(),
            })
        })
        .collect();

    let contents = ArchiveContents {
        manifest,
        studio,
        variables: None,
        packages,
    };
    ArchiveCodec::read(&ArchiveCodec::write(&contents).unwrap()).unwrap()
}

fn packport_error(err: &anyhow::Error) -> Option<&PackportError> {
    err.chain().find_map(|cause| cause.downcast_ref::<PackportError>())
}

fn imported_files(mock: &MockPlatform) -> Vec<String> {
    mock.imports().into_iter().map(|import| import.file_name).collect()
}

#[tokio::test]
async fn test_import_creates_missing_space_by_name() {
    init_test_logging(None);
    let mock = MockPlatform::new();
    let archive = archive(vec![entry("key-2", &["1.0.0"], Some(SpaceDescriptor::named("spaceName")))], None);

    let report = PackageImportService::new(&mock).import(&archive, &ImportOptions::default()).await.unwrap();

    assert_eq!(mock.created_spaces(), vec!["spaceName"]);
    let imports = mock.imports();
    assert_eq!(imports.len(), 1);
    assert_eq!(imports[0].file_name, "key-2_1.0.0.zip");
    assert_eq!(imports[0].space_id.as_deref(), Some("space-1"));
    assert!(!imports[0].overwrite);
    assert_eq!(
        report.mappings,
        vec![VersionMapping {
            package_key: "key-2".into(),
            old_version: "1.0.0".into(),
            new_version: "1.0.0".into(),
        }]
    );
}

#[tokio::test]
async fn test_import_reuses_space_with_same_name() {
    let mock = MockPlatform::new().with_space("s-7", "spaceName");
    let archive = archive(
        vec![
            entry("key-1", &["1.0.0"], Some(SpaceDescriptor::named("spaceName"))),
            entry("key-2", &["1.0.0"], Some(SpaceDescriptor::named("spaceName"))),
        ],
        None,
    );

    PackageImportService::new(&mock).import(&archive, &ImportOptions::default()).await.unwrap();

    assert!(mock.created_spaces().is_empty());
    assert!(mock.imports().iter().all(|import| import.space_id.as_deref() == Some("s-7")));
}

#[tokio::test]
async fn test_unknown_space_id_aborts_before_import() {
    let mock = MockPlatform::new().with_space("s-1", "Finance");
    let archive = archive(vec![entry("key-2", &["1.0.0"], Some(space_with_id("missing-id")))], None);

    let err = PackageImportService::new(&mock).import(&archive, &ImportOptions::default()).await.unwrap_err();

    assert!(matches!(packport_error(&err), Some(PackportError::SpaceNotFound { id }) if id == "missing-id"));
    assert!(format!("{:#}", err).contains("Provided space ID does not exist."));
    assert!(mock.imports().is_empty());
    assert!(mock.created_spaces().is_empty());
}

#[tokio::test]
async fn test_existing_package_rejected_without_overwrite() {
    let mock = MockPlatform::new().with_package(package("key-2", "node-2"));
    let archive = archive(vec![entry("key-1", &["1.0.0"], None), entry("key-2", &["1.0.0"], None)], None);

    let err = PackageImportService::new(&mock).import(&archive, &ImportOptions::default()).await.unwrap_err();

    assert!(matches!(
        packport_error(&err),
        Some(PackportError::PackageAlreadyExists { key }) if key == "key-2"
    ));
    assert_eq!(mock.count_calls(|call| matches!(call, MockCall::ImportPackage(_))), 0);
}

#[tokio::test]
async fn test_missing_nested_archive_detected_before_import() {
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut zip = ZipWriter::new(&mut cursor);
        let manifest = serde_yaml::to_string(&vec![
            entry("key-1", &["1.0.0"], None),
            entry("key-2", &["1.0.0"], None),
        ])
        .unwrap();
        zip.start_file("manifest.yml", SimpleFileOptions::default()).unwrap();
        zip.write_all(manifest.as_bytes()).unwrap();
        zip.start_file("key-1_1.0.0.zip", SimpleFileOptions::default()).unwrap();
        zip.write_all(&package_zip("key-1", "1.0.0", &[])).unwrap();
        zip.finish().unwrap();
    }
    let archive = ArchiveCodec::read(cursor.get_ref()).unwrap();
    let mock = MockPlatform::new();

    let err = PackageImportService::new(&mock).import(&archive, &ImportOptions::default()).await.unwrap_err();

    assert!(matches!(
        packport_error(&err),
        Some(PackportError::ArchiveEntryMissing { name }) if name == "key-2_1.0.0.zip"
    ));
    assert!(mock.imports().is_empty());
}

#[tokio::test]
async fn test_overwrite_moves_existing_package_to_resolved_space() {
    let mock = MockPlatform::new()
        .with_space("s-1", "Old")
        .with_space("s-2", "New")
        .with_package(studio_package("key-2", "node-2", "s-1"));
    let archive = archive(vec![entry("key-2", &["1.0.0"], Some(SpaceDescriptor::named("New")))], None);
    let options = ImportOptions {
        overwrite: true,
        ..Default::default()
    };

    PackageImportService::new(&mock).import(&archive, &options).await.unwrap();

    assert_eq!(mock.moves(), vec![("node-2".to_string(), "s-2".to_string())]);
    let imports = mock.imports();
    assert!(imports[0].overwrite);
    assert_eq!(imports[0].space_id.as_deref(), Some("s-2"));
}

#[tokio::test]
async fn test_existing_package_in_resolved_space_not_moved() {
    let mock = MockPlatform::new()
        .with_space("s-1", "Finance")
        .with_package(studio_package("key-2", "node-2", "s-1"));
    let archive = archive(vec![entry("key-2", &["1.0.0"], Some(space_with_id("s-1")))], None);
    let options = ImportOptions {
        overwrite: true,
        ..Default::default()
    };

    PackageImportService::new(&mock).import(&archive, &options).await.unwrap();

    assert!(mock.moves().is_empty());
    assert_eq!(mock.imports().len(), 1);
}

#[tokio::test]
async fn test_space_mapping_overrides_archived_space() {
    let mock = MockPlatform::new().with_space("s-1", "Finance");
    let studio = vec![StudioManifestEntry {
        package_key: "key-1".into(),
        space: Some(SpaceDescriptor::named("Finance")),
        runtime_variable_assignments: Vec::new(),
    }];
    let archive = archive(
        vec![
            entry("key-1", &["1.0.0"], Some(SpaceDescriptor::named("Ignored"))),
            entry("key-2", &["1.0.0"], Some(SpaceDescriptor::named("Finance"))),
        ],
        Some(studio),
    );
    let options = ImportOptions {
        space_mappings: HashMap::from([("key-2".to_string(), "Mapped".to_string())]),
        ..Default::default()
    };

    PackageImportService::new(&mock).import(&archive, &options).await.unwrap();

    // key-1 uses its studio space, key-2 the mapping.
    assert_eq!(mock.created_spaces(), vec!["Mapped"]);
    let spaces: HashMap<String, Option<String>> =
        mock.imports().into_iter().map(|import| (import.file_name, import.space_id)).collect();
    assert_eq!(spaces["key-1_1.0.0.zip"].as_deref(), Some("s-1"));
    assert_eq!(spaces["key-2_1.0.0.zip"].as_deref(), Some("space-2"));
}

#[tokio::test]
async fn test_dependencies_imported_first() {
    let mock = MockPlatform::new();
    let mut app = entry("app", &["2.0.0"], None);
    app.dependencies_by_version.insert("2.0.0".into(), vec![edge("lib", "1.0.0", "d-1")]);
    let mut lib = entry("lib", &["1.0.0", "0.9.0"], None);
    lib.dependencies_by_version.insert("1.0.0".into(), vec![edge("base", "1.0.0", "d-2")]);
    let base = entry("base", &["1.0.0"], None);

    let archive = archive(vec![app, lib, base], None);
    PackageImportService::new(&mock).import(&archive, &ImportOptions::default()).await.unwrap();

    assert_eq!(
        imported_files(&mock),
        vec!["base_1.0.0.zip", "lib_0.9.0.zip", "lib_1.0.0.zip", "app_2.0.0.zip"]
    );
}

#[tokio::test]
async fn test_cyclic_manifest_imports_in_manifest_order() {
    let mock = MockPlatform::new();
    let mut a = entry("a", &["1.0.0"], None);
    a.dependencies_by_version.insert("1.0.0".into(), vec![edge("b", "1.0.0", "d-b")]);
    let mut b = entry("b", &["1.0.0"], None);
    b.dependencies_by_version.insert("1.0.0".into(), vec![edge("a", "1.0.0", "d-a")]);

    let archive = archive(vec![a, b], None);
    PackageImportService::new(&mock).import(&archive, &ImportOptions::default()).await.unwrap();

    assert_eq!(imported_files(&mock), vec!["a_1.0.0.zip", "b_1.0.0.zip"]);
}

#[tokio::test]
async fn test_runtime_variables_assigned_after_import() {
    let runtime = vec![VariableAssignment {
        key: "threshold".into(),
        variable_type: VariableType::PlainText,
        value: json!("42"),
        metadata: None,
    }];
    let studio = vec![StudioManifestEntry {
        package_key: "studio-app".into(),
        space: Some(SpaceDescriptor::named("Finance")),
        runtime_variable_assignments: runtime.clone(),
    }];
    let mock = MockPlatform::new().with_space("s-1", "Finance");
    let archive = archive(vec![entry("studio-app", &["3.0.0"], None)], Some(studio));

    PackageImportService::new(&mock).import(&archive, &ImportOptions::default()).await.unwrap();

    assert_eq!(mock.assignments(), vec![("studio-app".to_string(), runtime)]);
    let calls = mock.calls();
    let imported = calls.iter().position(|c| matches!(c, MockCall::ImportPackage(_))).unwrap();
    let assigned = calls.iter().position(|c| matches!(c, MockCall::AssignRuntimeVariables(_))).unwrap();
    assert!(imported < assigned);
}

#[tokio::test]
async fn test_report_maps_to_target_versions() {
    let mock = MockPlatform::new().with_import_version("key-1", "7.0.0");
    let archive = archive(vec![entry("key-1", &["1.0.0"], None)], None);

    let report = PackageImportService::new(&mock).import(&archive, &ImportOptions::default()).await.unwrap();

    assert_eq!(report.mappings[0].old_version, "1.0.0");
    assert_eq!(report.mappings[0].new_version, "7.0.0");
    assert_eq!(mock.imports()[0].space_id, None);
}

#[tokio::test]
async fn test_import_failure_stops_remaining_packages() {
    let mock = MockPlatform::new().with_failure("import_package", 500);
    let archive = archive(vec![entry("key-1", &["1.0.0"], None), entry("key-2", &["1.0.0"], None)], None);

    let err = PackageImportService::new(&mock).import(&archive, &ImportOptions::default()).await.unwrap_err();

    assert!(matches!(
        packport_error(&err),
        Some(PackportError::TransportError { status: Some(500), .. })
    ));
    assert_eq!(mock.count_calls(|call| matches!(call, MockCall::ImportPackage(_))), 1);
}
