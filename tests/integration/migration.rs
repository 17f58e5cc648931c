//! Export from one environment, import into another.

use std::collections::HashMap;

use packport::archive::ArchiveCodec;
use packport::batch::{ExportOptions, ImportOptions, PackageDiffService, PackageExportService, PackageImportService};
use packport::test_utils::fixtures::{active_draft, edge, package, package_zip, studio_package};
use packport::test_utils::{MockPlatform, init_test_logging};

fn source() -> MockPlatform {
    MockPlatform::new()
        .with_space("src-space", "Finance")
        .with_package(studio_package("app", "node-app", "src-space"))
        .with_package(package("lib", "node-lib"))
        .with_active_version("app", "2.0.0")
        .with_active_version("lib", "1.4.0")
        .with_dependencies("node-app", &active_draft("node-app"), vec![edge("lib", "1.3.0", "d-lib-13")])
        .with_export(
            "app",
            "2.0.0",
            package_zip("app", "2.0.0", &[("board.yml", "VIEW"), ("sync.yml", "SCENARIO")]),
        )
}

#[tokio::test]
async fn test_migrate_with_dependencies_into_empty_target() {
    init_test_logging(None);
    let source = source();
    let bytes = PackageExportService::new(&source)
        .export(
            &["app".to_string()],
            ExportOptions {
                include_dependencies: true,
                ..Default::default()
            },
        )
        .await
        .unwrap();
    let archive = ArchiveCodec::read(&bytes).unwrap();

    let target = MockPlatform::new().with_import_version("app", "1.0.0");
    let options = ImportOptions {
        space_mappings: HashMap::from([("app".to_string(), "Finance".to_string())]),
        ..Default::default()
    };
    let report = PackageImportService::new(&target).import(&archive, &options).await.unwrap();

    let files: Vec<String> = target.imports().into_iter().map(|import| import.file_name).collect();
    assert_eq!(files, vec!["lib_1.3.0.zip", "app_2.0.0.zip"]);
    assert_eq!(target.created_spaces(), vec!["Finance"]);

    let app = report.mappings.iter().find(|m| m.package_key == "app").unwrap();
    assert_eq!((app.old_version.as_str(), app.new_version.as_str()), ("2.0.0", "1.0.0"));

    // Action-flow nodes never reach the target.
    let app_import = target.imports().into_iter().find(|import| import.file_name == "app_2.0.0.zip").unwrap();
    let payload = packport::archive::PackagePayload::from_zip(&app_import.payload).unwrap();
    assert_eq!(payload.nodes.len(), 1);
}

#[tokio::test]
async fn test_migrate_without_space_mappings() {
    let source = source();
    let bytes = PackageExportService::new(&source)
        .export(&["app".to_string()], ExportOptions::default())
        .await
        .unwrap();
    let archive = ArchiveCodec::read(&bytes).unwrap();

    // The target deployment has never seen "src-space".
    let target = MockPlatform::new();
    PackageImportService::new(&target)
        .import(&archive, &ImportOptions::default())
        .await
        .unwrap();

    assert_eq!(target.created_spaces(), vec!["Finance"]);
    let imports = target.imports();
    assert_eq!(imports.len(), 1);
    assert_eq!(imports[0].space_id.as_deref(), Some("space-1"));
}

#[tokio::test]
async fn test_migrate_into_existing_space_by_name() {
    let source = source();
    let bytes = PackageExportService::new(&source)
        .export(&["app".to_string()], ExportOptions::default())
        .await
        .unwrap();
    let archive = ArchiveCodec::read(&bytes).unwrap();

    let target = MockPlatform::new().with_space("tgt-space", "Finance");
    PackageImportService::new(&target)
        .import(&archive, &ImportOptions::default())
        .await
        .unwrap();

    assert!(target.created_spaces().is_empty());
    assert_eq!(target.imports()[0].space_id.as_deref(), Some("tgt-space"));
}

#[tokio::test]
async fn test_diff_reports_changed_packages_only() {
    let source = source();
    let bytes = PackageExportService::new(&source)
        .export(&["app".to_string(), "lib".to_string()], ExportOptions::default())
        .await
        .unwrap();
    let archive = ArchiveCodec::read(&bytes).unwrap();

    let target = MockPlatform::new().with_diff("app", true).with_diff("lib", false);
    let diffs = PackageDiffService::new(&target).diff(&archive, true).await.unwrap();

    assert_eq!(diffs.len(), 1);
    assert_eq!(diffs[0].package_key, "app");
    assert!(diffs[0].has_changes);
}
