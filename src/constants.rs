//! Constants shared across the export/import pipeline.
//!
//! Archive entry names are part of the on-disk format: archives produced by older
//! releases must keep loading, so these values never change.

/// Outer archive entry holding the serialized `ManifestEntry` list.
pub const MANIFEST_FILE_NAME: &str = "manifest.yml";

/// JSON variant of the manifest accepted when reading archives.
pub const MANIFEST_JSON_FILE_NAME: &str = "manifest.json";

/// Optional outer archive entry with per-studio-package space and runtime variables.
pub const STUDIO_FILE_NAME: &str = "studio.yml";

/// Optional outer archive entry with the reconciled variables per package version.
pub const VARIABLES_FILE_NAME: &str = "variables.yml";

/// Package descriptor inside every nested package archive.
pub const PACKAGE_DESCRIPTOR_FILE_NAME: &str = "package.yml";

/// Directory holding child node files inside a nested package archive.
pub const NODES_DIR: &str = "nodes/";

/// Node type of action-flow assets, which are migrated by a separate subsystem.
pub const ACTION_FLOW_NODE_TYPE: &str = "SCENARIO";

/// Package flavor of action-flow-backed packages.
pub const ACTION_FLOW_FLAVOR: &str = "ACTION_FLOWS";

/// Package flavor of studio-managed packages.
pub const STUDIO_FLAVOR: &str = "STUDIO";

/// Icon used when a space has to be created during import.
pub const DEFAULT_SPACE_ICON: &str = "earth";

/// Environment variable that disables progress spinners.
pub const NO_PROGRESS_ENV: &str = "PACKPORT_NO_PROGRESS";

/// Base path of the package-manager REST API.
pub const API_BASE_PATH: &str = "/package-manager/api";
