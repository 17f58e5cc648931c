//! Nested-zip archive format for batch package export and import.
//!
//! # Layout
//!
//! ```text
//! export.zip
//! ├── manifest.yml              ManifestEntry list, one per package key
//! ├── studio.yml                optional: studio package spaces + runtime variables
//! ├── variables.yml             optional: variables per package version
//! ├── key-1_1.0.0.zip           one nested archive per (key, version)
//! │   ├── package.yml
//! │   └── nodes/
//! │       └── <node>.yml
//! └── key-2_1.1.1.zip
//! ```
//!
//! Nodes of the action-flow type (`SCENARIO`) are never written into a nested archive;
//! they are migrated by a separate tool.
//!
//! Writing validates that the manifest and the bundled package archives describe the
//! same set of package versions, so a written archive is always importable. Reading
//! extracts into a scratch directory and loads nested archives lazily.

mod payload;
mod reader;
mod writer;

pub use payload::{NodeFile, PackagePayload};
pub use reader::ExtractedArchive;

use crate::core::PackportError;
use crate::models::{
    ManifestEntry, PackageKeyAndVersion, StudioManifestEntry, VariableManifestEntry,
};

/// Payload of one package version destined for the archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageArchive {
    pub identity: PackageKeyAndVersion,
    pub payload: PackagePayload,
}

/// Everything an archive holds.
#[derive(Debug, Clone, Default)]
pub struct ArchiveContents {
    pub manifest: Vec<ManifestEntry>,
    pub studio: Option<Vec<StudioManifestEntry>>,
    pub variables: Option<Vec<VariableManifestEntry>>,
    pub packages: Vec<PackageArchive>,
}

/// Reads and writes the nested-zip archive format.
pub struct ArchiveCodec;

impl ArchiveCodec {
    /// Serializes `contents` into archive bytes.
    pub fn write(contents: &ArchiveContents) -> Result<Vec<u8>, PackportError> {
        writer::write(contents)
    }

    /// Extracts archive bytes into a scratch directory.
    pub fn read(bytes: &[u8]) -> Result<ExtractedArchive, PackportError> {
        ExtractedArchive::read(bytes)
    }
}
