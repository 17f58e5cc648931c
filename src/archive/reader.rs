use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Cursor};
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use tempfile::TempDir;
use zip::ZipArchive;

use super::PackagePayload;
use crate::constants::{
    MANIFEST_FILE_NAME, MANIFEST_JSON_FILE_NAME, STUDIO_FILE_NAME, VARIABLES_FILE_NAME,
};
use crate::core::PackportError;
use crate::models::{
    ManifestEntry, PackageKeyAndVersion, StudioManifestEntry, VariableManifestEntry,
};

/// An archive unpacked into a scratch directory.
///
/// Manifest files are parsed eagerly; nested package archives stay on disk and are
/// loaded one at a time through [`ExtractedArchive::load_package`]. The scratch
/// directory is removed when the value is dropped.
#[derive(Debug)]
pub struct ExtractedArchive {
    dir: TempDir,
    pub manifest: Vec<ManifestEntry>,
    pub studio: Option<Vec<StudioManifestEntry>>,
    pub variables: Option<Vec<VariableManifestEntry>>,
    packages: BTreeMap<String, PathBuf>,
}

impl ExtractedArchive {
    /// Reads and extracts an archive file.
    pub fn open(path: &Path) -> Result<Self, PackportError> {
        if !path.is_file() {
            return Err(PackportError::FileNotFound {
                path: path.display().to_string(),
            });
        }
        let bytes = fs::read(path)?;
        Self::read(&bytes)
    }

    /// Extracts an in-memory archive.
    pub fn read(bytes: &[u8]) -> Result<Self, PackportError> {
        let dir = tempfile::Builder::new().prefix("packport-import-").tempdir()?;
        let mut archive = ZipArchive::new(Cursor::new(bytes))?;
        let mut packages = BTreeMap::new();

        for i in 0..archive.len() {
            let mut entry = archive.by_index(i)?;
            let relative = entry.enclosed_name().ok_or_else(|| PackportError::ArchiveError {
                reason: format!("entry '{}' escapes the archive root", entry.name()),
            })?;
            let target = dir.path().join(&relative);

            if entry.is_dir() {
                fs::create_dir_all(&target)?;
                continue;
            }
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            let mut file = fs::File::create(&target)?;
            io::copy(&mut entry, &mut file)?;

            let is_top_level = relative.components().count() == 1;
            if let (true, Some(stem)) = (is_top_level, nested_package_stem(&relative)) {
                packages.insert(stem, target);
            }
        }

        let manifest = if dir.path().join(MANIFEST_FILE_NAME).is_file() {
            parse_yaml(dir.path(), MANIFEST_FILE_NAME)?
        } else if dir.path().join(MANIFEST_JSON_FILE_NAME).is_file() {
            let content = fs::read(dir.path().join(MANIFEST_JSON_FILE_NAME))?;
            serde_json::from_slice(&content)?
        } else {
            return Err(PackportError::ArchiveEntryMissing {
                name: MANIFEST_FILE_NAME.to_string(),
            });
        };

        let studio = parse_optional_yaml(dir.path(), STUDIO_FILE_NAME)?;
        let variables = parse_optional_yaml(dir.path(), VARIABLES_FILE_NAME)?;

        tracing::debug!(
            "Extracted archive to {} ({} package archive(s))",
            dir.path().display(),
            packages.len()
        );

        Ok(Self {
            dir,
            manifest,
            studio,
            variables,
            packages,
        })
    }

    #[must_use]
    pub fn scratch_dir(&self) -> &Path {
        self.dir.path()
    }

    /// Names (`{key}_{version}`) of all nested package archives.
    pub fn package_names(&self) -> impl Iterator<Item = &str> {
        self.packages.keys().map(String::as_str)
    }

    #[must_use]
    pub fn has_package(&self, identity: &PackageKeyAndVersion) -> bool {
        self.packages.contains_key(&stem_of(identity))
    }

    /// Loads the raw bytes of one nested package archive from the scratch directory.
    pub fn load_package(&self, identity: &PackageKeyAndVersion) -> Result<Vec<u8>, PackportError> {
        let path = self.packages.get(&stem_of(identity)).ok_or_else(|| {
            PackportError::ArchiveEntryMissing {
                name: identity.archive_file_name(),
            }
        })?;
        Ok(fs::read(path)?)
    }

    /// Loads and unpacks one nested package archive.
    pub fn load_payload(
        &self,
        identity: &PackageKeyAndVersion,
    ) -> Result<PackagePayload, PackportError> {
        PackagePayload::from_zip(&self.load_package(identity)?)
    }

    /// Studio record of a package key, if the archive carries one.
    #[must_use]
    pub fn studio_entry(&self, package_key: &str) -> Option<&StudioManifestEntry> {
        self.studio.as_ref()?.iter().find(|entry| entry.package_key == package_key)
    }
}

fn stem_of(identity: &PackageKeyAndVersion) -> String {
    format!("{}_{}", identity.package_key, identity.version)
}

fn nested_package_stem(relative: &Path) -> Option<String> {
    let name = relative.file_name()?.to_str()?;
    name.strip_suffix(".zip").map(str::to_string)
}

fn parse_yaml<T: DeserializeOwned>(dir: &Path, name: &str) -> Result<T, PackportError> {
    let content = fs::read(dir.join(name))?;
    serde_yaml::from_slice(&content).map_err(|e| PackportError::ArchiveError {
        reason: format!("failed to parse {name}: {e}"),
    })
}

fn parse_optional_yaml<T: DeserializeOwned>(
    dir: &Path,
    name: &str,
) -> Result<Option<T>, PackportError> {
    if dir.join(name).is_file() {
        parse_yaml(dir, name).map(Some)
    } else {
        Ok(None)
    }
}
