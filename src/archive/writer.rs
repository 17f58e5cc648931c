use std::collections::BTreeSet;
use std::io::{Cursor, Write};

use serde::Serialize;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use super::{ArchiveContents, PackageArchive};
use crate::constants::{MANIFEST_FILE_NAME, STUDIO_FILE_NAME, VARIABLES_FILE_NAME};
use crate::core::PackportError;
use crate::models::PackageKeyAndVersion;

pub(super) fn write(contents: &ArchiveContents) -> Result<Vec<u8>, PackportError> {
    check_consistency(contents)?;

    let mut packages: Vec<&PackageArchive> = contents.packages.iter().collect();
    packages.sort_by(|a, b| a.identity.cmp(&b.identity));

    let mut cursor = Cursor::new(Vec::new());
    {
        let mut zip = ZipWriter::new(&mut cursor);
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

        write_yaml(&mut zip, MANIFEST_FILE_NAME, &contents.manifest, options)?;
        if let Some(studio) = &contents.studio {
            write_yaml(&mut zip, STUDIO_FILE_NAME, studio, options)?;
        }
        if let Some(variables) = &contents.variables {
            write_yaml(&mut zip, VARIABLES_FILE_NAME, variables, options)?;
        }

        for package in packages {
            let nested = package.payload.to_zip()?;
            zip.start_file(package.identity.archive_file_name(), options)?;
            zip.write_all(&nested)?;
        }

        zip.finish()?;
    }

    Ok(cursor.into_inner())
}

fn write_yaml<W, T>(
    zip: &mut ZipWriter<W>,
    name: &str,
    value: &T,
    options: SimpleFileOptions,
) -> Result<(), PackportError>
where
    W: Write + std::io::Seek,
    T: Serialize + ?Sized,
{
    let yaml = serde_yaml::to_string(value)?;
    zip.start_file(name, options)?;
    zip.write_all(yaml.as_bytes())?;
    Ok(())
}

/// Every manifest version must have exactly one nested archive and every nested
/// archive must be listed in the manifest.
fn check_consistency(contents: &ArchiveContents) -> Result<(), PackportError> {
    let listed: BTreeSet<PackageKeyAndVersion> = contents
        .manifest
        .iter()
        .flat_map(|entry| {
            entry.versions().map(|version| PackageKeyAndVersion::new(&entry.package_key, version))
        })
        .collect();

    let mut bundled = BTreeSet::new();
    for package in &contents.packages {
        if !bundled.insert(package.identity.clone()) {
            return Err(PackportError::ArchiveError {
                reason: format!("package {} is bundled twice", package.identity),
            });
        }
    }

    if let Some(missing) = listed.difference(&bundled).next() {
        return Err(PackportError::ArchiveError {
            reason: format!("manifest lists {missing} but no package archive was provided"),
        });
    }
    if let Some(unlisted) = bundled.difference(&listed).next() {
        return Err(PackportError::ArchiveError {
            reason: format!("package {unlisted} is not listed in the manifest"),
        });
    }

    Ok(())
}
