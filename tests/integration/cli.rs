//! Tests of the compiled `packport` binary.

use std::io::{BufRead, BufReader, Write};
use std::net::TcpListener;
use std::path::Path;

use assert_cmd::Command;
use packport::archive::{ArchiveCodec, ArchiveContents, PackageArchive, PackagePayload};
use packport::models::{ManifestEntry, PackageKeyAndVersion, SpaceDescriptor};
use packport::test_utils::fixtures::package_zip;
use predicates::prelude::*;
use tempfile::TempDir;

/// A `packport` command isolated from the user's profiles and environment.
fn packport(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("packport").unwrap();
    cmd.current_dir(dir)
        .env_remove("PACKPORT_URL")
        .env_remove("PACKPORT_TOKEN")
        .env_remove("PACKPORT_PROFILE")
        .env("PACKPORT_CONFIG_PATH", dir.join("config.toml"))
        .env("PACKPORT_NO_PROGRESS", "1");
    cmd
}

fn write_archive(path: &Path) {
    write_archive_in_space(path, None);
}

fn write_archive_in_space(path: &Path, space: Option<SpaceDescriptor>) {
    let mut entry = ManifestEntry {
        package_key: "key-1".into(),
        space,
        ..Default::default()
    };
    entry.dependencies_by_version.insert("1.0.0".into(), Vec::new());

    let contents = ArchiveContents {
        manifest: vec![entry],
        packages: vec![PackageArchive {
            identity: PackageKeyAndVersion::new("key-1", "1.0.0"),
            payload: PackagePayload::from_zip(&package_zip("key-1", "1.0.0", &[])).unwrap(),
        }],
        ..Default::default()
    };
    std::fs::write(path, ArchiveCodec::write(&contents).unwrap()).unwrap();
}

/// Serves canned JSON bodies on a local port, choosing the body by the last
/// path segment of each request. Returns the base URL.
fn serve_json(routes: &'static [(&'static str, &'static str)]) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let url = format!("http://{}", listener.local_addr().unwrap());

    std::thread::spawn(move || {
        for stream in listener.incoming() {
            let Ok(mut stream) = stream else { continue };
            let mut reader = BufReader::new(stream.try_clone().unwrap());
            let mut request_line = String::new();
            if reader.read_line(&mut request_line).is_err() {
                continue;
            }
            loop {
                let mut header = String::new();
                match reader.read_line(&mut header) {
                    Ok(0) | Err(_) => break,
                    Ok(_) if header == "\r\n" => break,
                    Ok(_) => {}
                }
            }

            let path = request_line.split_whitespace().nth(1).unwrap_or_default();
            let path = path.split('?').next().unwrap_or_default();
            let (status, body) = routes
                .iter()
                .find(|(segment, _)| path.ends_with(segment))
                .map_or(("404 Not Found", "{}"), |(_, body)| ("200 OK", *body));
            let response = format!(
                "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            let _ = stream.write_all(response.as_bytes());
        }
    });

    url
}

#[test]
fn test_help_lists_commands() {
    let temp = TempDir::new().unwrap();
    packport(temp.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("config"))
        .stdout(predicate::str::contains("profile"));
}

#[test]
fn test_export_requires_package_keys() {
    let temp = TempDir::new().unwrap();
    packport(temp.path())
        .args(["config", "export"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--packageKeys"));
}

#[test]
fn test_import_missing_file_fails() {
    let temp = TempDir::new().unwrap();
    packport(temp.path())
        .args(["config", "import", "-f", "missing.zip"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("File not found"));
}

#[test]
fn test_import_rejects_malformed_space_mapping() {
    let temp = TempDir::new().unwrap();
    write_archive(&temp.path().join("export.zip"));

    packport(temp.path())
        .args(["config", "import", "-f", "export.zip", "--spaceMappings", "no-separator"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Invalid space mapping"));
}

#[test]
fn test_corrupt_archive_rejected() {
    let temp = TempDir::new().unwrap();
    std::fs::write(temp.path().join("broken.zip"), b"not a zip").unwrap();

    packport(temp.path())
        .args(["config", "diff", "-f", "broken.zip"])
        .assert()
        .code(1);
}

#[test]
fn test_export_without_profile_fails() {
    let temp = TempDir::new().unwrap();
    packport(temp.path())
        .args(["config", "export", "--packageKeys", "key-1"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("No profile selected"));

    let leftovers = std::fs::read_dir(temp.path()).unwrap().count();
    assert_eq!(leftovers, 0);
}

#[test]
fn test_profile_add_and_list() {
    let temp = TempDir::new().unwrap();
    packport(temp.path())
        .args(["profile", "add", "staging", "--url", "https://staging.example.com", "--token", "abcd1234"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Saved profile"));

    assert!(temp.path().join("config.toml").exists());

    packport(temp.path())
        .args(["profile", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("staging"))
        .stdout(predicate::str::contains("****1234"))
        .stdout(predicate::str::contains("abcd1234").not());
}

#[test]
fn test_unknown_default_profile_fails() {
    let temp = TempDir::new().unwrap();
    packport(temp.path())
        .args(["profile", "default", "nope"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Profile 'nope' not found"));
}

#[test]
fn test_import_into_unknown_space_id_writes_no_report() {
    let temp = TempDir::new().unwrap();
    let space = SpaceDescriptor {
        id: Some("missing-id".into()),
        ..Default::default()
    };
    write_archive_in_space(&temp.path().join("export.zip"), Some(space));
    let url = serve_json(&[
        ("/package-manager/api/packages", "[]"),
        ("/package-manager/api/spaces", r#"[{"id":"s-1","name":"Finance"}]"#),
    ]);

    packport(temp.path())
        .env("PACKPORT_URL", url)
        .env("PACKPORT_TOKEN", "token-1234")
        .args(["config", "import", "-f", "export.zip"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Provided space ID does not exist."));

    let reports = std::fs::read_dir(temp.path())
        .unwrap()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_name().to_string_lossy().starts_with("config_import_report_"))
        .count();
    assert_eq!(reports, 0);
}
