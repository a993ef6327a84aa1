// tests/common/mod.rs
// Shared test utilities for integration tests
#![allow(dead_code)]

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::{NamedTempFile, TempDir};

fn binary_path() -> &'static str {
    // Use the built binary directly instead of cargo run to avoid compilation output
    if cfg!(debug_assertions) {
        "./target/debug/httpd-logparser"
    } else {
        "./target/release/httpd-logparser"
    }
}

/// Run httpd-logparser with the given arguments
pub fn run_logparser(args: &[&str]) -> (String, String, i32) {
    let output = Command::new(binary_path())
        .args(args)
        .output()
        .expect("Failed to execute httpd-logparser");

    (
        String::from_utf8_lossy(&output.stdout).to_string(),
        String::from_utf8_lossy(&output.stderr).to_string(),
        output.status.code().unwrap_or(-1),
    )
}

/// Run httpd-logparser on a temporary log file passed with `-f`
pub fn run_logparser_with_file(args: &[&str], file_content: &str) -> (String, String, i32) {
    let mut temp_file = NamedTempFile::new().expect("Failed to create temp file");
    temp_file
        .write_all(file_content.as_bytes())
        .expect("Failed to write to temp file");

    let path = temp_file.path().to_str().unwrap().to_string();
    let mut full_args = vec!["-f", path.as_str()];
    full_args.extend_from_slice(args);
    run_logparser(&full_args)
}

/// Write a file into a test directory and return its path
pub fn write_file(dir: &TempDir, name: &str, content: &str) -> String {
    let path = dir.path().join(name);
    fs::write(&path, content).expect("Failed to write test file");
    path.to_string_lossy().to_string()
}

/// Write a gzip compressed file into a test directory
pub fn write_gzip_file(dir: &TempDir, name: &str, content: &str) -> String {
    use flate2::write::GzEncoder;
    use flate2::Compression;

    let path = dir.path().join(name);
    let file = fs::File::create(&path).expect("Failed to create gzip file");
    let mut encoder = GzEncoder::new(file, Compression::default());
    encoder
        .write_all(content.as_bytes())
        .expect("Failed to write gzip data");
    encoder.finish().expect("Failed to finish gzip stream");
    path.to_string_lossy().to_string()
}

/// One access log line in the default format
pub fn access_line(host: &str, time: &str, request: &str, status: u16, agent: &str) -> String {
    format!(
        r#"{} - - [{} +0000] "{}" {} 512 "-" "{}" -"#,
        host, time, request, status, agent
    )
}

/// Fake geoiplookup that knows two countries: 1.x.x.x is France, anything
/// else is Germany.
#[cfg(unix)]
pub fn fake_geotool(dir: &TempDir) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let script = r#"#!/bin/sh
case "$3" in
  1.*)
    echo "GeoIP Country Edition: FR, France"
    echo "GeoIP City Edition, Rev 1: FR, 11, Ile-de-France, Paris, 75001, 48.8582, 2.3387, 0, 0"
    ;;
  *)
    echo "GeoIP Country Edition: DE, Germany"
    echo "GeoIP City Edition, Rev 1: DE, N/A, N/A, N/A, N/A, 51.2993, 9.4910, 0, 0"
    ;;
esac
"#;
    let path = dir.path().join("geoiplookup");
    fs::write(&path, script).expect("Failed to write fake geotool");
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755))
        .expect("Failed to make fake geotool executable");
    path
}

pub fn lines(output: &str) -> Vec<&str> {
    output.lines().filter(|l| !l.is_empty()).collect()
}

pub fn path_str(path: &Path) -> String {
    path.to_string_lossy().to_string()
}
