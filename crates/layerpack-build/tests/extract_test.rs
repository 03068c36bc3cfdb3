use std::fs::File;
use std::io::Write;
use std::path::Path;

use layerpack_build::{ExtractError, extract_entry};
use tempfile::TempDir;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

/// Build a zip shaped like the Chrome for Testing downloads.
fn write_zip(path: &Path, entries: &[(&str, &str, u32)]) {
    let file = File::create(path).unwrap();
    let mut zip = ZipWriter::new(file);
    for (name, content, mode) in entries {
        let options = SimpleFileOptions::default()
            .compression_method(zip::CompressionMethod::Deflated)
            .unix_permissions(*mode);
        zip.start_file(*name, options).unwrap();
        zip.write_all(content.as_bytes()).unwrap();
    }
    zip.finish().unwrap();
}

fn chrome_pack(dir: &Path) -> std::path::PathBuf {
    let path = dir.join("chrome_pack.zip");
    write_zip(
        &path,
        &[
            ("chrome-linux64/chrome_crashpad_handler", "crashpad", 0o755),
            ("chrome-linux64/chrome", "CHROME-BINARY", 0o755),
            ("chrome-linux64/locales/en-US.pak", "locale", 0o644),
            ("other/chrome", "SECOND", 0o755),
        ],
    );
    path
}

#[test]
fn extracts_first_matching_entry_only() {
    let tmp = TempDir::new().unwrap();
    let archive = chrome_pack(tmp.path());
    let dest = tmp.path().join("chrome-layer/chrome");

    let name = extract_entry(&archive, "/chrome", &dest).unwrap();

    assert_eq!(name, "chrome-linux64/chrome");
    assert_eq!(std::fs::read(&dest).unwrap(), b"CHROME-BINARY");
    let siblings: Vec<_> = std::fs::read_dir(tmp.path().join("chrome-layer"))
        .unwrap()
        .collect();
    assert_eq!(siblings.len(), 1);
}

#[test]
fn suffix_does_not_match_longer_names() {
    let tmp = TempDir::new().unwrap();
    let archive = tmp.path().join("driver.zip");
    write_zip(
        &archive,
        &[
            ("chromedriver-linux64/LICENSE.chromedriver", "license", 0o644),
            ("chromedriver-linux64/chromedriver", "DRIVER", 0o755),
        ],
    );
    let dest = tmp.path().join("chromedriver");

    let name = extract_entry(&archive, "/chromedriver", &dest).unwrap();

    assert_eq!(name, "chromedriver-linux64/chromedriver");
    assert_eq!(std::fs::read(&dest).unwrap(), b"DRIVER");
}

#[cfg(unix)]
#[test]
fn extracted_file_keeps_recorded_mode() {
    use std::os::unix::fs::PermissionsExt;

    let tmp = TempDir::new().unwrap();
    let archive = chrome_pack(tmp.path());
    let dest = tmp.path().join("chrome");

    extract_entry(&archive, "/chrome", &dest).unwrap();

    let mode = std::fs::metadata(&dest).unwrap().permissions().mode();
    assert_eq!(mode & 0o777, 0o755);
}

#[test]
fn missing_entry_is_error_and_writes_nothing() {
    let tmp = TempDir::new().unwrap();
    let archive = chrome_pack(tmp.path());
    let dest_dir = tmp.path().join("chrome-layer");
    let dest = dest_dir.join("chromedriver");

    let result = extract_entry(&archive, "/chromedriver", &dest);

    assert!(matches!(
        result,
        Err(ExtractError::EntryNotFound { ref pattern, .. }) if pattern == "/chromedriver"
    ));
    assert!(!dest.exists());
    assert!(!dest_dir.exists());
}

#[test]
fn directory_entries_are_not_selected() {
    let tmp = TempDir::new().unwrap();
    let archive = tmp.path().join("dirs.zip");
    {
        let file = File::create(&archive).unwrap();
        let mut zip = ZipWriter::new(file);
        zip.add_directory("pack/chrome", SimpleFileOptions::default())
            .unwrap();
        zip.finish().unwrap();
    }

    let result = extract_entry(&archive, "chrome/", &tmp.path().join("out"));

    assert!(matches!(result, Err(ExtractError::EntryNotFound { .. })));
}

#[test]
fn missing_archive_is_open_error() {
    let tmp = TempDir::new().unwrap();
    let result = extract_entry(
        &tmp.path().join("absent.zip"),
        "/chrome",
        &tmp.path().join("chrome"),
    );

    assert!(matches!(result, Err(ExtractError::Open { .. })));
}

#[test]
fn corrupt_archive_is_zip_error() {
    let tmp = TempDir::new().unwrap();
    let archive = tmp.path().join("broken.zip");
    std::fs::write(&archive, b"<html>not a zip</html>").unwrap();

    let result = extract_entry(&archive, "/chrome", &tmp.path().join("chrome"));

    assert!(matches!(result, Err(ExtractError::Zip { .. })));
}
