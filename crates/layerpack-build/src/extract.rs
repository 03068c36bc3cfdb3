use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use zip::ZipArchive;

use crate::stream::copy_chunked;

/// Extract the first entry of `archive` whose name ends with `suffix` to `dest`.
///
/// Only the matched entry is decompressed; the rest of the archive is never
/// read. Returns the name of the matched entry. When nothing matches, no
/// file or directory is created.
pub fn extract_entry(archive: &Path, suffix: &str, dest: &Path) -> Result<String, ExtractError> {
    let file = File::open(archive).map_err(|e| ExtractError::Open {
        path: archive.to_path_buf(),
        source: e,
    })?;
    let mut zip = ZipArchive::new(BufReader::new(file)).map_err(|e| ExtractError::Zip {
        path: archive.to_path_buf(),
        source: e,
    })?;

    let index = find_entry(&mut zip, suffix)
        .map_err(|e| ExtractError::Zip {
            path: archive.to_path_buf(),
            source: e,
        })?
        .ok_or_else(|| ExtractError::EntryNotFound {
            archive: archive.to_path_buf(),
            pattern: suffix.to_owned(),
        })?;

    let mut entry = zip.by_index(index).map_err(|e| ExtractError::Zip {
        path: archive.to_path_buf(),
        source: e,
    })?;
    let name = entry.name().to_owned();
    let mode = entry.unix_mode();
    tracing::debug!(entry = %name, dest = %dest.display(), "extracting entry");

    if let Some(parent) = dest.parent() {
        std::fs::create_dir_all(parent).map_err(|e| ExtractError::Write {
            path: parent.to_path_buf(),
            source: e,
        })?;
    }

    let write_result = File::create(dest).and_then(|mut out| copy_chunked(&mut entry, &mut out));
    let written = match write_result {
        Ok(n) => n,
        Err(e) => {
            if let Err(rm) = std::fs::remove_file(dest) {
                tracing::debug!(error = %rm, "no partial file to remove");
            }
            return Err(ExtractError::Write {
                path: dest.to_path_buf(),
                source: e,
            });
        }
    };

    if let Some(mode) = mode {
        apply_mode(dest, mode).map_err(|e| ExtractError::Write {
            path: dest.to_path_buf(),
            source: e,
        })?;
    }

    tracing::info!(entry = %name, bytes = written, "extracted");
    Ok(name)
}

#[cfg(unix)]
fn apply_mode(path: &Path, mode: u32) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode & 0o777))
}

#[cfg(not(unix))]
fn apply_mode(_path: &Path, _mode: u32) -> std::io::Result<()> {
    Ok(())
}

/// Index of the first non-directory entry, in archive order, ending with `suffix`.
fn find_entry<R: std::io::Read + std::io::Seek>(
    zip: &mut ZipArchive<R>,
    suffix: &str,
) -> zip::result::ZipResult<Option<usize>> {
    for i in 0..zip.len() {
        let entry = zip.by_index_raw(i)?;
        if !entry.is_dir() && entry.name().ends_with(suffix) {
            return Ok(Some(i));
        }
    }
    Ok(None)
}

#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("failed to open archive {path}")]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to read zip archive {path}")]
    Zip {
        path: PathBuf,
        source: zip::result::ZipError,
    },

    #[error("no entry ending with '{pattern}' in {archive}")]
    EntryNotFound { archive: PathBuf, pattern: String },

    #[error("failed to write extracted file {path}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}
