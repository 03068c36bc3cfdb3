use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::stream::copy_chunked;

/// Base names that the Lambda runtime executes directly.
pub const EXECUTABLE_NAMES: &[&str] = &["chrome", "chromedriver"];

/// `rwxr-xr-x`
pub const EXECUTABLE_MODE: u32 = 0o755;

/// `rw-r--r--`
pub const DEFAULT_MODE: u32 = 0o644;

/// One file to be written into a layer archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    /// Path inside the archive, relative to the source root, `/`-separated.
    pub name: String,
    pub source: PathBuf,
    pub mode: u32,
}

impl ArchiveEntry {
    pub fn is_executable(&self) -> bool {
        self.mode == EXECUTABLE_MODE
    }
}

pub fn is_executable_name(file_name: &str) -> bool {
    EXECUTABLE_NAMES.contains(&file_name)
}

/// Enumerate every regular file under `source_root`.
///
/// Entries are sorted by path so the archive layout is identical across runs.
/// Symlinks are followed and archived with the content they point to under
/// the link's own path; directories produce no entries.
pub fn collect_entries(source_root: &Path) -> Result<Vec<ArchiveEntry>, ArchiveError> {
    let mut entries = Vec::new();

    for item in WalkDir::new(source_root).follow_links(true).sort_by_file_name() {
        let item = item.map_err(|e| ArchiveError::Walk {
            root: source_root.to_path_buf(),
            source: e,
        })?;
        if item.file_type().is_dir() {
            continue;
        }
        if !item.file_type().is_file() {
            tracing::debug!(path = %item.path().display(), "skipping special file");
            continue;
        }

        let relative = item
            .path()
            .strip_prefix(source_root)
            .map_err(|_| ArchiveError::InvalidPath(item.path().to_path_buf()))?;
        let name = posix_name(relative)?;
        let executable = item
            .file_name()
            .to_str()
            .is_some_and(is_executable_name);

        entries.push(ArchiveEntry {
            name,
            source: item.path().to_path_buf(),
            mode: if executable {
                EXECUTABLE_MODE
            } else {
                DEFAULT_MODE
            },
        });
    }

    Ok(entries)
}

fn posix_name(relative: &Path) -> Result<String, ArchiveError> {
    let parts = relative
        .components()
        .map(|c| c.as_os_str().to_str())
        .collect::<Option<Vec<_>>>()
        .ok_or_else(|| ArchiveError::InvalidPath(relative.to_path_buf()))?;
    Ok(parts.join("/"))
}

/// Write `entries` into a DEFLATE-compressed zip at `dest`.
///
/// Executable entries are streamed through a fixed-size buffer; other files
/// are read whole. An archive left incomplete by an error is removed.
pub fn write_archive(entries: &[ArchiveEntry], dest: &Path) -> Result<(), ArchiveError> {
    if let Some(parent) = dest.parent() {
        std::fs::create_dir_all(parent).map_err(|e| ArchiveError::Io {
            path: parent.to_path_buf(),
            source: e,
        })?;
    }

    let file = File::create(dest).map_err(|e| ArchiveError::Io {
        path: dest.to_path_buf(),
        source: e,
    })?;

    let result = write_entries(ZipWriter::new(file), entries, dest);
    if result.is_err() {
        if let Err(rm) = std::fs::remove_file(dest) {
            tracing::warn!(error = %rm, dest = %dest.display(), "failed to remove incomplete archive");
        }
    }
    result
}

fn write_entries(
    mut zip: ZipWriter<File>,
    entries: &[ArchiveEntry],
    dest: &Path,
) -> Result<(), ArchiveError> {
    let zip_err = |e: zip::result::ZipError| ArchiveError::Zip {
        path: dest.to_path_buf(),
        source: e,
    };

    for entry in entries {
        let io_err = |e: std::io::Error| ArchiveError::Io {
            path: entry.source.clone(),
            source: e,
        };

        let size = std::fs::metadata(&entry.source).map_err(io_err)?.len();
        let options = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .unix_permissions(entry.mode)
            .large_file(size > u64::from(u32::MAX));

        zip.start_file(entry.name.as_str(), options)
            .map_err(zip_err)?;

        if entry.is_executable() {
            let mut src = File::open(&entry.source).map_err(io_err)?;
            copy_chunked(&mut src, &mut zip).map_err(io_err)?;
        } else {
            let content = std::fs::read(&entry.source).map_err(io_err)?;
            zip.write_all(&content).map_err(io_err)?;
        }
        tracing::debug!(entry = %entry.name, mode = format_args!("{:o}", entry.mode), "archived");
    }

    zip.finish().map_err(zip_err)?;
    Ok(())
}

/// Archive every file under `source_root` into `dest`.
pub fn assemble(source_root: &Path, dest: &Path) -> Result<Vec<ArchiveEntry>, ArchiveError> {
    tracing::info!(
        source = %source_root.display(),
        dest = %dest.display(),
        "packaging layer"
    );
    let entries = collect_entries(source_root)?;
    write_archive(&entries, dest)?;

    let executables = entries.iter().filter(|e| e.is_executable()).count();
    tracing::info!(
        entries = entries.len(),
        executables,
        dest = %dest.display(),
        "archive written"
    );
    Ok(entries)
}

#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    #[error("failed to walk {root}")]
    Walk {
        root: PathBuf,
        source: walkdir::Error,
    },

    #[error("path cannot be stored in the archive: {0}")]
    InvalidPath(PathBuf),

    #[error("I/O error on {path}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to write zip archive {path}")]
    Zip {
        path: PathBuf,
        source: zip::result::ZipError,
    },
}
