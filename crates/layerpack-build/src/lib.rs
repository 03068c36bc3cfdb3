//! Dependency acquisition and archive assembly for layerpack.
//!
//! # Manifest layer
//!
//! ```text
//! layerpack build
//!   1. Workspace  ── <build>/python/
//!   2. Install    ── pip install --only-binary=:all: --platform ... -r requirements.txt
//!   3. Archive    ── <build>/ → <output>/<layer>.zip
//!   4. Publish    ── aws lambda publish-layer-version (layerpack-cloud)
//! ```
//!
//! # Browser layer
//!
//! ```text
//! layerpack browser
//!   1. Workspace  ── <build>/chrome-layer/, <build>/python-layer/
//!   2. Download   ── chrome-linux64.zip, chromedriver-linux64.zip
//!   3. Extract    ── only the `chrome` / `chromedriver` entries
//!   4. Install    ── pip install <pkg> --target .../site-packages (one call per package)
//!   5. Archive    ── two zips, binaries marked 0755
//! ```
//!
//! Large payloads are always moved in bounded chunks: HTTP bodies are
//! written chunk by chunk, and binary entries are copied through a
//! fixed-size buffer both when extracting and when archiving.

pub mod archive;
pub mod download;
pub mod extract;
pub mod install;

mod stream;

pub use archive::{ArchiveEntry, ArchiveError, EXECUTABLE_NAMES};
pub use download::{DownloadError, Downloader};
pub use extract::{ExtractError, extract_entry};
pub use install::{InstallError, PipInstaller, TargetPlatform};
