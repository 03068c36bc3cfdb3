use std::path::{Component, Path, PathBuf};

use crate::config::LayerpackConfig;
use crate::{Error, Result};

/// Build root and output root of a single run.
///
/// The output root is never the build root or inside it, so tearing down
/// the build root cannot remove a produced archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspacePaths {
    pub build_root: PathBuf,
    pub output_root: PathBuf,
}

impl WorkspacePaths {
    pub fn new(build_root: impl Into<PathBuf>, output_root: impl Into<PathBuf>) -> Result<Self> {
        let build_root = build_root.into();
        let output_root = output_root.into();

        let build_abs = resolve(&build_root)?;
        let output_abs = resolve(&output_root)?;
        if output_abs.starts_with(&build_abs) {
            return Err(Error::OverlappingRoots {
                build_root,
                output_root,
            });
        }

        let cwd = std::env::current_dir().map_err(|e| Error::fs("read", ".", e))?;
        let cwd = resolve(&cwd)?;
        if cwd.starts_with(&build_abs) {
            return Err(Error::BuildRootContainsCwd { build_root, cwd });
        }

        Ok(Self {
            build_root,
            output_root,
        })
    }

    pub fn from_config(config: &LayerpackConfig) -> Result<Self> {
        Self::new(&config.workspace.build_dir, &config.workspace.output_dir)
    }
}

/// Absolute form of `path` with symlinks and `..` resolved.
///
/// The nearest existing ancestor is canonicalized; the components below it
/// do not exist yet and are normalized lexically.
fn resolve(path: &Path) -> Result<PathBuf> {
    let absolute = std::path::absolute(path).map_err(|e| Error::fs("resolve", path, e))?;

    let mut existing = absolute.as_path();
    let mut tail = Vec::new();
    let base = loop {
        match existing.canonicalize() {
            Ok(base) => break base,
            Err(e) => {
                let (Some(parent), Some(last)) = (existing.parent(), existing.components().next_back())
                else {
                    return Err(Error::fs("resolve", path, e));
                };
                tail.push(last);
                existing = parent;
            }
        }
    };

    let mut resolved = base;
    for component in tail.into_iter().rev() {
        match component {
            Component::ParentDir => {
                resolved.pop();
            }
            Component::Normal(name) => resolved.push(name),
            Component::CurDir | Component::RootDir | Component::Prefix(_) => {}
        }
    }
    Ok(resolved)
}

/// Paths used by the manifest (requirements file) variant.
///
/// ```text
/// <build>/python/...          pip --target
/// <output>/<layer-name>.zip   final archive (contains python/...)
/// ```
#[derive(Debug, Clone)]
pub struct ManifestLayout {
    pub paths: WorkspacePaths,
    pub layer_dir: PathBuf,
    pub archive: PathBuf,
}

impl ManifestLayout {
    pub fn new(config: &LayerpackConfig) -> Result<Self> {
        let paths = WorkspacePaths::from_config(config)?;
        Ok(Self {
            layer_dir: paths.build_root.join("python"),
            archive: paths
                .output_root
                .join(format!("{}.zip", config.layer.name)),
            paths,
        })
    }
}

/// Paths used by the headless browser variant.
///
/// ```text
/// <build>/chrome_pack.zip, <build>/chromedriver_pack.zip       downloads
/// <build>/chrome-layer/{chrome,chromedriver}                    extracted binaries
/// <build>/python-layer/python/lib/python<ver>/site-packages/    pip --target
/// <output>/<chrome-layer-name>.zip, <output>/<deps-layer-name>.zip
/// ```
#[derive(Debug, Clone)]
pub struct BrowserLayout {
    pub paths: WorkspacePaths,
    pub chrome_layer_dir: PathBuf,
    pub python_layer_dir: PathBuf,
    pub site_packages_dir: PathBuf,
    pub chrome_download: PathBuf,
    pub chromedriver_download: PathBuf,
    pub chrome_archive: PathBuf,
    pub deps_archive: PathBuf,
}

impl BrowserLayout {
    pub fn new(config: &LayerpackConfig) -> Result<Self> {
        let paths = WorkspacePaths::from_config(config)?;
        let build = &paths.build_root;
        let output = &paths.output_root;
        let python_layer_dir = build.join("python-layer");
        let site_packages_dir = python_layer_dir
            .join("python")
            .join("lib")
            .join(format!("python{}", config.layer.python_version))
            .join("site-packages");

        Ok(Self {
            chrome_layer_dir: build.join("chrome-layer"),
            site_packages_dir,
            python_layer_dir,
            chrome_download: build.join("chrome_pack.zip"),
            chromedriver_download: build.join("chromedriver_pack.zip"),
            chrome_archive: output.join(format!("{}.zip", config.browser.chrome_layer_name)),
            deps_archive: output.join(format!("{}.zip", config.browser.deps_layer_name)),
            paths,
        })
    }
}

/// Creates and removes the directories of a run.
pub struct Workspace;

impl Workspace {
    /// Create the build and output roots.
    ///
    /// A build root left over from an interrupted run is removed first.
    /// The returned guard removes the build root when released or dropped.
    pub fn prepare(paths: &WorkspacePaths) -> Result<WorkspaceGuard> {
        if paths.build_root.exists() {
            tracing::info!(path = %paths.build_root.display(), "removing stale build directory");
            Self::teardown(&paths.build_root)?;
        }

        ensure_dir(&paths.build_root)?;
        ensure_dir(&paths.output_root)?;
        tracing::debug!(
            build_root = %paths.build_root.display(),
            output_root = %paths.output_root.display(),
            "workspace ready"
        );

        Ok(WorkspaceGuard {
            build_root: paths.build_root.clone(),
            released: false,
        })
    }

    /// Recursively remove `build_root`. Absent directories are not an error.
    pub fn teardown(build_root: &Path) -> Result<()> {
        match std::fs::remove_dir_all(build_root) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::fs("remove", build_root, e)),
        }
    }
}

/// Create `path` and its parents. Existing directories are fine.
pub fn ensure_dir(path: &Path) -> Result<()> {
    std::fs::create_dir_all(path).map_err(|e| Error::fs("create directory", path, e))
}

/// Owns the build root for the duration of a run.
///
/// Teardown happens exactly once: through [`WorkspaceGuard::release`] on the
/// normal path, or in `Drop` when the run unwinds through an error or panic.
#[derive(Debug)]
#[must_use = "dropping the guard removes the build directory immediately"]
pub struct WorkspaceGuard {
    build_root: PathBuf,
    released: bool,
}

impl WorkspaceGuard {
    pub fn build_root(&self) -> &Path {
        &self.build_root
    }

    /// Remove the build root, reporting failure to the caller.
    pub fn release(mut self) -> Result<()> {
        self.released = true;
        Workspace::teardown(&self.build_root)?;
        tracing::debug!(path = %self.build_root.display(), "build directory removed");
        Ok(())
    }
}

impl Drop for WorkspaceGuard {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        match Workspace::teardown(&self.build_root) {
            Ok(()) => {
                tracing::debug!(path = %self.build_root.display(), "build directory removed")
            }
            Err(e) => tracing::warn!(error = %e, "failed to remove build directory"),
        }
    }
}
