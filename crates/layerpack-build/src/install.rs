use std::path::{Path, PathBuf};

use layerpack_core::{CommandOutput, CommandRunner, ExecError, Invocation, LayerConfig, RealRunner};

/// Runtime triple pip must produce wheels for, independent of the build host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetPlatform {
    pub python_version: String,
    pub platform: String,
    pub implementation: String,
}

impl TargetPlatform {
    pub fn from_layer(layer: &LayerConfig) -> Self {
        Self {
            python_version: layer.python_version.clone(),
            platform: layer.platform.clone(),
            implementation: layer.implementation.clone(),
        }
    }
}

/// Installs Python packages into a layer directory via `<python> -m pip`.
pub struct PipInstaller<R: CommandRunner = RealRunner> {
    runner: R,
    python: String,
}

impl PipInstaller<RealRunner> {
    pub fn new(python: impl Into<String>) -> Self {
        Self::with_runner(RealRunner, python)
    }
}

impl<R: CommandRunner> PipInstaller<R> {
    pub fn with_runner(runner: R, python: impl Into<String>) -> Self {
        Self {
            runner,
            python: python.into(),
        }
    }

    /// Build the single pip call that installs a requirements file.
    ///
    /// Binary wheels only, for an explicit platform, implementation and
    /// Python version, so the result runs on the target even when the
    /// build host differs.
    pub fn manifest_invocation(
        &self,
        manifest: &Path,
        target_dir: &Path,
        target: &TargetPlatform,
    ) -> Result<Invocation, InstallError> {
        Ok(self.pip().args([
            "--platform",
            target.platform.as_str(),
            "--implementation",
            target.implementation.as_str(),
            "--python-version",
            target.python_version.as_str(),
            "--only-binary=:all:",
            "--requirement",
            path_arg(manifest)?,
            "--target",
            path_arg(target_dir)?,
        ]))
    }

    /// Build the pip call for a single package.
    ///
    /// Unlike [`Self::manifest_invocation`] no platform constraints are applied.
    pub fn package_invocation(
        &self,
        package: &str,
        target_dir: &Path,
    ) -> Result<Invocation, InstallError> {
        Ok(self
            .pip()
            .args([package, "--target", path_arg(target_dir)?]))
    }

    pub async fn install_manifest(
        &self,
        manifest: &Path,
        target_dir: &Path,
        target: &TargetPlatform,
    ) -> Result<(), InstallError> {
        tracing::info!(
            manifest = %manifest.display(),
            python_version = %target.python_version,
            platform = %target.platform,
            "installing requirements"
        );
        let invocation = self.manifest_invocation(manifest, target_dir, target)?;
        let output = self.run(&invocation).await?;
        check(&invocation, output, None)
    }

    /// Install each package with its own pip call, stopping at the first failure.
    pub async fn install_packages(
        &self,
        packages: &[String],
        target_dir: &Path,
    ) -> Result<(), InstallError> {
        for package in packages {
            tracing::info!(%package, "installing package");
            let invocation = self.package_invocation(package, target_dir)?;
            let output = self.run(&invocation).await?;
            check(&invocation, output, Some(package))?;
        }
        Ok(())
    }

    fn pip(&self) -> Invocation {
        Invocation::new(&self.python).args(["-m", "pip", "install"])
    }

    async fn run(&self, invocation: &Invocation) -> Result<CommandOutput, InstallError> {
        tracing::debug!(command = %invocation.command_line(), "running pip");
        self.runner.run(invocation).await.map_err(|e| match e {
            ExecError::NotFound { program, source } => {
                InstallError::ToolNotFound { program, source }
            }
            ExecError::Spawn { program, source } => InstallError::Spawn { program, source },
        })
    }
}

fn check(
    invocation: &Invocation,
    output: CommandOutput,
    package: Option<&String>,
) -> Result<(), InstallError> {
    if output.success() {
        if !output.stdout.trim().is_empty() {
            tracing::debug!(stdout = %output.stdout.trim(), "pip output");
        }
        return Ok(());
    }
    Err(InstallError::Failed {
        package: package.cloned(),
        command: invocation.command_line(),
        status: output.status_label(),
        stderr: output.diagnostic(),
    })
}

fn path_arg(path: &Path) -> Result<&str, InstallError> {
    path.to_str()
        .ok_or_else(|| InstallError::InvalidPath(path.to_path_buf()))
}

#[derive(Debug, thiserror::Error)]
pub enum InstallError {
    #[error("installer `{program}` not found; is Python installed and on PATH?")]
    ToolNotFound {
        program: String,
        source: std::io::Error,
    },

    #[error("failed to start installer `{program}`")]
    Spawn {
        program: String,
        source: std::io::Error,
    },

    #[error(
        "pip install failed{} ({status}): {command}\n{stderr}",
        package.as_deref().map(|p| format!(" for package '{p}'")).unwrap_or_default()
    )]
    Failed {
        package: Option<String>,
        command: String,
        status: String,
        stderr: String,
    },

    #[error("path is not valid UTF-8: {0}")]
    InvalidPath(PathBuf),
}
