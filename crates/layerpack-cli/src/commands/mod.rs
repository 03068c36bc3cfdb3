mod browser;
mod build;
mod stage;
mod whoami;

use std::path::{Path, PathBuf};

use anyhow::Context;
use layerpack_core::LayerpackConfig;

pub use browser::browser;
pub use build::build;
pub use whoami::whoami;

/// Options shared by every command that reads `layer.toml`.
#[derive(Debug, Default, clap::Args)]
pub struct ConfigArgs {
    /// Path to the configuration file (default: ./layer.toml when present)
    #[arg(long, short = 'c', value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// AWS region
    #[arg(long)]
    pub region: Option<String>,
}

/// Layer settings that can be overridden from the command line.
#[derive(Debug, Default, clap::Args)]
pub struct LayerArgs {
    #[command(flatten)]
    pub config: ConfigArgs,

    /// Target Python version of the Lambda runtime (e.g. 3.13)
    #[arg(long, value_name = "VERSION")]
    pub python_version: Option<String>,

    /// Python interpreter used to run pip
    #[arg(long, value_name = "PROGRAM")]
    pub python: Option<String>,

    /// Directory used for temporary build files (removed after the run)
    #[arg(long, value_name = "DIR")]
    pub build_dir: Option<PathBuf>,

    /// Directory receiving the final archives
    #[arg(long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,
}

impl ConfigArgs {
    /// Load the configuration file and apply the region override.
    pub(crate) fn load(&self) -> anyhow::Result<LayerpackConfig> {
        let config = self.read()?;
        config.validate().context("invalid configuration")?;
        Ok(config)
    }

    fn read(&self) -> anyhow::Result<LayerpackConfig> {
        let mut config = match &self.config {
            Some(path) => LayerpackConfig::load_file(path)?,
            None => LayerpackConfig::load(Path::new("."))?,
        };
        if let Some(region) = &self.region {
            config.layer.region = region.clone();
        }
        Ok(config)
    }
}

impl LayerArgs {
    pub(crate) fn load(&self) -> anyhow::Result<LayerpackConfig> {
        let mut config = self.config.read()?;
        self.apply(&mut config);
        config.validate().context("invalid configuration")?;
        Ok(config)
    }

    pub(crate) fn apply(&self, config: &mut LayerpackConfig) {
        if let Some(version) = &self.python_version {
            config.layer.python_version = version.clone();
        }
        if let Some(python) = &self.python {
            config.layer.python = python.clone();
        }
        if let Some(dir) = &self.build_dir {
            config.workspace.build_dir = dir.clone();
        }
        if let Some(dir) = &self.output_dir {
            config.workspace.output_dir = dir.clone();
        }
    }
}

/// Print the step banner shown before each pipeline step.
pub(crate) fn step(message: &str) {
    println!("==> {message}");
}
