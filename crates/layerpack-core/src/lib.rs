//! Core types and configuration for layerpack.
//!
//! This crate defines the `layer.toml` schema ([`LayerpackConfig`]),
//! the build/output directory handling ([`Workspace`]), the subprocess
//! seam shared by the installer and publisher ([`CommandRunner`]),
//! and shared error types.

pub mod config;
pub mod error;
pub mod exec;
pub mod workspace;

pub use config::{BrowserConfig, LayerConfig, LayerpackConfig, ManifestConfig, WorkspaceConfig};
pub use error::{Error, Result};
pub use exec::{CommandOutput, CommandRunner, ExecError, Invocation, RealRunner};
pub use workspace::{BrowserLayout, ManifestLayout, Workspace, WorkspaceGuard, WorkspacePaths};
