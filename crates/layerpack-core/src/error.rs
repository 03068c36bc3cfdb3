use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to load config from {path}")]
    ConfigLoad {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config at {path}")]
    ConfigParse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("invalid config value for `{field}`: {reason}")]
    InvalidConfig { field: &'static str, reason: String },

    // ── Workspace ──
    #[error("failed to {action} {path}")]
    Filesystem {
        action: &'static str,
        path: PathBuf,
        source: std::io::Error,
    },

    #[error(
        "output directory {output_root} must not be inside build directory {build_root}; \
         it would be removed during cleanup"
    )]
    OverlappingRoots {
        build_root: PathBuf,
        output_root: PathBuf,
    },

    #[error("build directory {build_root} contains the working directory {cwd}; it would be removed during cleanup")]
    BuildRootContainsCwd { build_root: PathBuf, cwd: PathBuf },
}

impl Error {
    pub(crate) fn fs(action: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Filesystem {
            action,
            path: path.into(),
            source,
        }
    }
}
