use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Name of the configuration file looked up in the project directory.
pub const CONFIG_FILE_NAME: &str = "layer.toml";

const CHROME_FOR_TESTING_BASE: &str = "https://storage.googleapis.com/chrome-for-testing-public";

/// layer.toml configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LayerpackConfig {
    #[serde(default)]
    pub layer: LayerConfig,
    #[serde(default)]
    pub workspace: WorkspaceConfig,
    #[serde(default)]
    pub manifest: ManifestConfig,
    #[serde(default)]
    pub browser: BrowserConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayerConfig {
    /// Layer name registered with AWS Lambda
    #[serde(default = "default_layer_name")]
    pub name: String,
    /// Python runtime version the layer targets (e.g. "3.13")
    #[serde(default = "default_python_version")]
    pub python_version: String,
    /// pip `--platform` tag for binary wheels
    #[serde(default = "default_platform")]
    pub platform: String,
    /// pip `--implementation` tag
    #[serde(default = "default_implementation")]
    pub implementation: String,
    /// AWS region the layer is published to
    #[serde(default = "default_region")]
    pub region: String,
    /// Python interpreter used to run pip
    #[serde(default = "default_python")]
    pub python: String,
    /// Layer version description (defaults to "Dependencies from <manifest>")
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkspaceConfig {
    /// Ephemeral build root, removed at the end of every run
    #[serde(default = "default_build_dir")]
    pub build_dir: PathBuf,
    /// Directory receiving the final archives; survives cleanup
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestConfig {
    /// Path to the requirements file
    #[serde(default = "default_requirements")]
    pub requirements: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserConfig {
    /// Chrome for Testing release used to derive download URLs
    #[serde(default = "default_chrome_version")]
    pub chrome_version: String,
    /// Overrides the derived chrome archive URL
    #[serde(default)]
    pub chrome_url: Option<String>,
    /// Overrides the derived chromedriver archive URL
    #[serde(default)]
    pub chromedriver_url: Option<String>,
    /// Python packages installed into the dependency layer, one pip call each
    #[serde(default = "default_browser_packages")]
    pub packages: Vec<String>,
    #[serde(default = "default_chrome_layer_name")]
    pub chrome_layer_name: String,
    #[serde(default = "default_deps_layer_name")]
    pub deps_layer_name: String,
}

impl Default for LayerConfig {
    fn default() -> Self {
        Self {
            name: default_layer_name(),
            python_version: default_python_version(),
            platform: default_platform(),
            implementation: default_implementation(),
            region: default_region(),
            python: default_python(),
            description: None,
        }
    }
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            build_dir: default_build_dir(),
            output_dir: default_output_dir(),
        }
    }
}

impl Default for ManifestConfig {
    fn default() -> Self {
        Self {
            requirements: default_requirements(),
        }
    }
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            chrome_version: default_chrome_version(),
            chrome_url: None,
            chromedriver_url: None,
            packages: default_browser_packages(),
            chrome_layer_name: default_chrome_layer_name(),
            deps_layer_name: default_deps_layer_name(),
        }
    }
}

impl LayerpackConfig {
    /// Load from layer.toml in the given directory, or return defaults if not found.
    pub fn load(project_dir: &Path) -> crate::Result<Self> {
        let config_path = project_dir.join(CONFIG_FILE_NAME);
        if config_path.exists() {
            Self::load_file(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load from an explicit config file. The file must exist.
    pub fn load_file(config_path: &Path) -> crate::Result<Self> {
        let content =
            std::fs::read_to_string(config_path).map_err(|e| crate::Error::ConfigLoad {
                path: config_path.to_path_buf(),
                source: e,
            })?;
        let config: Self = toml::from_str(&content).map_err(|e| crate::Error::ConfigParse {
            path: config_path.to_path_buf(),
            source: e,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values that would produce an unusable layer or invocation.
    pub fn validate(&self) -> crate::Result<()> {
        if self.layer.name.trim().is_empty() {
            return Err(crate::Error::InvalidConfig {
                field: "layer.name",
                reason: "must not be empty".to_owned(),
            });
        }
        if self.layer.python_version.trim().is_empty() {
            return Err(crate::Error::InvalidConfig {
                field: "layer.python_version",
                reason: "must not be empty".to_owned(),
            });
        }
        if self.layer.name.contains(['/', '\\']) {
            return Err(crate::Error::InvalidConfig {
                field: "layer.name",
                reason: format!("'{}' must not contain path separators", self.layer.name),
            });
        }
        Ok(())
    }
}

impl LayerConfig {
    /// Lambda runtime identifier, e.g. `python3.13`.
    pub fn runtime_identifier(&self) -> String {
        format!("python{}", self.python_version)
    }

    /// Description attached to the published layer version.
    pub fn description_for(&self, manifest: &Path) -> String {
        self.description
            .clone()
            .unwrap_or_else(|| format!("Dependencies from {}", manifest.display()))
    }
}

impl BrowserConfig {
    pub fn chrome_url(&self) -> String {
        self.chrome_url
            .clone()
            .unwrap_or_else(|| chrome_for_testing_url(&self.chrome_version, "chrome"))
    }

    pub fn chromedriver_url(&self) -> String {
        self.chromedriver_url
            .clone()
            .unwrap_or_else(|| chrome_for_testing_url(&self.chrome_version, "chromedriver"))
    }
}

fn chrome_for_testing_url(version: &str, component: &str) -> String {
    format!("{CHROME_FOR_TESTING_BASE}/{version}/linux64/{component}-linux64.zip")
}

fn default_layer_name() -> String {
    "acelerador-lambda-layer".to_owned()
}

fn default_python_version() -> String {
    "3.13".to_owned()
}

fn default_platform() -> String {
    "manylinux2014_x86_64".to_owned()
}

fn default_implementation() -> String {
    "cp".to_owned()
}

fn default_region() -> String {
    "sa-east-1".to_owned()
}

fn default_python() -> String {
    "python3".to_owned()
}

fn default_build_dir() -> PathBuf {
    PathBuf::from("build")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("layers_output")
}

fn default_requirements() -> PathBuf {
    PathBuf::from("requirements.txt")
}

fn default_chrome_version() -> String {
    "126.0.6478.126".to_owned()
}

fn default_browser_packages() -> Vec<String> {
    ["selenium", "pandas", "python-dotenv"]
        .iter()
        .map(|s| (*s).to_owned())
        .collect()
}

fn default_chrome_layer_name() -> String {
    "selenium-chrome-layer".to_owned()
}

fn default_deps_layer_name() -> String {
    "selenium-deps-layer".to_owned()
}
