use std::path::PathBuf;

use layerpack_build::{Downloader, PipInstaller, archive, extract_entry};
use layerpack_core::workspace::ensure_dir;
use layerpack_core::{BrowserLayout, CommandRunner, LayerpackConfig, Workspace};

use super::stage::{Stage, Stages};
use super::{LayerArgs, step};

/// Result of a successful browser pipeline run.
#[derive(Debug)]
pub(crate) struct BrowserOutcome {
    pub chrome_archive: PathBuf,
    pub deps_archive: PathBuf,
}

/// Build the headless browser layer and its Python dependency layer.
pub async fn browser(
    args: &LayerArgs,
    chrome_version: Option<String>,
    chrome_url: Option<String>,
    chromedriver_url: Option<String>,
) -> anyhow::Result<()> {
    let mut config = args.load()?;
    if let Some(version) = chrome_version {
        config.browser.chrome_version = version;
    }
    if chrome_url.is_some() {
        config.browser.chrome_url = chrome_url;
    }
    if chromedriver_url.is_some() {
        config.browser.chromedriver_url = chromedriver_url;
    }

    let installer = PipInstaller::new(&config.layer.python);
    let downloader = Downloader::new();

    let mut stages = Stages::new("browser");
    let result = run(&config, &installer, &downloader, &mut stages).await;
    stages.finish(&result);
    let outcome = result?;

    println!();
    println!("Layer archives:");
    println!("  - {}", outcome.chrome_archive.display());
    println!("  - {}", outcome.deps_archive.display());
    Ok(())
}

/// Run the browser pipeline: workspace → download → extract → pip install →
/// two archives. Nothing is published.
pub(crate) async fn run<R: CommandRunner>(
    config: &LayerpackConfig,
    installer: &PipInstaller<R>,
    downloader: &Downloader,
    stages: &mut Stages,
) -> anyhow::Result<BrowserOutcome> {
    let layout = BrowserLayout::new(config)?;

    step("Preparing workspace for the browser layers");
    let workspace = Workspace::prepare(&layout.paths)?;
    ensure_dir(&layout.chrome_layer_dir)?;
    ensure_dir(&layout.site_packages_dir)?;
    stages.advance(Stage::WorkspaceReady);

    let chrome_url = config.browser.chrome_url();
    let chromedriver_url = config.browser.chromedriver_url();
    step(&format!("Downloading {chrome_url}"));
    downloader.download(&chrome_url, &layout.chrome_download).await?;
    step(&format!("Downloading {chromedriver_url}"));
    downloader
        .download(&chromedriver_url, &layout.chromedriver_download)
        .await?;
    stages.advance(Stage::DependenciesAcquired);

    step("Extracting chrome and chromedriver binaries");
    extract_entry(
        &layout.chrome_download,
        "/chrome",
        &layout.chrome_layer_dir.join("chrome"),
    )?;
    extract_entry(
        &layout.chromedriver_download,
        "/chromedriver",
        &layout.chrome_layer_dir.join("chromedriver"),
    )?;
    stages.advance(Stage::Extracted);

    step(&format!(
        "Installing Python dependencies for version {}",
        config.layer.python_version
    ));
    installer
        .install_packages(&config.browser.packages, &layout.site_packages_dir)
        .await?;

    step("Packaging layers");
    archive::assemble(&layout.chrome_layer_dir, &layout.chrome_archive)?;
    archive::assemble(&layout.python_layer_dir, &layout.deps_archive)?;
    stages.advance(Stage::Archived);

    step("Cleaning up temporary files");
    workspace.release()?;
    stages.advance(Stage::Done);

    Ok(BrowserOutcome {
        chrome_archive: layout.chrome_archive,
        deps_archive: layout.deps_archive,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use layerpack_core::{CommandOutput, ExecError, Invocation};
    use mockall::mock;
    use std::io::Write;
    use std::path::Path;
    use tempfile::TempDir;
    use zip::write::SimpleFileOptions;

    mock! {
        Runner {}

        impl CommandRunner for Runner {
            async fn run(&self, invocation: &Invocation) -> Result<CommandOutput, ExecError>;
        }
    }

    /// Zip bytes containing `entries` as (name, content) pairs.
    fn zip_bytes(entries: &[(&str, &str)]) -> Vec<u8> {
        let mut zip = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
        for (name, content) in entries {
            zip.start_file(*name, SimpleFileOptions::default().unix_permissions(0o755))
                .unwrap();
            zip.write_all(content.as_bytes()).unwrap();
        }
        zip.finish().unwrap().into_inner()
    }

    /// Stands in for pip: drops a module named after the package into `--target`.
    fn fake_pip(inv: &Invocation) -> Result<CommandOutput, ExecError> {
        let target = inv
            .args
            .iter()
            .position(|a| a == "--target")
            .map(|i| PathBuf::from(&inv.args[i + 1]))
            .unwrap();
        let package = &inv.args[3];
        std::fs::write(target.join(format!("{package}.py")), "").unwrap();
        Ok(CommandOutput {
            status: Some(0),
            stdout: String::new(),
            stderr: String::new(),
        })
    }

    fn config_in(tmp: &TempDir, server_url: &str) -> LayerpackConfig {
        let mut config = LayerpackConfig::default();
        config.workspace.build_dir = tmp.path().join("build");
        config.workspace.output_dir = tmp.path().join("layers_output");
        config.browser.chrome_url = Some(format!("{server_url}/chrome-linux64.zip"));
        config.browser.chromedriver_url = Some(format!("{server_url}/chromedriver-linux64.zip"));
        config.browser.packages = vec!["selenium".to_owned(), "pandas".to_owned()];
        config
    }

    fn entries(archive: &Path) -> Vec<(String, Option<u32>)> {
        let file = std::fs::File::open(archive).unwrap();
        let mut zip = zip::ZipArchive::new(file).unwrap();
        (0..zip.len())
            .map(|i| {
                let entry = zip.by_index(i).unwrap();
                (entry.name().to_owned(), entry.unix_mode().map(|m| m & 0o777))
            })
            .collect()
    }

    #[tokio::test]
    async fn builds_chrome_and_deps_layers() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/chrome-linux64.zip")
            .with_body(zip_bytes(&[
                ("chrome-linux64/chrome_crashpad_handler", "crashpad"),
                ("chrome-linux64/chrome", "chrome-binary"),
                ("chrome-linux64/libEGL.so", "egl"),
            ]))
            .create_async()
            .await;
        server
            .mock("GET", "/chromedriver-linux64.zip")
            .with_body(zip_bytes(&[
                ("chromedriver-linux64/LICENSE.chromedriver", "license"),
                ("chromedriver-linux64/chromedriver", "driver-binary"),
            ]))
            .create_async()
            .await;

        let tmp = TempDir::new().unwrap();
        let config = config_in(&tmp, &server.url());
        let mut runner = MockRunner::new();
        runner.expect_run().times(2).returning(fake_pip);
        let installer = PipInstaller::with_runner(runner, "python3");
        let mut stages = Stages::new("browser");

        let outcome = run(&config, &installer, &Downloader::new(), &mut stages)
            .await
            .unwrap();

        assert_eq!(
            entries(&outcome.chrome_archive),
            [
                ("chrome".to_owned(), Some(0o755)),
                ("chromedriver".to_owned(), Some(0o755)),
            ]
        );
        assert_eq!(
            entries(&outcome.deps_archive),
            [
                (
                    "python/lib/python3.13/site-packages/pandas.py".to_owned(),
                    Some(0o644)
                ),
                (
                    "python/lib/python3.13/site-packages/selenium.py".to_owned(),
                    Some(0o644)
                ),
            ]
        );
        assert!(!tmp.path().join("build").exists());
        assert_eq!(
            stages.reached(),
            [
                Stage::Init,
                Stage::WorkspaceReady,
                Stage::DependenciesAcquired,
                Stage::Extracted,
                Stage::Archived,
                Stage::Done,
            ]
        );
    }

    #[tokio::test]
    async fn download_failure_aborts_before_install() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/chrome-linux64.zip")
            .with_status(404)
            .create_async()
            .await;

        let tmp = TempDir::new().unwrap();
        let config = config_in(&tmp, &server.url());
        let mut runner = MockRunner::new();
        runner.expect_run().times(0);
        let installer = PipInstaller::with_runner(runner, "python3");
        let mut stages = Stages::new("browser");

        let err = run(&config, &installer, &Downloader::new(), &mut stages)
            .await
            .unwrap_err();

        assert!(err.to_string().contains("404"));
        assert!(!tmp.path().join("build").exists());
        assert_eq!(stages.current(), Stage::WorkspaceReady);
    }

    #[tokio::test]
    async fn archive_without_binary_is_entry_not_found() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/chrome-linux64.zip")
            .with_body(zip_bytes(&[("chrome-linux64/chrome-wrapper", "sh")]))
            .create_async()
            .await;
        server
            .mock("GET", "/chromedriver-linux64.zip")
            .with_body(zip_bytes(&[("chromedriver-linux64/chromedriver", "driver")]))
            .create_async()
            .await;

        let tmp = TempDir::new().unwrap();
        let config = config_in(&tmp, &server.url());
        let mut runner = MockRunner::new();
        runner.expect_run().times(0);
        let installer = PipInstaller::with_runner(runner, "python3");
        let mut stages = Stages::new("browser");

        let err = run(&config, &installer, &Downloader::new(), &mut stages)
            .await
            .unwrap_err();

        assert!(matches!(
            err.downcast_ref::<layerpack_build::ExtractError>(),
            Some(layerpack_build::ExtractError::EntryNotFound { .. })
        ));
        assert!(!tmp.path().join("build").exists());
        assert!(!tmp.path().join("layers_output/selenium-chrome-layer.zip").exists());
    }
}
