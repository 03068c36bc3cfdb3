use std::path::PathBuf;

use anyhow::Context;
use layerpack_build::{PipInstaller, TargetPlatform, archive};
use layerpack_cloud::{AwsClient, AwsSession, PublishRequest, PublishedLayer};
use layerpack_core::workspace::ensure_dir;
use layerpack_core::{CommandRunner, LayerpackConfig, ManifestLayout, Workspace};

use super::stage::{Stage, Stages};
use super::{LayerArgs, step};

/// Result of a successful manifest pipeline run.
#[derive(Debug)]
pub(crate) struct BuildOutcome {
    pub archive: PathBuf,
    pub entries: usize,
    /// `None` when publishing was skipped.
    pub published: Option<PublishedLayer>,
}

/// Build the manifest layer and, unless `no_publish`, publish it.
pub async fn build(
    args: &LayerArgs,
    requirements: Option<PathBuf>,
    layer_name: Option<String>,
    description: Option<String>,
    no_publish: bool,
) -> anyhow::Result<()> {
    let mut config = args.load()?;
    if let Some(path) = requirements {
        config.manifest.requirements = path;
    }
    if let Some(name) = layer_name {
        config.layer.name = name;
    }
    if description.is_some() {
        config.layer.description = description;
    }
    config.validate().context("invalid configuration")?;

    let installer = PipInstaller::new(&config.layer.python);
    let publisher = if no_publish {
        None
    } else {
        let session = AwsSession::from_env(&config.layer.region)?;
        Some(AwsClient::new(session))
    };

    let mut stages = Stages::new("manifest");
    let result = run(&config, &installer, publisher.as_ref(), &mut stages).await;
    stages.finish(&result);
    let outcome = result?;

    println!();
    println!("Layer archive: {} ({} files)", outcome.archive.display(), outcome.entries);
    match &outcome.published {
        Some(published) => match &published.layer_version_arn {
            Some(arn) => println!("Published:     {arn}"),
            None => println!("Published layer '{}'", config.layer.name),
        },
        None => println!("Publishing skipped (--no-publish)"),
    }
    Ok(())
}

/// Run the manifest pipeline: workspace → pip install → archive → publish.
///
/// The build root is removed on every path out of this function.
pub(crate) async fn run<R, P>(
    config: &LayerpackConfig,
    installer: &PipInstaller<R>,
    publisher: Option<&AwsClient<P>>,
    stages: &mut Stages,
) -> anyhow::Result<BuildOutcome>
where
    R: CommandRunner,
    P: CommandRunner,
{
    let layout = ManifestLayout::new(config)?;
    let manifest = &config.manifest.requirements;

    step(&format!("Preparing workspace for layer '{}'", config.layer.name));
    let workspace = Workspace::prepare(&layout.paths)?;
    ensure_dir(&layout.layer_dir)?;
    remove_stale_archive(&layout.archive)?;
    stages.advance(Stage::WorkspaceReady);

    if !manifest.is_file() {
        anyhow::bail!("requirements file {} not found", manifest.display());
    }

    step(&format!("Installing dependencies from {}", manifest.display()));
    installer
        .install_manifest(manifest, &layout.layer_dir, &TargetPlatform::from_layer(&config.layer))
        .await?;
    stages.advance(Stage::DependenciesAcquired);

    step(&format!("Packaging layer into {}", layout.archive.display()));
    let entries = archive::assemble(&layout.paths.build_root, &layout.archive)?;
    stages.advance(Stage::Archived);

    let published = match publisher {
        Some(client) => {
            step(&format!(
                "Publishing layer '{}' to {}",
                config.layer.name, config.layer.region
            ));
            let request = PublishRequest::new(&layout.archive, &config.layer.name, &config.layer.region)
                .description(config.layer.description_for(manifest))
                .runtime(config.layer.runtime_identifier());
            let published = client.publish_layer_version(&request).await?;
            stages.advance(Stage::Published);
            Some(published)
        }
        None => None,
    };

    step("Cleaning up temporary files");
    workspace.release()?;
    stages.advance(Stage::Done);

    Ok(BuildOutcome {
        archive: layout.archive,
        entries: entries.len(),
        published,
    })
}

fn remove_stale_archive(path: &std::path::Path) -> anyhow::Result<()> {
    match std::fs::remove_file(path) {
        Ok(()) => {
            tracing::info!(path = %path.display(), "removed stale archive");
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e).with_context(|| format!("failed to remove stale archive {}", path.display())),
    }
}
