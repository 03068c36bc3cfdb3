use std::path::{Path, PathBuf};

use layerpack_core::{CommandRunner, Invocation, RealRunner};
use serde::Deserialize;

use crate::aws::{self, AWS_PROGRAM, AwsError};
use crate::session::AwsSession;

/// AWS operations client, parameterized over the runner for testability.
pub struct AwsClient<R: CommandRunner = RealRunner> {
    runner: R,
    session: AwsSession,
}

impl AwsClient<RealRunner> {
    pub fn new(session: AwsSession) -> Self {
        Self::with_runner(RealRunner, session)
    }
}

impl<R: CommandRunner> AwsClient<R> {
    pub fn with_runner(runner: R, session: AwsSession) -> Self {
        Self { runner, session }
    }

    pub fn session(&self) -> &AwsSession {
        &self.session
    }

    // ── Lambda layers ──

    /// Build the `aws lambda publish-layer-version` call for `request`.
    pub fn publish_invocation(&self, request: &PublishRequest) -> Result<Invocation, PublishError> {
        let archive = request
            .archive
            .to_str()
            .ok_or_else(|| PublishError::InvalidPath(request.archive.clone()))?;
        let zip_file = format!("fileb://{archive}");

        let invocation = Invocation::new(AWS_PROGRAM)
            .args([
                "lambda",
                "publish-layer-version",
                "--layer-name",
                request.layer_name.as_str(),
                "--description",
                request.description.as_str(),
                "--zip-file",
                zip_file.as_str(),
                "--compatible-runtimes",
            ])
            .args(request.compatible_runtimes.iter().map(String::as_str))
            .args(["--region", request.region.as_str(), "--output", "json"]);

        Ok(self.session.apply(invocation))
    }

    /// Register `request.archive` as a new version of the layer.
    pub async fn publish_layer_version(
        &self,
        request: &PublishRequest,
    ) -> Result<PublishedLayer, PublishError> {
        if !request.archive.is_file() {
            return Err(PublishError::MissingArchive(request.archive.clone()));
        }

        let invocation = self.publish_invocation(request)?;
        tracing::info!(
            layer = %request.layer_name,
            region = %request.region,
            archive = %request.archive.display(),
            "publishing layer version"
        );

        let stdout = aws::run(&self.runner, &invocation)
            .await
            .map_err(|e| PublishError::Publish {
                layer: request.layer_name.clone(),
                source: e,
            })?;

        // The layer is registered at this point; an unreadable response only
        // loses the ARN in the summary.
        let published = match serde_json::from_str::<PublishedLayer>(&stdout) {
            Ok(p) => p,
            Err(e) => {
                tracing::warn!(error = %e, "could not parse publish-layer-version output");
                PublishedLayer::default()
            }
        };
        tracing::info!(
            arn = published.layer_version_arn.as_deref().unwrap_or("unknown"),
            "layer published"
        );
        Ok(published)
    }

    // ── STS ──

    /// Resolve the identity behind the session's credentials.
    pub async fn caller_identity(&self) -> Result<CallerIdentity, AwsError> {
        let invocation = self.session.apply(Invocation::new(AWS_PROGRAM).args([
            "sts",
            "get-caller-identity",
            "--region",
            self.session.region.as_str(),
            "--output",
            "json",
        ]));

        let stdout = aws::run(&self.runner, &invocation).await?;
        serde_json::from_str(&stdout).map_err(|e| AwsError::InvalidOutput {
            command: invocation.command_line(),
            source: e,
        })
    }
}

/// Parameters of a single layer publication.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishRequest {
    pub archive: PathBuf,
    pub layer_name: String,
    pub description: String,
    pub compatible_runtimes: Vec<String>,
    pub region: String,
}

impl PublishRequest {
    pub fn new(archive: &Path, layer_name: &str, region: &str) -> Self {
        Self {
            archive: archive.to_path_buf(),
            layer_name: layer_name.to_owned(),
            description: String::new(),
            compatible_runtimes: Vec::new(),
            region: region.to_owned(),
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn runtime(mut self, runtime: impl Into<String>) -> Self {
        self.compatible_runtimes.push(runtime.into());
        self
    }
}

/// Subset of the `publish-layer-version` response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PublishedLayer {
    pub layer_version_arn: Option<String>,
    pub version: Option<u64>,
}

/// `sts get-caller-identity` response.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CallerIdentity {
    #[serde(rename = "Account")]
    pub account: String,
    #[serde(rename = "UserId")]
    pub user_id: String,
    #[serde(rename = "Arn")]
    pub arn: String,
}

// ── Error types ──

#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("layer archive path is not valid UTF-8: {0}")]
    InvalidPath(PathBuf),

    #[error("layer archive {0} does not exist")]
    MissingArchive(PathBuf),

    #[error("publishing layer '{layer}' failed")]
    Publish { layer: String, source: AwsError },
}
