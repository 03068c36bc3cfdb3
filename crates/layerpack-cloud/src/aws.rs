use layerpack_core::{CommandRunner, ExecError, Invocation};

/// Program name of the AWS CLI.
pub const AWS_PROGRAM: &str = "aws";

#[derive(Debug, thiserror::Error)]
pub enum AwsError {
    #[error("aws CLI not found; install: https://docs.aws.amazon.com/cli/latest/userguide/getting-started-install.html")]
    NotFound { source: std::io::Error },

    #[error("failed to start aws CLI")]
    Spawn { source: std::io::Error },

    #[error("aws command failed ({status}): {command}\n{stderr}")]
    CommandFailed {
        command: String,
        status: String,
        stderr: String,
    },

    #[error("unexpected output from `{command}`")]
    InvalidOutput {
        command: String,
        source: serde_json::Error,
    },
}

/// Run an `aws` invocation and return its stdout, mapping non-zero exits to
/// [`AwsError::CommandFailed`] with the captured stderr.
pub(crate) async fn run<R: CommandRunner>(
    runner: &R,
    invocation: &Invocation,
) -> Result<String, AwsError> {
    tracing::debug!(command = %invocation.command_line(), "running aws");

    let output = runner.run(invocation).await.map_err(|e| match e {
        ExecError::NotFound { source, .. } => AwsError::NotFound { source },
        ExecError::Spawn { source, .. } => AwsError::Spawn { source },
    })?;

    if output.success() {
        Ok(output.stdout)
    } else {
        Err(AwsError::CommandFailed {
            command: invocation.command_line(),
            status: output.status_label(),
            stderr: output.diagnostic(),
        })
    }
}
