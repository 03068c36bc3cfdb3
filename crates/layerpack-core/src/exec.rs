use std::fmt;

/// A single external program invocation: program, arguments, extra environment.
#[derive(Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    /// Extra environment variables. Values are never logged.
    pub envs: Vec<(String, String)>,
}

impl Invocation {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            envs: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.envs.push((key.into(), value.into()));
        self
    }

    /// Number of times `flag` is immediately followed by `value`.
    pub fn count_pair(&self, flag: &str, value: &str) -> usize {
        self.args
            .windows(2)
            .filter(|w| w[0] == flag && w[1] == value)
            .count()
    }

    /// The command line as it would be typed in a shell (environment omitted).
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl fmt::Debug for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let env_keys: Vec<&str> = self.envs.iter().map(|(k, _)| k.as_str()).collect();
        f.debug_struct("Invocation")
            .field("program", &self.program)
            .field("args", &self.args)
            .field("envs", &env_keys)
            .finish()
    }
}

/// Captured result of a finished process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code; `None` when the process was terminated by a signal.
    pub status: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.status == Some(0)
    }

    /// Human-readable diagnostic for a failed run: stderr, falling back to stdout.
    pub fn diagnostic(&self) -> String {
        let stderr = self.stderr.trim();
        if stderr.is_empty() {
            self.stdout.trim().to_owned()
        } else {
            stderr.to_owned()
        }
    }

    /// Exit status as shown to users.
    pub fn status_label(&self) -> String {
        match self.status {
            Some(code) => format!("exit code {code}"),
            None => "terminated by signal".to_owned(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ExecError {
    #[error("`{program}` not found; is it installed and on PATH?")]
    NotFound {
        program: String,
        source: std::io::Error,
    },

    #[error("failed to run `{program}`")]
    Spawn {
        program: String,
        source: std::io::Error,
    },
}

/// Abstraction over process execution for testability.
///
/// Production code uses [`RealRunner`], tests use mockall-generated mocks.
/// Non-zero exits are not errors at this level; callers inspect
/// [`CommandOutput::success`] and map failures to their own error type.
#[allow(async_fn_in_trait)]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, invocation: &Invocation) -> Result<CommandOutput, ExecError>;
}

/// Real process runner backed by `tokio::process`.
pub struct RealRunner;

impl CommandRunner for RealRunner {
    async fn run(&self, invocation: &Invocation) -> Result<CommandOutput, ExecError> {
        use std::process::Stdio;

        tracing::debug!(command = %invocation.command_line(), "running");

        let output = tokio::process::Command::new(&invocation.program)
            .args(&invocation.args)
            .envs(invocation.envs.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| {
                let program = invocation.program.clone();
                if e.kind() == std::io::ErrorKind::NotFound {
                    ExecError::NotFound { program, source: e }
                } else {
                    ExecError::Spawn { program, source: e }
                }
            })?;

        Ok(CommandOutput {
            status: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}
