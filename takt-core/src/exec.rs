//! Process execution seam
//!
//! Every subprocess this action starts (`gh`, `takt`, `npm`, `git`) goes
//! through the [`Exec`] trait so callers can be exercised against fakes.

use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

use crate::{Error, Result};

/// A single command invocation
#[derive(Clone, Default, PartialEq, Eq)]
pub struct ExecRequest {
    pub program: String,
    pub args: Vec<String>,
    /// Extra environment variables layered over the inherited environment
    pub env: Vec<(String, String)>,
    pub cwd: Option<PathBuf>,
    /// Data written to the child's stdin before it is closed
    pub stdin: Option<String>,
}

impl ExecRequest {
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn with_cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    pub fn with_stdin(mut self, input: impl Into<String>) -> Self {
        self.stdin = Some(input.into());
        self
    }

    /// The command line as it would be typed, for logging
    pub fn command_line(&self) -> String {
        if self.args.is_empty() {
            self.program.clone()
        } else {
            format!("{} {}", self.program, self.args.join(" "))
        }
    }
}

// Env values and stdin routinely carry tokens, so only their keys are shown.
impl std::fmt::Debug for ExecRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecRequest")
            .field("program", &self.program)
            .field("args", &self.args)
            .field(
                "env",
                &self.env.iter().map(|(k, _)| k.as_str()).collect::<Vec<_>>(),
            )
            .field("cwd", &self.cwd)
            .field("stdin", &self.stdin.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Captured result of a finished command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecOutput {
    pub code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl ExecOutput {
    pub fn success(&self) -> bool {
        self.code == 0
    }

    /// Return stdout, turning a non-zero exit into [`Error::CommandFailed`]
    pub fn into_stdout(self, program: &str) -> Result<String> {
        if self.success() {
            Ok(self.stdout)
        } else {
            Err(Error::CommandFailed {
                program: program.to_string(),
                code: self.code,
                stderr: self.stderr.trim().to_string(),
            })
        }
    }
}

/// Runs external commands
///
/// A non-zero exit is reported in [`ExecOutput::code`], not as an error;
/// errors are reserved for commands that could not be run at all.
#[async_trait]
pub trait Exec: Send + Sync {
    async fn exec(&self, request: &ExecRequest) -> Result<ExecOutput>;
}

/// [`Exec`] backed by real child processes
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemExec;

#[async_trait]
impl Exec for SystemExec {
    async fn exec(&self, request: &ExecRequest) -> Result<ExecOutput> {
        debug!(command = %request.command_line(), "Executing");

        let mut cmd = Command::new(&request.program);
        cmd.args(&request.args)
            .envs(request.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .stdin(if request.stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            });

        if let Some(ref cwd) = request.cwd {
            cmd.current_dir(cwd);
        }
        cmd.kill_on_drop(true);

        let mut child = cmd.spawn().map_err(|e| Error::Spawn {
            program: request.program.clone(),
            reason: e.to_string(),
        })?;

        // Feed stdin while the output pipes are drained
        let stdin = child.stdin.take();
        let input = request.stdin.as_deref().unwrap_or_default();
        let write = async move {
            if let Some(mut stdin) = stdin {
                stdin.write_all(input.as_bytes()).await?;
            }
            Ok::<(), std::io::Error>(())
        };

        let (written, output) = tokio::join!(write, child.wait_with_output());
        let output = output?;
        match written {
            // The child may exit without reading all of its input
            Err(e) if e.kind() == std::io::ErrorKind::BrokenPipe => {
                debug!(program = %request.program, "stdin closed early");
            }
            other => other?,
        }

        Ok(ExecOutput {
            code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}
