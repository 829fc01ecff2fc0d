//! Invocation of the `takt` CLI in pipeline mode

use async_trait::async_trait;
use tracing::{info, warn};

use crate::exec::{Exec, ExecRequest};
use crate::Result;

/// Environment variable the runner reads its Anthropic key from
pub const ANTHROPIC_KEY_ENV: &str = "TAKT_ANTHROPIC_API_KEY";
/// Environment variable the runner reads its OpenAI key from
pub const OPENAI_KEY_ENV: &str = "TAKT_OPENAI_API_KEY";

/// What to run and how
#[derive(Clone, Default)]
pub struct RunOptions {
    /// Workflow (piece) to execute
    pub workflow: Option<String>,
    /// Inline task description
    pub task: Option<String>,
    /// GitHub issue the runner should read the task from
    pub issue_number: Option<u64>,
    /// `owner/repo` for `issue_number`
    pub repo: Option<String>,
    pub model: Option<String>,
    pub provider: Option<String>,
    /// Let the runner open a pull request with its changes
    pub auto_pr: bool,
    pub anthropic_api_key: Option<String>,
    pub openai_api_key: Option<String>,
    /// Echo the runner's output into the job log
    pub log_output: bool,
}

impl std::fmt::Debug for RunOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunOptions")
            .field("workflow", &self.workflow)
            .field("task_len", &self.task.as_ref().map(String::len))
            .field("issue_number", &self.issue_number)
            .field("repo", &self.repo)
            .field("model", &self.model)
            .field("provider", &self.provider)
            .field("auto_pr", &self.auto_pr)
            .field("log_output", &self.log_output)
            .finish_non_exhaustive()
    }
}

impl RunOptions {
    /// Command-line arguments for `takt`
    pub fn to_args(&self) -> Vec<String> {
        let mut args = vec!["--pipeline".to_string()];

        if let Some(task) = non_empty(&self.task) {
            args.push("--task".to_string());
            args.push(task.to_string());
        }

        if let Some(number) = self.issue_number {
            args.push("--issue".to_string());
            args.push(number.to_string());
        }

        if let Some(repo) = non_empty(&self.repo) {
            args.push("--repo".to_string());
            args.push(repo.to_string());
        }

        if self.auto_pr {
            args.push("--auto-pr".to_string());
        }

        for (flag, value) in [
            ("--workflow", &self.workflow),
            ("--model", &self.model),
            ("--provider", &self.provider),
        ] {
            if let Some(value) = non_empty(value) {
                args.push(flag.to_string());
                args.push(value.to_string());
            }
        }

        args
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

/// Outcome of a runner invocation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunResult {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl RunResult {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Runs an automation workflow and captures its outcome
///
/// A non-zero exit code is part of the [`RunResult`]; only failures to run
/// the tool at all are errors.
#[async_trait]
pub trait ToolRunner: Send + Sync {
    async fn run(&self, options: &RunOptions) -> Result<RunResult>;
}

/// [`ToolRunner`] that shells out to the `takt` CLI
#[derive(Debug, Clone)]
pub struct TaktRunner<E> {
    exec: E,
    program: String,
}

impl<E: Exec> TaktRunner<E> {
    pub fn new(exec: E) -> Self {
        Self {
            exec,
            program: "takt".to_string(),
        }
    }

    /// Use a specific `takt` executable instead of the one on PATH
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }
}

#[async_trait]
impl<E: Exec> ToolRunner for TaktRunner<E> {
    async fn run(&self, options: &RunOptions) -> Result<RunResult> {
        let mut request = ExecRequest::new(self.program.as_str(), options.to_args());
        if let Some(key) = non_empty(&options.anthropic_api_key) {
            request = request.with_env(ANTHROPIC_KEY_ENV, key);
        }
        if let Some(key) = non_empty(&options.openai_api_key) {
            request = request.with_env(OPENAI_KEY_ENV, key);
        }

        // The task body can be large, so log it by size only
        info!(
            program = %self.program,
            workflow = ?options.workflow,
            issue = ?options.issue_number,
            task_len = options.task.as_ref().map(String::len),
            "Executing takt"
        );

        let output = self.exec.exec(&request).await?;

        if options.log_output {
            for line in output.stdout.lines() {
                info!(target: "takt", "{}", line);
            }
            for line in output.stderr.lines() {
                warn!(target: "takt", "{}", line);
            }
        }

        Ok(RunResult {
            exit_code: output.code,
            stdout: output.stdout,
            stderr: output.stderr,
        })
    }
}
