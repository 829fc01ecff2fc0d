//! Handle command - React to the GitHub event that triggered the workflow

use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use async_trait::async_trait;
use clap::{Args, Parser};
use takt_core::event::load_payload;
use takt_core::setup::default_gh_config_dir;
use takt_core::{
    ensure_gh_authenticated, ensure_takt_installed, Config, ConfigOverrides,
    EventContext, GhEnv, InstallSource, SystemExec, TaktRunner,
};
use takt_github::{parse_github_url, GhCli, GitHubClient};
use tracing::info;

use crate::actions;
use crate::handler::{Handler, RunSettings, Status, ToolSetup};

/// Arguments for the handle command
///
/// Every option doubles as an action input (`INPUT_<NAME>`).
#[derive(Args)]
pub struct HandleArgs {
    /// Anthropic API key passed to takt
    #[arg(long, env = "INPUT_ANTHROPIC_API_KEY", hide_env_values = true)]
    pub anthropic_api_key: Option<String>,

    /// OpenAI API key passed to takt
    #[arg(long, env = "INPUT_OPENAI_API_KEY", hide_env_values = true)]
    pub openai_api_key: Option<String>,

    /// Token for gh and the REST API
    #[arg(long, env = "INPUT_GITHUB_TOKEN", hide_env_values = true)]
    pub github_token: Option<String>,

    /// Default workflow when a comment names none
    #[arg(long, env = "INPUT_WORKFLOW")]
    pub workflow: Option<String>,

    #[arg(long, env = "INPUT_MODEL")]
    pub model: Option<String>,

    #[arg(long, env = "INPUT_PROVIDER")]
    pub provider: Option<String>,

    /// Pull request number, overriding the event payload
    #[arg(long, env = "INPUT_PR_NUMBER")]
    pub pr_number: Option<String>,

    /// Run the review workflow on pull_request events ("true"/"false")
    #[arg(long, env = "INPUT_POST_REVIEW")]
    pub post_review: Option<String>,

    /// Where to install takt from: latest or git
    #[arg(long, env = "INPUT_TAKT_VERSION")]
    pub takt_version: Option<String>,

    /// Echo takt output into the job log ("true"/"false")
    #[arg(long, env = "INPUT_LOG_OUTPUT")]
    pub log_output: Option<String>,

    /// Let takt open a pull request with its changes ("true"/"false")
    #[arg(long, env = "INPUT_AUTO_PR")]
    pub auto_pr: Option<String>,

    /// Event name (defaults to GITHUB_EVENT_NAME)
    #[arg(long)]
    pub event_name: Option<String>,

    /// Path to the event payload JSON (defaults to GITHUB_EVENT_PATH)
    #[arg(long)]
    pub event_path: Option<PathBuf>,

    /// Repository as owner/repo or URL (defaults to GITHUB_REPOSITORY)
    #[arg(long)]
    pub repo: Option<String>,

    /// Assume takt and gh are already installed and authenticated
    #[arg(long)]
    pub skip_setup: bool,
}

/// [`HandleArgs`] read from `INPUT_*` variables alone
#[derive(Parser)]
#[command(name = "takt-action")]
struct InputsOnly {
    #[command(flatten)]
    args: HandleArgs,
}

impl fmt::Debug for HandleArgs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandleArgs")
            .field("workflow", &self.workflow)
            .field("model", &self.model)
            .field("provider", &self.provider)
            .field("pr_number", &self.pr_number)
            .field("post_review", &self.post_review)
            .field("event_name", &self.event_name)
            .field("event_path", &self.event_path)
            .field("repo", &self.repo)
            .field("skip_setup", &self.skip_setup)
            .finish_non_exhaustive()
    }
}

impl HandleArgs {
    /// Inputs for a run started without arguments
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(InputsOnly::try_parse_from(["takt-action"])?.args)
    }

    /// Execute the handle command
    pub async fn execute(&self, config_path: Option<&Path>) -> anyhow::Result<()> {
        for secret in [&self.anthropic_api_key, &self.openai_api_key, &self.github_token]
            .into_iter()
            .flatten()
        {
            actions::mask(secret);
        }

        let config = Config::load_with_overrides(config_path, self.overrides()?)?;
        let event = self.load_event()?;
        let settings = RunSettings {
            pr_number: input(&self.pr_number),
            anthropic_api_key: input(&self.anthropic_api_key),
            openai_api_key: input(&self.openai_api_key),
            auto_pr: parse_bool_input("auto_pr", &self.auto_pr)?.unwrap_or(false),
        };

        let token = input(&self.github_token).context("github_token input is required")?;

        let gh_env = if self.skip_setup {
            GhEnv::new(token.as_str(), default_gh_config_dir())
        } else {
            ensure_gh_authenticated(&SystemExec, &token, &default_gh_config_dir()).await?
        };
        let installer = TaktInstaller {
            program: &config.takt.path,
            source: config.takt.install_source,
            skip: self.skip_setup,
        };

        let source = GhCli::new(SystemExec)
            .with_repo(event.full_name())
            .with_env(gh_env);
        let runner = TaktRunner::new(SystemExec).with_program(config.takt.path.as_str());
        let publisher = GitHubClient::from_env(token)?;

        let outcome = Handler {
            event: &event,
            config: &config,
            settings: &settings,
            source: &source,
            setup: &installer,
            runner: &runner,
            publisher: &publisher,
        }
        .handle()
        .await?;

        for (name, value) in &outcome.outputs {
            actions::set_output(name, value)
                .with_context(|| format!("Failed to write output {}", name))?;
        }

        match outcome.status {
            Status::Completed => {
                info!("Done");
                Ok(())
            }
            Status::Skipped(reason) => {
                info!("{}", reason);
                Ok(())
            }
            Status::Failed(message) => bail!(message),
        }
    }

    fn overrides(&self) -> anyhow::Result<ConfigOverrides> {
        let install_source = match input(&self.takt_version) {
            Some(v) => Some(v.parse::<InstallSource>()?),
            None => None,
        };

        Ok(ConfigOverrides {
            takt_path: None,
            install_source,
            log_output: parse_bool_input("log_output", &self.log_output)?,
            workflow: self.workflow.clone(),
            model: self.model.clone(),
            provider: self.provider.clone(),
            post_review: parse_bool_input("post_review", &self.post_review)?,
        })
    }

    fn load_event(&self) -> anyhow::Result<EventContext> {
        let overridden = self.event_name.is_some() || self.event_path.is_some() || self.repo.is_some();
        if !overridden {
            return EventContext::from_env().context("Failed to load the triggering event");
        }

        let event_name = match self.event_name {
            Some(ref name) => name.clone(),
            None => std::env::var("GITHUB_EVENT_NAME")
                .context("--event-name or GITHUB_EVENT_NAME is required")?,
        };

        let event_path = self
            .event_path
            .clone()
            .or_else(|| {
                std::env::var_os("GITHUB_EVENT_PATH")
                    .filter(|p| !p.is_empty())
                    .map(PathBuf::from)
            });
        let payload = match event_path {
            Some(path) => load_payload(&path)
                .with_context(|| format!("Failed to read event payload {}", path.display()))?,
            None => Default::default(),
        };

        let repository = match self.repo {
            Some(ref repo) => {
                let (owner, name) = parse_github_url(repo)?;
                Some(format!("{}/{}", owner, name))
            }
            None => std::env::var("GITHUB_REPOSITORY").ok(),
        };

        Ok(EventContext::from_parts(
            event_name,
            repository.as_deref(),
            payload,
        )?)
    }
}

/// Installs `takt` the first time a workflow is about to run
struct TaktInstaller<'a> {
    program: &'a str,
    source: InstallSource,
    skip: bool,
}

#[async_trait]
impl ToolSetup for TaktInstaller<'_> {
    async fn prepare(&self) -> takt_core::Result<()> {
        if self.skip {
            return Ok(());
        }
        ensure_takt_installed(&SystemExec, self.program, self.source).await
    }
}

/// Treat unset and blank inputs alike
fn input(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Actions booleans arrive as strings
fn parse_bool_input(name: &str, value: &Option<String>) -> anyhow::Result<Option<bool>> {
    match input(value).map(|v| v.to_lowercase()).as_deref() {
        None => Ok(None),
        Some("true") => Ok(Some(true)),
        Some("false") => Ok(Some(false)),
        Some(other) => bail!("Input {} must be true or false, got '{}'", name, other),
    }
}
