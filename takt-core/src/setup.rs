//! Tool preparation: install `takt`, authenticate `gh`

use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::exec::{Exec, ExecRequest};
use crate::{Error, Result};

const TAKT_GIT_URL: &str = "https://github.com/nrslib/takt.git";
const TAKT_GIT_CHECKOUT: &str = "/tmp/takt";

/// Where to install `takt` from when it is missing
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstallSource {
    /// Latest release from npm
    #[default]
    Latest,
    /// Build from the main branch of the git repository
    Git,
}

impl FromStr for InstallSource {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "" | "latest" => Ok(Self::Latest),
            "git" => Ok(Self::Git),
            other => Err(Error::Config(format!(
                "Unknown takt install source '{}'. Expected 'latest' or 'git'",
                other
            ))),
        }
    }
}

/// Install `takt` unless `<program> --version` already succeeds
pub async fn ensure_takt_installed<E>(exec: &E, program: &str, source: InstallSource) -> Result<()>
where
    E: Exec + ?Sized,
{
    let probe = exec.exec(&ExecRequest::new(program, ["--version"])).await;
    if matches!(probe, Ok(ref out) if out.success()) {
        info!("takt CLI is already installed");
        return Ok(());
    }

    let steps: Vec<ExecRequest> = match source {
        InstallSource::Latest => {
            info!("Installing takt CLI from npm...");
            vec![ExecRequest::new("npm", ["install", "-g", "takt"])]
        }
        InstallSource::Git => {
            info!("Installing takt CLI from git repository...");
            vec![
                ExecRequest::new("git", ["clone", TAKT_GIT_URL, TAKT_GIT_CHECKOUT]),
                ExecRequest::new("npm", ["install"]).with_cwd(TAKT_GIT_CHECKOUT),
                ExecRequest::new("npm", ["run", "build"]).with_cwd(TAKT_GIT_CHECKOUT),
                ExecRequest::new("npm", ["link"]).with_cwd(TAKT_GIT_CHECKOUT),
            ]
        }
    };

    for step in &steps {
        exec.exec(step).await?.into_stdout(&step.program)?;
    }

    info!(source = ?source, "takt CLI installed successfully");
    Ok(())
}

/// Credentials every `gh` invocation needs
#[derive(Clone, PartialEq, Eq)]
pub struct GhEnv {
    token: String,
    config_dir: PathBuf,
}

impl GhEnv {
    pub fn new(token: impl Into<String>, config_dir: impl Into<PathBuf>) -> Self {
        Self {
            token: token.into(),
            config_dir: config_dir.into(),
        }
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    /// Add `GH_TOKEN`, `GITHUB_TOKEN` and `GH_CONFIG_DIR` to `request`
    pub fn apply(&self, request: ExecRequest) -> ExecRequest {
        request
            .with_env("GH_TOKEN", self.token.as_str())
            .with_env("GITHUB_TOKEN", self.token.as_str())
            .with_env("GH_CONFIG_DIR", self.config_dir.to_string_lossy())
    }
}

impl std::fmt::Debug for GhEnv {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GhEnv")
            .field("config_dir", &self.config_dir)
            .finish_non_exhaustive()
    }
}

/// Default `gh` config directory: `$GH_CONFIG_DIR` or `/tmp/github-cli`
pub fn default_gh_config_dir() -> PathBuf {
    std::env::var("GH_CONFIG_DIR")
        .ok()
        .filter(|d| !d.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("/tmp/github-cli"))
}

/// Make sure `gh` is logged in with `token`
///
/// Returns the environment subsequent `gh` calls must run with.
pub async fn ensure_gh_authenticated<E>(exec: &E, token: &str, config_dir: &Path) -> Result<GhEnv>
where
    E: Exec + ?Sized,
{
    if token.trim().is_empty() {
        return Err(Error::Config(
            "github_token input is required to authenticate the gh CLI".to_string(),
        ));
    }

    std::fs::create_dir_all(config_dir)?;
    let env = GhEnv::new(token.trim(), config_dir);

    let status = exec
        .exec(&env.apply(ExecRequest::new("gh", ["auth", "status"])))
        .await?;
    if status.success() {
        info!("gh CLI is already authenticated");
        return Ok(env);
    }

    info!("Authenticating gh CLI with github_token");
    let login = env
        .apply(ExecRequest::new("gh", ["auth", "login", "--with-token"]))
        .with_stdin(token.trim());
    exec.exec(&login).await?.into_stdout("gh")?;
    info!("gh CLI authenticated");

    Ok(env)
}
