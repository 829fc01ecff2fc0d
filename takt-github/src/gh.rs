//! Pull request data via the GitHub CLI

use async_trait::async_trait;
use serde::Deserialize;
use takt_core::{parse_changed_files, Exec, ExecRequest, GhEnv, PrMetadata, PrSource};
use tracing::debug;

/// `gh pr view --json title,body,headRefOid`
#[derive(Debug, Deserialize)]
struct GhPrView {
    title: String,
    #[serde(default)]
    body: Option<String>,
    #[serde(rename = "headRefOid")]
    head_ref_oid: String,
}

/// [`PrSource`] that shells out to `gh`
#[derive(Debug, Clone)]
pub struct GhCli<E> {
    exec: E,
    env: Option<GhEnv>,
    repo: Option<String>,
}

impl<E: Exec> GhCli<E> {
    pub fn new(exec: E) -> Self {
        Self {
            exec,
            env: None,
            repo: None,
        }
    }

    /// Run every `gh` call with these credentials
    pub fn with_env(mut self, env: GhEnv) -> Self {
        self.env = Some(env);
        self
    }

    /// Target `owner/repo` explicitly instead of the checkout's remote
    pub fn with_repo(mut self, repo: impl Into<String>) -> Self {
        self.repo = Some(repo.into());
        self
    }

    fn request(&self, args: &[&str]) -> ExecRequest {
        let mut args: Vec<String> = args.iter().map(|a| a.to_string()).collect();
        if let Some(ref repo) = self.repo {
            args.push("--repo".to_string());
            args.push(repo.clone());
        }

        let request = ExecRequest::new("gh", args);
        match self.env {
            Some(ref env) => env.apply(request),
            None => request,
        }
    }

    async fn stdout(&self, args: &[&str]) -> takt_core::Result<String> {
        let request = self.request(args);
        debug!(command = %request.command_line(), "Running gh");
        self.exec.exec(&request).await?.into_stdout("gh")
    }
}

#[async_trait]
impl<E: Exec> PrSource for GhCli<E> {
    async fn fetch_diff(&self, pr_number: u64) -> takt_core::Result<String> {
        let number = pr_number.to_string();
        self.stdout(&["pr", "diff", number.as_str()]).await
    }

    async fn fetch_changed_files(&self, pr_number: u64) -> takt_core::Result<Vec<String>> {
        let number = pr_number.to_string();
        let raw = self.stdout(&["pr", "diff", number.as_str(), "--name-only"]).await?;
        Ok(parse_changed_files(&raw))
    }

    async fn fetch_metadata(&self, pr_number: u64) -> takt_core::Result<PrMetadata> {
        let number = pr_number.to_string();
        let raw = self
            .stdout(&["pr", "view", number.as_str(), "--json", "title,body,headRefOid"])
            .await?;
        let view: GhPrView = serde_json::from_str(&raw)?;

        Ok(PrMetadata {
            title: view.title,
            body: view.body.unwrap_or_default(),
            head_sha: view.head_ref_oid,
        })
    }
}
