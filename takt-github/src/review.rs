//! Posting comments and reviews

use async_trait::async_trait;
use reqwest::header::{ACCEPT, USER_AGENT};
use serde::Serialize;
use takt_core::{Publisher, ReviewComment};
use tracing::debug;

use crate::{Error, GitHubClient, Result};

/// Body of `POST /repos/{owner}/{repo}/pulls/{number}/reviews`
#[derive(Debug, Serialize)]
struct CreateReviewRequest<'a> {
    commit_id: &'a str,
    event: &'static str,
    comments: Vec<DraftReviewComment<'a>>,
}

#[derive(Debug, Serialize)]
struct DraftReviewComment<'a> {
    path: &'a str,
    line: u32,
    side: &'static str,
    body: &'a str,
}

impl<'a> CreateReviewRequest<'a> {
    /// A plain `COMMENT` review; every comment targets the new side of the diff
    fn comment(commit_id: &'a str, comments: &'a [ReviewComment]) -> Self {
        Self {
            commit_id,
            event: "COMMENT",
            comments: comments
                .iter()
                .map(|c| DraftReviewComment {
                    path: &c.path,
                    line: c.line,
                    side: "RIGHT",
                    body: &c.body,
                })
                .collect(),
        }
    }
}

impl GitHubClient {
    /// Comment on an issue or pull request
    pub async fn create_comment(&self, owner: &str, repo: &str, number: u64, body: &str) -> Result<()> {
        debug!(owner, repo, number, len = body.len(), "Creating comment");
        self.client()
            .issues(owner, repo)
            .create_comment(number, body)
            .await?;
        Ok(())
    }

    /// Submit a review with inline comments
    pub async fn submit_review(
        &self,
        owner: &str,
        repo: &str,
        pr_number: u64,
        commit_id: &str,
        comments: &[ReviewComment],
    ) -> Result<()> {
        debug!(owner, repo, pr_number, count = comments.len(), "Submitting review");

        let url = format!(
            "{}/repos/{}/{}/pulls/{}/reviews",
            self.api_url(),
            owner,
            repo,
            pr_number
        );

        let response = self
            .http()
            .post(&url)
            .bearer_auth(self.token())
            .header(USER_AGENT, "takt-action")
            .header(ACCEPT, "application/vnd.github+json")
            .json(&CreateReviewRequest::comment(commit_id, comments))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read response".to_string());
            return Err(Error::Status { status, body });
        }

        Ok(())
    }
}

#[async_trait]
impl Publisher for GitHubClient {
    async fn create_issue_comment(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
        body: &str,
    ) -> takt_core::Result<()> {
        Ok(self.create_comment(owner, repo, number, body).await?)
    }

    async fn create_review(
        &self,
        owner: &str,
        repo: &str,
        pr_number: u64,
        commit_id: &str,
        comments: &[ReviewComment],
    ) -> takt_core::Result<()> {
        Ok(self
            .submit_review(owner, repo, pr_number, commit_id, comments)
            .await?)
    }
}
