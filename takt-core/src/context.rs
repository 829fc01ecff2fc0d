//! Context records built from the triggering event
//!
//! Every record is a short-lived snapshot: built once, formatted or
//! forwarded, then dropped.

use async_trait::async_trait;
use tracing::{debug, info};

use crate::event::EventContext;
use crate::mention::is_mention;
use crate::Result;

/// Title, body and head commit of a pull request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrMetadata {
    pub title: String,
    pub body: String,
    pub head_sha: String,
}

/// Source of pull request data (diff, changed files, metadata)
///
/// Each call is independent and may fail on its own.
#[async_trait]
pub trait PrSource: Send + Sync {
    /// Unified diff of the pull request
    async fn fetch_diff(&self, pr_number: u64) -> Result<String>;

    /// Changed file paths in tool output order
    async fn fetch_changed_files(&self, pr_number: u64) -> Result<Vec<String>>;

    async fn fetch_metadata(&self, pr_number: u64) -> Result<PrMetadata>;
}

/// Everything a reviewer needs to know about a pull request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrContext {
    pub owner: String,
    pub repo: String,
    pub pr_number: u64,
    pub head_sha: String,
    pub title: String,
    pub body: String,
    pub diff: String,
    pub changed_files: Vec<String>,
}

/// A comment on a pull request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentContext {
    pub owner: String,
    pub repo: String,
    pub pr_number: u64,
    pub comment_body: String,
    pub comment_id: u64,
    pub is_mention: bool,
}

/// A comment on a plain issue
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueCommentContext {
    pub owner: String,
    pub repo: String,
    pub issue_number: u64,
    pub comment_body: String,
    pub comment_id: u64,
    pub is_mention: bool,
    pub issue_title: String,
    /// Empty when the issue has no description
    pub issue_body: String,
}

/// Fetch diff, changed files and metadata concurrently and merge them
///
/// The first failing read aborts the build; no partial context is returned.
pub async fn build_pr_context<S>(event: &EventContext, source: &S, pr_number: u64) -> Result<PrContext>
where
    S: PrSource + ?Sized,
{
    debug!(pr_number, "Building PR context");

    let (metadata, diff, changed_files) = tokio::try_join!(
        source.fetch_metadata(pr_number),
        source.fetch_diff(pr_number),
        source.fetch_changed_files(pr_number),
    )?;

    info!(
        pr_number,
        files = changed_files.len(),
        diff_len = diff.len(),
        "Built PR context"
    );

    Ok(PrContext {
        owner: event.owner.clone(),
        repo: event.repo.clone(),
        pr_number,
        head_sha: metadata.head_sha,
        title: metadata.title,
        body: metadata.body,
        diff,
        changed_files,
    })
}

/// Context for a comment on a pull request, or `None` for anything else
pub fn build_comment_context(event: &EventContext) -> Option<CommentContext> {
    let comment = event.payload.comment.as_ref()?;
    let issue = event.payload.issue.as_ref().filter(|i| i.is_pull_request())?;

    let comment_body = comment.body.clone().unwrap_or_default();

    Some(CommentContext {
        owner: event.owner.clone(),
        repo: event.repo.clone(),
        pr_number: issue.number,
        is_mention: is_mention(&comment_body),
        comment_body,
        comment_id: comment.id,
    })
}

/// Context for a comment on a plain issue, or `None` for anything else
pub fn build_issue_comment_context(event: &EventContext) -> Option<IssueCommentContext> {
    let comment = event.payload.comment.as_ref()?;
    let issue = event.payload.issue.as_ref().filter(|i| !i.is_pull_request())?;

    let comment_body = comment.body.clone().unwrap_or_default();

    Some(IssueCommentContext {
        owner: event.owner.clone(),
        repo: event.repo.clone(),
        issue_number: issue.number,
        is_mention: is_mention(&comment_body),
        comment_body,
        comment_id: comment.id,
        issue_title: issue.title.clone().unwrap_or_default(),
        issue_body: issue.body.clone().unwrap_or_default(),
    })
}

/// Split `--name-only` style output into file paths
///
/// Lines are trimmed and blank ones dropped; order and duplicates are kept.
pub fn parse_changed_files(raw: &str) -> Vec<String> {
    raw.split('\n')
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}
