//! Posting results back to the code host

use async_trait::async_trait;
use tracing::{debug, info};

use crate::review::ReviewComment;
use crate::Result;

/// Write side of the GitHub API used by this action
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Post a plain comment on an issue or pull request
    async fn create_issue_comment(&self, owner: &str, repo: &str, number: u64, body: &str)
        -> Result<()>;

    /// Submit a `COMMENT` review with inline comments against `commit_id`
    async fn create_review(
        &self,
        owner: &str,
        repo: &str,
        pr_number: u64,
        commit_id: &str,
        comments: &[ReviewComment],
    ) -> Result<()>;
}

/// Post `body` as a comment on issue or pull request `number`
pub async fn post_issue_comment<P>(publisher: &P, owner: &str, repo: &str, number: u64, body: &str) -> Result<()>
where
    P: Publisher + ?Sized,
{
    publisher.create_issue_comment(owner, repo, number, body).await?;
    info!(number, "Posted comment");
    Ok(())
}

/// Post inline review comments; an empty list makes no API call
pub async fn post_review_comments<P>(
    publisher: &P,
    owner: &str,
    repo: &str,
    pr_number: u64,
    commit_id: &str,
    comments: &[ReviewComment],
) -> Result<()>
where
    P: Publisher + ?Sized,
{
    if comments.is_empty() {
        debug!(pr_number, "No review comments to post");
        return Ok(());
    }

    publisher
        .create_review(owner, repo, pr_number, commit_id, comments)
        .await?;
    info!(pr_number, count = comments.len(), "Posted review comments");
    Ok(())
}
