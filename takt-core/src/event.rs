//! Webhook event context
//!
//! The event that triggered the run is loaded once from the Actions
//! environment and passed by reference to everything that needs it:
//! - `GITHUB_EVENT_NAME`: event name (`pull_request`, `issue_comment`, ...)
//! - `GITHUB_REPOSITORY`: `owner/repo`
//! - `GITHUB_EVENT_PATH`: path to the JSON webhook payload

use std::path::Path;

use serde::Deserialize;
use tracing::debug;

use crate::{Error, Result};

/// Kind of event this action knows how to handle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventType {
    PullRequest,
    IssueComment,
    Unknown,
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            EventType::PullRequest => "pull_request",
            EventType::IssueComment => "issue_comment",
            EventType::Unknown => "unknown",
        })
    }
}

/// Map a GitHub event name onto an [`EventType`]
pub fn detect_event_type(event_name: &str) -> EventType {
    match event_name {
        "pull_request" | "pull_request_target" => EventType::PullRequest,
        "issue_comment" => EventType::IssueComment,
        _ => EventType::Unknown,
    }
}

/// The parts of a webhook payload this action reads
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventPayload {
    #[serde(default)]
    pub pull_request: Option<PullRequestPayload>,
    #[serde(default)]
    pub issue: Option<IssuePayload>,
    #[serde(default)]
    pub comment: Option<CommentPayload>,
    #[serde(default)]
    pub repository: Option<RepositoryPayload>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PullRequestPayload {
    pub number: u64,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IssuePayload {
    pub number: u64,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
    /// Present (non-null) when the issue is really a pull request
    #[serde(default)]
    pub pull_request: Option<serde_json::Value>,
}

impl IssuePayload {
    pub fn is_pull_request(&self) -> bool {
        self.pull_request.is_some()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommentPayload {
    pub id: u64,
    #[serde(default)]
    pub body: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RepositoryPayload {
    pub name: String,
    pub owner: OwnerPayload,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OwnerPayload {
    pub login: String,
}

/// Immutable snapshot of the triggering event
#[derive(Debug, Clone)]
pub struct EventContext {
    pub event_name: String,
    pub owner: String,
    pub repo: String,
    pub payload: EventPayload,
}

impl EventContext {
    pub fn new(
        event_name: impl Into<String>,
        owner: impl Into<String>,
        repo: impl Into<String>,
        payload: EventPayload,
    ) -> Self {
        Self {
            event_name: event_name.into(),
            owner: owner.into(),
            repo: repo.into(),
            payload,
        }
    }

    /// Load the event from the standard Actions environment variables
    pub fn from_env() -> Result<Self> {
        let event_name = std::env::var("GITHUB_EVENT_NAME")
            .map_err(|_| Error::Event("GITHUB_EVENT_NAME is not set".to_string()))?;
        let repository = std::env::var("GITHUB_REPOSITORY").ok();
        let event_path = std::env::var("GITHUB_EVENT_PATH").ok();

        let payload = match event_path {
            Some(path) if !path.is_empty() => load_payload(Path::new(&path))?,
            _ => EventPayload::default(),
        };

        Self::from_parts(event_name, repository.as_deref(), payload)
    }

    /// Build a context, taking owner/repo from `repository` (`owner/repo`)
    /// or, failing that, from the payload's `repository` object
    pub fn from_parts(
        event_name: impl Into<String>,
        repository: Option<&str>,
        payload: EventPayload,
    ) -> Result<Self> {
        let (owner, repo) = match repository.and_then(split_repository) {
            Some(pair) => pair,
            None => payload
                .repository
                .as_ref()
                .map(|r| (r.owner.login.clone(), r.name.clone()))
                .ok_or_else(|| {
                    Error::Event(
                        "Repository unknown: set GITHUB_REPOSITORY or include `repository` in the payload"
                            .to_string(),
                    )
                })?,
        };

        let ctx = Self::new(event_name, owner, repo, payload);
        debug!(
            event = %ctx.event_name,
            owner = %ctx.owner,
            repo = %ctx.repo,
            "Loaded event context"
        );
        Ok(ctx)
    }

    pub fn event_type(&self) -> EventType {
        detect_event_type(&self.event_name)
    }

    /// `owner/repo`
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.repo)
    }

    /// Resolve the pull request number for this run
    ///
    /// An explicit input wins when it is a base-10 integer; otherwise the
    /// payload's `pull_request`, then an `issue` marked as a pull request.
    pub fn resolve_pr_number(&self, input: Option<&str>) -> Option<u64> {
        if let Some(n) = input.and_then(|s| s.trim().parse::<u64>().ok()) {
            return Some(n);
        }

        if let Some(ref pr) = self.payload.pull_request {
            return Some(pr.number);
        }

        self.payload
            .issue
            .as_ref()
            .filter(|issue| issue.is_pull_request())
            .map(|issue| issue.number)
    }
}

/// Read and parse a webhook payload file
pub fn load_payload(path: &Path) -> Result<EventPayload> {
    let contents = std::fs::read_to_string(path).map_err(|e| {
        Error::Event(format!("Failed to read event payload {}: {}", path.display(), e))
    })?;
    Ok(serde_json::from_str(&contents)?)
}

fn split_repository(repository: &str) -> Option<(String, String)> {
    let (owner, repo) = repository.trim().split_once('/')?;
    if owner.is_empty() || repo.is_empty() || repo.contains('/') {
        return None;
    }
    Some((owner.to_string(), repo.to_string()))
}

#[cfg(test)]
pub(crate) fn payload_from_json(json: serde_json::Value) -> EventPayload {
    serde_json::from_value(json).expect("valid test payload")
}
