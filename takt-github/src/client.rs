//! GitHub API client using octocrab

use crate::{Error, Result};
use octocrab::Octocrab;
use tracing::info;

/// Default REST endpoint; GitHub Enterprise runners set `GITHUB_API_URL`
pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// GitHub API client used to post results
pub struct GitHubClient {
    client: Octocrab,
    http: reqwest::Client,
    token: String,
    api_url: String,
}

impl GitHubClient {
    /// Create a client for `api_url` authenticated with `token`
    pub fn new(token: impl Into<String>, api_url: impl Into<String>) -> Result<Self> {
        let token = token.into();
        let api_url = api_url.into().trim_end_matches('/').to_string();

        if token.trim().is_empty() {
            return Err(Error::Auth(
                "GitHub token not found. Set the github_token input".to_string(),
            ));
        }

        let client = Octocrab::builder()
            .personal_token(token.clone())
            .base_uri(api_url.as_str())
            .map_err(|e| Error::Auth(format!("Invalid GitHub API URL {}: {}", api_url, e)))?
            .build()
            .map_err(|e| Error::Auth(format!("Failed to create GitHub client: {}", e)))?;

        info!(api_url = %api_url, "Created GitHub client");

        Ok(Self {
            client,
            http: reqwest::Client::new(),
            token,
            api_url,
        })
    }

    /// Create a client for the API URL the runner advertises
    pub fn from_env(token: impl Into<String>) -> Result<Self> {
        let api_url = std::env::var("GITHUB_API_URL")
            .ok()
            .filter(|u| !u.is_empty())
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());
        Self::new(token, api_url)
    }

    /// Get the underlying octocrab client
    pub fn client(&self) -> &Octocrab {
        &self.client
    }

    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.http
    }

    pub(crate) fn token(&self) -> &str {
        &self.token
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }
}

impl std::fmt::Debug for GitHubClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubClient")
            .field("api_url", &self.api_url)
            .finish_non_exhaustive()
    }
}

/// Parse a repository reference into owner and repo
///
/// Supports formats:
/// - owner/repo
/// - https://github.com/owner/repo
/// - git@github.com:owner/repo.git
pub fn parse_github_url(url: &str) -> Result<(String, String)> {
    let url = url.trim();

    if !url.contains(':') && !url.contains('/') {
        return Err(Error::Parse(format!(
            "Invalid repository format: {}. Expected owner/repo",
            url
        )));
    }

    if !url.contains("://") && !url.contains('@') {
        // Simple owner/repo format
        let parts: Vec<&str> = url.split('/').collect();
        if parts.len() == 2 && !parts[0].is_empty() && !parts[1].is_empty() {
            return Ok((
                parts[0].to_string(),
                parts[1].trim_end_matches(".git").to_string(),
            ));
        }
        return Err(Error::Parse(format!(
            "Invalid repository format: {}. Expected owner/repo",
            url
        )));
    }

    // Handle HTTPS URL: https://github.com/owner/repo
    if url.starts_with("https://") || url.starts_with("http://") {
        let url = url::Url::parse(url).map_err(|e| Error::Parse(e.to_string()))?;
        let path = url.path().trim_start_matches('/').trim_end_matches(".git");
        let parts: Vec<&str> = path.split('/').collect();
        if parts.len() >= 2 && !parts[0].is_empty() && !parts[1].is_empty() {
            return Ok((parts[0].to_string(), parts[1].to_string()));
        }
        return Err(Error::Parse(format!("Invalid GitHub URL path: {}", path)));
    }

    // Handle SSH URL: git@github.com:owner/repo.git
    if url.starts_with("git@") {
        if let Some(path) = url.split(':').nth(1) {
            let path = path.trim_end_matches(".git");
            let parts: Vec<&str> = path.split('/').collect();
            if parts.len() >= 2 {
                return Ok((parts[0].to_string(), parts[1].to_string()));
            }
        }
        return Err(Error::Parse(format!("Invalid SSH URL: {}", url)));
    }

    Err(Error::Parse(format!("Unrecognized URL format: {}", url)))
}
