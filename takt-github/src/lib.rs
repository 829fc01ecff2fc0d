//! takt GitHub - GitHub collaborators for the takt action
//!
//! Reads pull request data through the `gh` CLI and posts comments and
//! reviews through the REST API.

mod client;
mod error;
mod gh;
mod review;

pub use client::{parse_github_url, GitHubClient, DEFAULT_API_URL};
pub use error::{Error, Result};
pub use gh::GhCli;
