//! Configuration management for the takt action
//!
//! Configuration is loaded with the following priority (highest to lowest):
//! 1. Action inputs / CLI flags
//! 2. Environment variables (TAKT_ACTION_*)
//! 3. Config file (~/.config/takt-action/config.toml, or an explicit path)
//! 4. Default values
//!
//! Credentials are never read from the config file.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::setup::InstallSource;
use crate::{Error, Result};

/// How the `takt` CLI is located and run
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TaktConfig {
    /// Path to the takt executable
    pub path: String,

    /// Where to install takt from when it is missing
    pub install_source: InstallSource,

    /// Echo takt's output into the job log
    pub log_output: bool,
}

impl Default for TaktConfig {
    fn default() -> Self {
        Self {
            path: "takt".to_string(),
            install_source: InstallSource::Latest,
            log_output: false,
        }
    }
}

/// Values used when a mention comment does not specify them
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DefaultsConfig {
    pub workflow: String,
    pub model: Option<String>,
    pub provider: Option<String>,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            workflow: "default".to_string(),
            model: None, // Let takt use its default
            provider: None,
        }
    }
}

/// Automatic review of pull_request events
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ReviewConfig {
    /// Run a review workflow and post its findings as inline comments
    pub post_review: bool,

    /// Workflow used for automatic reviews
    pub workflow: String,
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self {
            post_review: false,
            workflow: "review".to_string(),
        }
    }
}

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub takt: TaktConfig,
    pub defaults: DefaultsConfig,
    pub review: ReviewConfig,
}

/// Highest-priority overrides, typically from action inputs
///
/// Empty strings count as unset since Actions passes unset inputs as `""`.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub takt_path: Option<String>,
    pub install_source: Option<InstallSource>,
    pub log_output: Option<bool>,
    pub workflow: Option<String>,
    pub model: Option<String>,
    pub provider: Option<String>,
    pub post_review: Option<bool>,
}

impl Config {
    /// Load configuration from the default config file location
    ///
    /// Returns default config if file doesn't exist
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path();

        if let Some(path) = config_path {
            if path.exists() {
                return Self::load_from_file(&path);
            }
        }

        Ok(Self::default())
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(Error::Io)?;
        toml::from_str(&contents)
            .map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))
    }

    /// Get the default config file path
    ///
    /// Returns `~/.config/takt-action/config.toml` on Unix
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("takt-action").join("config.toml"))
    }

    /// Apply environment variable overrides
    ///
    /// Supported variables:
    /// - TAKT_ACTION_TAKT_PATH: Path to takt executable
    /// - TAKT_ACTION_WORKFLOW: Default workflow
    /// - TAKT_ACTION_MODEL: Model to use
    /// - TAKT_ACTION_PROVIDER: Provider to use
    pub fn with_env_overrides(self) -> Self {
        let var = |name: &str| std::env::var(name).ok();
        self.with_overrides(ConfigOverrides {
            takt_path: var("TAKT_ACTION_TAKT_PATH"),
            workflow: var("TAKT_ACTION_WORKFLOW"),
            model: var("TAKT_ACTION_MODEL"),
            provider: var("TAKT_ACTION_PROVIDER"),
            ..Default::default()
        })
    }

    /// Apply input / CLI flag overrides
    pub fn with_overrides(mut self, overrides: ConfigOverrides) -> Self {
        let set = |value: Option<String>| value.filter(|v| !v.trim().is_empty());

        if let Some(path) = set(overrides.takt_path) {
            self.takt.path = path;
        }
        if let Some(source) = overrides.install_source {
            self.takt.install_source = source;
        }
        if let Some(log_output) = overrides.log_output {
            self.takt.log_output = log_output;
        }
        if let Some(workflow) = set(overrides.workflow) {
            self.defaults.workflow = workflow;
        }
        if let Some(model) = set(overrides.model) {
            self.defaults.model = Some(model);
        }
        if let Some(provider) = set(overrides.provider) {
            self.defaults.provider = Some(provider);
        }
        if let Some(post_review) = overrides.post_review {
            self.review.post_review = post_review;
        }

        self
    }

    /// Load configuration with all overrides applied
    ///
    /// Priority: inputs > env > config file > defaults
    pub fn load_with_overrides(path: Option<&Path>, overrides: ConfigOverrides) -> Result<Self> {
        let base = match path {
            Some(p) => Self::load_from_file(p)?,
            None => Self::load()?,
        };
        Ok(base.with_env_overrides().with_overrides(overrides))
    }
}
