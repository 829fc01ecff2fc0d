//! Error types for the takt action

use thiserror::Error;

/// Result type alias for takt action operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for takt action operations
#[derive(Error, Debug)]
pub enum Error {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// An external command exited unsuccessfully
    #[error("`{program}` exited with code {code}: {stderr}")]
    CommandFailed {
        program: String,
        code: i32,
        stderr: String,
    },

    /// An external command could not be started
    #[error("Failed to start `{program}`: {reason}")]
    Spawn { program: String, reason: String },

    /// Code-host API call rejected or unreachable
    #[error("API error: {0}")]
    Api(String),

    /// Event payload is missing or malformed
    #[error("Event error: {0}")]
    Event(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}
