//! Error type shared by the platform collector implementations

use std::time::Duration;

use thiserror::Error;

/// Failure while talking to a platform
///
/// These never cross the collector boundary: `run` logs them and reports
/// no data to the dispatch engine.
#[derive(Error, Debug)]
pub enum CollectError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Local I/O failed (fixture files, certificates)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Response could not be (de)serialized
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Platform rejected the credentials
    #[error("authentication failed: {0}")]
    Auth(String),

    /// Response shape did not match the platform API
    #[error("malformed response: {0}")]
    Malformed(String),

    /// Helper command exited with a failure status
    #[error("command failed with status {status}: {stderr}")]
    Command {
        /// Exit status code
        status: i32,
        /// Stderr output
        stderr: String,
    },

    /// Helper command timed out
    #[error("command timed out after {0:?}")]
    Timeout(Duration),
}
