//! Error types for virtgather-core

use thiserror::Error;

/// Errors that prevent a single target from being dispatched
///
/// These are logged per target and never abort the run.
#[derive(Error, Debug, Clone)]
pub enum ConfigError {
    /// A declared parameter is absent or empty in the target record
    #[error("missing parameter or value '{0}'")]
    MissingParameter(String),

    /// A parameter is present but unusable
    #[error("invalid value for parameter '{name}': {reason}")]
    InvalidParameter {
        /// Parameter name
        name: String,
        /// Why the value was rejected
        reason: String,
    },

    /// The target names a module that is not registered
    #[error("unknown module '{0}'")]
    UnknownModule(String),
}

/// Errors while reading the target list; fatal for the run
#[derive(Error, Debug)]
pub enum InputError {
    /// Input file could not be read
    #[error("failed to read input file '{path}': {source}")]
    Io {
        /// Path as given on the command line
        path: String,
        /// Underlying I/O error
        source: std::io::Error,
    },

    /// Input file is not a JSON array of target records
    #[error("input file is not a valid target list: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors while writing the result document; fatal for the run
#[derive(Error, Debug)]
pub enum OutputError {
    /// Output destination could not be written
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Result could not be serialized
    #[error("serialization failed: {0}")]
    Json(#[from] serde_json::Error),
}
