//! Error types for the samples validator
//!
//! These are fatal errors only: configuration problems and infrastructure
//! failures that stop a run. A sample that fails is not an error, it is an
//! [`ExecutionOutcome`](crate::runner::ExecutionOutcome) carrying a
//! [`FailureReason`](crate::runner::FailureReason).

use std::io;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the samples validator
#[derive(Error, Debug)]
pub enum Error {
    // === Configuration Errors ===
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration file '{path}': {message}")]
    ConfigParse { path: String, message: String },

    #[error("Missing environment variables required by configuration: {}", .0.join(", "))]
    MissingEnvironment(Vec<String>),

    // === Scan Errors ===
    #[error("Invalid HTTP method directory '{dir}' for sample '{path}'. Expected one of POST, GET, PUT, DELETE")]
    InvalidMethodDir { path: String, dir: String },

    #[error("Failed to walk samples directory: {0}")]
    Walk(#[from] walkdir::Error),

    // === Environment Errors ===
    #[error("Interpreter '{0}' not found in PATH")]
    InterpreterNotFound(String),

    #[error("Failed to provision {runner} environment: {reason}")]
    Provision { runner: String, reason: String },

    #[error("Failed to spawn '{program}': {error}")]
    Spawn { program: String, error: String },

    // === Network Errors ===
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    // === IO Errors ===
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to read file '{path}': {error}")]
    FileRead { path: String, error: String },

    // === Session Errors ===
    #[error("Session interrupted")]
    Interrupted,
}

impl Error {
    /// Create a provisioning error for the named runner
    pub fn provision(runner: &str, reason: impl Into<String>) -> Self {
        Self::Provision {
            runner: runner.to_string(),
            reason: reason.into(),
        }
    }

    /// Create a file read error
    pub fn file_read(path: &std::path::Path, error: &io::Error) -> Self {
        Self::FileRead {
            path: path.display().to_string(),
            error: error.to_string(),
        }
    }
}
