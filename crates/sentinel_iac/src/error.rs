//! Error types for the infrastructure collaborators.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for IaC operations.
pub type IacResult<T> = Result<T, IacError>;

/// Errors that can occur while talking to terraform or kubectl.
#[derive(Error, Debug)]
pub enum IacError {
    #[error("Terraform not available: {0}")]
    TerraformNotAvailable(String),

    #[error("Terraform output failed (exit code {exit_code}): {message}")]
    OutputFailed { exit_code: i32, message: String },

    #[error("Invalid terraform outputs document: {0}")]
    InvalidOutputs(String),

    #[error("Outputs file not found: {0}")]
    OutputsFileNotFound(PathBuf),

    #[error("Failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
