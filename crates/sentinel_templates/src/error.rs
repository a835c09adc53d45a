//! Error types for manifest rendering.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for render operations.
pub type RenderResult<T> = Result<T, RenderError>;

/// Fatal rendering errors. Anything recoverable is a
/// [`RenderWarning`](crate::report::RenderWarning) instead.
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Invalid environment '{0}': expected one of dev, staging, prod")]
    InvalidEnvironment(String),

    #[error("Missing required value: {0}")]
    MissingRequiredValue(String),

    #[error("Output path {0} would overwrite its own template")]
    OutputOverlapsInput(PathBuf),

    #[error("Invalid render configuration: {0}")]
    Config(String),

    #[error("Failed to write {path}: {source}")]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid placeholder pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Infrastructure error: {0}")]
    Iac(#[from] sentinel_iac::IacError),
}
