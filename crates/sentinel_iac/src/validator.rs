//! Dry-run validation of rendered manifests.
//!
//! Validation is advisory: the cluster may not be reachable from where the
//! renderer runs, so every failure mode is reported as a
//! [`ValidationOutcome`] instead of an error.

use std::fmt;
use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::IacError;
use crate::process::run_tool;

/// Messages kubectl prints when it has no usable cluster behind it.
const UNREACHABLE_MARKERS: &[&str] = &[
    "unable to connect to the server",
    "connection refused",
    "couldn't get current server api group list",
    "no configuration has been provided",
];

/// Which kind of dry run kubectl performs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DryRunMode {
    /// Schema-level check done by kubectl itself.
    #[default]
    Client,
    /// Full admission check on the API server.
    Server,
}

impl DryRunMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            DryRunMode::Client => "client",
            DryRunMode::Server => "server",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "client" => Some(DryRunMode::Client),
            "server" => Some(DryRunMode::Server),
            _ => None,
        }
    }
}

impl fmt::Display for DryRunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Result of validating one manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationOutcome {
    /// The validator accepted the document.
    Accepted,
    /// The validator ran and rejected the document.
    Rejected(String),
    /// The validator could not give an answer.
    Unavailable(String),
}

impl ValidationOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, ValidationOutcome::Accepted)
    }

    /// Detail message for non-accepted outcomes.
    pub fn message(&self) -> Option<&str> {
        match self {
            ValidationOutcome::Accepted => None,
            ValidationOutcome::Rejected(msg) | ValidationOutcome::Unavailable(msg) => Some(msg),
        }
    }
}

/// Something that can check a rendered manifest without persisting it.
#[async_trait]
pub trait ManifestValidator: Send + Sync {
    /// Short name used in logs and reports.
    fn name(&self) -> &str;

    /// Validate the manifest at `manifest`.
    async fn validate(&self, manifest: &Path) -> ValidationOutcome;
}

/// Validator backed by `kubectl apply --dry-run`.
pub struct KubectlValidator {
    binary: String,
    mode: DryRunMode,
    context: Option<String>,
}

impl Default for KubectlValidator {
    fn default() -> Self {
        Self::new(DryRunMode::default())
    }
}

impl KubectlValidator {
    pub fn new(mode: DryRunMode) -> Self {
        Self {
            binary: "kubectl".to_string(),
            mode,
            context: None,
        }
    }

    pub fn with_binary(mut self, binary: impl Into<String>) -> Self {
        self.binary = binary.into();
        self
    }

    /// Pin the kubeconfig context instead of using the current one.
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    fn build_args(&self, manifest: &Path) -> Vec<String> {
        let mut args = vec![
            "apply".to_string(),
            format!("--dry-run={}", self.mode),
            "-f".to_string(),
            manifest.to_string_lossy().into_owned(),
        ];
        if let Some(context) = &self.context {
            args.push("--context".to_string());
            args.push(context.clone());
        }
        args
    }
}

#[async_trait]
impl ManifestValidator for KubectlValidator {
    fn name(&self) -> &str {
        &self.binary
    }

    async fn validate(&self, manifest: &Path) -> ValidationOutcome {
        info!("Dry-run ({}) validating {:?}", self.mode, manifest);

        let output = match run_tool(&self.binary, &self.build_args(manifest), None).await {
            Ok(output) => output,
            Err(IacError::Spawn { program, source }) => {
                return ValidationOutcome::Unavailable(format!(
                    "{} not available: {}",
                    program, source
                ));
            }
            Err(e) => return ValidationOutcome::Unavailable(e.to_string()),
        };

        if output.success() {
            debug!("{} accepted {:?}", self.binary, manifest);
            return ValidationOutcome::Accepted;
        }

        let message = output.combined_output();
        if is_unreachable(&message) {
            ValidationOutcome::Unavailable(message)
        } else {
            ValidationOutcome::Rejected(message)
        }
    }
}

fn is_unreachable(message: &str) -> bool {
    let lower = message.to_lowercase();
    UNREACHABLE_MARKERS.iter().any(|m| lower.contains(m))
}
