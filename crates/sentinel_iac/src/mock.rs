//! Mock validator for testing.
//!
//! Provides a configurable [`ManifestValidator`] that records every call and
//! replays predefined outcomes, so rendering can be exercised without kubectl
//! or a cluster.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::validator::{ManifestValidator, ValidationOutcome};

/// Mock manifest validator.
///
/// With no responses configured every manifest is accepted. Otherwise the
/// responses are returned in order, cycling once exhausted.
#[derive(Clone, Default)]
pub struct MockValidator {
    responses: Arc<RwLock<Vec<ValidationOutcome>>>,
    response_index: Arc<AtomicUsize>,
    captured: Arc<RwLock<Vec<CapturedValidation>>>,
}

/// Captured call information for verification.
#[derive(Debug, Clone)]
pub struct CapturedValidation {
    pub path: PathBuf,
    /// File content at the time of the call.
    pub content: String,
}

impl MockValidator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an outcome for the next validate call.
    pub fn add_response(self, outcome: ValidationOutcome) -> Self {
        self.responses.write().push(outcome);
        self
    }

    /// Reject every manifest with the given message.
    pub fn rejecting(message: impl Into<String>) -> Self {
        Self::new().add_response(ValidationOutcome::Rejected(message.into()))
    }

    /// Report the validator as unavailable for every manifest.
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new().add_response(ValidationOutcome::Unavailable(message.into()))
    }

    /// Get all captured calls.
    pub fn get_calls(&self) -> Vec<CapturedValidation> {
        self.captured.read().clone()
    }

    pub fn call_count(&self) -> usize {
        self.captured.read().len()
    }

    fn next_response(&self) -> ValidationOutcome {
        let responses = self.responses.read();
        if responses.is_empty() {
            return ValidationOutcome::Accepted;
        }
        let index = self.response_index.fetch_add(1, Ordering::SeqCst);
        responses[index % responses.len()].clone()
    }
}

#[async_trait]
impl ManifestValidator for MockValidator {
    fn name(&self) -> &str {
        "mock"
    }

    async fn validate(&self, manifest: &Path) -> ValidationOutcome {
        let content = std::fs::read_to_string(manifest).unwrap_or_default();
        self.captured.write().push(CapturedValidation {
            path: manifest.to_path_buf(),
            content,
        });
        self.next_response()
    }
}
