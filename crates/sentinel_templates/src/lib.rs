//! # sentinel_templates
//!
//! Manifest placeholder rendering for CyberSentinel.
//!
//! Takes a fixed set of Kubernetes manifest templates, substitutes the
//! environment name and IRSA role ARNs read from Terraform outputs, and writes
//! environment-scoped copies plus a generated `kustomization.yaml`:
//!
//! - Closed environment set (`dev`, `staging`, `prod`)
//! - Longest-token-first substitution in a single pass
//! - Post-render scan for leftover placeholders
//! - Atomic writes, byte-identical on re-run
//! - Best-effort `kubectl` dry-run validation
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use sentinel_iac::{DryRunMode, KubectlValidator, TerraformOutputs};
//! use sentinel_templates::{ManifestRenderer, RenderConfig};
//!
//! # async fn run() -> sentinel_templates::RenderResult<()> {
//! let renderer = ManifestRenderer::new(RenderConfig::default())
//!     .with_validator(Arc::new(KubectlValidator::new(DryRunMode::Client)));
//!
//! let report = renderer.run("staging", &TerraformOutputs::new("terraform")).await?;
//! println!("{} rendered, {} warning(s)", report.rendered_count(), report.warning_count());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod environment;
pub mod error;
pub mod kustomize;
pub mod placeholder;
pub mod renderer;
pub mod report;
pub mod writer;

pub use config::{RenderConfig, TemplateFile, TemplateKind, TemplateSpec};
pub use environment::Environment;
pub use error::{RenderError, RenderResult};
pub use kustomize::{Kustomization, KUSTOMIZATION_FILE};
pub use placeholder::{Placeholder, PlaceholderSet, ResolvedValues, Substitution, Unresolved, ValueKey};
pub use renderer::ManifestRenderer;
pub use report::{FileReport, FileStatus, RenderReport, RenderWarning, ValidationStatus};
pub use writer::{write_atomic, WriteOutcome};
