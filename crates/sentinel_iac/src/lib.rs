//! # sentinel_iac
//!
//! Infrastructure collaborators for the CyberSentinel manifest renderer.
//!
//! This crate wraps the two external tools the renderer talks to:
//!
//! - Terraform, queried once per run for named outputs (account id, region,
//!   IRSA role ARNs)
//! - kubectl, used for best-effort dry-run validation of rendered manifests
//!
//! Both sit behind traits ([`OutputSource`], [`ManifestValidator`]) so the
//! renderer can be driven by saved outputs and a [`MockValidator`] in tests.
//!
//! ## Example
//!
//! ```rust,no_run
//! use sentinel_iac::{DryRunMode, KubectlValidator, ManifestValidator, OutputSource, TerraformOutputs};
//! use std::path::Path;
//!
//! # async fn run() -> sentinel_iac::IacResult<()> {
//! let outputs = TerraformOutputs::new("terraform").fetch().await?;
//! println!("account: {:?}", outputs.get("account_id"));
//!
//! let validator = KubectlValidator::new(DryRunMode::Client);
//! let outcome = validator.validate(Path::new("k8s/rendered/dev/rbac.yaml")).await;
//! println!("accepted: {}", outcome.is_accepted());
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod mock;
pub mod outputs;
pub mod process;
pub mod validator;

pub use error::{IacError, IacResult};
pub use mock::{CapturedValidation, MockValidator};
pub use outputs::{parse_outputs, OutputSource, OutputValues, StaticOutputs, TerraformOutputs};
pub use process::{run_tool, ToolOutput};
pub use validator::{DryRunMode, KubectlValidator, ManifestValidator, ValidationOutcome};
