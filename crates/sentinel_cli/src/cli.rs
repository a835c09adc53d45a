//! Command-line arguments.

use std::path::PathBuf;

use clap::builder::FalseyValueParser;
use clap::{Parser, ValueEnum};
use sentinel_iac::DryRunMode;

/// Render CyberSentinel Kubernetes manifests for one environment
#[derive(Parser, Debug)]
#[command(name = "render-k8s-manifests")]
#[command(version, about = "Render CyberSentinel Kubernetes manifests for one environment")]
#[command(long_about = r#"
Substitutes the environment name and IRSA role ARNs from Terraform outputs
into the manifest templates, writes them under <output-root>/<environment>/
together with a generated kustomization.yaml, and dry-run validates each
rendered manifest with kubectl.

Missing templates, leftover placeholders and failed dry-runs are reported as
warnings. Use --strict to turn any warning into a failure.

ENVIRONMENT VARIABLES:
  SKIP_VALIDATION     Skip the kubectl dry-run step (same as --skip-validation)
  STRICT_VALIDATION   Fail on any warning (same as --strict)
  RUST_LOG            Override the log filter

EXIT CODES:
  0 - Success (possibly with warnings)
  1 - General error
  2 - Invalid arguments
  3 - Strict mode failure
  4 - Missing required value
  5 - Terraform error
"#)]
pub struct Cli {
    /// Target environment: dev, staging or prod
    #[arg(value_name = "ENVIRONMENT")]
    pub environment: String,

    /// Render configuration file (TOML); defaults to the built-in template set
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Terraform working directory to read outputs from
    #[arg(long, value_name = "DIR", default_value = "terraform")]
    pub terraform_dir: PathBuf,

    /// Read outputs from a saved `terraform output -json` file instead
    #[arg(long, value_name = "FILE")]
    pub outputs_file: Option<PathBuf>,

    /// Override the configured output root
    #[arg(long, value_name = "DIR")]
    pub output_root: Option<PathBuf>,

    /// Skip the kubectl dry-run validation step
    #[arg(long, env = "SKIP_VALIDATION", value_parser = FalseyValueParser::new())]
    pub skip_validation: bool,

    /// Treat every warning as a failure
    #[arg(long, env = "STRICT_VALIDATION", value_parser = FalseyValueParser::new())]
    pub strict: bool,

    /// kubectl dry-run flavour (defaults to the configured mode, client)
    #[arg(long, value_enum, value_name = "MODE")]
    pub dry_run_mode: Option<DryRunArg>,

    /// kubeconfig context used for validation
    #[arg(long, value_name = "CONTEXT")]
    pub kube_context: Option<String>,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Suppress non-essential output
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DryRunArg {
    Client,
    Server,
}

impl From<DryRunArg> for DryRunMode {
    fn from(arg: DryRunArg) -> Self {
        match arg {
            DryRunArg::Client => DryRunMode::Client,
            DryRunArg::Server => DryRunMode::Server,
        }
    }
}
