//! render-k8s-manifests - Main entry point.
//!
//! Exit codes:
//! - 0: Success
//! - 1: General error
//! - 2: Invalid arguments
//! - 3: Strict mode failure
//! - 4: Missing required value
//! - 5: Terraform error

use std::process::ExitCode;

use clap::Parser;
use sentinel_iac::IacError;
use sentinel_templates::RenderError;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod cli;
mod render;

use cli::Cli;

/// CI-friendly exit codes
pub struct ExitCodes;

impl ExitCodes {
    pub const SUCCESS: u8 = 0;
    pub const GENERAL_ERROR: u8 = 1;
    pub const INVALID_ARGS: u8 = 2;
    pub const STRICT_FAILURE: u8 = 3;
    pub const MISSING_VALUE: u8 = 4;
    pub const IAC_ERROR: u8 = 5;
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    match render::execute(&cli).await {
        Ok(report) if report.is_success() => ExitCode::from(ExitCodes::SUCCESS),
        Ok(report) => {
            eprintln!(
                "❌ Strict mode: {} failed file(s), {} warning(s)",
                report.failed_count(),
                report.warning_count()
            );
            ExitCode::from(ExitCodes::STRICT_FAILURE)
        }
        Err(e) => {
            let exit_code = categorize_error(&e);
            eprintln!("❌ Error: {:#}", e);
            ExitCode::from(exit_code)
        }
    }
}

/// Logs go to stderr so the summary on stdout stays clean.
fn init_logging(verbose: bool, quiet: bool) {
    let level = if verbose {
        "debug"
    } else if quiet {
        "warn"
    } else {
        "info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "warn,sentinel_templates={level},sentinel_iac={level},render_k8s_manifests={level}"
        ))
    });

    // Already initialized is fine.
    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .try_init();
}

/// Map the error chain to an exit code.
fn categorize_error(e: &anyhow::Error) -> u8 {
    for cause in e.chain() {
        if let Some(err) = cause.downcast_ref::<RenderError>() {
            return match err {
                RenderError::InvalidEnvironment(_) => ExitCodes::INVALID_ARGS,
                RenderError::MissingRequiredValue(_) => ExitCodes::MISSING_VALUE,
                RenderError::Iac(_) => ExitCodes::IAC_ERROR,
                _ => ExitCodes::GENERAL_ERROR,
            };
        }
        if cause.downcast_ref::<IacError>().is_some() {
            return ExitCodes::IAC_ERROR;
        }
    }
    ExitCodes::GENERAL_ERROR
}
