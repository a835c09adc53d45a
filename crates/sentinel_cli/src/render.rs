//! Render command - build the config, run the renderer, print the summary.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, info};

use sentinel_iac::{KubectlValidator, OutputSource, StaticOutputs, TerraformOutputs};
use sentinel_templates::{
    Environment, FileStatus, ManifestRenderer, RenderConfig, RenderReport, ValidationStatus,
};

use crate::cli::Cli;

pub async fn execute(cli: &Cli) -> Result<RenderReport> {
    // Reject a bad environment before touching config, outputs or disk.
    let environment = Environment::parse(&cli.environment)?;
    info!("Rendering manifests for {}", environment);

    let config = build_config(cli)?;
    debug!("Render config: {:?}", config);

    let source: Box<dyn OutputSource> = match &cli.outputs_file {
        Some(path) => Box::new(StaticOutputs::from_file(path)?),
        None => Box::new(TerraformOutputs::new(&cli.terraform_dir)),
    };

    let mut validator = KubectlValidator::new(config.dry_run_mode);
    if let Some(context) = &cli.kube_context {
        validator = validator.with_context(context);
    }

    let renderer = ManifestRenderer::new(config).with_validator(Arc::new(validator));
    let report = renderer.run(environment.as_str(), source.as_ref()).await?;

    print_summary(&report, renderer.config().skip_validation, cli.quiet);
    Ok(report)
}

/// Merge the configuration file (or defaults) with command-line overrides.
fn build_config(cli: &Cli) -> Result<RenderConfig> {
    let mut config = match &cli.config {
        Some(path) => RenderConfig::load(path)
            .with_context(|| format!("Failed to load render config {:?}", path))?,
        None => RenderConfig::default(),
    };

    if let Some(root) = &cli.output_root {
        config.output_root = root.clone();
    }
    if let Some(mode) = cli.dry_run_mode {
        config.dry_run_mode = mode.into();
    }
    let strict = config.strict || cli.strict;
    let skip_validation = config.skip_validation || cli.skip_validation;

    Ok(config.strict(strict).skip_validation(skip_validation))
}

fn print_summary(report: &RenderReport, validation_skipped: bool, quiet: bool) {
    if !quiet {
        println!("📦 Rendering {} → {}", report.environment, report.output_dir.display());
        for file in &report.files {
            let marker = match file.status {
                FileStatus::Rendered => "✅",
                FileStatus::Skipped => "⏭️ ",
                FileStatus::Failed => "❌",
            };
            let validation = match &file.validation {
                ValidationStatus::NotRun => "",
                ValidationStatus::Accepted => " (dry-run ok)",
                ValidationStatus::Rejected(_) => " (dry-run rejected)",
                ValidationStatus::Unavailable(_) => " (dry-run unavailable)",
            };
            println!("   {} {}{}", marker, file.relative_output.display(), validation);
        }
        if let Some(composition) = &report.composition {
            println!("   📝 {}", composition.display());
        }
        if validation_skipped {
            println!("   ⏭️  Dry-run validation skipped");
        }
    }

    if !report.warnings.is_empty() {
        println!();
        for warning in &report.warnings {
            println!("   ⚠️  [{}] {}", warning.kind(), warning);
        }
    }

    println!();
    println!(
        "Results: {} rendered, {} skipped, {} failed, {} warning(s), {} unresolved placeholder warning(s)",
        report.rendered_count(),
        report.skipped_count(),
        report.failed_count(),
        report.warning_count(),
        report.unresolved_warning_count()
    );
}
