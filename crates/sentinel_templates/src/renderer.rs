//! Manifest rendering.

use std::fs;
use std::sync::Arc;

use sentinel_iac::{ManifestValidator, OutputSource, ValidationOutcome};
use tracing::{debug, info, warn};

use crate::config::{RenderConfig, TemplateFile};
use crate::environment::Environment;
use crate::error::RenderResult;
use crate::kustomize::{Kustomization, KUSTOMIZATION_FILE};
use crate::placeholder::{PlaceholderSet, ResolvedValues};
use crate::report::{FileReport, FileStatus, RenderReport, RenderWarning, ValidationStatus};
use crate::writer::write_atomic;

/// Renders the configured template set for one environment.
///
/// Fatal problems (bad environment, missing account id, a template set
/// that would overwrite its own inputs) are detected before the first write.
/// Everything else is collected into the [`RenderReport`].
pub struct ManifestRenderer {
    config: RenderConfig,
    validator: Option<Arc<dyn ManifestValidator>>,
}

impl ManifestRenderer {
    pub fn new(config: RenderConfig) -> Self {
        Self {
            config,
            validator: None,
        }
    }

    /// Validator used for the dry-run check of each rendered file.
    pub fn with_validator(mut self, validator: Arc<dyn ManifestValidator>) -> Self {
        self.validator = Some(validator);
        self
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// Render every template for `environment` using values from `source`.
    pub async fn run(
        &self,
        environment: &str,
        source: &dyn OutputSource,
    ) -> RenderResult<RenderReport> {
        let environment = Environment::parse(environment)?;
        let files = self.config.template_files(environment)?;

        info!("Fetching values from {}", source.describe());
        let outputs = source.fetch().await?;
        let (values, warnings) =
            ResolvedValues::from_outputs(environment, &self.config.project, &outputs)?;
        let placeholders = PlaceholderSet::new(&values)?;

        self.render_all(environment, &files, &placeholders, warnings)
            .await
    }

    /// Render an already-resolved template set.
    pub async fn render_all(
        &self,
        environment: Environment,
        files: &[TemplateFile],
        placeholders: &PlaceholderSet,
        warnings: Vec<RenderWarning>,
    ) -> RenderResult<RenderReport> {
        let output_dir = self.config.environment_dir(environment);
        info!(
            "Rendering {} template(s) for {} into {:?}",
            files.len(),
            environment,
            output_dir
        );

        let mut report = RenderReport::new(environment, output_dir.clone(), self.config.strict);
        report.warnings = warnings;

        for file in files {
            let mut file_report = self.render_file(file, placeholders, &mut report.warnings)?;
            if file_report.status == FileStatus::Rendered {
                self.validate_file(file, &mut file_report, &mut report.warnings)
                    .await;
            }
            report.files.push(file_report);
        }

        let kustomization = Kustomization::for_environment(
            environment,
            &self.config.project,
            report
                .files
                .iter()
                .filter(|f| f.status != FileStatus::Skipped)
                .map(|f| f.relative_output.as_path()),
        );
        let composition = output_dir.join(KUSTOMIZATION_FILE);
        write_atomic(&composition, kustomization.to_yaml()?.as_bytes())?;
        debug!("Wrote composition descriptor {:?}", composition);
        report.composition = Some(composition);

        info!(
            "Rendered {} file(s), skipped {}, {} warning(s)",
            report.rendered_count() + report.failed_count(),
            report.skipped_count(),
            report.warning_count()
        );
        Ok(report)
    }

    /// Render one template to its output path.
    ///
    /// A missing or unreadable template is skipped with a warning. Leftover
    /// placeholders are recorded, never fatal.
    pub fn render_file(
        &self,
        file: &TemplateFile,
        placeholders: &PlaceholderSet,
        warnings: &mut Vec<RenderWarning>,
    ) -> RenderResult<FileReport> {
        let mut file_report = FileReport::skipped(file);

        if !file.source.is_file() {
            warn!("Template not found, skipping: {:?}", file.source);
            warnings.push(RenderWarning::MissingTemplate {
                path: file.source.clone(),
            });
            return Ok(file_report);
        }

        let template = match fs::read_to_string(&file.source) {
            Ok(template) => template,
            Err(e) => {
                warn!("Template unreadable, skipping: {:?}: {}", file.source, e);
                warnings.push(RenderWarning::UnreadableTemplate {
                    path: file.source.clone(),
                    reason: e.to_string(),
                });
                return Ok(file_report);
            }
        };
        let substitution = placeholders.substitute(&template);
        let write = write_atomic(&file.output, substitution.content.as_bytes())?;

        debug!(
            "Rendered {:?} -> {:?} ({} replacement(s), {:?})",
            file.source, file.output, substitution.replacements, write
        );

        let unresolved = placeholders.scan(&substitution.content);
        if !unresolved.is_empty() {
            warn!(
                "{} unresolved placeholder(s) in {:?}: {}",
                unresolved.count,
                file.output,
                unresolved.tokens.join(", ")
            );
            warnings.push(RenderWarning::UnresolvedPlaceholder {
                file: file.output.clone(),
                tokens: unresolved.tokens.clone(),
                count: unresolved.count,
            });
        }

        file_report.status = FileStatus::Rendered;
        file_report.write = Some(write);
        file_report.replacements = substitution.replacements;
        file_report.unresolved_count = unresolved.count;
        file_report.unresolved_tokens = unresolved.tokens;
        file_report.empty_values = substitution.empty_values.into_iter().collect();
        Ok(file_report)
    }

    async fn validate_file(
        &self,
        file: &TemplateFile,
        file_report: &mut FileReport,
        warnings: &mut Vec<RenderWarning>,
    ) {
        let validator = match &self.validator {
            Some(v) if !self.config.skip_validation => v,
            _ => return,
        };

        let outcome = validator.validate(&file.output).await;
        file_report.validation = match outcome {
            ValidationOutcome::Accepted => ValidationStatus::Accepted,
            ValidationOutcome::Rejected(reason) => {
                warn!("{} rejected {:?}", validator.name(), file.output);
                if self.config.strict {
                    file_report.status = FileStatus::Failed;
                }
                warnings.push(RenderWarning::ValidatorUnavailable {
                    file: file.output.clone(),
                    reason: reason.clone(),
                });
                ValidationStatus::Rejected(reason)
            }
            ValidationOutcome::Unavailable(reason) => {
                warn!(
                    "{} could not validate {:?}, continuing",
                    validator.name(),
                    file.output
                );
                warnings.push(RenderWarning::ValidatorUnavailable {
                    file: file.output.clone(),
                    reason: reason.clone(),
                });
                ValidationStatus::Unavailable(reason)
            }
        };
    }
}
