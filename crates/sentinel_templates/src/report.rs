//! Per-run rendering report.

use std::fmt;
use std::path::PathBuf;

use crate::config::{TemplateFile, TemplateKind};
use crate::environment::Environment;
use crate::placeholder::ValueKey;
use crate::writer::WriteOutcome;

/// Recoverable problems. They are accumulated and summarized at the end;
/// only strict mode turns them into a failed run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderWarning {
    /// A template in the set does not exist; the file was skipped.
    MissingTemplate { path: PathBuf },
    /// A template exists but could not be read as text; the file was skipped.
    UnreadableTemplate { path: PathBuf, reason: String },
    /// Tokens were left in a rendered file.
    UnresolvedPlaceholder {
        file: PathBuf,
        tokens: Vec<String>,
        count: usize,
    },
    /// Dry-run validation was rejected or could not run.
    ValidatorUnavailable { file: PathBuf, reason: String },
    /// An optional output was absent and substituted as empty.
    MissingOptionalValue { output: String },
}

impl RenderWarning {
    /// Stable identifier of the warning category.
    pub fn kind(&self) -> &'static str {
        match self {
            RenderWarning::MissingTemplate { .. } => "missing-template",
            RenderWarning::UnreadableTemplate { .. } => "unreadable-template",
            RenderWarning::UnresolvedPlaceholder { .. } => "unresolved-placeholder",
            RenderWarning::ValidatorUnavailable { .. } => "validator-unavailable",
            RenderWarning::MissingOptionalValue { .. } => "missing-optional-value",
        }
    }
}

impl fmt::Display for RenderWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderWarning::MissingTemplate { path } => {
                write!(f, "template not found, skipped: {}", path.display())
            }
            RenderWarning::UnreadableTemplate { path, reason } => {
                write!(f, "template unreadable, skipped: {}: {}", path.display(), reason)
            }
            RenderWarning::UnresolvedPlaceholder { file, tokens, count } => write!(
                f,
                "{} unresolved placeholder(s) in {}: {}",
                count,
                file.display(),
                tokens.join(", ")
            ),
            RenderWarning::ValidatorUnavailable { file, reason } => {
                let first_line = reason.lines().next().unwrap_or("");
                write!(f, "dry-run validation failed for {}: {}", file.display(), first_line)
            }
            RenderWarning::MissingOptionalValue { output } => {
                write!(f, "output '{}' missing, substituted as empty string", output)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileStatus {
    Rendered,
    Skipped,
    /// Rendered, but rejected by the validator in strict mode.
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationStatus {
    NotRun,
    Accepted,
    Rejected(String),
    Unavailable(String),
}

/// Result for a single template.
#[derive(Debug, Clone)]
pub struct FileReport {
    pub template: PathBuf,
    pub output: PathBuf,
    /// `output` relative to the environment directory.
    pub relative_output: PathBuf,
    pub kind: TemplateKind,
    pub status: FileStatus,
    pub write: Option<WriteOutcome>,
    pub replacements: usize,
    pub unresolved_count: usize,
    pub unresolved_tokens: Vec<String>,
    pub empty_values: Vec<ValueKey>,
    pub validation: ValidationStatus,
}

impl FileReport {
    pub(crate) fn skipped(file: &TemplateFile) -> Self {
        Self {
            template: file.source.clone(),
            output: file.output.clone(),
            relative_output: file.relative_output.clone(),
            kind: file.kind,
            status: FileStatus::Skipped,
            write: None,
            replacements: 0,
            unresolved_count: 0,
            unresolved_tokens: Vec::new(),
            empty_values: Vec::new(),
            validation: ValidationStatus::NotRun,
        }
    }
}

/// Summary of a full run.
#[derive(Debug, Clone)]
pub struct RenderReport {
    pub environment: Environment,
    pub output_dir: PathBuf,
    pub files: Vec<FileReport>,
    pub warnings: Vec<RenderWarning>,
    /// Path of the generated kustomization, if written.
    pub composition: Option<PathBuf>,
    pub strict: bool,
}

impl RenderReport {
    pub fn new(environment: Environment, output_dir: PathBuf, strict: bool) -> Self {
        Self {
            environment,
            output_dir,
            files: Vec::new(),
            warnings: Vec::new(),
            composition: None,
            strict,
        }
    }

    pub fn rendered_count(&self) -> usize {
        self.count_status(FileStatus::Rendered)
    }

    pub fn skipped_count(&self) -> usize {
        self.count_status(FileStatus::Skipped)
    }

    pub fn failed_count(&self) -> usize {
        self.count_status(FileStatus::Failed)
    }

    pub fn warning_count(&self) -> usize {
        self.warnings.len()
    }

    /// Number of files with leftover placeholders.
    pub fn unresolved_warning_count(&self) -> usize {
        self.warnings
            .iter()
            .filter(|w| matches!(w, RenderWarning::UnresolvedPlaceholder { .. }))
            .count()
    }

    /// Outputs that were written, in template order.
    pub fn rendered_outputs(&self) -> impl Iterator<Item = &PathBuf> {
        self.files
            .iter()
            .filter(|f| f.status != FileStatus::Skipped)
            .map(|f| &f.output)
    }

    /// Whether the run should be reported as successful.
    ///
    /// Warnings alone never fail a run unless strict mode is on.
    pub fn is_success(&self) -> bool {
        self.failed_count() == 0 && !(self.strict && !self.warnings.is_empty())
    }

    fn count_status(&self, status: FileStatus) -> usize {
        self.files.iter().filter(|f| f.status == status).count()
    }
}
