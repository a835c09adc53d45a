//! Render configuration.
//!
//! Everything a run needs is carried in one [`RenderConfig`] value that is
//! passed by reference into the renderer. The template set is fixed per
//! configuration: either the built-in default or a TOML file such as
//!
//! ```toml
//! project = "cybersentinel"
//! templates_root = "k8s/templates"
//! output_root = "k8s/rendered"
//!
//! [[templates]]
//! source = "namespace.yaml"
//! output = "namespace.yaml"
//! kind = "namespace"
//! ```

use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::{Component, Path, PathBuf};

use sentinel_iac::DryRunMode;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::environment::Environment;
use crate::error::{RenderError, RenderResult};

/// What a template deploys. Informational only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TemplateKind {
    Namespace,
    Backup,
    GitopsApplication,
    Rbac,
    #[default]
    Other,
}

impl TemplateKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TemplateKind::Namespace => "namespace",
            TemplateKind::Backup => "backup",
            TemplateKind::GitopsApplication => "gitops-application",
            TemplateKind::Rbac => "rbac",
            TemplateKind::Other => "other",
        }
    }
}

impl fmt::Display for TemplateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One entry of the template set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateSpec {
    /// Path relative to `templates_root`.
    pub source: PathBuf,
    /// Path relative to the environment's output directory.
    pub output: PathBuf,
    #[serde(default)]
    pub kind: TemplateKind,
}

impl TemplateSpec {
    pub fn new(
        source: impl Into<PathBuf>,
        output: impl Into<PathBuf>,
        kind: TemplateKind,
    ) -> Self {
        Self {
            source: source.into(),
            output: output.into(),
            kind,
        }
    }
}

/// A template resolved against a concrete environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateFile {
    pub source: PathBuf,
    pub output: PathBuf,
    /// `output` relative to the environment directory.
    pub relative_output: PathBuf,
    pub kind: TemplateKind,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    #[serde(default = "default_project")]
    pub project: String,
    #[serde(default = "default_templates_root")]
    pub templates_root: PathBuf,
    #[serde(default = "default_output_root")]
    pub output_root: PathBuf,
    #[serde(default = "default_templates")]
    pub templates: Vec<TemplateSpec>,
    /// Treat every warning as a failure.
    #[serde(default)]
    pub strict: bool,
    #[serde(default)]
    pub skip_validation: bool,
    #[serde(default)]
    pub dry_run_mode: DryRunMode,
}

fn default_project() -> String {
    "cybersentinel".to_string()
}

fn default_templates_root() -> PathBuf {
    PathBuf::from("k8s/templates")
}

fn default_output_root() -> PathBuf {
    PathBuf::from("k8s/rendered")
}

fn default_templates() -> Vec<TemplateSpec> {
    use TemplateKind::*;

    let mut templates = vec![
        TemplateSpec::new("namespace.yaml", "namespace.yaml", Namespace),
        TemplateSpec::new("velero.yaml", "velero.yaml", Backup),
    ];
    for app in [
        "external-secrets",
        "ingress-nginx",
        "cert-manager",
        "external-dns",
        "cloudwatch-agent",
    ] {
        let path = format!("argocd/{}.yaml", app);
        templates.push(TemplateSpec::new(&path, &path, GitopsApplication));
    }
    templates.push(TemplateSpec::new("rbac.yaml", "rbac.yaml", Rbac));
    templates
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            project: default_project(),
            templates_root: default_templates_root(),
            output_root: default_output_root(),
            templates: default_templates(),
            strict: false,
            skip_validation: false,
            dry_run_mode: DryRunMode::default(),
        }
    }
}

impl RenderConfig {
    /// Load a TOML configuration file.
    ///
    /// Relative roots are resolved against the directory holding the file.
    pub fn load(path: impl AsRef<Path>) -> RenderResult<Self> {
        let path = path.as_ref();
        debug!("Loading render config from {:?}", path);

        let content = fs::read_to_string(path)?;
        let mut config = Self::from_toml_str(&content)?;

        if let Some(base) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            if config.templates_root.is_relative() {
                config.templates_root = base.join(&config.templates_root);
            }
            if config.output_root.is_relative() {
                config.output_root = base.join(&config.output_root);
            }
        }

        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> RenderResult<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_templates_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.templates_root = root.into();
        self
    }

    pub fn with_output_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.output_root = root.into();
        self
    }

    pub fn with_templates(mut self, templates: Vec<TemplateSpec>) -> Self {
        self.templates = templates;
        self
    }

    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn skip_validation(mut self, skip: bool) -> Self {
        self.skip_validation = skip;
        self
    }

    pub fn with_dry_run_mode(mut self, mode: DryRunMode) -> Self {
        self.dry_run_mode = mode;
        self
    }

    /// Check structural rules that do not depend on the environment.
    pub fn validate(&self) -> RenderResult<()> {
        if self.project.trim().is_empty() {
            return Err(RenderError::Config("project must not be empty".into()));
        }

        let mut seen = HashSet::new();
        for spec in &self.templates {
            if !is_contained(&spec.output) {
                return Err(RenderError::Config(format!(
                    "output {} must be a relative path inside the environment directory",
                    spec.output.display()
                )));
            }
            if !seen.insert(&spec.output) {
                return Err(RenderError::Config(format!(
                    "output {} is produced by more than one template",
                    spec.output.display()
                )));
            }
            if spec.output == Path::new(crate::kustomize::KUSTOMIZATION_FILE) {
                return Err(RenderError::Config(format!(
                    "output {} is reserved for the generated kustomization",
                    spec.output.display()
                )));
            }
        }
        Ok(())
    }

    /// Output directory for an environment.
    pub fn environment_dir(&self, environment: Environment) -> PathBuf {
        self.output_root.join(environment.as_str())
    }

    /// Resolve the template set for an environment.
    ///
    /// Fails if any output, including the generated kustomization, would
    /// land on any template of the set.
    pub fn template_files(&self, environment: Environment) -> RenderResult<Vec<TemplateFile>> {
        self.validate()?;
        let env_dir = self.environment_dir(environment);

        let files: Vec<TemplateFile> = self
            .templates
            .iter()
            .map(|spec| TemplateFile {
                source: self.templates_root.join(&spec.source),
                output: env_dir.join(&spec.output),
                relative_output: spec.output.clone(),
                kind: spec.kind,
            })
            .collect();

        let composition = env_dir.join(crate::kustomize::KUSTOMIZATION_FILE);
        let outputs = files
            .iter()
            .map(|f| &f.output)
            .chain(std::iter::once(&composition));
        for output in outputs {
            if files.iter().any(|f| same_path(&f.source, output)) {
                return Err(RenderError::OutputOverlapsInput(output.clone()));
            }
        }
        Ok(files)
    }
}

/// Relative, non-empty, and free of `..` or root components.
fn is_contained(path: &Path) -> bool {
    !path.as_os_str().is_empty()
        && path
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}

fn same_path(a: &Path, b: &Path) -> bool {
    if let (Ok(a), Ok(b)) = (a.canonicalize(), b.canonicalize()) {
        return a == b;
    }
    match (std::path::absolute(a), std::path::absolute(b)) {
        (Ok(a), Ok(b)) => normalize(&a) == normalize(&b),
        _ => a == b,
    }
}

fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other),
        }
    }
    out
}
