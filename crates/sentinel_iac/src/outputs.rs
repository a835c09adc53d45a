//! Infrastructure-state outputs.
//!
//! The renderer needs a handful of named values (account id, region, role
//! ARNs) that Terraform exposes as root-module outputs. [`OutputSource`] is the
//! seam: [`TerraformOutputs`] shells out to `terraform output -json`, while
//! [`StaticOutputs`] serves a fixed map or a saved copy of that JSON.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, info};

use crate::error::{IacError, IacResult};
use crate::process::run_tool;

/// Output name to string value. Absent outputs are simply not present.
pub type OutputValues = BTreeMap<String, String>;

/// A provider of named infrastructure outputs.
#[async_trait]
pub trait OutputSource: Send + Sync {
    /// Human-readable description for logs.
    fn describe(&self) -> String;

    /// Fetch every output the provider knows about.
    async fn fetch(&self) -> IacResult<OutputValues>;
}

/// Reads outputs from a Terraform working directory.
pub struct TerraformOutputs {
    working_dir: PathBuf,
    binary: String,
}

impl TerraformOutputs {
    /// Create an output source for the given Terraform directory.
    pub fn new(working_dir: impl Into<PathBuf>) -> Self {
        Self {
            working_dir: working_dir.into(),
            binary: "terraform".to_string(),
        }
    }

    /// Use a different terraform-compatible binary (e.g. `tofu`).
    pub fn with_binary(mut self, binary: impl Into<String>) -> Self {
        self.binary = binary.into();
        self
    }
}

#[async_trait]
impl OutputSource for TerraformOutputs {
    fn describe(&self) -> String {
        format!("{} outputs in {}", self.binary, self.working_dir.display())
    }

    async fn fetch(&self) -> IacResult<OutputValues> {
        info!("Reading terraform outputs from {:?}", self.working_dir);

        let args = vec!["output".to_string(), "-json".to_string()];
        let output = run_tool(&self.binary, &args, Some(&self.working_dir))
            .await
            .map_err(|e| match e {
                IacError::Spawn { program, source } => {
                    IacError::TerraformNotAvailable(format!("{}: {}", program, source))
                }
                other => other,
            })?;

        if !output.success() {
            return Err(IacError::OutputFailed {
                exit_code: output.exit_code,
                message: output.combined_output(),
            });
        }

        let values = parse_outputs(&output.stdout)?;
        debug!(
            "Terraform returned {} output(s) in {}ms",
            values.len(),
            output.duration_ms
        );
        Ok(values)
    }
}

/// A fixed set of outputs, either built in code or loaded from a file.
#[derive(Debug, Clone, Default)]
pub struct StaticOutputs {
    values: OutputValues,
    origin: Option<PathBuf>,
}

impl StaticOutputs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a single output.
    pub fn with_output(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(name.into(), value.into());
        self
    }

    /// Load a saved `terraform output -json` document, or a flat
    /// `{"name": "value"}` object.
    pub fn from_file(path: impl AsRef<Path>) -> IacResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(IacError::OutputsFileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        Ok(Self {
            values: parse_outputs(&content)?,
            origin: Some(path.to_path_buf()),
        })
    }
}

#[async_trait]
impl OutputSource for StaticOutputs {
    fn describe(&self) -> String {
        match &self.origin {
            Some(path) => format!("outputs file {}", path.display()),
            None => "static outputs".to_string(),
        }
    }

    async fn fetch(&self) -> IacResult<OutputValues> {
        Ok(self.values.clone())
    }
}

/// Parse an outputs document into name/value strings.
///
/// Accepts the `terraform output -json` shape, where each output is an
/// object carrying a `value` field, as well as a flat map of names to values.
/// Non-string scalars are stringified, collections are kept as compact JSON,
/// and `null` values are dropped.
pub fn parse_outputs(content: &str) -> IacResult<OutputValues> {
    let document: Value = serde_json::from_str(content)?;
    let entries = document.as_object().ok_or_else(|| {
        IacError::InvalidOutputs("expected a JSON object at the top level".to_string())
    })?;

    let mut values = OutputValues::new();
    for (name, entry) in entries {
        let raw = match entry {
            Value::Object(fields) if fields.contains_key("value") => &fields["value"],
            other => other,
        };

        let value = match raw {
            Value::Null => continue,
            Value::String(s) => s.clone(),
            Value::Bool(b) => b.to_string(),
            Value::Number(n) => n.to_string(),
            collection => serde_json::to_string(collection)?,
        };
        values.insert(name.clone(), value);
    }

    Ok(values)
}
