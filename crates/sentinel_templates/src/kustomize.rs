//! Generated Kustomize overlay for an environment.

use std::collections::BTreeMap;
use std::path::{Component, Path};

use serde::{Deserialize, Serialize};

use crate::environment::Environment;
use crate::error::RenderResult;

pub const KUSTOMIZATION_FILE: &str = "kustomization.yaml";

const API_VERSION: &str = "kustomize.config.k8s.io/v1beta1";

/// Kustomization listing the rendered manifests of one environment.
///
/// Labels live in a `BTreeMap` so serialization is deterministic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Kustomization {
    pub api_version: String,
    pub kind: String,
    pub common_labels: BTreeMap<String, String>,
    pub resources: Vec<String>,
}

impl Kustomization {
    pub fn for_environment<'a>(
        environment: Environment,
        project: &str,
        resources: impl IntoIterator<Item = &'a Path>,
    ) -> Self {
        let mut common_labels = BTreeMap::new();
        common_labels.insert("environment".to_string(), environment.as_str().to_string());
        common_labels.insert("app.kubernetes.io/part-of".to_string(), project.to_string());

        Self {
            api_version: API_VERSION.to_string(),
            kind: "Kustomization".to_string(),
            common_labels,
            resources: resources.into_iter().map(resource_path).collect(),
        }
    }

    /// Render as YAML with a generated-file header.
    pub fn to_yaml(&self) -> RenderResult<String> {
        let body = serde_yaml::to_string(self)?;
        let environment = self
            .common_labels
            .get("environment")
            .map(String::as_str)
            .unwrap_or("unknown");
        Ok(format!(
            "# Generated by render-k8s-manifests for the {} environment. Do not edit.\n{}",
            environment, body
        ))
    }
}

/// Kustomize wants forward slashes regardless of platform.
fn resource_path(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_for_environment() {
        let resources = [
            PathBuf::from("namespace.yaml"),
            PathBuf::from("argocd").join("cert-manager.yaml"),
        ];
        let kustomization = Kustomization::for_environment(
            Environment::Prod,
            "cybersentinel",
            resources.iter().map(PathBuf::as_path),
        );

        assert_eq!(
            kustomization.resources,
            vec!["namespace.yaml", "argocd/cert-manager.yaml"]
        );
        assert_eq!(kustomization.common_labels.get("environment").unwrap(), "prod");
    }

    #[test]
    fn test_yaml_shape() {
        let kustomization = Kustomization::for_environment(
            Environment::Dev,
            "cybersentinel",
            [Path::new("rbac.yaml")],
        );
        let yaml = kustomization.to_yaml().unwrap();

        assert!(yaml.starts_with("# Generated by render-k8s-manifests for the dev environment"));
        assert!(yaml.contains("apiVersion: kustomize.config.k8s.io/v1beta1"));
        assert!(yaml.contains("kind: Kustomization"));
        assert!(yaml.contains("environment: dev"));
        assert!(yaml.contains("- rbac.yaml"));

        let parsed: Kustomization = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed, kustomization);
    }
}
