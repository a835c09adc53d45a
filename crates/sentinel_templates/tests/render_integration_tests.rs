//! Integration tests for manifest rendering.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use sentinel_iac::{MockValidator, StaticOutputs, ValidationOutcome};
use sentinel_templates::{
    Environment, FileStatus, Kustomization, ManifestRenderer, RenderConfig, RenderError,
    RenderWarning, TemplateKind, TemplateSpec, ValidationStatus, ValueKey, WriteOutcome,
};
use tempfile::tempdir;

const ACCOUNT: &str = "123456789012";

fn shipped_templates() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../../k8s/templates")
}

fn role_arn(env: &str, role: &str) -> String {
    format!("arn:aws:iam::{}:role/cybersentinel-{}-{}", ACCOUNT, env, role)
}

fn full_outputs(env: &str) -> StaticOutputs {
    let mut outputs = StaticOutputs::new()
        .with_output("account_id", ACCOUNT)
        .with_output("region", "eu-west-1");
    for key in ValueKey::ROLES {
        outputs = outputs.with_output(key.as_str(), role_arn(env, key.role_suffix().unwrap()));
    }
    outputs
}

fn shipped_config(output_root: &Path) -> RenderConfig {
    RenderConfig::default()
        .with_templates_root(shipped_templates())
        .with_output_root(output_root)
}

fn single_template(dir: &Path, content: &str) -> RenderConfig {
    fs::write(dir.join("template.yaml"), content).unwrap();
    RenderConfig::default()
        .with_templates_root(dir)
        .with_output_root(dir.join("out"))
        .with_templates(vec![TemplateSpec::new(
            "template.yaml",
            "rendered.yaml",
            TemplateKind::Other,
        )])
}

#[tokio::test]
async fn test_every_environment_renders_full_set() {
    for env in Environment::ALL {
        let dir = tempdir().unwrap();
        let renderer = ManifestRenderer::new(shipped_config(dir.path()));

        let report = renderer
            .run(env.as_str(), &full_outputs(env.as_str()))
            .await
            .unwrap();

        assert_eq!(report.rendered_count(), 8, "environment {}", env);
        assert_eq!(report.skipped_count(), 0);
        assert!(report.is_success());

        let env_dir = dir.path().join(env.as_str());
        for expected in [
            "namespace.yaml",
            "velero.yaml",
            "argocd/external-secrets.yaml",
            "argocd/ingress-nginx.yaml",
            "argocd/cert-manager.yaml",
            "argocd/external-dns.yaml",
            "argocd/cloudwatch-agent.yaml",
            "rbac.yaml",
            "kustomization.yaml",
        ] {
            assert!(env_dir.join(expected).is_file(), "{} missing for {}", expected, env);
        }
        assert_eq!(report.composition, Some(env_dir.join("kustomization.yaml")));
    }
}

#[tokio::test]
async fn test_invalid_environment_leaves_filesystem_untouched() {
    let dir = tempdir().unwrap();
    let renderer = ManifestRenderer::new(shipped_config(&dir.path().join("out")));

    for bad in ["production", "Staging", "", "dev/../prod"] {
        let result = renderer.run(bad, &full_outputs("dev")).await;
        assert!(matches!(result, Err(RenderError::InvalidEnvironment(_))));
    }

    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_rendering_is_idempotent() {
    let dir = tempdir().unwrap();
    let renderer = ManifestRenderer::new(shipped_config(dir.path()));
    let outputs = full_outputs("prod");

    let first = renderer.run("prod", &outputs).await.unwrap();
    let mut snapshot = Vec::new();
    for path in first.rendered_outputs().chain(first.composition.iter()) {
        snapshot.push((path.clone(), fs::read(path).unwrap()));
    }

    let second = renderer.run("prod", &outputs).await.unwrap();
    for (path, bytes) in &snapshot {
        assert_eq!(&fs::read(path).unwrap(), bytes, "{:?} changed", path);
    }
    assert!(second
        .files
        .iter()
        .all(|f| f.write == Some(WriteOutcome::Unchanged)));
}

#[tokio::test]
async fn test_specific_arn_survives_generic_account_token() {
    let dir = tempdir().unwrap();
    let config = single_template(
        dir.path(),
        "bucket: logs-ACCOUNT_ID\n\
         role: arn:aws:iam::ACCOUNT_ID:role/cybersentinel-ENVIRONMENT-dns-updater\n",
    );
    let outputs = StaticOutputs::new()
        .with_output("account_id", ACCOUNT)
        .with_output(
            "dns_updater_role_arn",
            "arn:aws:iam::999999999999:role/shared-external-dns",
        );

    let report = ManifestRenderer::new(config)
        .run("dev", &outputs)
        .await
        .unwrap();

    let rendered = fs::read_to_string(dir.path().join("out/dev/rendered.yaml")).unwrap();
    assert_eq!(
        rendered,
        "bucket: logs-123456789012\n\
         role: arn:aws:iam::999999999999:role/shared-external-dns\n"
    );
    assert_eq!(report.unresolved_warning_count(), 0);
}

#[tokio::test]
async fn test_missing_account_id_writes_nothing() {
    let dir = tempdir().unwrap();
    let out = dir.path().join("out");
    let renderer = ManifestRenderer::new(shipped_config(&out));

    let outputs = StaticOutputs::new()
        .with_output("region", "eu-west-1")
        .with_output("workload_role_arn", role_arn("dev", "workload"));

    let result = renderer.run("dev", &outputs).await;
    assert!(matches!(result, Err(RenderError::MissingRequiredValue(_))));
    assert!(!out.exists());
}

#[tokio::test]
async fn test_missing_optional_role_becomes_empty_with_warning() {
    let dir = tempdir().unwrap();
    let config = single_template(dir.path(), "role-arn: ${BACKUP_ROLE_ARN}\n");
    let outputs = StaticOutputs::new().with_output("account_id", ACCOUNT);

    let report = ManifestRenderer::new(config)
        .run("staging", &outputs)
        .await
        .unwrap();

    assert!(report.is_success());
    assert_eq!(report.files[0].status, FileStatus::Rendered);
    assert_eq!(report.files[0].empty_values, vec![ValueKey::BackupRole]);
    assert!(report.warnings.contains(&RenderWarning::MissingOptionalValue {
        output: "backup_role_arn".into()
    }));

    let rendered = fs::read_to_string(dir.path().join("out/staging/rendered.yaml")).unwrap();
    assert_eq!(rendered, "role-arn: \n");
}

#[tokio::test]
async fn test_staging_namespace_end_to_end() {
    let dir = tempdir().unwrap();
    let renderer = ManifestRenderer::new(shipped_config(dir.path()));
    let outputs = StaticOutputs::new()
        .with_output("account_id", ACCOUNT)
        .with_output(
            "workload_role_arn",
            "arn:aws:iam::123456789012:role/cybersentinel-staging-workload",
        );

    let report = renderer.run("staging", &outputs).await.unwrap();

    let namespace = fs::read_to_string(dir.path().join("staging/namespace.yaml")).unwrap();
    assert!(namespace.contains(
        "eks.amazonaws.com/role-arn: arn:aws:iam::123456789012:role/cybersentinel-staging-workload"
    ));
    assert!(namespace.contains("name: cybersentinel-staging"));
    assert!(!namespace.contains("ACCOUNT_ID"));
    assert!(!namespace.contains("${"));

    assert_eq!(report.unresolved_warning_count(), 0);
    assert!(report.is_success());
}

#[tokio::test]
async fn test_missing_template_is_skipped() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("namespace.yaml"), "name: ${PROJECT}\n").unwrap();

    let config = RenderConfig::default()
        .with_templates_root(dir.path())
        .with_output_root(dir.path().join("out"))
        .with_templates(vec![
            TemplateSpec::new("namespace.yaml", "namespace.yaml", TemplateKind::Namespace),
            TemplateSpec::new("velero.yaml", "velero.yaml", TemplateKind::Backup),
        ]);

    let report = ManifestRenderer::new(config)
        .run("dev", &full_outputs("dev"))
        .await
        .unwrap();

    assert!(report.is_success());
    assert_eq!(report.rendered_count(), 1);
    assert_eq!(report.skipped_count(), 1);
    assert!(matches!(
        report.warnings.as_slice(),
        [RenderWarning::MissingTemplate { .. }]
    ));
    assert!(!dir.path().join("out/dev/velero.yaml").exists());

    let yaml = fs::read_to_string(dir.path().join("out/dev/kustomization.yaml")).unwrap();
    let kustomization: Kustomization = serde_yaml::from_str(&yaml).unwrap();
    assert_eq!(kustomization.resources, vec!["namespace.yaml"]);
    assert_eq!(kustomization.common_labels.get("environment").unwrap(), "dev");
}

#[tokio::test]
async fn test_unknown_role_reference_is_reported() {
    let dir = tempdir().unwrap();
    let config = single_template(dir.path(), "a: ${LOKI_ROLE_ARN}\nb: ${AWS_REGION}\n");

    let report = ManifestRenderer::new(config)
        .run("dev", &full_outputs("dev"))
        .await
        .unwrap();

    assert!(report.is_success());
    assert_eq!(report.unresolved_warning_count(), 1);
    assert_eq!(report.files[0].unresolved_tokens, vec!["${LOKI_ROLE_ARN}"]);
}

#[tokio::test]
async fn test_validator_rejection_is_warning_unless_strict() {
    let dir = tempdir().unwrap();
    let validator = MockValidator::rejecting("unknown field \"spec.bogus\"");

    let lenient = ManifestRenderer::new(shipped_config(dir.path()))
        .with_validator(Arc::new(validator.clone()));
    let report = lenient.run("dev", &full_outputs("dev")).await.unwrap();

    assert!(report.is_success());
    assert_eq!(report.failed_count(), 0);
    assert_eq!(validator.call_count(), 8);
    assert!(matches!(
        report.files[0].validation,
        ValidationStatus::Rejected(_)
    ));

    let strict = ManifestRenderer::new(shipped_config(dir.path()).strict(true))
        .with_validator(Arc::new(validator.clone()));
    let report = strict.run("dev", &full_outputs("dev")).await.unwrap();

    assert!(!report.is_success());
    assert_eq!(report.failed_count(), 8);
    // Failed files are still written and listed.
    assert_eq!(report.rendered_outputs().count(), 8);
}

#[tokio::test]
async fn test_validator_sees_rendered_content() {
    let dir = tempdir().unwrap();
    let config = single_template(dir.path(), "env: ${ENVIRONMENT}\n");
    let validator = MockValidator::new()
        .add_response(ValidationOutcome::Unavailable("no cluster".into()));

    let report = ManifestRenderer::new(config)
        .with_validator(Arc::new(validator.clone()))
        .run("prod", &full_outputs("prod"))
        .await
        .unwrap();

    assert!(report.is_success());
    assert_eq!(
        report.files[0].validation,
        ValidationStatus::Unavailable("no cluster".into())
    );
    assert_eq!(validator.get_calls()[0].content, "env: prod\n");
}

#[tokio::test]
async fn test_unclaimed_literal_arn_is_reported() {
    let dir = tempdir().unwrap();
    let config = single_template(
        dir.path(),
        "role: arn:aws:iam::ACCOUNT_ID:role/cybersentinel-ENVIRONMENT-loki\n",
    );
    let outputs = StaticOutputs::new().with_output("account_id", ACCOUNT);

    let report = ManifestRenderer::new(config)
        .run("dev", &outputs)
        .await
        .unwrap();

    assert_eq!(report.unresolved_warning_count(), 1);
    assert_eq!(
        report.files[0].unresolved_tokens,
        vec!["arn:aws:iam::123456789012:role/cybersentinel-ENVIRONMENT-loki"]
    );
}

#[tokio::test]
async fn test_template_for_other_project_is_reported() {
    let dir = tempdir().unwrap();
    let mut config = single_template(
        dir.path(),
        "role: arn:aws:iam::ACCOUNT_ID:role/cybersentinel-ENVIRONMENT-ingress-controller\n",
    );
    config.project = "sentinel".to_string();
    let outputs = StaticOutputs::new()
        .with_output("account_id", ACCOUNT)
        .with_output("ingress_controller_role_arn", role_arn("dev", "ingress-controller"));

    let report = ManifestRenderer::new(config.clone().strict(true))
        .run("dev", &outputs)
        .await
        .unwrap();

    assert_eq!(report.unresolved_warning_count(), 1);
    assert!(!report.is_success());

    fs::write(
        dir.path().join("template.yaml"),
        "role: arn:aws:iam::ACCOUNT_ID:role/sentinel-ENVIRONMENT-ingress-controller\n",
    )
    .unwrap();
    let report = ManifestRenderer::new(config)
        .run("dev", &outputs)
        .await
        .unwrap();

    assert_eq!(report.unresolved_warning_count(), 0);
    let rendered = fs::read_to_string(dir.path().join("out/dev/rendered.yaml")).unwrap();
    assert_eq!(
        rendered,
        format!("role: {}\n", role_arn("dev", "ingress-controller"))
    );
}

#[tokio::test]
async fn test_output_colliding_with_another_template_writes_nothing() {
    let dir = tempdir().unwrap();
    let root = dir.path();
    fs::write(root.join("a.yaml"), "from-a ${ENVIRONMENT}\n").unwrap();
    fs::create_dir(root.join("dev")).unwrap();
    fs::write(root.join("dev/b.yaml"), "original-b ${ENVIRONMENT}\n").unwrap();

    let config = RenderConfig::default()
        .with_templates_root(root)
        .with_output_root(root)
        .with_templates(vec![
            TemplateSpec::new("a.yaml", "b.yaml", TemplateKind::Other),
            TemplateSpec::new("dev/b.yaml", "c.yaml", TemplateKind::Other),
        ]);

    let result = ManifestRenderer::new(config)
        .run("dev", &full_outputs("dev"))
        .await;

    assert!(matches!(result, Err(RenderError::OutputOverlapsInput(_))));
    assert_eq!(
        fs::read_to_string(root.join("dev/b.yaml")).unwrap(),
        "original-b ${ENVIRONMENT}\n"
    );
    assert!(!root.join("dev/c.yaml").exists());
    assert!(!root.join("dev/kustomization.yaml").exists());
}

#[tokio::test]
async fn test_unreadable_template_is_skipped() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("namespace.yaml"), "name: ${PROJECT}\n").unwrap();
    fs::write(dir.path().join("binary.yaml"), [0xff, 0xfe, b'\n']).unwrap();

    let config = RenderConfig::default()
        .with_templates_root(dir.path())
        .with_output_root(dir.path().join("out"))
        .with_templates(vec![
            TemplateSpec::new("binary.yaml", "binary.yaml", TemplateKind::Other),
            TemplateSpec::new("namespace.yaml", "namespace.yaml", TemplateKind::Namespace),
        ]);

    let report = ManifestRenderer::new(config)
        .run("dev", &full_outputs("dev"))
        .await
        .unwrap();

    assert!(report.is_success());
    assert_eq!(report.files[0].status, FileStatus::Skipped);
    assert_eq!(report.rendered_count(), 1);
    assert!(matches!(
        report.warnings.as_slice(),
        [RenderWarning::UnreadableTemplate { .. }]
    ));
    assert!(!dir.path().join("out/dev/binary.yaml").exists());

    let yaml = fs::read_to_string(dir.path().join("out/dev/kustomization.yaml")).unwrap();
    let kustomization: Kustomization = serde_yaml::from_str(&yaml).unwrap();
    assert_eq!(kustomization.resources, vec!["namespace.yaml"]);
}
