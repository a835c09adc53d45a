//! Placeholder tokens and their resolved values.
//!
//! Templates carry three token shapes:
//!
//! - delimited references such as `${WORKLOAD_ROLE_ARN}` or `${ENVIRONMENT}`
//! - literal ARN patterns such as
//!   `arn:aws:iam::ACCOUNT_ID:role/cybersentinel-ENVIRONMENT-workload`
//! - the bare marker `ACCOUNT_ID`
//!
//! The ARN patterns embed the bare marker, so substitution must prefer the
//! longer token wherever both could match. [`PlaceholderSet`] keeps its
//! entries ordered longest-first and replaces everything in a single pass,
//! which also means a substituted value is never itself re-substituted.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;

use regex::{Captures, Regex};
use sentinel_iac::OutputValues;
use tracing::{debug, warn};

use crate::environment::Environment;
use crate::error::{RenderError, RenderResult};
use crate::report::RenderWarning;

/// Token shapes that still count as placeholders when nothing in the set
/// claims them.
const LEFTOVER_PATTERN: &str = r"\$\{(?:AWS_[A-Z0-9_]+|[A-Z][A-Z0-9_]*_ROLE_ARN)\}";

/// An IAM ARN still carrying a bare marker. Matches literal ARN placeholders
/// no specific token claimed, after `ACCOUNT_ID` alone was filled in.
const PARTIAL_ARN_PATTERN: &str = r#"arn:aws:iam::[^\s"']*(?:ACCOUNT_ID|ENVIRONMENT)[^\s"']*"#;

/// Logical name of a substitutable value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ValueKey {
    AccountId,
    Region,
    Environment,
    Project,
    WorkloadRole,
    BackupRole,
    GitopsControllerRole,
    SecretsSyncRole,
    IngressControllerRole,
    CertIssuerRole,
    DnsUpdaterRole,
    MetricsAgentRole,
}

impl ValueKey {
    /// IRSA roles, in the order their placeholders are declared.
    pub const ROLES: [ValueKey; 8] = [
        ValueKey::WorkloadRole,
        ValueKey::BackupRole,
        ValueKey::GitopsControllerRole,
        ValueKey::SecretsSyncRole,
        ValueKey::IngressControllerRole,
        ValueKey::CertIssuerRole,
        ValueKey::DnsUpdaterRole,
        ValueKey::MetricsAgentRole,
    ];

    /// Values read from the infrastructure-state provider.
    pub const FETCHED: [ValueKey; 10] = [
        ValueKey::AccountId,
        ValueKey::Region,
        ValueKey::WorkloadRole,
        ValueKey::BackupRole,
        ValueKey::GitopsControllerRole,
        ValueKey::SecretsSyncRole,
        ValueKey::IngressControllerRole,
        ValueKey::CertIssuerRole,
        ValueKey::DnsUpdaterRole,
        ValueKey::MetricsAgentRole,
    ];

    /// Snake-case name; for fetched keys this is also the Terraform output name.
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueKey::AccountId => "account_id",
            ValueKey::Region => "region",
            ValueKey::Environment => "environment",
            ValueKey::Project => "project",
            ValueKey::WorkloadRole => "workload_role_arn",
            ValueKey::BackupRole => "backup_role_arn",
            ValueKey::GitopsControllerRole => "gitops_controller_role_arn",
            ValueKey::SecretsSyncRole => "secrets_sync_role_arn",
            ValueKey::IngressControllerRole => "ingress_controller_role_arn",
            ValueKey::CertIssuerRole => "cert_issuer_role_arn",
            ValueKey::DnsUpdaterRole => "dns_updater_role_arn",
            ValueKey::MetricsAgentRole => "metrics_agent_role_arn",
        }
    }

    /// Name used inside `${...}` references.
    pub fn variable(&self) -> &'static str {
        match self {
            ValueKey::AccountId => "AWS_ACCOUNT_ID",
            ValueKey::Region => "AWS_REGION",
            ValueKey::Environment => "ENVIRONMENT",
            ValueKey::Project => "PROJECT",
            ValueKey::WorkloadRole => "WORKLOAD_ROLE_ARN",
            ValueKey::BackupRole => "BACKUP_ROLE_ARN",
            ValueKey::GitopsControllerRole => "GITOPS_CONTROLLER_ROLE_ARN",
            ValueKey::SecretsSyncRole => "SECRETS_SYNC_ROLE_ARN",
            ValueKey::IngressControllerRole => "INGRESS_CONTROLLER_ROLE_ARN",
            ValueKey::CertIssuerRole => "CERT_ISSUER_ROLE_ARN",
            ValueKey::DnsUpdaterRole => "DNS_UPDATER_ROLE_ARN",
            ValueKey::MetricsAgentRole => "METRICS_AGENT_ROLE_ARN",
        }
    }

    /// Role-name suffix used in literal ARN placeholders.
    pub fn role_suffix(&self) -> Option<&'static str> {
        match self {
            ValueKey::WorkloadRole => Some("workload"),
            ValueKey::BackupRole => Some("backup"),
            ValueKey::GitopsControllerRole => Some("gitops-controller"),
            ValueKey::SecretsSyncRole => Some("secrets-sync"),
            ValueKey::IngressControllerRole => Some("ingress-controller"),
            ValueKey::CertIssuerRole => Some("cert-issuer"),
            ValueKey::DnsUpdaterRole => Some("dns-updater"),
            ValueKey::MetricsAgentRole => Some("metrics-agent"),
            _ => None,
        }
    }

    pub fn is_required(&self) -> bool {
        matches!(self, ValueKey::AccountId)
    }
}

impl fmt::Display for ValueKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Every value a run substitutes, resolved once before rendering starts.
#[derive(Debug, Clone)]
pub struct ResolvedValues {
    project: String,
    values: BTreeMap<ValueKey, String>,
}

impl ResolvedValues {
    /// Build the value map from infrastructure outputs.
    ///
    /// A missing or blank account id is fatal. Any other missing output
    /// resolves to the empty string and yields a warning.
    pub fn from_outputs(
        environment: Environment,
        project: &str,
        outputs: &OutputValues,
    ) -> RenderResult<(Self, Vec<RenderWarning>)> {
        let mut values = BTreeMap::new();
        let mut warnings = Vec::new();

        for key in ValueKey::FETCHED {
            let value = outputs
                .get(key.as_str())
                .map(|v| v.trim().to_string())
                .unwrap_or_default();

            if value.is_empty() {
                if key.is_required() {
                    return Err(RenderError::MissingRequiredValue(format!(
                        "output '{}' is absent or empty",
                        key
                    )));
                }
                warn!("Output '{}' is missing, substituting an empty string", key);
                warnings.push(RenderWarning::MissingOptionalValue {
                    output: key.as_str().to_string(),
                });
            }

            values.insert(key, value);
        }

        values.insert(ValueKey::Environment, environment.as_str().to_string());
        values.insert(ValueKey::Project, project.to_string());

        Ok((
            Self {
                project: project.to_string(),
                values,
            },
            warnings,
        ))
    }

    pub fn project(&self) -> &str {
        &self.project
    }

    /// Resolved value, empty when the output was missing.
    pub fn get(&self, key: ValueKey) -> &str {
        self.values.get(&key).map(String::as_str).unwrap_or("")
    }
}

/// A single token and what it resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placeholder {
    pub token: String,
    pub key: ValueKey,
    pub value: String,
}

impl Placeholder {
    pub fn new(token: impl Into<String>, key: ValueKey, value: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            key,
            value: value.into(),
        }
    }
}

/// Output of [`PlaceholderSet::substitute`].
#[derive(Debug, Clone)]
pub struct Substitution {
    pub content: String,
    /// Number of tokens replaced.
    pub replacements: usize,
    /// Keys that were substituted with an empty value.
    pub empty_values: BTreeSet<ValueKey>,
}

/// Placeholders left in a document after substitution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Unresolved {
    pub count: usize,
    pub tokens: Vec<String>,
}

impl Unresolved {
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}

/// Ordered (token, value) pairs, longest token first.
#[derive(Debug, Clone)]
pub struct PlaceholderSet {
    entries: Vec<Placeholder>,
    index: HashMap<String, usize>,
    matcher: Regex,
    leftovers: Regex,
}

impl PlaceholderSet {
    /// Standard token set for a run.
    ///
    /// Literal ARN tokens spell the configured project, so a template written
    /// for another project keeps its ARN and is reported by [`Self::scan`].
    pub fn new(values: &ResolvedValues) -> RenderResult<Self> {
        let mut entries = Vec::new();

        for key in ValueKey::ROLES {
            let value = values.get(key);
            if let Some(suffix) = key.role_suffix() {
                entries.push(Placeholder::new(
                    format!(
                        "arn:aws:iam::ACCOUNT_ID:role/{}-ENVIRONMENT-{}",
                        values.project(),
                        suffix
                    ),
                    key,
                    value,
                ));
            }
            entries.push(Placeholder::new(format!("${{{}}}", key.variable()), key, value));
        }

        for key in [
            ValueKey::AccountId,
            ValueKey::Region,
            ValueKey::Environment,
            ValueKey::Project,
        ] {
            entries.push(Placeholder::new(
                format!("${{{}}}", key.variable()),
                key,
                values.get(key),
            ));
        }
        entries.push(Placeholder::new(
            "ACCOUNT_ID",
            ValueKey::AccountId,
            values.get(ValueKey::AccountId),
        ));

        Self::from_entries(entries)
    }

    /// Build a set from arbitrary entries.
    ///
    /// Entries are re-ordered longest token first; ties keep their declared
    /// order. A duplicate token keeps its first declaration.
    pub fn from_entries(mut entries: Vec<Placeholder>) -> RenderResult<Self> {
        if entries.is_empty() {
            return Err(RenderError::Config("placeholder set is empty".into()));
        }
        if entries.iter().any(|p| p.token.is_empty()) {
            return Err(RenderError::Config("placeholder token is empty".into()));
        }

        entries.sort_by(|a, b| b.token.len().cmp(&a.token.len()));

        let mut index = HashMap::new();
        let mut unique = Vec::with_capacity(entries.len());
        for entry in entries {
            if index.contains_key(&entry.token) {
                debug!("Ignoring duplicate placeholder {}", entry.token);
                continue;
            }
            index.insert(entry.token.clone(), unique.len());
            unique.push(entry);
        }

        // Alternation is leftmost-first, so at any position the longer token wins.
        let alternation = unique
            .iter()
            .map(|p| regex::escape(&p.token))
            .collect::<Vec<_>>()
            .join("|");
        let matcher = Regex::new(&alternation)?;
        let leftovers = Regex::new(&format!(
            "{}|{}|{}",
            alternation, PARTIAL_ARN_PATTERN, LEFTOVER_PATTERN
        ))?;

        Ok(Self {
            entries: unique,
            index,
            matcher,
            leftovers,
        })
    }

    pub fn entries(&self) -> &[Placeholder] {
        &self.entries
    }

    pub fn tokens(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|p| p.token.as_str())
    }

    /// Replace every token in `content` with its value.
    pub fn substitute(&self, content: &str) -> Substitution {
        let mut replacements = 0;
        let mut empty_values = BTreeSet::new();

        let rendered = self.matcher.replace_all(content, |caps: &Captures| {
            let token = &caps[0];
            match self.index.get(token).map(|&i| &self.entries[i]) {
                Some(placeholder) => {
                    replacements += 1;
                    if placeholder.value.is_empty() {
                        empty_values.insert(placeholder.key);
                    }
                    placeholder.value.clone()
                }
                None => token.to_string(),
            }
        });

        Substitution {
            content: rendered.into_owned(),
            replacements,
            empty_values,
        }
    }

    /// Find placeholders still present in `content`.
    pub fn scan(&self, content: &str) -> Unresolved {
        let mut tokens = BTreeSet::new();
        let mut count = 0;
        for found in self.leftovers.find_iter(content) {
            count += 1;
            tokens.insert(found.as_str().to_string());
        }
        Unresolved {
            count,
            tokens: tokens.into_iter().collect(),
        }
    }
}
