//! Policy checks on rendered resources
//!
//! Only Deployments are inspected: every container must declare a liveness
//! or a readiness probe. Other kinds, and documents that do not decode as a
//! known resource, are accepted as they are.
//!
//! Deployments are read through a narrow view holding just the fields the
//! policy looks at, so unrelated fields (resource quantities, volumes) never
//! keep a document from being checked.

use serde::Deserialize;
use serde_yaml::Value;
use std::collections::BTreeMap;

/// Deployment API versions sharing the `apps/v1` pod template layout
const DEPLOYMENT_API_VERSIONS: &[&str] = &[
    "apps/v1",
    "apps/v1beta1",
    "apps/v1beta2",
    "extensions/v1beta1",
];

/// The parts of a Deployment the probe policy reads
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct DeploymentView {
    metadata: MetadataView,
    spec: DeploymentSpecView,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct MetadataView {
    name: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct DeploymentSpecView {
    template: PodTemplateView,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PodTemplateView {
    spec: PodSpecView,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PodSpecView {
    containers: Vec<ContainerView>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ContainerView {
    name: String,
    liveness_probe: Option<Value>,
    readiness_probe: Option<Value>,
}

/// A policy finding on one resource
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LintViolation {
    /// Short resource reference, e.g. `deploy/dashboard`
    pub resource: String,

    /// Offending container
    pub container: String,

    pub message: String,
}

impl std::fmt::Display for LintViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

/// Violations found in one rendered file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LintReport {
    /// Template path the document came from
    pub path: String,
    pub violations: Vec<LintViolation>,
}

impl LintReport {
    pub fn is_ok(&self) -> bool {
        self.violations.is_empty()
    }
}

/// Lint every document of a rendered file
///
/// A violation in one document does not stop the others from being checked.
pub fn lint_resource(yaml: &str) -> Vec<LintViolation> {
    let mut violations = Vec::new();

    for document in serde_yaml::Deserializer::from_str(yaml) {
        let Ok(value) = Value::deserialize(document) else {
            // Not a decodable resource, nothing to check
            break;
        };
        if let Some(deployment) = decode_deployment(value) {
            violations.extend(state_probes(&deployment));
        }
    }

    violations
}

/// Lint each rendered file, in path order
pub fn lint_rendered(manifests: &BTreeMap<String, String>) -> Vec<LintReport> {
    manifests
        .iter()
        .map(|(path, content)| {
            let violations = lint_resource(content);
            tracing::debug!(%path, violations = violations.len(), "linted");
            LintReport {
                path: path.clone(),
                violations,
            }
        })
        .collect()
}

/// Containers without any health probe
fn state_probes(deployment: &DeploymentView) -> Vec<LintViolation> {
    let name = &deployment.metadata.name;

    deployment
        .spec
        .template
        .spec
        .containers
        .iter()
        .filter(|c| c.liveness_probe.is_none() && c.readiness_probe.is_none())
        .map(|c| LintViolation {
            resource: format!("deploy/{}", name),
            container: c.name.clone(),
            message: format!(
                "deploy/{} container {} has no liveness nor readiness probe",
                name, c.name
            ),
        })
        .collect()
}

/// Decode a Deployment of any supported API version
fn decode_deployment(value: Value) -> Option<DeploymentView> {
    if value.get("kind").and_then(Value::as_str) != Some("Deployment") {
        return None;
    }
    let api_version = value.get("apiVersion").and_then(Value::as_str)?;
    if !DEPLOYMENT_API_VERSIONS.contains(&api_version) {
        return None;
    }

    serde_yaml::from_value(value).ok()
}
