//! Template rendering context

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::chart::{Chart, ChartMetadata};
use crate::values::Values;

/// Context available to all templates
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderContext {
    /// Effective values: chart defaults with overrides merged on top
    pub values: JsonValue,

    /// Release identity
    pub release: ReleaseOptions,

    /// Chart metadata
    pub chart: ChartInfo,

    /// Cluster capabilities
    pub capabilities: Capabilities,
}

/// Release identity and operation flags
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseOptions {
    /// Release name
    pub name: String,

    /// Target namespace
    pub namespace: String,

    /// Revision number
    pub revision: u32,

    /// Is this an install operation?
    pub is_install: bool,

    /// Is this an upgrade operation?
    pub is_upgrade: bool,

    /// Service (always "deckhand")
    pub service: String,
}

impl ReleaseOptions {
    /// Release options for a first install
    pub fn for_install(name: &str, namespace: &str) -> Self {
        Self {
            name: name.to_string(),
            namespace: namespace.to_string(),
            revision: 1,
            is_install: true,
            is_upgrade: false,
            service: "deckhand".to_string(),
        }
    }
}

/// Chart information for templates
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartInfo {
    pub name: String,
    pub version: String,
    pub app_version: Option<String>,
}

impl From<&ChartMetadata> for ChartInfo {
    fn from(meta: &ChartMetadata) -> Self {
        Self {
            name: meta.name.clone(),
            version: meta.version.to_string(),
            app_version: meta.app_version.clone(),
        }
    }
}

/// Cluster capabilities
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Capabilities {
    /// Kubernetes version
    pub kube_version: KubeVersion,

    /// Available API versions
    pub api_versions: Vec<String>,
}

/// Kubernetes version info
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KubeVersion {
    pub version: String,
    pub major: String,
    pub minor: String,
}

impl Default for KubeVersion {
    fn default() -> Self {
        // Local rendering has no cluster to ask
        Self {
            version: "v1.28.0".to_string(),
            major: "1".to_string(),
            minor: "28".to_string(),
        }
    }
}

impl RenderContext {
    /// Build the context for rendering `chart` with `overrides`
    ///
    /// The chart's own defaults sit under the overrides.
    pub fn new(chart: &Chart, overrides: &Values, release: ReleaseOptions) -> Self {
        let mut values = chart.values.clone();
        if values.is_empty() {
            values = Values::new();
        }
        values.merge(overrides);

        Self {
            values: values.into_inner(),
            release,
            chart: ChartInfo::from(&chart.metadata),
            capabilities: Capabilities::default(),
        }
    }

    /// Set capabilities
    pub fn with_capabilities(mut self, capabilities: Capabilities) -> Self {
        self.capabilities = capabilities;
        self
    }
}
