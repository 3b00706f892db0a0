//! Error types for deckhand-kube

use thiserror::Error;

/// Result type for deckhand-kube operations
pub type Result<T> = std::result::Result<T, KubeError>;

/// Errors that can occur while talking to the cluster or the deployment service
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum KubeError {
    /// The cluster could not be queried for the service endpoints
    #[error("failed to query endpoints of {service} in namespace {namespace}: {source}")]
    EndpointResolution {
        service: String,
        namespace: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The service exists but exposes no address
    #[error("could not find any {service} endpoint in namespace {namespace}")]
    EndpointNotFound { service: String, namespace: String },

    /// The deployment service has no record of the release
    #[error("release: \"{name}\" not found")]
    ReleaseNotFound { name: String },

    /// The deployment service answered with an error status
    #[error("deployment service returned {status}: {message}")]
    Service { status: u16, message: String },

    /// A deployment service operation failed for a release
    #[error("{operation} of release {name} in namespace {namespace} failed: {source}")]
    DeployService {
        operation: &'static str,
        name: String,
        namespace: String,
        #[source]
        source: Box<KubeError>,
    },

    /// Kubeconfig could not be loaded
    #[error("invalid kubeconfig: {0}")]
    Kubeconfig(#[from] kube::config::KubeconfigError),

    /// Kubernetes client error
    #[error("Kubernetes API error: {0}")]
    Api(#[from] kube::Error),

    /// Transport error talking to the deployment service
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Manifest, chart or override error
    #[error(transparent)]
    Core(#[from] deckhand_core::CoreError),

    /// Template rendering error
    #[error(transparent)]
    Engine(#[from] deckhand_engine::EngineError),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for KubeError {
    fn from(e: serde_json::Error) -> Self {
        KubeError::Serialization(e.to_string())
    }
}

impl From<serde_yaml::Error> for KubeError {
    fn from(e: serde_yaml::Error) -> Self {
        KubeError::Serialization(e.to_string())
    }
}

impl KubeError {
    /// Check if the deployment service reported the release as unknown
    pub fn is_release_not_found(&self) -> bool {
        match self {
            KubeError::ReleaseNotFound { .. } => true,
            KubeError::DeployService { source, .. } => source.is_release_not_found(),
            _ => false,
        }
    }

    /// Innermost error, skipping the release identity wrapper
    pub fn root(&self) -> &KubeError {
        match self {
            KubeError::DeployService { source, .. } => source.root(),
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_not_found_names_service_and_namespace() {
        let err = KubeError::EndpointNotFound {
            service: "deploy-svc".to_string(),
            namespace: "ns1".to_string(),
        };

        let msg = err.to_string();
        assert!(msg.contains("deploy-svc"));
        assert!(msg.contains("ns1"));
    }

    #[test]
    fn test_wrapped_not_found() {
        let err = KubeError::DeployService {
            operation: "status",
            name: "web".to_string(),
            namespace: "apps".to_string(),
            source: Box::new(KubeError::ReleaseNotFound {
                name: "web".to_string(),
            }),
        };

        assert!(err.is_release_not_found());
        assert!(matches!(err.root(), KubeError::ReleaseNotFound { .. }));
        assert_eq!(
            err.to_string(),
            "status of release web in namespace apps failed: release: \"web\" not found"
        );
    }
}
