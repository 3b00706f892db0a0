//! Where to find the deployment service and how to reach it

use std::path::PathBuf;
use std::time::Duration;

/// Namespace the deployment service runs in unless told otherwise
pub const DEFAULT_SERVICE_NAMESPACE: &str = "kube-system";

/// Name of the deployment service's Kubernetes Service
pub const DEFAULT_SERVICE_NAME: &str = "deploy-service";

/// Connection establishment timeout for the deployment service client
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Settings shared by every cluster-backed operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployConfig {
    /// Namespace of the deployment service
    pub service_namespace: String,

    /// Service name whose endpoints are looked up
    pub service_name: String,

    /// Explicit kubeconfig path; the client's default lookup applies when unset
    pub kubeconfig: Option<PathBuf>,

    /// Timeout for establishing a connection to the deployment service
    pub connect_timeout: Duration,
}

impl Default for DeployConfig {
    fn default() -> Self {
        Self {
            service_namespace: DEFAULT_SERVICE_NAMESPACE.to_string(),
            service_name: DEFAULT_SERVICE_NAME.to_string(),
            kubeconfig: None,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }
}

impl DeployConfig {
    pub fn with_service(mut self, namespace: impl Into<String>, name: impl Into<String>) -> Self {
        self.service_namespace = namespace.into();
        self.service_name = name.into();
        self
    }

    pub fn with_kubeconfig(mut self, path: impl Into<PathBuf>) -> Self {
        self.kubeconfig = Some(path.into());
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = DeployConfig::default();
        assert_eq!(config.service_namespace, "kube-system");
        assert_eq!(config.service_name, "deploy-service");
        assert_eq!(config.connect_timeout, Duration::from_secs(5));
        assert!(config.kubeconfig.is_none());
    }

    #[test]
    fn test_builders() {
        let config = DeployConfig::default()
            .with_service("ns1", "deploy-svc")
            .with_kubeconfig("/tmp/kubeconfig")
            .with_connect_timeout(Duration::from_secs(1));

        assert_eq!(config.service_namespace, "ns1");
        assert_eq!(config.service_name, "deploy-svc");
        assert_eq!(config.kubeconfig, Some(PathBuf::from("/tmp/kubeconfig")));
        assert_eq!(config.connect_timeout, Duration::from_secs(1));
    }
}
