//! Deployment service endpoint discovery

use async_trait::async_trait;
use k8s_openapi::api::core::v1::Endpoints;
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Api, Client, Config};
use std::path::Path;

use crate::error::{KubeError, Result};

/// The slice of the cluster API the orchestrator needs
#[async_trait]
pub trait ClusterApi: Send + Sync {
    /// Every `ip:port` address backing `service` in `namespace`
    ///
    /// An empty list is a valid answer; callers decide what it means.
    async fn endpoints(&self, namespace: &str, service: &str) -> Result<Vec<String>>;
}

/// Cluster access through a kubeconfig
#[derive(Clone)]
pub struct KubeCluster {
    client: Client,
}

impl KubeCluster {
    /// Connect using `kubeconfig` (or the default lookup) with optional
    /// context and cluster overrides
    pub async fn connect(
        kubeconfig: Option<&Path>,
        context: Option<&str>,
        cluster: Option<&str>,
    ) -> Result<Self> {
        let kubeconfig = match kubeconfig {
            Some(path) => Kubeconfig::read_from(path)?,
            None => Kubeconfig::read()?,
        };
        let options = KubeConfigOptions {
            context: context.map(str::to_string),
            cluster: cluster.map(str::to_string),
            user: None,
        };
        let config = Config::from_custom_kubeconfig(kubeconfig, &options).await?;

        tracing::debug!(
            cluster_url = %config.cluster_url,
            context = ?context,
            "connecting to cluster"
        );

        Ok(Self {
            client: Client::try_from(config)?,
        })
    }

    /// Wrap an existing client
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ClusterApi for KubeCluster {
    async fn endpoints(&self, namespace: &str, service: &str) -> Result<Vec<String>> {
        let api: Api<Endpoints> = Api::namespaced(self.client.clone(), namespace);
        let endpoints = api
            .get(service)
            .await
            .map_err(|e| KubeError::EndpointResolution {
                service: service.to_string(),
                namespace: namespace.to_string(),
                source: Box::new(e),
            })?;

        Ok(endpoint_addresses(&endpoints))
    }
}

/// Flatten an Endpoints object into `ip:port` strings
///
/// Ordered by subset, then port, then address.
pub fn endpoint_addresses(endpoints: &Endpoints) -> Vec<String> {
    let mut out = Vec::new();
    for subset in endpoints.subsets.iter().flatten() {
        for port in subset.ports.iter().flatten() {
            for address in subset.addresses.iter().flatten() {
                out.push(format!("{}:{}", address.ip, port.port));
            }
        }
    }
    out
}

/// Pick the address to talk to for `service` in `namespace`
///
/// The first address wins; zero addresses is `EndpointNotFound`.
pub async fn resolve_endpoint(
    cluster: &dyn ClusterApi,
    namespace: &str,
    service: &str,
) -> Result<String> {
    let endpoints = cluster.endpoints(namespace, service).await?;

    let endpoint = endpoints
        .into_iter()
        .next()
        .ok_or_else(|| KubeError::EndpointNotFound {
            service: service.to_string(),
            namespace: namespace.to_string(),
        })?;

    tracing::debug!(%endpoint, %service, %namespace, "using deployment service endpoint");
    Ok(endpoint)
}
