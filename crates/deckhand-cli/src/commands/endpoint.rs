//! Endpoint command - print the deployment service address

use deckhand_core::Manifest;
use deckhand_kube::{DeployConfig, KubeCluster, resolve_endpoint};
use std::path::Path;

use crate::error::Result;

pub async fn run(manifest: &Path, config: &DeployConfig) -> Result<()> {
    let manifest = Manifest::from_file(manifest)?;

    let cluster = KubeCluster::connect(
        config.kubeconfig.as_deref(),
        manifest.context(),
        manifest.cluster(),
    )
    .await?;
    let endpoint =
        resolve_endpoint(&cluster, &config.service_namespace, &config.service_name).await?;

    println!("DECKHAND_HOST=\"{}\"", endpoint);
    Ok(())
}
