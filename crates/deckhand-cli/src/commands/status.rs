//! Status command - show the status of the release

use deckhand_core::StatusReport;
use deckhand_kube::DeployConfig;
use std::path::Path;

use crate::error::Result;

pub async fn run(manifest: &Path, config: &DeployConfig) -> Result<()> {
    let deployer = super::connect(manifest, &[], &[], config).await?;

    let release = deployer.status().await?;
    print!("{}", StatusReport(&release));

    Ok(())
}
