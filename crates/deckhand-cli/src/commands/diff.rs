//! Diff command - compare the running release with what a deploy would produce

use deckhand_kube::{DeployConfig, diff_resources, unified_diff};
use std::path::{Path, PathBuf};

use crate::error::Result;

pub async fn run(
    manifest: &Path,
    values: &[PathBuf],
    set: &[String],
    config: &DeployConfig,
) -> Result<()> {
    let deployer = super::connect(manifest, values, set, config).await?;

    let proposed = deployer.deploy(true).await?;
    let current = deployer.content().await?;

    let summary = diff_resources(&current.manifest, &proposed.manifest);
    tracing::info!(
        release = %deployer.release_name(),
        changes = %summary,
        "compared with deployed release"
    );

    print!("{}", unified_diff(&current.manifest, &proposed.manifest));
    Ok(())
}
