//! Deploy command - install or upgrade the release

use console::style;
use deckhand_core::StatusReport;
use deckhand_kube::DeployConfig;
use std::path::{Path, PathBuf};

use crate::error::Result;

pub async fn run(
    manifest: &Path,
    values: &[PathBuf],
    set: &[String],
    dry_run: bool,
    config: &DeployConfig,
) -> Result<()> {
    let deployer = super::connect(manifest, values, set, config).await?;

    let release = deployer.deploy(dry_run).await?;

    if dry_run {
        eprintln!(
            "{} dry run, nothing was changed",
            style("NOTE:").yellow().bold()
        );
    }
    print!("{}", StatusReport(&release));

    Ok(())
}
