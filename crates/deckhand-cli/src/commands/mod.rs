//! CLI commands

pub mod deploy;
pub mod diff;
pub mod endpoint;
pub mod lint;
pub mod status;
pub mod template;

use deckhand_core::Chart;
use deckhand_engine::{Engine, RenderResult};
use deckhand_kube::{DeployConfig, Deployer, ReleasePlan};
use std::path::{Path, PathBuf};

use crate::error::Result;

/// Build a deployer for the manifest, with the command line overrides
/// appended after the manifest's own
async fn connect(
    manifest: &Path,
    values: &[PathBuf],
    set: &[String],
    config: &DeployConfig,
) -> Result<Deployer> {
    let mut deployer = Deployer::from_manifest(manifest, config).await?;
    deployer.add_overrides(values, set);
    Ok(deployer)
}

/// Render the manifest's chart without touching the cluster
fn render_local(
    manifest: &Path,
    values: &[PathBuf],
    set: &[String],
) -> Result<(ReleasePlan, RenderResult)> {
    let mut plan = ReleasePlan::load(manifest)?;
    plan.add_overrides(values, set);

    let result = plan.render(&Engine::default())?;
    Ok((plan, result))
}

/// Display path of a rendered document
fn source_path(chart: &Chart, path: &str) -> String {
    format!("{}/templates/{}", chart.name(), path)
}
