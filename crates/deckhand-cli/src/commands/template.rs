//! Template command - render the chart locally

use std::path::{Path, PathBuf};

use crate::error::Result;

pub fn run(manifest: &Path, values: &[PathBuf], set: &[String]) -> Result<()> {
    let (plan, result) = super::render_local(manifest, values, set)?;

    print!("{}", result.manifest_stream(plan.chart().name()));

    if let Some(notes) = result.notes.as_deref().filter(|n| !n.trim().is_empty()) {
        println!("\nNOTES:\n{}", notes.trim_end());
    }

    Ok(())
}
