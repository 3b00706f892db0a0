//! Lint command - check rendered resources against deployment policies

use console::style;
use deckhand_kube::lint_rendered;
use std::path::{Path, PathBuf};

use crate::error::{CliError, Result};

pub fn run(manifest: &Path, values: &[PathBuf], set: &[String], strict: bool) -> Result<()> {
    let (plan, result) = super::render_local(manifest, values, set)?;

    let mut violations = 0;
    for report in lint_rendered(&result.manifests) {
        println!("# Source: {}", super::source_path(plan.chart(), &report.path));
        if report.is_ok() {
            println!("{}", style("OK").green());
            continue;
        }
        for violation in &report.violations {
            println!("{}", style(violation).red());
        }
        violations += report.violations.len();
    }

    if violations > 0 {
        tracing::warn!(violations, "lint found policy violations");
        if strict {
            return Err(CliError::lint_failed(violations));
        }
    }

    Ok(())
}
