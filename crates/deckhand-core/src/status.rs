//! Human-readable release status report

use chrono::{DateTime, Utc};
use regex::Regex;
use std::fmt;
use std::sync::LazyLock;

use crate::release::Release;

/// Runs of two or more spaces separate columns in the resource listing
static COLUMN_GAP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(" {2,}").expect("column gap pattern is valid")
});

/// Padding between aligned columns
const COLUMN_PADDING: usize = 2;

/// Formats a release in the fixed status layout
///
/// ```text
/// LAST DEPLOYED: Mon Mar  4 10:00:00 2024
/// NAMESPACE: default
/// STATUS: DEPLOYED
///
/// RESOURCES:
/// ...
/// ```
pub struct StatusReport<'a>(pub &'a Release);

impl fmt::Display for StatusReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let release = self.0;
        let info = &release.info;

        if let Some(last_deployed) = &info.last_deployed {
            writeln!(f, "LAST DEPLOYED: {}", format_timestamp(last_deployed))?;
        }
        writeln!(f, "NAMESPACE: {}", release.namespace)?;
        writeln!(f, "STATUS: {}", info.status.code)?;
        writeln!(f)?;

        if !info.status.resources.is_empty() {
            writeln!(f, "RESOURCES:")?;
            writeln!(f, "{}", align_columns(&info.status.resources))?;
        }

        if let Some(run) = &info.status.last_test_suite_run {
            writeln!(f, "TEST SUITE:")?;
            writeln!(f, "Last Started: {}", format_optional(run.started_at.as_ref()))?;
            writeln!(f, "Last Completed: {}", format_optional(run.completed_at.as_ref()))?;
            writeln!(f)?;
        }

        if let Some(notes) = info.status.notes.as_deref().filter(|n| !n.is_empty()) {
            writeln!(f, "NOTES:")?;
            writeln!(f, "{}", notes)?;
        }

        Ok(())
    }
}

fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.format("%a %b %e %H:%M:%S %Y").to_string()
}

fn format_optional(ts: Option<&DateTime<Utc>>) -> String {
    ts.map(format_timestamp).unwrap_or_else(|| "-".to_string())
}

/// Normalize whitespace in a column listing and re-align it
///
/// Lines are grouped into blocks separated by blank lines; each block is
/// aligned on its own. The last cell of a line never pads the column.
fn align_columns(text: &str) -> String {
    let rows: Vec<Vec<&str>> = text
        .lines()
        .map(|line| COLUMN_GAP.split(line.trim_end()).collect())
        .collect();

    let mut out: Vec<String> = Vec::with_capacity(rows.len());
    for block in rows.split(|row| row.len() == 1 && row[0].is_empty()) {
        let mut widths: Vec<usize> = Vec::new();
        for row in block {
            for (i, cell) in row.iter().enumerate().take(row.len().saturating_sub(1)) {
                if widths.len() <= i {
                    widths.push(0);
                }
                widths[i] = widths[i].max(cell.chars().count());
            }
        }

        for row in block {
            let mut line = String::new();
            for (i, cell) in row.iter().enumerate() {
                if i + 1 < row.len() {
                    line.push_str(&format!("{:<width$}", cell, width = widths[i] + COLUMN_PADDING));
                } else {
                    line.push_str(cell);
                }
            }
            out.push(line);
        }
        out.push(String::new());
    }
    // The split above yields one trailing separator too many
    out.pop();

    out.join("\n")
}
