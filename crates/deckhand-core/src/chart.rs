//! Chart definition and loading

use semver::Version;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::error::{CoreError, Result};
use crate::values::Values;

/// Chart metadata from `Chart.yaml`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartMetadata {
    /// Chart name (required)
    pub name: String,

    /// Chart version (required, SemVer)
    pub version: Version,

    /// Description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Application version
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_version: Option<String>,
}

/// A chart loaded into memory
///
/// Templates are read eagerly so the whole bundle can be rendered locally or
/// shipped to the deployment service as a single document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chart {
    /// Chart metadata
    pub metadata: ChartMetadata,

    /// Default values from `values.yaml`
    #[serde(default)]
    pub values: Values,

    /// Template sources keyed by path relative to `templates/`
    #[serde(default)]
    pub templates: BTreeMap<String, String>,

    /// Directory the chart was loaded from
    #[serde(skip)]
    pub root: PathBuf,
}

impl Chart {
    /// Load a chart from a directory
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let root = path.as_ref().to_path_buf();
        let display = root.display().to_string();

        if !root.is_dir() {
            return Err(CoreError::ChartNotFound { path: display });
        }

        let chart_file = root.join("Chart.yaml");
        if !chart_file.exists() {
            return Err(CoreError::InvalidChart {
                path: display,
                message: "Chart.yaml not found".to_string(),
            });
        }

        let content = std::fs::read_to_string(&chart_file)?;
        let metadata: ChartMetadata =
            serde_yaml::from_str(&content).map_err(|e| CoreError::InvalidChart {
                path: display.clone(),
                message: format!("Chart.yaml: {}", e),
            })?;

        if metadata.name.trim().is_empty() {
            return Err(CoreError::InvalidChart {
                path: display,
                message: "Chart.yaml: name must not be empty".to_string(),
            });
        }

        let values_path = root.join("values.yaml");
        let values = if values_path.exists() {
            let content = std::fs::read_to_string(&values_path)?;
            Values::from_yaml(&content).map_err(|e| CoreError::InvalidChart {
                path: display.clone(),
                message: format!("values.yaml: {}", e),
            })?
        } else {
            Values::new()
        };

        let templates = load_templates(&root.join("templates"))?;

        tracing::debug!(
            chart = %metadata.name,
            version = %metadata.version,
            templates = templates.len(),
            "loaded chart"
        );

        Ok(Self {
            metadata,
            values,
            templates,
            root,
        })
    }

    /// Name of the chart
    pub fn name(&self) -> &str {
        &self.metadata.name
    }
}

/// Read every file under `templates/`, sorted by relative path
fn load_templates(dir: &Path) -> Result<BTreeMap<String, String>> {
    let mut templates = BTreeMap::new();

    if !dir.exists() {
        return Ok(templates);
    }

    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.map_err(|e| CoreError::Io(e.into()))?;
        if !entry.file_type().is_file() {
            continue;
        }

        let rel_path = entry
            .path()
            .strip_prefix(dir)
            .unwrap_or(entry.path())
            .to_string_lossy()
            .replace('\\', "/");

        let content = std::fs::read_to_string(entry.path())?;
        templates.insert(rel_path, content);
    }

    Ok(templates)
}
