//! Release manifest loading
//!
//! A release manifest is the declarative description of one deployment:
//!
//! ```yaml
//! name: dashboard
//! context: production
//! namespace: kube-system
//! chart: ./charts/dashboard
//! values:
//!   - values/base.yaml
//!   - values/production.yaml
//! set:
//!   - image.tag=v1.10.1
//! ```
//!
//! Relative `chart` and `values` paths are anchored at the directory holding
//! the manifest file, so a loaded [`Manifest`] no longer depends on the
//! current working directory.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{CoreError, Result};

/// A loaded release manifest
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    /// Release name
    #[serde(default)]
    pub name: String,

    /// Kubeconfig context to use (empty for the current context)
    #[serde(default)]
    pub context: String,

    /// Cluster override for the selected context (empty for none)
    #[serde(default)]
    pub cluster: String,

    /// Target namespace of the release
    #[serde(default)]
    pub namespace: String,

    /// Chart location
    #[serde(default)]
    pub chart: PathBuf,

    /// Value files, merged in order
    #[serde(default, rename = "values")]
    pub value_files: Vec<PathBuf>,

    /// Inline `dotted.key=value` overrides, applied in order after value files
    #[serde(default, rename = "set")]
    pub set_values: Vec<String>,
}

impl Manifest {
    /// Load a manifest from a file and resolve its relative paths
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| CoreError::ManifestRead {
            path: path.to_path_buf(),
            source,
        })?;

        let mut manifest: Manifest =
            serde_yaml::from_str(&content).map_err(|source| CoreError::ManifestParse {
                path: path.to_path_buf(),
                source,
            })?;

        // A bare file name has an empty parent; anchor at the working directory
        let absolute = std::path::absolute(path).map_err(|source| CoreError::ManifestRead {
            path: path.to_path_buf(),
            source,
        })?;
        let base = absolute.parent().unwrap_or_else(|| Path::new("/"));
        manifest.resolve_paths(base);

        tracing::debug!(
            manifest = %path.display(),
            release = %manifest.name,
            chart = %manifest.chart.display(),
            "loaded release manifest"
        );

        Ok(manifest)
    }

    /// Anchor relative chart and value-file paths at `base`
    fn resolve_paths(&mut self, base: &Path) {
        self.chart = anchor(base, &self.chart);
        for value_file in &mut self.value_files {
            *value_file = anchor(base, value_file);
        }
    }

    /// Kubeconfig context, if one was set
    pub fn context(&self) -> Option<&str> {
        Some(self.context.as_str()).filter(|c| !c.is_empty())
    }

    /// Cluster override, if one was set
    pub fn cluster(&self) -> Option<&str> {
        Some(self.cluster.as_str()).filter(|c| !c.is_empty())
    }
}

fn anchor(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}
