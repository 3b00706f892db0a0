//! Manifest diffing
//!
//! [`unified_diff`] is the textual view printed by `deckhand diff`;
//! [`diff_resources`] classifies the same change per Kubernetes resource.

use serde::{Deserialize, Serialize};
use similar::TextDiff;
use std::collections::BTreeMap;

/// Lines of context around each hunk
pub const CONTEXT_LINES: usize = 3;

/// Unified diff of two manifest bodies, without file headers
///
/// Identical bodies give an empty string.
pub fn unified_diff(old: &str, new: &str) -> String {
    TextDiff::from_lines(old, new)
        .unified_diff()
        .context_radius(CONTEXT_LINES)
        .missing_newline_hint(false)
        .to_string()
}

/// Type of resource change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeType {
    Added,
    Modified,
    Removed,
}

impl std::fmt::Display for ChangeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChangeType::Added => write!(f, "added"),
            ChangeType::Modified => write!(f, "modified"),
            ChangeType::Removed => write!(f, "removed"),
        }
    }
}

/// Identity of a resource inside a manifest
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ResourceKey {
    pub kind: String,
    pub namespace: Option<String>,
    pub name: String,
}

impl std::fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.namespace {
            Some(ns) => write!(f, "{}/{}/{}", self.kind, ns, self.name),
            None => write!(f, "{}/{}", self.kind, self.name),
        }
    }
}

/// A resource that differs between two manifests
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceChange {
    pub key: ResourceKey,
    pub change_type: ChangeType,
}

/// Per-resource changes between two manifests, ordered by resource key
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffSummary {
    pub changes: Vec<ResourceChange>,
}

impl DiffSummary {
    pub fn has_changes(&self) -> bool {
        !self.changes.is_empty()
    }

    pub fn count(&self, change_type: ChangeType) -> usize {
        self.changes
            .iter()
            .filter(|c| c.change_type == change_type)
            .count()
    }
}

impl std::fmt::Display for DiffSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if !self.has_changes() {
            return write!(f, "No changes");
        }
        write!(
            f,
            "{} added, {} modified, {} removed",
            self.count(ChangeType::Added),
            self.count(ChangeType::Modified),
            self.count(ChangeType::Removed)
        )
    }
}

/// Classify every resource of two manifests as added, modified or removed
pub fn diff_resources(old: &str, new: &str) -> DiffSummary {
    let old_resources = parse_manifest_resources(old);
    let new_resources = parse_manifest_resources(new);

    let mut changes = Vec::new();

    for (key, new_doc) in &new_resources {
        let change_type = match old_resources.get(key) {
            None => ChangeType::Added,
            Some(old_doc) if old_doc != new_doc => ChangeType::Modified,
            Some(_) => continue,
        };
        changes.push(ResourceChange {
            key: key.clone(),
            change_type,
        });
    }

    for key in old_resources.keys() {
        if !new_resources.contains_key(key) {
            changes.push(ResourceChange {
                key: key.clone(),
                change_type: ChangeType::Removed,
            });
        }
    }

    changes.sort_by(|a, b| a.key.cmp(&b.key));
    DiffSummary { changes }
}

/// Split a manifest into resources keyed by kind, namespace and name
///
/// Documents without a `kind` (comments, empty documents) are skipped.
fn parse_manifest_resources(manifest: &str) -> BTreeMap<ResourceKey, serde_yaml::Value> {
    let mut resources = BTreeMap::new();

    for doc in split_documents(manifest) {
        let Ok(yaml) = serde_yaml::from_str::<serde_yaml::Value>(doc) else {
            continue;
        };
        let Some(kind) = yaml.get("kind").and_then(|v| v.as_str()) else {
            continue;
        };

        let metadata = yaml.get("metadata");
        let key = ResourceKey {
            kind: kind.to_string(),
            namespace: metadata
                .and_then(|m| m.get("namespace"))
                .and_then(|n| n.as_str())
                .map(String::from),
            name: metadata
                .and_then(|m| m.get("name"))
                .and_then(|n| n.as_str())
                .unwrap_or_default()
                .to_string(),
        };

        resources.insert(key, yaml);
    }

    resources
}

/// Documents of a multi-document YAML stream
fn split_documents(manifest: &str) -> Vec<&str> {
    let mut docs = Vec::new();
    let mut start = 0;
    let mut offset = 0;

    for line in manifest.split_inclusive('\n') {
        if line.trim_end() == "---" || line.starts_with("--- ") {
            docs.push(&manifest[start..offset]);
            start = offset + line.len();
        }
        offset += line.len();
    }
    docs.push(&manifest[start..]);

    docs.into_iter().filter(|d| !d.trim().is_empty()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const OLD: &str = "---
apiVersion: v1
kind: Service
metadata:
  name: web
spec:
  ports:
  - port: 80
---
apiVersion: v1
kind: ConfigMap
metadata:
  name: settings
data:
  level: info
";

    const NEW: &str = "---
apiVersion: v1
kind: Service
metadata:
  name: web
spec:
  ports:
  - port: 8080
---
apiVersion: apps/v1
kind: Deployment
metadata:
  name: web
  namespace: apps
";

    #[test]
    fn test_identical_is_empty() {
        assert_eq!(unified_diff(OLD, OLD), "");
    }

    #[test]
    fn test_single_inserted_line() {
        let old = "a\nb\nc\n";
        let new = "a\nb\ninserted\nc\n";

        let diff = unified_diff(old, new);

        let added: Vec<_> = diff.lines().filter(|l| l.starts_with('+')).collect();
        assert_eq!(added, vec!["+inserted"]);
        assert!(!diff.lines().any(|l| l.starts_with('-')));
        assert!(!diff.contains("---"));
    }

    #[test]
    fn test_context_window() {
        let old: String = (1..=20).map(|i| format!("line{}\n", i)).collect();
        let new = old.replace("line10\n", "line10 changed\n");

        let diff = unified_diff(&old, &new);

        assert!(diff.starts_with("@@ -7,7 +7,7 @@\n"));
        assert!(diff.contains(" line7\n"));
        assert!(!diff.contains("line6"));
        assert!(diff.contains("-line10\n+line10 changed\n"));
    }

    #[test]
    fn test_diff_resources() {
        let summary = diff_resources(OLD, NEW);

        let changes: Vec<_> = summary
            .changes
            .iter()
            .map(|c| (c.key.to_string(), c.change_type))
            .collect();
        assert_eq!(
            changes,
            vec![
                ("ConfigMap/settings".to_string(), ChangeType::Removed),
                ("Deployment/apps/web".to_string(), ChangeType::Added),
                ("Service/web".to_string(), ChangeType::Modified),
            ]
        );
        assert_eq!(summary.to_string(), "1 added, 1 modified, 1 removed");
    }

    #[test]
    fn test_diff_resources_unchanged() {
        let summary = diff_resources(OLD, OLD);
        assert!(!summary.has_changes());
        assert_eq!(summary.to_string(), "No changes");
    }

    #[test]
    fn test_split_documents_ignores_dashes_in_values() {
        let docs = split_documents("kind: A\ndata: a---b\n---\nkind: B\n");
        assert_eq!(docs, vec!["kind: A\ndata: a---b\n", "kind: B\n"]);
    }
}
