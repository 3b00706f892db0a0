//! Release state as reported by the deployment service

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A release tracked by the deployment service
///
/// Only `name` and `namespace` are guaranteed; a status query leaves
/// `manifest` empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Release {
    /// Release name
    pub name: String,

    /// Kubernetes namespace
    pub namespace: String,

    /// Revision number
    #[serde(default)]
    pub version: u32,

    /// Deployment info (status, timestamps, notes)
    #[serde(default)]
    pub info: ReleaseInfo,

    /// Rendered manifest (all resources, concatenated)
    #[serde(default)]
    pub manifest: String,
}

impl Release {
    /// Current status code
    pub fn status(&self) -> &ReleaseStatus {
        &self.info.status.code
    }
}

/// Release lifecycle information
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseInfo {
    #[serde(default)]
    pub status: StatusInfo,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_deployed: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_deployed: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Status details of a release
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusInfo {
    #[serde(default)]
    pub code: ReleaseStatus,

    /// Resource listing as produced by the service (column text)
    #[serde(default)]
    pub resources: String,

    /// Rendered NOTES.txt
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_test_suite_run: Option<TestSuiteRun>,
}

/// Timing of the last `test` run against a release
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestSuiteRun {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

/// Release status
///
/// Note: This enum is non-exhaustive - new variants may be added in future versions.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[non_exhaustive]
pub enum ReleaseStatus {
    #[default]
    Unknown,
    Deployed,
    Deleted,
    Superseded,
    Failed,
    Deleting,
    PendingInstall,
    PendingUpgrade,
    PendingRollback,
}

impl std::fmt::Display for ReleaseStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Unknown => "UNKNOWN",
            Self::Deployed => "DEPLOYED",
            Self::Deleted => "DELETED",
            Self::Superseded => "SUPERSEDED",
            Self::Failed => "FAILED",
            Self::Deleting => "DELETING",
            Self::PendingInstall => "PENDING_INSTALL",
            Self::PendingUpgrade => "PENDING_UPGRADE",
            Self::PendingRollback => "PENDING_ROLLBACK",
        };
        write!(f, "{}", s)
    }
}
