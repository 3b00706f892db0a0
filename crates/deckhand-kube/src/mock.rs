//! In-memory cluster and deployment service for testing
//!
//! These stand in for the real collaborators so the orchestrator can be
//! exercised without a Kubernetes cluster.

use async_trait::async_trait;
use deckhand_core::{Release, ReleaseStatus};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::cluster::ClusterApi;
use crate::error::{KubeError, Result};
use crate::service::{DeployService, InstallRequest, UpdateRequest};

/// Fixed endpoint table keyed by (namespace, service)
#[derive(Debug, Clone, Default)]
pub struct MockCluster {
    endpoints: HashMap<(String, String), Vec<String>>,
    failure: Option<String>,
}

impl MockCluster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_endpoints(mut self, namespace: &str, service: &str, addresses: &[&str]) -> Self {
        self.endpoints.insert(
            (namespace.to_string(), service.to_string()),
            addresses.iter().map(|a| a.to_string()).collect(),
        );
        self
    }

    /// Make every query fail as an unreachable cluster would
    pub fn failing(mut self, message: &str) -> Self {
        self.failure = Some(message.to_string());
        self
    }
}

#[async_trait]
impl ClusterApi for MockCluster {
    async fn endpoints(&self, namespace: &str, service: &str) -> Result<Vec<String>> {
        if let Some(message) = &self.failure {
            return Err(KubeError::EndpointResolution {
                service: service.to_string(),
                namespace: namespace.to_string(),
                source: message.clone().into(),
            });
        }

        Ok(self
            .endpoints
            .get(&(namespace.to_string(), service.to_string()))
            .cloned()
            .unwrap_or_default())
    }
}

/// A recorded install or upgrade call
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub operation: &'static str,
    pub name: String,
    pub namespace: Option<String>,
    pub values: String,
    pub dry_run: bool,
}

/// Counts of operations performed for testing assertions
#[derive(Debug, Default, Clone)]
pub struct OperationCounts {
    pub histories: usize,
    pub installs: usize,
    pub updates: usize,
    pub statuses: usize,
    pub contents: usize,
}

/// Deployment service keeping releases in memory
///
/// Installs and non-dry-run upgrades are stored; dry runs only echo back
/// the release they would produce.
#[derive(Clone, Default)]
pub struct MockDeployService {
    releases: Arc<RwLock<HashMap<String, Vec<Release>>>>,
    calls: Arc<RwLock<Vec<RecordedCall>>>,
    operations: Arc<RwLock<OperationCounts>>,
    history_error: Arc<RwLock<Option<String>>>,
}

impl MockDeployService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create with pre-populated releases (oldest revision first)
    pub fn with_releases(releases: Vec<Release>) -> Self {
        let service = Self::new();
        if let Ok(mut store) = service.releases.write() {
            for release in releases {
                store.entry(release.name.clone()).or_default().push(release);
            }
        }
        service
    }

    /// Register a release name with an empty history
    pub fn with_empty_history(self, name: &str) -> Self {
        if let Ok(mut store) = self.releases.write() {
            store.entry(name.to_string()).or_default();
        }
        self
    }

    /// Make history queries fail with a service error
    pub fn with_history_error(self, message: &str) -> Self {
        if let Ok(mut error) = self.history_error.write() {
            *error = Some(message.to_string());
        }
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.read().map(|c| c.clone()).unwrap_or_default()
    }

    pub fn operation_counts(&self) -> OperationCounts {
        self.operations
            .read()
            .map(|o| o.clone())
            .unwrap_or_default()
    }

    fn count(&self, f: impl FnOnce(&mut OperationCounts)) {
        if let Ok(mut ops) = self.operations.write() {
            f(&mut ops);
        }
    }

    fn record(&self, call: RecordedCall) {
        if let Ok(mut calls) = self.calls.write() {
            calls.push(call);
        }
    }

    fn latest(&self, name: &str) -> Result<Release> {
        self.releases
            .read()
            .ok()
            .and_then(|store| store.get(name).and_then(|h| h.last().cloned()))
            .ok_or_else(|| KubeError::ReleaseNotFound {
                name: name.to_string(),
            })
    }

    fn store(&self, release: &Release) {
        if let Ok(mut store) = self.releases.write() {
            let history = store.entry(release.name.clone()).or_default();
            if let Some(previous) = history.last_mut() {
                previous.info.status.code = ReleaseStatus::Superseded;
            }
            history.push(release.clone());
        }
    }
}

/// Manifest body a fake install produces
fn fake_manifest(chart: &str, values: &str) -> String {
    format!("# chart: {}\n{}", chart, values)
}

#[async_trait]
impl DeployService for MockDeployService {
    async fn release_history(&self, name: &str, max: u32) -> Result<Vec<Release>> {
        self.count(|o| o.histories += 1);

        if let Some(message) = self.history_error.read().ok().and_then(|e| e.clone()) {
            return Err(KubeError::Service {
                status: 500,
                message,
            });
        }

        let store = self
            .releases
            .read()
            .map_err(|e| KubeError::Serialization(e.to_string()))?;
        let history = store.get(name).ok_or_else(|| KubeError::ReleaseNotFound {
            name: name.to_string(),
        })?;

        Ok(history.iter().rev().take(max as usize).cloned().collect())
    }

    async fn install_release(&self, request: InstallRequest<'_>) -> Result<Release> {
        self.count(|o| o.installs += 1);
        self.record(RecordedCall {
            operation: "install",
            name: request.name.to_string(),
            namespace: Some(request.namespace.to_string()),
            values: request.values.to_string(),
            dry_run: request.dry_run,
        });

        let mut release = Release {
            name: request.name.to_string(),
            namespace: request.namespace.to_string(),
            version: 1,
            manifest: fake_manifest(request.chart.name(), request.values),
            ..Default::default()
        };
        release.info.status.code = if request.dry_run {
            ReleaseStatus::PendingInstall
        } else {
            ReleaseStatus::Deployed
        };

        if !request.dry_run {
            self.store(&release);
        }
        Ok(release)
    }

    async fn update_release(&self, request: UpdateRequest<'_>) -> Result<Release> {
        self.count(|o| o.updates += 1);
        let current = self.latest(request.name)?;
        self.record(RecordedCall {
            operation: "update",
            name: request.name.to_string(),
            namespace: None,
            values: request.values.to_string(),
            dry_run: request.dry_run,
        });

        let mut release = Release {
            version: current.version + 1,
            manifest: fake_manifest(request.chart.name(), request.values),
            ..current
        };
        release.info.status.code = if request.dry_run {
            ReleaseStatus::PendingUpgrade
        } else {
            ReleaseStatus::Deployed
        };

        if !request.dry_run {
            self.store(&release);
        }
        Ok(release)
    }

    async fn release_status(&self, name: &str) -> Result<Release> {
        self.count(|o| o.statuses += 1);
        let release = self.latest(name)?;
        Ok(Release {
            manifest: String::new(),
            ..release
        })
    }

    async fn release_content(&self, name: &str) -> Result<Release> {
        self.count(|o| o.contents += 1);
        self.latest(name)
    }
}
