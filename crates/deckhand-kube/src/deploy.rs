//! Release deployment orchestration
//!
//! A [`Deployer`] binds one manifest's release identity, chart and overrides
//! to a deployment service, and decides between install and upgrade.
//!
//! The install-or-upgrade decision is a check-then-act sequence: another
//! client may install or upgrade the same release between the history
//! query and the install/upgrade call. The deployment service then
//! rejects the losing call and that error is returned unchanged.

use deckhand_core::{Chart, Manifest, Release, ReleaseOptions, Values};
use deckhand_engine::{RenderResult, TemplateEngine};
use std::path::{Path, PathBuf};

use crate::cluster::{ClusterApi, KubeCluster, resolve_endpoint};
use crate::config::DeployConfig;
use crate::error::{KubeError, Result};
use crate::service::{DeployService, HttpDeployService, InstallRequest, UpdateRequest};

/// Whether the deployment service knows the release
///
/// Install moves `NotInstalled` to `Installed`; upgrade keeps `Installed`.
/// In-flight states belong to the deployment service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseState {
    NotInstalled,
    Installed,
}

impl std::fmt::Display for ReleaseState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotInstalled => write!(f, "not installed"),
            Self::Installed => write!(f, "installed"),
        }
    }
}

/// What to deploy: release identity, chart and ordered overrides
///
/// Needs no cluster, so local rendering goes through it directly.
#[derive(Debug, Clone)]
pub struct ReleasePlan {
    release_name: String,
    namespace: String,
    chart: Chart,
    value_files: Vec<PathBuf>,
    set_values: Vec<String>,
}

impl ReleasePlan {
    pub fn new(manifest: &Manifest, chart: Chart) -> Self {
        Self {
            release_name: manifest.name.clone(),
            namespace: manifest.namespace.clone(),
            chart,
            value_files: manifest.value_files.clone(),
            set_values: manifest.set_values.clone(),
        }
    }

    /// Load the manifest at `path` and the chart it points to
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let manifest = Manifest::from_file(path)?;
        let chart = Chart::load(&manifest.chart)?;
        Ok(Self::new(&manifest, chart))
    }

    pub fn release_name(&self) -> &str {
        &self.release_name
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn chart(&self) -> &Chart {
        &self.chart
    }

    pub fn value_files(&self) -> &[PathBuf] {
        &self.value_files
    }

    pub fn set_values(&self) -> &[String] {
        &self.set_values
    }

    /// Append value files and inline overrides after the manifest's own
    pub fn add_overrides(&mut self, value_files: &[PathBuf], set_values: &[String]) {
        self.value_files.extend_from_slice(value_files);
        self.set_values.extend_from_slice(set_values);
    }

    /// Build the Override Document from the value files and inline overrides
    pub fn merge_overrides(&self) -> Result<Values> {
        Ok(deckhand_core::merge_overrides(&self.value_files, &self.set_values)?)
    }

    /// Render the chart with the merged overrides
    pub fn render(&self, engine: &dyn TemplateEngine) -> Result<RenderResult> {
        let overrides = self.merge_overrides()?;
        let release = ReleaseOptions::for_install(&self.release_name, &self.namespace);
        Ok(engine.render(&self.chart, &overrides, release)?)
    }
}

/// Orchestrates one release against a deployment service
pub struct Deployer {
    plan: ReleasePlan,
    service: Box<dyn DeployService>,
}

impl Deployer {
    /// Bind a loaded manifest and chart to a deployment service
    pub fn new(manifest: &Manifest, chart: Chart, service: Box<dyn DeployService>) -> Self {
        Self::with_plan(ReleasePlan::new(manifest, chart), service)
    }

    pub fn with_plan(plan: ReleasePlan, service: Box<dyn DeployService>) -> Self {
        Self { plan, service }
    }

    /// Load the manifest at `path` and its chart, connect to the cluster
    /// the manifest names, and locate the deployment service
    pub async fn from_manifest<P: AsRef<Path>>(path: P, config: &DeployConfig) -> Result<Self> {
        let manifest = Manifest::from_file(path)?;
        let chart = Chart::load(&manifest.chart)?;

        let cluster = KubeCluster::connect(
            config.kubeconfig.as_deref(),
            manifest.context(),
            manifest.cluster(),
        )
        .await?;

        Self::connect(&manifest, chart, &cluster, config).await
    }

    /// Locate the deployment service through `cluster` and bind to it
    pub async fn connect(
        manifest: &Manifest,
        chart: Chart,
        cluster: &dyn ClusterApi,
        config: &DeployConfig,
    ) -> Result<Self> {
        let endpoint =
            resolve_endpoint(cluster, &config.service_namespace, &config.service_name).await?;
        let service = HttpDeployService::new(&endpoint, config.connect_timeout)?;

        Ok(Self::new(manifest, chart, Box::new(service)))
    }

    pub fn plan(&self) -> &ReleasePlan {
        &self.plan
    }

    pub fn release_name(&self) -> &str {
        self.plan.release_name()
    }

    pub fn namespace(&self) -> &str {
        self.plan.namespace()
    }

    /// Append value files and inline overrides after the manifest's own
    pub fn add_overrides(&mut self, value_files: &[PathBuf], set_values: &[String]) {
        self.plan.add_overrides(value_files, set_values);
    }

    /// Ask the deployment service whether the release exists
    ///
    /// "Not found" and an empty history both mean not installed; any other
    /// failure is returned.
    pub async fn state(&self) -> Result<ReleaseState> {
        let state = match self.service.release_history(self.plan.release_name(), 1).await {
            Ok(history) if history.is_empty() => ReleaseState::NotInstalled,
            Ok(_) => ReleaseState::Installed,
            Err(KubeError::ReleaseNotFound { .. }) => ReleaseState::NotInstalled,
            Err(e) => return Err(self.wrap("history", e)),
        };

        tracing::debug!(
            release = %self.plan.release_name(),
            namespace = %self.plan.namespace(),
            %state,
            "checked release state"
        );
        Ok(state)
    }

    pub async fn is_installed(&self) -> Result<bool> {
        Ok(self.state().await? == ReleaseState::Installed)
    }

    /// Install or upgrade the release
    ///
    /// A dry run leaves deployed state untouched and returns the release
    /// that would result.
    pub async fn deploy(&self, dry_run: bool) -> Result<Release> {
        let overrides = self.plan.merge_overrides()?;
        let values = overrides.to_yaml()?;

        let release = match self.state().await? {
            ReleaseState::NotInstalled => {
                tracing::debug!(
                    release = %self.plan.release_name(),
                    namespace = %self.plan.namespace(),
                    dry_run,
                    "installing release"
                );
                self.service
                    .install_release(InstallRequest {
                        chart: self.plan.chart(),
                        namespace: self.plan.namespace(),
                        name: self.plan.release_name(),
                        values: &values,
                        dry_run,
                    })
                    .await
                    .map_err(|e| self.wrap("install", e))?
            }
            ReleaseState::Installed => {
                tracing::debug!(
                    release = %self.plan.release_name(),
                    namespace = %self.plan.namespace(),
                    dry_run,
                    "upgrading release"
                );
                self.service
                    .update_release(UpdateRequest {
                        name: self.plan.release_name(),
                        chart: self.plan.chart(),
                        values: &values,
                        dry_run,
                    })
                    .await
                    .map_err(|e| self.wrap("upgrade", e))?
            }
        };

        if !dry_run {
            tracing::info!(
                release = %release.name,
                namespace = %release.namespace,
                revision = release.version,
                "release deployed"
            );
        }
        Ok(release)
    }

    /// Current status: name, namespace and info only
    pub async fn status(&self) -> Result<Release> {
        let release = self
            .service
            .release_status(self.plan.release_name())
            .await
            .map_err(|e| self.wrap("status", e))?;

        Ok(Release {
            name: release.name,
            namespace: release.namespace,
            info: release.info,
            ..Default::default()
        })
    }

    /// The currently deployed release, including its manifest body
    pub async fn content(&self) -> Result<Release> {
        self.service
            .release_content(self.plan.release_name())
            .await
            .map_err(|e| self.wrap("content", e))
    }

    fn wrap(&self, operation: &'static str, source: KubeError) -> KubeError {
        KubeError::DeployService {
            operation,
            name: self.plan.release_name().to_string(),
            namespace: self.plan.namespace().to_string(),
            source: Box::new(source),
        }
    }
}
