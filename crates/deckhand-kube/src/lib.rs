//! deckhand kube - cluster-facing side of deckhand
//!
//! This crate provides:
//! - **Endpoint discovery**: locate the deployment service through the cluster API
//! - **Deployment service client**: install, upgrade, status and content over HTTP
//! - **Orchestration**: the install-or-upgrade decision for one release
//! - **Diff**: unified text diff and per-resource change summary of manifests
//! - **Lint**: health probe policy on rendered Deployments
//! - **Mocks**: in-memory cluster and deployment service for tests

pub mod cluster;
pub mod config;
pub mod deploy;
pub mod diff;
pub mod error;
pub mod lint;
pub mod mock;
pub mod service;

pub use cluster::{ClusterApi, KubeCluster, endpoint_addresses, resolve_endpoint};
pub use config::DeployConfig;
pub use deploy::{Deployer, ReleasePlan, ReleaseState};
pub use diff::{ChangeType, DiffSummary, ResourceChange, ResourceKey, diff_resources, unified_diff};
pub use error::{KubeError, Result};
pub use lint::{LintReport, LintViolation, lint_rendered, lint_resource};
pub use mock::{MockCluster, MockDeployService};
pub use service::{DeployService, HttpDeployService, InstallRequest, UpdateRequest};
