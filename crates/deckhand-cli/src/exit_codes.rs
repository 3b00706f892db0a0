//! Process exit codes
//!
//! Each failure class of a deckhand invocation has its own code so CI
//! pipelines can tell a bad manifest from an unreachable cluster.

/// General error - unspecified failure
pub const ERROR: i32 = 1;

/// Input error - malformed manifest, value file or `--set` expression
pub const INPUT_ERROR: i32 = 2;

/// Template error - chart rendering failed
pub const TEMPLATE_ERROR: i32 = 3;

/// Chart error - chart missing or Chart.yaml invalid
pub const CHART_ERROR: i32 = 4;

/// IO error - file not found, permission denied, etc.
pub const IO_ERROR: i32 = 5;

/// Cluster error - kubeconfig, cluster API or endpoint lookup failed
pub const CLUSTER_ERROR: i32 = 6;

/// Deployment service error - install, upgrade, status or content failed
pub const SERVICE_ERROR: i32 = 7;

/// Lint failed - violations found with `--strict`
pub const LINT_FAILED: i32 = 8;
