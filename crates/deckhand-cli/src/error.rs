//! CLI error type with exit code handling
//!
//! Library errors are sorted into the failure classes of `exit_codes`.

use deckhand_core::CoreError;
use deckhand_engine::{EngineError, TemplateError};
use deckhand_kube::KubeError;
use miette::Diagnostic;
use thiserror::Error;

use crate::exit_codes;

/// CLI-specific error type that includes exit code information
#[derive(Error, Debug, Diagnostic)]
pub enum CliError {
    /// Manifest, value file or inline override is malformed
    #[error("{message}")]
    #[diagnostic(code(deckhand::cli::input))]
    Input { message: String },

    /// Template rendering failed
    #[error("Template error in {}: {}", .0.template, .0.message)]
    #[diagnostic(transparent)]
    Template(TemplateError),

    /// Chart missing or invalid
    #[error("{message}")]
    #[diagnostic(code(deckhand::cli::chart))]
    Chart { message: String },

    /// IO error (file not found, permissions, etc.)
    #[error("IO error: {message}")]
    #[diagnostic(code(deckhand::cli::io))]
    Io { message: String },

    /// Cluster access or endpoint discovery failed
    #[error("{message}")]
    #[diagnostic(
        code(deckhand::cli::cluster),
        help("check --service-namespace, --service-name and the kubeconfig context")
    )]
    Cluster { message: String },

    /// The deployment service rejected or failed an operation
    #[error("{message}")]
    #[diagnostic(code(deckhand::cli::service))]
    Service { message: String },

    /// Linting found violations and `--strict` was given
    #[error("Linting failed with {violations} violation(s)")]
    #[diagnostic(code(deckhand::cli::lint))]
    LintFailed { violations: usize },

    /// Anything else
    #[error("{message}")]
    #[diagnostic(code(deckhand::cli::error))]
    Other { message: String },
}

impl CliError {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Input { .. } => exit_codes::INPUT_ERROR,
            CliError::Template(_) => exit_codes::TEMPLATE_ERROR,
            CliError::Chart { .. } => exit_codes::CHART_ERROR,
            CliError::Io { .. } => exit_codes::IO_ERROR,
            CliError::Cluster { .. } => exit_codes::CLUSTER_ERROR,
            CliError::Service { .. } => exit_codes::SERVICE_ERROR,
            CliError::LintFailed { .. } => exit_codes::LINT_FAILED,
            CliError::Other { .. } => exit_codes::ERROR,
        }
    }

    pub fn lint_failed(violations: usize) -> Self {
        Self::LintFailed { violations }
    }
}

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        let message = err.to_string();
        match err {
            CoreError::ManifestRead { .. }
            | CoreError::ManifestParse { .. }
            | CoreError::Merge { .. }
            | CoreError::YamlParse(_)
            | CoreError::JsonParse(_) => CliError::Input { message },
            CoreError::ChartNotFound { .. } | CoreError::InvalidChart { .. } => {
                CliError::Chart { message }
            }
            CoreError::Io(e) => e.into(),
        }
    }
}

impl From<EngineError> for CliError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::Template(e) => CliError::Template(e),
            dup @ EngineError::DuplicateOutput { .. } => CliError::Chart {
                message: dup.to_string(),
            },
            EngineError::Io(e) => CliError::Io {
                message: e.to_string(),
            },
            other => CliError::Other {
                message: other.to_string(),
            },
        }
    }
}

impl From<KubeError> for CliError {
    fn from(err: KubeError) -> Self {
        let message = err.to_string();
        match err {
            KubeError::Core(e) => e.into(),
            KubeError::Engine(e) => e.into(),
            KubeError::EndpointResolution { .. }
            | KubeError::EndpointNotFound { .. }
            | KubeError::Kubeconfig(_)
            | KubeError::Api(_) => CliError::Cluster { message },
            KubeError::DeployService { .. }
            | KubeError::ReleaseNotFound { .. }
            | KubeError::Service { .. }
            | KubeError::Http(_) => CliError::Service { message },
            KubeError::Io(e) => e.into(),
            _ => CliError::Other { message },
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        CliError::Io {
            message: err.to_string(),
        }
    }
}

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;
