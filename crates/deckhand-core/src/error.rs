//! Core error types

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Failed to read release manifest {path}: {source}")]
    ManifestRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse release manifest {path}: {source}")]
    ManifestParse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Chart not found: {path}")]
    ChartNotFound { path: String },

    #[error("Invalid chart {path}: {message}")]
    InvalidChart { path: String, message: String },

    /// A value file or inline `--set` expression could not be merged.
    /// `source_name` is the file path or the expression itself.
    #[error("Values merge error in {source_name}: {message}")]
    Merge {
        source_name: String,
        message: String,
    },

    #[error("Failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CoreError {
    pub(crate) fn merge(source_name: impl Into<String>, message: impl ToString) -> Self {
        Self::Merge {
            source_name: source_name.into(),
            message: message.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
