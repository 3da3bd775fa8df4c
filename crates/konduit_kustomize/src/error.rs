//! Error types for the kustomize module.

use std::path::PathBuf;

use konduit_runner::RunnerError;
use thiserror::Error;

/// Result type alias for kustomize operations.
pub type KustomizeResult<T> = Result<T, KustomizeError>;

/// Errors that can occur while building the overlay or running the filter.
#[derive(Error, Debug)]
pub enum KustomizeError {
    #[error("decode patch {index}: {source}")]
    DecodePatch {
        index: usize,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("invalid patch {index}: {message}")]
    InvalidPatch { index: usize, message: String },

    #[error("invalid patch {index}: unknown field {field:?}")]
    UnknownField { index: usize, field: String },

    #[error("file already exists: {0}")]
    FileExists(PathBuf),

    #[error("path is not valid UTF-8: {0:?}")]
    NonUtf8Path(PathBuf),

    #[error("kustomization not prepared: {0}")]
    MissingSpec(PathBuf),

    #[error("run kustomize: {0}")]
    OverlayBuild(#[source] RunnerError),

    #[error("run original post-renderer: {0}")]
    ChainedFilter(#[source] RunnerError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML encoding error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl KustomizeError {
    /// The process failure behind this error, if any.
    pub fn runner_error(&self) -> Option<&RunnerError> {
        match self {
            Self::OverlayBuild(e) | Self::ChainedFilter(e) => Some(e),
            _ => None,
        }
    }
}
