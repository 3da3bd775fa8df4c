//! Error types for the CUE module.

use std::path::PathBuf;

use konduit_core::EvaluationError;
use konduit_runner::RunnerError;
use thiserror::Error;

/// Result type alias for CUE operations.
pub type CueResult<T> = Result<T, CueError>;

/// Errors that can occur while evaluating CUE.
#[derive(Error, Debug)]
pub enum CueError {
    #[error("no CUE files provided")]
    NoFiles,

    #[error("read scope file {path:?}: {source}")]
    ReadScope {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("extract scope data {index}: {source}")]
    ParseScope {
        index: usize,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("invalid scope {index}: {message}")]
    InvalidScope { index: usize, message: String },

    #[error("unify scopes: conflicting values at {path}")]
    ScopeConflict { path: String },

    #[error("encode scope: {0}")]
    EncodeScope(#[from] serde_json::Error),

    #[error("write scope file: {0}")]
    WriteScope(#[source] std::io::Error),

    #[error("run cue: {0}")]
    Engine(#[from] RunnerError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<CueError> for EvaluationError {
    fn from(e: CueError) -> Self {
        match e {
            CueError::NoFiles => EvaluationError::NoFiles,
            other => EvaluationError::engine(other),
        }
    }
}
