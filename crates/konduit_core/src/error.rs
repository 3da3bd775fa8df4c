//! Error types for the core module.

use std::fmt;
use std::path::PathBuf;

use konduit_kustomize::KustomizeError;
use konduit_runner::RunnerError;
use thiserror::Error;

use crate::evaluator::EvaluationError;

/// Result type alias for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Input category routed between static files and evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Values,
    Patches,
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Values => f.write_str("values"),
            Self::Patches => f.write_str("patches"),
        }
    }
}

/// Errors that can occur while configuring or running an instance.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("{0}")]
    Configuration(String),

    #[error("strict mode enabled; can't use evaluated and static {category} at the same time")]
    StrictConflict { category: Category },

    #[error("evaluate {category}: {source}")]
    Evaluation {
        category: Category,
        #[source]
        source: EvaluationError,
    },

    #[error("read patch file {path:?}: {source}")]
    ReadPatch {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{stage}: {source}")]
    Stage {
        stage: &'static str,
        #[source]
        source: Box<CoreError>,
    },

    #[error(transparent)]
    Build(#[from] KustomizeError),

    #[error(transparent)]
    Run(#[from] RunnerError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl CoreError {
    /// Wrap an error with the execution stage it happened in.
    pub fn stage(stage: &'static str) -> impl FnOnce(CoreError) -> CoreError {
        move |source| CoreError::Stage {
            stage,
            source: Box::new(source),
        }
    }

    /// The error with all stage wrappers removed.
    pub fn root(&self) -> &CoreError {
        match self {
            Self::Stage { source, .. } => source.root(),
            other => other,
        }
    }

    /// Whether the invocation itself was malformed.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self.root(),
            Self::Configuration(_) | Self::StrictConflict { .. }
        )
    }

    /// Whether a child process was stopped by cancellation.
    pub fn is_cancelled(&self) -> bool {
        match self.root() {
            Self::Run(e) => e.is_cancelled(),
            Self::Build(e) => e.runner_error().is_some_and(RunnerError::is_cancelled),
            _ => false,
        }
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(e: serde_json::Error) -> Self {
        CoreError::Serialization(e.to_string())
    }
}
