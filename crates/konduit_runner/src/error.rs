//! Error types for the runner module.

use thiserror::Error;

/// Result type alias for runner operations.
pub type RunnerResult<T> = Result<T, RunnerError>;

/// Errors that can occur while running an external program.
#[derive(Error, Debug)]
pub enum RunnerError {
    #[error("find executable {0:?}: not found in PATH")]
    ExecutableNotFound(String),

    #[error("spawn {command:?}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("exec command {command:?}: {}", describe_exit(.code))]
    Process { command: String, code: Option<i32> },

    #[error("exec command {0:?}: cancelled")]
    Cancelled(String),

    #[error("stream {command:?}: {source}")]
    Pipe {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl RunnerError {
    /// Whether the run was stopped by a cancellation request.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled(_))
    }

    /// Exit code of the failed child, if it exited on its own.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            Self::Process { code, .. } => *code,
            _ => None,
        }
    }
}

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit status {}", code),
        None => "terminated by signal".to_string(),
    }
}
