//! Process runner trait and run options.

use std::fmt;
use std::path::PathBuf;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite};
use tokio_util::sync::CancellationToken;

use crate::error::{RunnerError, RunnerResult};
use crate::pipe::pipe;

/// Boxed source for a child's standard input.
pub type BoxedReader = Box<dyn AsyncRead + Send + Unpin>;

/// Boxed sink for a child's standard output.
pub type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// Stream and directory overrides for a single run.
///
/// Anything left unset is inherited from the calling process.
#[derive(Default)]
pub struct RunOptions {
    /// Source copied into the child's standard input
    pub stdin: Option<BoxedReader>,
    /// Sink receiving the child's standard output
    pub stdout: Option<BoxedWriter>,
    /// Working directory of the child
    pub dir: Option<PathBuf>,
}

impl RunOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stdin(mut self, stdin: impl AsyncRead + Send + Unpin + 'static) -> Self {
        self.stdin = Some(Box::new(stdin));
        self
    }

    pub fn stdout(mut self, stdout: impl AsyncWrite + Send + Unpin + 'static) -> Self {
        self.stdout = Some(Box::new(stdout));
        self
    }

    pub fn dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.dir = Some(dir.into());
        self
    }
}

impl fmt::Debug for RunOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunOptions")
            .field("stdin", &self.stdin.as_ref().map(|_| "<reader>"))
            .field("stdout", &self.stdout.as_ref().map(|_| "<writer>"))
            .field("dir", &self.dir)
            .finish()
    }
}

/// Executes named external programs.
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    /// Run `command` with `args` to completion.
    ///
    /// Returns `Ok(())` only on a zero exit. If `cancel` fires before or
    /// during the run, the child is killed and [`RunnerError::Cancelled`]
    /// is returned.
    async fn run(
        &self,
        cancel: &CancellationToken,
        command: &str,
        args: &[String],
        options: RunOptions,
    ) -> RunnerResult<()>;

    /// Run `command` and collect its standard output.
    ///
    /// Any `stdout` override in `options` is replaced.
    async fn output(
        &self,
        cancel: &CancellationToken,
        command: &str,
        args: &[String],
        options: RunOptions,
    ) -> RunnerResult<Vec<u8>> {
        let (writer, mut reader) = pipe();
        let collect = async move {
            let mut buf = Vec::new();
            reader.read_to_end(&mut buf).await.map(|_| buf)
        };

        let (result, collected) =
            tokio::join!(self.run(cancel, command, args, options.stdout(writer)), collect);
        result?;

        collected.map_err(|source| RunnerError::Pipe {
            command: command.to_string(),
            source,
        })
    }
}

/// Render a command line for logging.
pub fn format_command(command: &str, args: &[String]) -> String {
    let mut line = command.to_string();
    for arg in args {
        if arg.is_empty() || arg.contains(' ') || arg.contains('=') {
            line.push_str(&format!(" '{}'", arg));
        } else {
            line.push(' ');
            line.push_str(arg);
        }
    }
    line
}
