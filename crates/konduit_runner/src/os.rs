//! Runner backed by real operating-system processes.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::{ChildStdin, ChildStdout, Command};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::{RunnerError, RunnerResult};
use crate::runner::{format_command, BoxedReader, BoxedWriter, ProcessRunner, RunOptions};

/// Runs programs found on the search path, streaming through the caller's
/// standard streams unless overridden.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsRunner;

impl OsRunner {
    pub fn new() -> Self {
        Self
    }
}

/// Resolve `command` to an executable file.
///
/// Bare names are looked up in `PATH`; anything containing a path
/// separator is checked as given.
pub fn find_executable(command: &str) -> RunnerResult<PathBuf> {
    let not_found = || RunnerError::ExecutableNotFound(command.to_string());

    if command.is_empty() {
        return Err(not_found());
    }

    let candidate = Path::new(command);
    if candidate.is_absolute() || candidate.components().count() > 1 {
        return if is_executable(candidate) {
            Ok(candidate.to_path_buf())
        } else {
            Err(not_found())
        };
    }

    let path = std::env::var_os("PATH").ok_or_else(not_found)?;
    for dir in std::env::split_paths(&path) {
        let full = dir.join(command);
        if is_executable(&full) {
            return Ok(full);
        }

        #[cfg(windows)]
        {
            let exe = full.with_extension("exe");
            if is_executable(&exe) {
                return Ok(exe);
            }
        }
    }

    Err(not_found())
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;

    path.metadata()
        .map(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

/// Copy `source` into the child's stdin, closing it at end-of-stream.
///
/// A child that stops reading early is not an error; a failing source is.
async fn feed_stdin(mut source: BoxedReader, mut stdin: ChildStdin) -> std::io::Result<()> {
    let mut buf = vec![0u8; 16 * 1024];
    loop {
        let n = source.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        match stdin.write_all(&buf[..n]).await {
            Err(e) if e.kind() == ErrorKind::BrokenPipe => break,
            other => other?,
        }
    }
    Ok(())
}

async fn drain_stdout(mut stdout: ChildStdout, mut sink: BoxedWriter) -> std::io::Result<()> {
    tokio::io::copy(&mut stdout, &mut sink).await?;
    sink.flush().await
}

async fn join_stream(
    command: &str,
    handle: Option<JoinHandle<std::io::Result<()>>>,
) -> RunnerResult<()> {
    let Some(handle) = handle else {
        return Ok(());
    };

    let result = handle
        .await
        .unwrap_or_else(|e| Err(std::io::Error::new(ErrorKind::Other, e)));

    result.map_err(|source| RunnerError::Pipe {
        command: command.to_string(),
        source,
    })
}

#[async_trait]
impl ProcessRunner for OsRunner {
    async fn run(
        &self,
        cancel: &CancellationToken,
        command: &str,
        args: &[String],
        options: RunOptions,
    ) -> RunnerResult<()> {
        let executable = find_executable(command)?;

        if cancel.is_cancelled() {
            return Err(RunnerError::Cancelled(command.to_string()));
        }

        let mut cmd = Command::new(&executable);
        cmd.args(args)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);

        if options.stdin.is_some() {
            cmd.stdin(Stdio::piped());
        }
        if options.stdout.is_some() {
            cmd.stdout(Stdio::piped());
        }
        if let Some(dir) = &options.dir {
            cmd.current_dir(dir);
        }

        debug!("Executing: {}", format_command(&executable.to_string_lossy(), args));

        let mut child = cmd.spawn().map_err(|source| RunnerError::Spawn {
            command: command.to_string(),
            source,
        })?;

        let feeder = options
            .stdin
            .zip(child.stdin.take())
            .map(|(source, stdin)| tokio::spawn(feed_stdin(source, stdin)));
        let drainer = child
            .stdout
            .take()
            .zip(options.stdout)
            .map(|(stdout, sink)| tokio::spawn(drain_stdout(stdout, sink)));

        let status = tokio::select! {
            status = child.wait() => status?,
            _ = cancel.cancelled() => {
                warn!("Cancelling {}", command);
                if let Err(e) = child.kill().await {
                    warn!("Failed to kill {}: {}", command, e);
                }
                for handle in feeder.iter().chain(drainer.iter()) {
                    handle.abort();
                }
                return Err(RunnerError::Cancelled(command.to_string()));
            }
        };

        let fed = join_stream(command, feeder).await;
        let drained = join_stream(command, drainer).await;

        // A broken input stream explains the exit better than the exit itself.
        fed?;

        if !status.success() {
            debug!("{} exited with {}", command, status);
            return Err(RunnerError::Process {
                command: command.to_string(),
                code: status.code(),
            });
        }

        drained
    }
}
